use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use tracing::error;

use crate::clock::DATETIME_FORMAT;
use crate::registry::IpEntry;

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate<'a> {
    entries: &'a [IpEntry],
    time_format: &'a str,
    auth_enabled: bool,
}

/// Render the allow-list page; a template failure becomes a bare 500.
pub fn index(entries: &[IpEntry], auth_enabled: bool) -> Response {
    let template = IndexTemplate {
        entries,
        time_format: DATETIME_FORMAT,
        auth_enabled,
    };

    match template.render() {
        Ok(body) => Html(body).into_response(),
        Err(e) => {
            error!("failed to render index template: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
