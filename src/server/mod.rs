//! HTTP surface and graceful shutdown.
//!
//! ```text
//! POST /api/me/add      allow the caller's own address
//! POST /api/me/delete   remove the caller's own address
//! POST /api/ip/add      allow the `ip` form field
//! POST /api/ip/delete   remove the `ip` form field
//! GET  /                current allow-list
//! GET  <login_path>     basic-auth challenge (only when auth is enabled)
//! ```

mod auth;
mod handlers;
mod render;
mod shutdown;

use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

pub use auth::{AuthFailure, BasicAuth};
pub use shutdown::serve;

use crate::error::AllowlistError;
use crate::registry::Registry;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    /// Cancelled when the shutdown grace period runs out; in-flight firewall
    /// commands observe it.
    pub abort: CancellationToken,
    pub auth: Option<Arc<BasicAuth>>,
}

impl AppState {
    pub fn new(registry: Arc<Registry>, abort: CancellationToken, auth: Option<BasicAuth>) -> Self {
        Self {
            registry,
            abort,
            auth: auth.map(Arc::new),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let mut api = Router::new()
        .route("/api/me/add", post(handlers::add_me))
        .route("/api/me/delete", post(handlers::delete_me))
        .route("/api/ip/add", post(handlers::add_ip))
        .route("/api/ip/delete", post(handlers::delete_ip));

    let mut app = Router::new().route("/", get(handlers::index));

    if let Some(basic) = &state.auth {
        api = api.route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_basic_auth,
        ));
        app = app.route(basic.login_path(), get(auth::login));
    }

    app.merge(api).with_state(state)
}

impl IntoResponse for AllowlistError {
    fn into_response(self) -> Response {
        let status = match &self {
            AllowlistError::InvalidAddress(_)
            | AllowlistError::RequestMalformed(_)
            | AllowlistError::PeerAddressUnresolvable(_) => StatusCode::BAD_REQUEST,
            AllowlistError::NotFound(_) => StatusCode::NOT_FOUND,
            AllowlistError::CommandExecutionFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AllowlistError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        };

        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("{}", self);
        }

        // Internal error text stays in the log
        (status, status.canonical_reason().unwrap_or("Error")).into_response()
    }
}
