//! HTTP basic authentication for the mutation routes.

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;
use tracing::{debug, warn};

use super::AppState;
use crate::config::{AuthConfig, SecureString};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("missing credentials")]
    Missing,

    #[error("malformed Authorization header")]
    Malformed,

    #[error("invalid credentials for user '{0}'")]
    InvalidCredentials(String),
}

/// Static user table checked against `Authorization: Basic` headers.
pub struct BasicAuth {
    realm: String,
    login_path: String,
    users: Vec<(String, SecureString)>,
}

impl BasicAuth {
    /// `None` when auth is disabled in the configuration.
    pub fn from_config(config: &AuthConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }

        Some(Self {
            realm: config.realm.clone(),
            login_path: config.login_path.clone(),
            users: config
                .users
                .iter()
                .map(|u| (u.username.clone(), u.get_password()))
                .collect(),
        })
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Check the request headers, returning the authenticated user name.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<&str, AuthFailure> {
        let value = headers.get(AUTHORIZATION).ok_or(AuthFailure::Missing)?;
        let (username, password) = parse_basic(value)?;

        self.users
            .iter()
            .find(|(name, secret)| *name == username && secret.as_str() == password)
            .map(|(name, _)| name.as_str())
            .ok_or(AuthFailure::InvalidCredentials(username))
    }

    fn challenge(&self) -> Response {
        let mut response = StatusCode::UNAUTHORIZED.into_response();
        let header = format!("Basic realm=\"{}\", charset=\"UTF-8\"", self.realm);
        if let Ok(value) = HeaderValue::from_str(&header) {
            response.headers_mut().insert(WWW_AUTHENTICATE, value);
        }
        response
    }
}

fn parse_basic(value: &HeaderValue) -> Result<(String, String), AuthFailure> {
    let value = value.to_str().map_err(|_| AuthFailure::Malformed)?;
    let (scheme, encoded) = value.trim().split_once(' ').ok_or(AuthFailure::Malformed)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(AuthFailure::Malformed);
    }

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthFailure::Malformed)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthFailure::Malformed)?;
    let (username, password) = decoded.split_once(':').ok_or(AuthFailure::Malformed)?;

    Ok((username.to_string(), password.to_string()))
}

/// Middleware: unauthenticated requests are sent to the login path.
pub async fn require_basic_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(auth) = state.auth.as_deref() else {
        return next.run(request).await;
    };

    match auth.authenticate(request.headers()) {
        Ok(user) => {
            debug!("Authenticated user '{}' for {}", user, request.uri().path());
            next.run(request).await
        }
        Err(AuthFailure::Malformed) => {
            warn!("Rejected request to {}: malformed credentials", request.uri().path());
            StatusCode::BAD_REQUEST.into_response()
        }
        Err(e) => {
            debug!("Redirecting {} to login: {}", request.uri().path(), e);
            Redirect::to(auth.login_path()).into_response()
        }
    }
}

/// Login page: challenges until the browser presents valid credentials.
pub async fn login(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(auth) = state.auth.as_deref() else {
        return Redirect::to("/").into_response();
    };

    match auth.authenticate(&headers) {
        Ok(user) => {
            debug!("User '{}' logged in", user);
            Redirect::to("/").into_response()
        }
        Err(AuthFailure::Malformed) => StatusCode::BAD_REQUEST.into_response(),
        Err(e) => {
            if let AuthFailure::InvalidCredentials(_) = e {
                warn!("Login failed: {}", e);
            }
            auth.challenge()
        }
    }
}
