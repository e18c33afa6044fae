//! Bearer-token authentication for the admin API.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::Response,
};

const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Admin API credentials. Without a key every request is let through.
#[derive(Clone, Debug, Default)]
pub struct SecurityConfig {
    pub api_key: Option<String>,
}

impl SecurityConfig {
    /// Reads `GEMINI_API_KEY`. An empty value counts as unset.
    pub fn from_env() -> Self {
        let api_key = std::env::var(API_KEY_VAR).ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!("{} is not set; the admin API is unauthenticated", API_KEY_VAR);
        }
        Self { api_key }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
        }
    }

    fn accepts(&self, headers: &HeaderMap) -> Result<(), &'static str> {
        let Some(expected) = self.api_key.as_deref() else {
            return Ok(());
        };
        let header = headers
            .get(AUTHORIZATION)
            .ok_or("missing Authorization header")?
            .to_str()
            .map_err(|_| "unreadable Authorization header")?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or("Authorization header is not a bearer token")?;
        if token == expected {
            Ok(())
        } else {
            Err("wrong API key")
        }
    }
}

/// Rejects requests that do not carry the configured bearer token.
/// Installed as a route layer, so only the routes it wraps are checked.
pub async fn auth_middleware(
    State(config): State<SecurityConfig>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    match config.accepts(request.headers()) {
        Ok(()) => Ok(next.run(request).await),
        Err(reason) => {
            tracing::warn!(path = %request.uri().path(), "Rejected request: {}", reason);
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
