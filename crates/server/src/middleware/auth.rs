//! Admin authentication for the import endpoints

use axum::{
    Json,
    body::Body,
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use emr_core::{IssueType, OperationOutcome};

/// Header carrying the admin API key
pub const API_KEY_HEADER: &str = "X-API-Key";

/// API Key authentication state
#[derive(Clone)]
pub struct ApiKeyAuth {
    api_key: Option<String>,
}

impl ApiKeyAuth {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }

    /// Without a configured key every request is accepted
    fn is_authorized(&self, headers: &HeaderMap) -> bool {
        match &self.api_key {
            None => true,
            Some(expected) => headers
                .get(API_KEY_HEADER)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|provided| provided == expected),
        }
    }
}

/// Reject requests that do not carry the admin API key
pub async fn auth_middleware(request: Request<Body>, next: Next) -> Response {
    let authorized = request
        .extensions()
        .get::<ApiKeyAuth>()
        .is_none_or(|auth| auth.is_authorized(request.headers()));

    if !authorized {
        tracing::warn!(path = %request.uri().path(), "Rejected request without a valid API key");
        let outcome = OperationOutcome::error(
            IssueType::Login,
            "Only admins can import FHIR data: missing or invalid API key",
        );
        return (StatusCode::UNAUTHORIZED, Json(outcome)).into_response();
    }

    next.run(request).await
}
