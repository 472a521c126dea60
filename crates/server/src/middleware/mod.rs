//! HTTP middleware

pub mod auth;
pub mod metrics;
pub mod request_id;

pub use auth::{ApiKeyAuth, auth_middleware};
pub use self::metrics::metrics_middleware;
pub use request_id::request_id_middleware;
