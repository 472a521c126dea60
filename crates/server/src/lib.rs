//! emr-server library crate
//!
//! Exposes the FHIR bundle importer, its PostgreSQL store and `build_app`
//! for integration tests. The actual binary entrypoint is in `main.rs`.

pub mod config;
pub mod db;
mod error;
pub mod import;
mod middleware;
mod routes;
pub mod state;

use axum::{Extension, Router, extract::DefaultBodyLimit, middleware as axum_mw, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use import::Store;
use middleware::ApiKeyAuth;
use state::AppState;

/// Build the full application router with all routes and middleware.
///
/// Generic over the store so integration tests can run the HTTP layer
/// against an in-memory store without binding to a TCP port.
pub fn build_app<S>(store: S, config: &Config) -> Router
where
    S: Store + Clone + 'static,
{
    let auth = ApiKeyAuth::new(config.api_key.clone());

    // Protected routes (admin only)
    let protected_routes: Router<AppState<S>> = Router::new()
        .nest("/fhir", routes::fhir_routes::<S>())
        .layer(DefaultBodyLimit::max(config.max_bundle_bytes))
        .layer(axum_mw::from_fn(middleware::auth_middleware))
        .layer(Extension(auth));

    // Install Prometheus metrics recorder.
    // Use build_recorder() + set_global_recorder() so that repeated calls
    // (e.g. in integration tests) don't panic; the second install is
    // silently ignored and we still get a valid handle for /metrics.
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let prometheus_handle = recorder.handle();
    let _ = metrics::set_global_recorder(recorder);

    // Public routes (no auth required)
    let public_routes: Router<AppState<S>> = Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/metrics", get(routes::metrics::get))
        .layer(Extension(prometheus_handle));

    // Build CORS layer
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Build application
    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(AppState::new(store, config))
        .layer(axum_mw::from_fn(middleware::request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum_mw::from_fn(middleware::metrics_middleware))
}
