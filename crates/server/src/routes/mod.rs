pub mod health;
pub mod import;
pub mod metrics;

use axum::{Router, routing::post};

use crate::import::Store;
use crate::state::AppState;

/// Build the admin FHIR import routes
pub fn fhir_routes<S>() -> Router<AppState<S>>
where
    S: Store + Clone + 'static,
{
    Router::new()
        .route("/import", post(import::import_body::<S>))
        .route("/import-all", post(import::import_all::<S>))
        .route("/import/{filename}", post(import::import_file::<S>))
}
