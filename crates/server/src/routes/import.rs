//! FHIR bundle import handlers

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Serialize;

use crate::error::AppError;
use crate::import::{self, ImportStats, ImportSummary, Store};
use crate::middleware::request_id::RequestId;
use crate::state::AppState;

/// Response for single-bundle imports
#[derive(Serialize)]
pub struct ImportResponse {
    message: String,
    stats: ImportStats,
}

/// Response for directory imports
#[derive(Serialize)]
pub struct ImportAllResponse {
    message: String,
    summary: ImportSummary,
}

/// Only plain file names inside the import directory may be addressed
fn validate_filename(filename: &str) -> Result<(), AppError> {
    let traverses = filename.is_empty()
        || filename == "."
        || filename.contains("..")
        || filename.contains(['/', '\\']);

    if traverses {
        return Err(AppError::BadRequest(format!(
            "Invalid bundle file name '{}'",
            filename
        )));
    }
    Ok(())
}

/// POST /fhir/import/{filename} - Import one bundle file from the import directory
pub async fn import_file<S: Store>(
    State(state): State<AppState<S>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Path(filename): Path<String>,
) -> Result<Json<ImportResponse>, AppError> {
    validate_filename(&filename)?;

    let path = state.import_dir.join(&filename);
    tracing::info!(request_id = %request_id, file = %filename, "Importing FHIR bundle file");
    let stats = import::import_file(&state.store, &path, &state.options).await?;

    Ok(Json(ImportResponse {
        message: format!("FHIR data from {} imported successfully", filename),
        stats,
    }))
}

/// POST /fhir/import-all - Import every bundle file in the import directory
pub async fn import_all<S: Store>(
    State(state): State<AppState<S>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
) -> Result<Json<ImportAllResponse>, AppError> {
    tracing::info!(
        request_id = %request_id,
        dir = %state.import_dir.display(),
        "Importing all FHIR bundle files"
    );
    let summary = import::import_directory(&state.store, &state.import_dir, &state.options).await?;

    Ok(Json(ImportAllResponse {
        message: "FHIR data import complete".to_string(),
        summary,
    }))
}

/// POST /fhir/import - Import the bundle sent as the request body
pub async fn import_body<S: Store>(
    State(state): State<AppState<S>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    body: String,
) -> Result<Json<ImportResponse>, AppError> {
    tracing::info!(
        request_id = %request_id,
        bytes = body.len(),
        "Importing FHIR bundle from request body"
    );
    let stats = import::import_bundle(&state.store, &body, &state.options).await?;

    Ok(Json(ImportResponse {
        message: "FHIR bundle imported successfully".to_string(),
        stats,
    }))
}
