//! Application error handling

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use emr_core::{IssueType, OperationOutcome};

use crate::import::{FileImportError, ImportError};

/// Application error type
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Import(ImportError),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, outcome) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, OperationOutcome::not_found(&msg)),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, OperationOutcome::invalid(&msg)),
            AppError::Import(err) => {
                let msg = err.to_string();
                match err {
                    ImportError::MalformedInput(_) => {
                        (StatusCode::BAD_REQUEST, OperationOutcome::invalid(&msg))
                    }
                    ImportError::InvalidBundle(_) => (
                        StatusCode::BAD_REQUEST,
                        OperationOutcome::error(IssueType::Structure, &msg),
                    ),
                    ImportError::BundleImport(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        OperationOutcome::error(IssueType::Exception, &msg),
                    ),
                }
            }
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                OperationOutcome::error(IssueType::Exception, &msg),
            ),
        };

        (status, Json(outcome)).into_response()
    }
}

impl From<ImportError> for AppError {
    fn from(err: ImportError) -> Self {
        AppError::Import(err)
    }
}

impl From<FileImportError> for AppError {
    fn from(err: FileImportError) -> Self {
        match err {
            FileImportError::Read { path, source }
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                AppError::NotFound(format!("Bundle file {} not found", name))
            }
            FileImportError::Read { .. } => AppError::Internal(err.to_string()),
            FileImportError::Import(err) => AppError::Import(err),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("I/O error: {}", err))
    }
}
