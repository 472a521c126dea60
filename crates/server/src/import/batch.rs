//! Importing bundle files from disk

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use super::importer::{ImportError, ImportOptions, ImportStats, import_bundle};
use super::store::Store;

/// Failure to import a single bundle file
#[derive(Debug, Error)]
pub enum FileImportError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Import(#[from] ImportError),
}

/// Result for one file of a directory import
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ImportStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Tally of a directory import
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub total: usize,
    pub imported: usize,
    pub failed: usize,
    pub files: Vec<FileOutcome>,
}

/// Read a bundle file and import it as one transaction
pub async fn import_file<S: Store>(
    store: &S,
    path: &Path,
    options: &ImportOptions,
) -> Result<ImportStats, FileImportError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FileImportError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(import_bundle(store, &text, options).await?)
}

/// Import every `*.json` file in `dir`, in file name order.
///
/// Each file is its own transaction. A file that fails is recorded in the
/// summary and the remaining files are still imported; only a directory
/// that cannot be listed is an error.
pub async fn import_directory<S: Store>(
    store: &S,
    dir: &Path,
    options: &ImportOptions,
) -> std::io::Result<ImportSummary> {
    let mut paths = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") && entry.file_type().await?.is_file()
        {
            paths.push(path);
        }
    }
    paths.sort();

    let mut summary = ImportSummary {
        total: paths.len(),
        ..Default::default()
    };

    for path in paths {
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        match import_file(store, &path, options).await {
            Ok(stats) => {
                tracing::info!(file = %file, "Imported FHIR bundle file");
                summary.imported += 1;
                summary.files.push(FileOutcome {
                    file,
                    stats: Some(stats),
                    error: None,
                });
            }
            Err(e) => {
                tracing::error!(file = %file, error = %e, "Failed to import FHIR bundle file");
                summary.failed += 1;
                summary.files.push(FileOutcome {
                    file,
                    stats: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    Ok(summary)
}
