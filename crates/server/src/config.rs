//! Server configuration

use std::path::PathBuf;

use crate::import::ImportOptions;

/// Server configuration loaded from environment variables
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    /// Admin key required on `/fhir/*`; `None` disables the check
    pub api_key: Option<String>,
    pub cors_origins: Vec<String>,
    /// Directory the file-based import endpoints read bundles from
    pub import_dir: PathBuf,
    /// Doctor recorded on imported appointments and medical records
    pub default_doctor_id: i32,
    pub max_bundle_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "host=localhost user=postgres dbname=emr".into()),
            bind_address: std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5000".into()),
            api_key: std::env::var("API_KEY").ok().filter(|k| !k.is_empty()),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".into())
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            import_dir: std::env::var("FHIR_IMPORT_DIR")
                .unwrap_or_else(|_| "data/fhir".into())
                .into(),
            default_doctor_id: env_parse("IMPORT_DOCTOR_ID", 1),
            max_bundle_bytes: env_parse("MAX_BUNDLE_BYTES", 50 * 1024 * 1024),
        }
    }

    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            default_doctor_id: self.default_doctor_id,
        }
    }
}

/// Parse an environment variable, falling back to `default` when it is
/// unset or unparsable
fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(variable = name, value = %raw, "Ignoring invalid value");
            default
        }),
        Err(_) => default,
    }
}
