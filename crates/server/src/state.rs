//! Shared handler state

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::import::ImportOptions;

/// State handed to every route: the store plus import settings
#[derive(Clone)]
pub struct AppState<S> {
    pub store: S,
    pub import_dir: Arc<PathBuf>,
    pub options: ImportOptions,
}

impl<S> AppState<S> {
    pub fn new(store: S, config: &Config) -> Self {
        Self {
            store,
            import_dir: Arc::new(config.import_dir.clone()),
            options: config.import_options(),
        }
    }
}
