use thiserror::Error;

use crate::calendar::StoreError;
use crate::config::ConfigError;
use crate::predict::SourceError;

/// Errors that abort a run before anything is published.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("prediction source error: {0}")]
    Source(#[from] SourceError),
    #[error("calendar store error: {0}")]
    Store(#[from] StoreError),
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}
