use chrono::{DateTime, Utc};
use thiserror::Error;

/// A single raw entry that cannot become a [`super::PassRecord`].
#[derive(Debug, Error, PartialEq)]
pub enum MalformedPassData {
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("invalid {field}: {value:?}")]
    Invalid { field: &'static str, value: String },
    #[error("pass times out of order (start {start}, peak {peak}, end {end})")]
    OutOfOrder {
        start: DateTime<Utc>,
        peak: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Retrieval of raw predictions failed; fatal to the run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("prediction source returned {status} for NORAD {norad_id}")]
    Status {
        norad_id: u32,
        status: reqwest::StatusCode,
    },
    #[error("unrecognised pass summary page for NORAD {0}")]
    Unrecognised(u32),
    #[error("replay file read error: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("replay file parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid timezone in replay file: {0}")]
    Timezone(String),
}
