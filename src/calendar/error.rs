use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("store entry {key} holds event {uid}")]
    KeyMismatch { key: String, uid: String },
    #[error("rendered calendar does not parse: {0}")]
    InvalidCalendar(String),
}
