use thiserror::Error;

/// Forecast could not be obtained. Never fatal: the annotator degrades to unknown weather.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("METEOBLUE_API_KEY is not set")]
    MissingApiKey,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("meteoblue returned {0}")]
    Status(reqwest::StatusCode),
    #[error("unexpected forecast payload: {0}")]
    Payload(String),
    #[error("weather cache IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("weather cache parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
