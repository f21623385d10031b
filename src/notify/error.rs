use thiserror::Error;

/// The digest could not be delivered. Reported, never rolls back the calendar.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{method} returned {status}")]
    Status {
        method: &'static str,
        status: reqwest::StatusCode,
    },
    #[error("Slack API error from {method}: {error}")]
    Api { method: &'static str, error: String },
    #[error("attachment read error: {0}")]
    Attachment(#[from] std::io::Error),
}
