mod digest;
mod error;
mod slack;
mod transport;

pub use digest::DigestFormatter;
pub use error::DeliveryError;
pub use slack::Slack;
pub use transport::ChatTransport;
