use std::path::Path;

use crate::notify::error::DeliveryError;

/// Delivers a digest to a chat channel. No retries.
#[allow(async_fn_in_trait)]
pub trait ChatTransport {
    async fn deliver(
        &self,
        channel: &str,
        text: &str,
        attachment: Option<&Path>,
    ) -> Result<(), DeliveryError>;
}
