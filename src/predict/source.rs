use chrono_tz::Tz;

use crate::predict::{RawPassEntry, SatelliteInfo, SourceError};

/// Supplies raw pass predictions for the configured site.
#[allow(async_fn_in_trait)]
pub trait PredictionSource {
    /// Timezone in which the source writes wall-clock times.
    fn display_timezone(&self) -> Tz;

    async fn fetch(&self, satellites: &[SatelliteInfo]) -> Result<Vec<RawPassEntry>, SourceError>;
}
