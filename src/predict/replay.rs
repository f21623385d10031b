use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::Deserialize;

use crate::predict::error::SourceError;
use crate::predict::source::PredictionSource;
use crate::predict::types::{RawPassEntry, SatelliteInfo};

/// Raw predictions recorded in a YAML file.
///
/// ```yaml
/// timezone: Asia/Tokyo
/// entries:
///   - satellite: ISS
///     norad_id: 25544
///     start: { time: "2026-10-17T18:30:00", altitude: 10, azimuth: SW }
///     peak: { time: "2026-10-17T18:32:00", altitude: 45, azimuth: S }
///     end: { time: "2026-10-17T18:34:00", altitude: 10, azimuth: E }
/// ```
pub struct ReplaySource {
    path: PathBuf,
    timezone: Tz,
    entries: Vec<RawPassEntry>,
}

#[derive(Debug, Deserialize)]
struct ReplayFile {
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    entries: Vec<RawPassEntry>,
}

impl ReplaySource {
    pub fn from_file(path: &Path) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path)?;
        let mut source = Self::from_str(&content)?;
        source.path = path.to_path_buf();
        Ok(source)
    }

    pub fn from_str(yaml: &str) -> Result<Self, SourceError> {
        let file: ReplayFile = serde_yaml::from_str(yaml)?;
        let timezone = match file.timezone {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| SourceError::Timezone(name.clone()))?,
            None => Tz::UTC,
        };
        Ok(Self {
            path: PathBuf::new(),
            timezone,
            entries: file.entries,
        })
    }
}

impl PredictionSource for ReplaySource {
    fn display_timezone(&self) -> Tz {
        self.timezone
    }

    /// Entries are replayed as recorded; satellites outside the catalogue are kept.
    async fn fetch(&self, _satellites: &[SatelliteInfo]) -> Result<Vec<RawPassEntry>, SourceError> {
        log::info!(
            "Replaying {} recorded pass entries from {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(self.entries.clone())
    }
}
