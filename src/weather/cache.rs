use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fsutil;
use crate::weather::error::WeatherError;
use crate::weather::types::WeatherAnnotation;

pub const CACHE_FILE: &str = "weather_cache.yaml";

/// Forecasts kept between runs, at most one per UTC date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherCache {
    #[serde(default)]
    dates: BTreeMap<NaiveDate, WeatherAnnotation>,
}

impl WeatherCache {
    /// A missing file is an empty cache.
    pub fn load(path: &Path) -> Result<Self, WeatherError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let cache: Self = serde_yaml::from_str(&content)?;
        log::debug!("Weather cache {} holds {} dates", path.display(), cache.len());
        Ok(cache)
    }

    pub fn save(&self, path: &Path) -> Result<(), WeatherError> {
        fsutil::save_yaml(path, self)?;
        Ok(())
    }

    pub fn get(&self, date: NaiveDate) -> Option<&WeatherAnnotation> {
        self.dates.get(&date)
    }

    /// Replaces any annotation already held for the same date.
    pub fn insert(&mut self, annotation: WeatherAnnotation) {
        self.dates.insert(annotation.date, annotation);
    }

    /// Drops dates before `today`.
    pub fn prune(&mut self, today: NaiveDate) {
        self.dates.retain(|date, _| *date >= today);
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}
