use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::predict::PassRecord;
use crate::weather::pictocode::{self, Pictocode};

/// When the forecast is fetched again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WeatherPolicy {
    /// Refetch on every run.
    Force,
    /// Reuse a forecast fetched earlier the same (UTC) day.
    Daily,
}

/// One hour of forecast, starting at `time`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyWeather {
    pub time: DateTime<Utc>,
    pub total_cloud_pct: f64,
    pub low_cloud_pct: f64,
    pub mid_cloud_pct: f64,
    pub high_cloud_pct: f64,
    pub temperature_c: f64,
    pub wind_speed_ms: f64,
    pub pictocode: u8,
}

impl HourlyWeather {
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.time <= at && at < self.time + Duration::hours(1)
    }

    pub fn sky(&self) -> Option<&'static Pictocode> {
        pictocode::lookup(self.pictocode)
    }

    /// Emoji for the sky condition, empty for unknown codes.
    pub fn emoji(&self) -> &'static str {
        self.sky().map(|p| p.emoji).unwrap_or("")
    }
}

/// Forecast for one UTC date at the site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAnnotation {
    pub date: NaiveDate,
    pub fetched_at: DateTime<Utc>,
    pub hours: Vec<HourlyWeather>,
}

impl WeatherAnnotation {
    /// The forecast hour `at` falls into.
    pub fn hour_of(&self, at: DateTime<Utc>) -> Option<&HourlyWeather> {
        let truncated = at.with_nanosecond(0)?.with_second(0)?.with_minute(0)?;
        self.hours
            .iter()
            .find(|h| h.time == truncated)
            .or_else(|| self.hours.iter().find(|h| h.covers(at)))
    }
}

/// A pass plus the forecast for the hour it starts in.
///
/// `weather` is `None` when the forecast is unknown; filtering never looks at it.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedPass {
    pub pass: PassRecord,
    pub weather: Option<HourlyWeather>,
}
