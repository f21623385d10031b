use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::site::{Night, Segment};

/// Where a satellite's display name came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum NameSource {
    Config,
    Celestrak,
    Fallback,
}

/// Information about a single tracked satellite
#[derive(Debug, Clone, PartialEq)]
pub struct SatelliteInfo {
    pub name: String,
    pub norad_id: u32,
    pub name_source: NameSource,
}

/// One pass prediction as handed over by a prediction source.
///
/// Everything is text in the source's own shape; [`crate::predict::Normalizer`]
/// turns it into a [`PassRecord`] or rejects it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPassEntry {
    #[serde(deserialize_with = "scalar")]
    pub satellite: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub norad_id: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub magnitude: Option<String>,
    /// Calendar date of the peak in the source's display timezone.
    #[serde(deserialize_with = "scalar")]
    pub date: Option<String>,
    /// Modified Julian Date of the peak.
    #[serde(deserialize_with = "scalar")]
    pub mjd: Option<String>,
    pub start: RawPoint,
    pub peak: RawPoint,
    pub end: RawPoint,
    #[serde(deserialize_with = "scalar")]
    pub pass_type: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub detail_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPoint {
    #[serde(deserialize_with = "scalar")]
    pub time: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub altitude: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub azimuth: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Accepts any YAML scalar as text so replay files can write `altitude: 45`.
fn scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|s| s.to_string()))
}

/// Position of the satellite at one instant of a pass
#[derive(Debug, Clone, PartialEq)]
pub struct PassPoint {
    pub time: DateTime<Utc>,
    pub altitude_deg: Option<f64>,
    pub azimuth: Option<String>,
}

/// A predicted visible pass, in UTC, ready for filtering
#[derive(Debug, Clone, PartialEq)]
pub struct PassRecord {
    pub satellite: String,
    pub norad_id: Option<u32>,
    pub start: PassPoint,
    pub peak: PassPoint,
    pub end: PassPoint,
    pub max_altitude_deg: f64,
    pub magnitude: Option<f64>,
    pub duration_seconds: i64,
    pub visible: bool,
    pub detail_url: Option<String>,
    /// The night the peak belongs to at the observing site.
    pub night: Night,
}

impl PassRecord {
    /// Part of the night the peak falls into.
    pub fn segment(&self) -> Segment {
        self.night.segment(self.peak.time)
    }

    /// Stable identifier used for grouping and identity keys.
    pub fn satellite_id(&self) -> String {
        match self.norad_id {
            Some(id) => id.to_string(),
            None => self.satellite.clone(),
        }
    }
}
