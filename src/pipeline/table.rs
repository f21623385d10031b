use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::fsutil;
use crate::predict::PassPoint;
use crate::site::Segment;
use crate::visibility::{qualifies, NotificationCriteria};
use crate::weather::AnnotatedPass;

pub const PASS_TABLE_FILE: &str = "SatPass.csv";

#[derive(Debug, Error)]
pub enum TableError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One annotated pass, flattened. Unknown values are empty cells.
#[derive(Debug, Serialize)]
struct PassRow<'a> {
    satellite: &'a str,
    norad_id: Option<u32>,
    start_utc: String,
    start_alt_deg: Option<f64>,
    start_az: Option<&'a str>,
    peak_utc: String,
    peak_alt_deg: Option<f64>,
    peak_az: Option<&'a str>,
    end_utc: String,
    end_alt_deg: Option<f64>,
    end_az: Option<&'a str>,
    max_alt_deg: f64,
    magnitude: Option<f64>,
    duration_s: i64,
    visible: bool,
    segment: &'static str,
    qualifies: bool,
    total_cloud_pct: Option<f64>,
    low_cloud_pct: Option<f64>,
    mid_cloud_pct: Option<f64>,
    high_cloud_pct: Option<f64>,
    temperature_c: Option<f64>,
    wind_speed_ms: Option<f64>,
    pictocode: Option<u8>,
}

impl<'a> PassRow<'a> {
    fn new(annotated: &'a AnnotatedPass, criteria: &NotificationCriteria) -> Self {
        let pass = &annotated.pass;
        let weather = annotated.weather.as_ref();
        PassRow {
            satellite: &pass.satellite,
            norad_id: pass.norad_id,
            start_utc: utc(pass.start.time),
            start_alt_deg: pass.start.altitude_deg,
            start_az: azimuth(&pass.start),
            peak_utc: utc(pass.peak.time),
            peak_alt_deg: pass.peak.altitude_deg,
            peak_az: azimuth(&pass.peak),
            end_utc: utc(pass.end.time),
            end_alt_deg: pass.end.altitude_deg,
            end_az: azimuth(&pass.end),
            max_alt_deg: pass.max_altitude_deg,
            magnitude: pass.magnitude,
            duration_s: pass.duration_seconds,
            visible: pass.visible,
            segment: match pass.segment() {
                Segment::Evening => "evening",
                Segment::Morning => "morning",
                Segment::Daylight => "daylight",
            },
            qualifies: qualifies(pass, criteria),
            total_cloud_pct: weather.map(|w| w.total_cloud_pct),
            low_cloud_pct: weather.map(|w| w.low_cloud_pct),
            mid_cloud_pct: weather.map(|w| w.mid_cloud_pct),
            high_cloud_pct: weather.map(|w| w.high_cloud_pct),
            temperature_c: weather.map(|w| w.temperature_c),
            wind_speed_ms: weather.map(|w| w.wind_speed_ms),
            pictocode: weather.map(|w| w.pictocode),
        }
    }
}

fn utc(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn azimuth(p: &PassPoint) -> Option<&str> {
    p.azimuth.as_deref()
}

/// Every annotated pass of the run, qualifying or not, in peak order.
pub fn render(
    passes: &[AnnotatedPass],
    criteria: &NotificationCriteria,
) -> Result<Vec<u8>, TableError> {
    let mut rows: Vec<PassRow> = passes.iter().map(|p| PassRow::new(p, criteria)).collect();
    rows.sort_by(|a, b| {
        a.peak_utc
            .cmp(&b.peak_utc)
            .then_with(|| a.satellite.cmp(b.satellite))
    });

    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.into_inner().map_err(|e| TableError::Io(e.into_error()))
}

pub fn write(path: &Path, csv: &[u8]) -> Result<(), TableError> {
    fsutil::write_atomic(path, csv)?;
    Ok(())
}
