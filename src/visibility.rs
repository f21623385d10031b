use serde::Deserialize;

use crate::predict::PassRecord;
use crate::site::Segment;

/// Which part of the night passes must peak in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TimeWindow {
    /// After sunset, before local midnight.
    Evening,
    /// After local midnight, before sunrise.
    Morning,
    /// No time-of-day restriction.
    All,
}

/// How the digest groups passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, strum_macros::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum GroupMode {
    #[serde(alias = "bydate")]
    ByDate,
    #[serde(alias = "bysat")]
    BySatellite,
}

/// Thresholds a pass must meet to be notified. Fixed for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationCriteria {
    pub window: TimeWindow,
    pub min_altitude_deg: u32,
    pub min_duration_seconds: u32,
    pub grouping: GroupMode,
}

impl NotificationCriteria {
    /// One-line description used in digests and logs.
    pub fn describe(&self) -> String {
        format!(
            "alt >= {} deg & duration >= {} sec & time window = {}",
            self.min_altitude_deg, self.min_duration_seconds, self.window
        )
    }
}

/// Whether a pass should be notified under `criteria`.
pub fn qualifies(pass: &PassRecord, criteria: &NotificationCriteria) -> bool {
    pass.visible
        && in_window(pass.segment(), criteria.window)
        && pass.max_altitude_deg >= f64::from(criteria.min_altitude_deg)
        && pass.duration_seconds >= i64::from(criteria.min_duration_seconds)
}

fn in_window(segment: Segment, window: TimeWindow) -> bool {
    match window {
        TimeWindow::All => true,
        TimeWindow::Evening => segment == Segment::Evening,
        TimeWindow::Morning => segment == Segment::Morning,
    }
}
