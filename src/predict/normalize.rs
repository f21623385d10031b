use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::predict::error::MalformedPassData;
use crate::predict::types::{PassPoint, PassRecord, RawPassEntry, RawPoint};
use crate::site::Site;

/// How far ahead predictions are kept.
pub const PREDICTION_HORIZON_DAYS: i64 = 10;

const MJD_UNIX_EPOCH: f64 = 40_587.0;

/// Turns raw source entries into UTC [`PassRecord`]s for one site.
pub struct Normalizer<'a> {
    site: &'a Site,
    source_tz: Tz,
    now: DateTime<Utc>,
    horizon: Duration,
}

impl<'a> Normalizer<'a> {
    pub fn new(site: &'a Site, source_tz: Tz, now: DateTime<Utc>) -> Self {
        Self {
            site,
            source_tz,
            now,
            horizon: Duration::days(PREDICTION_HORIZON_DAYS),
        }
    }

    /// Normalizes every entry, skipping malformed ones with a warning.
    pub fn normalize_all(&self, raw: &[RawPassEntry]) -> Vec<PassRecord> {
        let mut passes = Vec::new();
        let mut skipped = 0usize;
        let mut outside = 0usize;

        for entry in raw {
            match self.normalize(entry) {
                Ok(Some(pass)) => passes.push(pass),
                Ok(None) => outside += 1,
                Err(e) => {
                    skipped += 1;
                    log::warn!(
                        "Skipping pass entry for {}: {}",
                        entry
                            .satellite
                            .as_deref()
                            .or(entry.norad_id.as_deref())
                            .unwrap_or("unknown satellite"),
                        e
                    );
                }
            }
        }

        log::info!(
            "Normalized {} passes ({} malformed, {} outside the {}-day horizon)",
            passes.len(),
            skipped,
            outside,
            PREDICTION_HORIZON_DAYS
        );
        passes
    }

    /// Returns `Ok(None)` for a well-formed pass that lies entirely outside the horizon.
    pub fn normalize(&self, raw: &RawPassEntry) -> Result<Option<PassRecord>, MalformedPassData> {
        let norad_id = match non_empty(&raw.norad_id) {
            Some(s) => Some(parse_norad(s)?),
            None => None,
        };
        let satellite = match (non_empty(&raw.satellite), norad_id) {
            (Some(name), _) => name.to_string(),
            (None, Some(id)) => format!("NORAD {}", id),
            (None, None) => return Err(MalformedPassData::Missing("satellite id")),
        };

        let peak_text = non_empty(&raw.peak.time).ok_or(MalformedPassData::Missing("peak time"))?;
        let start_text =
            non_empty(&raw.start.time).ok_or(MalformedPassData::Missing("start time"))?;
        let end_text = non_empty(&raw.end.time).ok_or(MalformedPassData::Missing("end time"))?;
        let max_altitude = non_empty(&raw.peak.altitude)
            .ok_or(MalformedPassData::Missing("peak altitude"))
            .and_then(|s| parse_degrees("peak altitude", s))?;

        let anchor = self.anchor_date(raw)?;
        let peak = self.parse_instant("peak time", peak_text, anchor)?;
        let peak_date = peak.with_timezone(&self.source_tz).date_naive();

        let mut start = self.parse_instant("start time", start_text, Some(peak_date))?;
        let mut end = self.parse_instant("end time", end_text, Some(peak_date))?;
        if is_clock_time(start_text) && start > peak {
            start -= Duration::days(1);
        }
        if is_clock_time(end_text) && end < peak {
            end += Duration::days(1);
        }

        if !(start <= peak && peak <= end) || start == end {
            return Err(MalformedPassData::OutOfOrder { start, peak, end });
        }

        if end < self.now || start > self.now + self.horizon {
            return Ok(None);
        }

        let magnitude = non_empty(&raw.magnitude).and_then(|s| s.parse::<f64>().ok());
        let visible = non_empty(&raw.pass_type)
            .map(|t| t.eq_ignore_ascii_case("visible"))
            .unwrap_or(true);

        Ok(Some(PassRecord {
            satellite,
            norad_id,
            start: point("start altitude", &raw.start, start)?,
            peak: PassPoint {
                time: peak,
                altitude_deg: Some(max_altitude),
                azimuth: non_empty(&raw.peak.azimuth).map(String::from),
            },
            end: point("end altitude", &raw.end, end)?,
            max_altitude_deg: max_altitude,
            magnitude,
            duration_seconds: (end - start).num_seconds(),
            visible,
            detail_url: non_empty(&raw.detail_url).map(String::from),
            night: self.site.night(peak),
        }))
    }

    /// Date that bare clock times of the peak refer to.
    fn anchor_date(&self, raw: &RawPassEntry) -> Result<Option<NaiveDate>, MalformedPassData> {
        if let Some(date) = non_empty(&raw.date) {
            return NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map(Some)
                .map_err(|_| invalid("date", date));
        }
        if let Some(mjd) = non_empty(&raw.mjd) {
            let value = mjd
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| invalid("mjd", mjd))?;
            let secs = ((value - MJD_UNIX_EPOCH) * 86_400.0).round() as i64;
            let at = DateTime::from_timestamp(secs, 0).ok_or_else(|| invalid("mjd", mjd))?;
            return Ok(Some(at.with_timezone(&self.source_tz).date_naive()));
        }
        Ok(None)
    }

    fn parse_instant(
        &self,
        field: &'static str,
        text: &str,
        anchor: Option<NaiveDate>,
    ) -> Result<DateTime<Utc>, MalformedPassData> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Ok(dt.with_timezone(&Utc));
        }

        let naive = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok());
        let naive = match naive {
            Some(n) => n,
            None => {
                let time = ["%H:%M:%S", "%H:%M"]
                    .iter()
                    .find_map(|f| NaiveTime::parse_from_str(text, f).ok())
                    .ok_or_else(|| invalid(field, text))?;
                let date = anchor.ok_or(MalformedPassData::Missing("pass date"))?;
                date.and_time(time)
            }
        };

        self.source_tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|t| t.with_timezone(&Utc))
            .ok_or_else(|| invalid(field, text))
    }
}

fn point(
    field: &'static str,
    raw: &RawPoint,
    time: DateTime<Utc>,
) -> Result<PassPoint, MalformedPassData> {
    let altitude_deg = match non_empty(&raw.altitude) {
        Some(s) => Some(parse_degrees(field, s)?),
        None => None,
    };
    Ok(PassPoint {
        time,
        altitude_deg,
        azimuth: non_empty(&raw.azimuth).map(String::from),
    })
}

fn parse_norad(text: &str) -> Result<u32, MalformedPassData> {
    text.parse::<u32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| invalid("norad id", text))
}

fn parse_degrees(field: &'static str, text: &str) -> Result<f64, MalformedPassData> {
    let cleaned = text
        .replace("Â°", "")
        .replace('°', "")
        .replace("&deg;", "");
    cleaned
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(field, text))
}

fn is_clock_time(text: &str) -> bool {
    !text.contains('-') && text.contains(':')
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn invalid(field: &'static str, value: &str) -> MalformedPassData {
    MalformedPassData::Invalid {
        field,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::types::RawPoint;

    fn site() -> Site {
        Site::from_coordinates("KUPT", "33.599, 130.212", Some(40.0), Tz::Asia__Tokyo).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap()
    }

    fn point(time: &str, alt: &str) -> RawPoint {
        RawPoint {
            time: Some(time.to_string()),
            altitude: Some(alt.to_string()),
            azimuth: Some("NW".to_string()),
        }
    }

    fn iss(start: &str, peak: &str, end: &str) -> RawPassEntry {
        RawPassEntry {
            satellite: Some("ISS".to_string()),
            norad_id: Some("25544".to_string()),
            magnitude: Some("-3.2".to_string()),
            start: point(start, "10°"),
            peak: point(peak, "45°"),
            end: point(end, "10°"),
            pass_type: Some("visible".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn full_timestamps_in_display_timezone_become_utc() {
        let site = site();
        let normalizer = Normalizer::new(&site, Tz::Asia__Tokyo, now());
        let raw = iss(
            "2026-10-17T18:30:00",
            "2026-10-17T18:32:00",
            "2026-10-17T18:34:05",
        );

        let pass = normalizer.normalize(&raw).unwrap().unwrap();
        assert_eq!(pass.start.time, Utc.with_ymd_and_hms(2026, 10, 17, 9, 30, 0).unwrap());
        assert_eq!(pass.end.time, Utc.with_ymd_and_hms(2026, 10, 17, 9, 34, 5).unwrap());
        assert_eq!(pass.duration_seconds, 245);
        assert_eq!(pass.max_altitude_deg, 45.0);
        assert_eq!(pass.start.altitude_deg, Some(10.0));
        assert_eq!(pass.magnitude, Some(-3.2));
        assert_eq!(pass.norad_id, Some(25544));
        assert!(pass.visible);
    }

    #[test]
    fn clock_times_are_anchored_on_the_peak_mjd_and_wrap_midnight() {
        let site = site();
        let normalizer = Normalizer::new(&site, Tz::UTC, now());
        // MJD 61331.0 is 2026-10-18 00:00 UTC; peak a little after midnight.
        let mut raw = iss("23:59:00", "00:01:00", "00:03:00");
        raw.mjd = Some("61331.0007".to_string());

        let pass = normalizer.normalize(&raw).unwrap().unwrap();
        assert_eq!(pass.start.time, Utc.with_ymd_and_hms(2026, 10, 17, 23, 59, 0).unwrap());
        assert_eq!(pass.peak.time, Utc.with_ymd_and_hms(2026, 10, 18, 0, 1, 0).unwrap());
        assert_eq!(pass.end.time, Utc.with_ymd_and_hms(2026, 10, 18, 0, 3, 0).unwrap());
        assert_eq!(pass.duration_seconds, 240);
    }

    #[test]
    fn non_finite_mjd_is_malformed() {
        let site = site();
        let normalizer = Normalizer::new(&site, Tz::UTC, now());
        for mjd in ["NaN", "inf", "-infinity", "1e300"] {
            let mut raw = iss("23:59:00", "00:01:00", "00:03:00");
            raw.mjd = Some(mjd.to_string());
            assert!(
                matches!(
                    normalizer.normalize(&raw),
                    Err(MalformedPassData::Invalid { field: "mjd", .. })
                ),
                "{}",
                mjd
            );
        }
    }

    #[test]
    fn passes_outside_the_horizon_are_dropped_silently() {
        let site = site();
        let normalizer = Normalizer::new(&site, Tz::UTC, now());

        let past = iss("2026-10-15T10:00:00Z", "2026-10-15T10:02:00Z", "2026-10-15T10:04:00Z");
        assert_eq!(normalizer.normalize(&past), Ok(None));

        let far = iss("2026-10-27T10:00:00Z", "2026-10-27T10:02:00Z", "2026-10-27T10:04:00Z");
        assert_eq!(normalizer.normalize(&far), Ok(None));
    }

    #[test]
    fn missing_or_broken_fields_are_malformed() {
        let site = site();
        let normalizer = Normalizer::new(&site, Tz::UTC, now());
        let good = iss("2026-10-17T10:00:00Z", "2026-10-17T10:02:00Z", "2026-10-17T10:04:00Z");

        let mut raw = good.clone();
        raw.satellite = None;
        raw.norad_id = None;
        assert_eq!(
            normalizer.normalize(&raw),
            Err(MalformedPassData::Missing("satellite id"))
        );

        let mut raw = good.clone();
        raw.peak.altitude = Some("high".to_string());
        assert!(matches!(
            normalizer.normalize(&raw),
            Err(MalformedPassData::Invalid { field: "peak altitude", .. })
        ));

        let mut raw = good.clone();
        raw.end.time = None;
        assert_eq!(
            normalizer.normalize(&raw),
            Err(MalformedPassData::Missing("end time"))
        );

        let mut raw = good.clone();
        raw.peak.time = Some("10:02:00".to_string());
        assert_eq!(
            normalizer.normalize(&raw),
            Err(MalformedPassData::Missing("pass date"))
        );

        let raw = iss("2026-10-17T10:05:00Z", "2026-10-17T10:02:00Z", "2026-10-17T10:04:00Z");
        assert!(matches!(
            normalizer.normalize(&raw),
            Err(MalformedPassData::OutOfOrder { .. })
        ));
    }

    #[test]
    fn normalize_all_skips_bad_entries_and_keeps_good_ones() {
        let site = site();
        let normalizer = Normalizer::new(&site, Tz::UTC, now());
        let good = iss("2026-10-17T10:00:00Z", "2026-10-17T10:02:00Z", "2026-10-17T10:04:00Z");
        let mut bad = good.clone();
        bad.peak.altitude = None;

        let passes = normalizer.normalize_all(&[bad, good]);
        assert_eq!(passes.len(), 1);
        assert_eq!(passes[0].satellite, "ISS");
    }

    #[test]
    fn name_falls_back_to_norad_id_and_non_visible_type_is_kept_as_flag() {
        let site = site();
        let normalizer = Normalizer::new(&site, Tz::UTC, now());
        let mut raw = iss("2026-10-17T10:00:00Z", "2026-10-17T10:02:00Z", "2026-10-17T10:04:00Z");
        raw.satellite = None;
        raw.pass_type = Some("daylight".to_string());
        raw.magnitude = Some("?".to_string());

        let pass = normalizer.normalize(&raw).unwrap().unwrap();
        assert_eq!(pass.satellite, "NORAD 25544");
        assert!(!pass.visible);
        assert_eq!(pass.magnitude, None);
    }
}
