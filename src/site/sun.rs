//! Sunset/sunrise boundaries for the observing site.
//!
//! Uses the NOAA sunrise equation. Boundaries are a pure function of the
//! site coordinates and the local date, so a pass is always classified the
//! same way for the same site and night.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use chrono::LocalResult;
use chrono_tz::Tz;

use super::Site;

const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const J2000_JD: f64 = 2_451_545.0;
const DAYS_FROM_CE_TO_UNIX_EPOCH: i32 = 719_163;
const OBLIQUITY_DEG: f64 = 23.4397;

/// Sun altitude used for sunset and sunrise.
pub const HORIZON_DEG: f64 = 0.0;
/// Sun altitude used for astronomical dusk and dawn.
pub const ASTRONOMICAL_DEG: f64 = -18.0;

/// When the sun crosses a given altitude on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    At(DateTime<Utc>),
    /// The sun stays above the altitude all day.
    AlwaysAbove,
    /// The sun stays below the altitude all day.
    AlwaysBelow,
}

/// Part of the day a moment falls into, relative to one night.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// After sunset, before local midnight.
    Evening,
    /// After local midnight, before sunrise.
    Morning,
    Daylight,
}

/// The night that starts on the evening of `date` (site-local).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Night {
    pub date: NaiveDate,
    pub sunset: Crossing,
    pub dusk: Crossing,
    pub midnight: DateTime<Utc>,
    pub dawn: Crossing,
    pub sunrise: Crossing,
}

impl Night {
    pub fn segment(&self, at: DateTime<Utc>) -> Segment {
        if at < self.midnight {
            let dark = match self.sunset {
                Crossing::At(sunset) => at >= sunset,
                Crossing::AlwaysBelow => true,
                Crossing::AlwaysAbove => false,
            };
            if dark {
                return Segment::Evening;
            }
        } else {
            let dark = match self.sunrise {
                Crossing::At(sunrise) => at < sunrise,
                Crossing::AlwaysBelow => true,
                Crossing::AlwaysAbove => false,
            };
            if dark {
                return Segment::Morning;
            }
        }
        Segment::Daylight
    }
}

/// Night boundaries for the night closest to `at`.
///
/// Moments after local noon belong to the night starting that evening;
/// moments before local noon belong to the night that started the evening before.
pub fn night_of(site: &Site, at: DateTime<Utc>) -> Night {
    let local = at.with_timezone(&site.timezone);
    let date = if local.time() >= NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN) {
        local.date_naive()
    } else {
        local.date_naive().pred_opt().unwrap_or(local.date_naive())
    };
    let next = date.succ_opt().unwrap_or(date);

    let lat = site.latitude_deg;
    let lon = site.longitude_deg;
    Night {
        date,
        sunset: crossing(date, lat, lon, HORIZON_DEG, false),
        dusk: crossing(date, lat, lon, ASTRONOMICAL_DEG, false),
        midnight: local_midnight(site.timezone, next),
        dawn: crossing(next, lat, lon, ASTRONOMICAL_DEG, true),
        sunrise: crossing(next, lat, lon, HORIZON_DEG, true),
    }
}

/// Time the sun rises through (or sets through) `altitude_deg` on `date`.
pub fn crossing(
    date: NaiveDate,
    lat_deg: f64,
    lon_deg: f64,
    altitude_deg: f64,
    rising: bool,
) -> Crossing {
    let days = (date.num_days_from_ce() - DAYS_FROM_CE_TO_UNIX_EPOCH) as f64;
    let n = days + UNIX_EPOCH_JD + 0.5 - J2000_JD;

    let mean_noon = n - lon_deg / 360.0;
    let anomaly = (357.5291 + 0.985_600_28 * mean_noon).rem_euclid(360.0).to_radians();
    let center = 1.9148 * anomaly.sin()
        + 0.0200 * (2.0 * anomaly).sin()
        + 0.0003 * (3.0 * anomaly).sin();
    let ecliptic_lon = (anomaly.to_degrees() + center + 180.0 + 102.9372)
        .rem_euclid(360.0)
        .to_radians();
    let transit =
        J2000_JD + mean_noon + 0.0053 * anomaly.sin() - 0.0069 * (2.0 * ecliptic_lon).sin();

    let sin_decl = ecliptic_lon.sin() * OBLIQUITY_DEG.to_radians().sin();
    let cos_decl = (1.0 - sin_decl * sin_decl).sqrt();
    let phi = lat_deg.to_radians();
    let cos_hour_angle =
        (altitude_deg.to_radians().sin() - phi.sin() * sin_decl) / (phi.cos() * cos_decl);

    if cos_hour_angle.is_nan() || cos_hour_angle > 1.0 {
        return Crossing::AlwaysBelow;
    }
    if cos_hour_angle < -1.0 {
        return Crossing::AlwaysAbove;
    }

    let half_arc = cos_hour_angle.acos().to_degrees() / 360.0;
    let jd = if rising {
        transit - half_arc
    } else {
        transit + half_arc
    };
    Crossing::At(from_julian(jd))
}

fn from_julian(jd: f64) -> DateTime<Utc> {
    let secs = ((jd - UNIX_EPOCH_JD) * 86_400.0).round() as i64;
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

fn local_midnight(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => t.with_timezone(&Utc),
        LocalResult::None => {
            // Midnight skipped by a DST jump; use the instant the clock jumps over it.
            let offset = tz.offset_from_utc_datetime(&midnight).fix().local_minus_utc();
            Utc.from_utc_datetime(&(midnight - Duration::seconds(i64::from(offset))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn fukuoka() -> Site {
        Site::from_coordinates("KUPT", "33.599, 130.212", Some(40.0), Tz::Asia__Tokyo).unwrap()
    }

    fn local_hm(site: &Site, c: Crossing) -> (u32, u32) {
        match c {
            Crossing::At(t) => {
                let l = t.with_timezone(&site.timezone);
                (l.hour(), l.minute())
            }
            other => panic!("expected a crossing, got {:?}", other),
        }
    }

    #[test]
    fn equinox_sunset_and_sunrise_are_near_half_past_six() {
        let site = fukuoka();
        let evening = Tz::Asia__Tokyo
            .with_ymd_and_hms(2026, 3, 20, 21, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        let night = night_of(&site, evening);

        assert_eq!(night.date, NaiveDate::from_ymd_opt(2026, 3, 20).unwrap());
        let (h, _) = local_hm(&site, night.sunset);
        assert_eq!(h, 18);
        let (h, _) = local_hm(&site, night.sunrise);
        assert_eq!(h, 6);
        let (h, _) = local_hm(&site, night.dusk);
        assert!(h == 19 || h == 20);
    }

    #[test]
    fn morning_moment_belongs_to_previous_evening() {
        let site = fukuoka();
        let early = Tz::Asia__Tokyo
            .with_ymd_and_hms(2026, 3, 21, 4, 30, 0)
            .unwrap()
            .with_timezone(&Utc);
        let night = night_of(&site, early);
        assert_eq!(night.date, NaiveDate::from_ymd_opt(2026, 3, 20).unwrap());
        assert_eq!(
            night.midnight,
            Tz::Asia__Tokyo
                .with_ymd_and_hms(2026, 3, 21, 0, 0, 0)
                .unwrap()
                .with_timezone(&Utc)
        );
        assert_eq!(night.segment(early), Segment::Morning);
    }

    #[test]
    fn segments_split_at_sunset_midnight_and_sunrise() {
        let site = fukuoka();
        let at = |h, m| {
            Tz::Asia__Tokyo
                .with_ymd_and_hms(2026, 3, 20, h, m, 0)
                .unwrap()
                .with_timezone(&Utc)
        };
        let night = night_of(&site, at(20, 0));
        assert_eq!(night.segment(at(20, 0)), Segment::Evening);
        assert_eq!(night.segment(at(23, 59)), Segment::Evening);
        assert_eq!(night.segment(at(17, 0)), Segment::Daylight);
        assert_eq!(night.segment(night.midnight), Segment::Morning);
        assert_eq!(
            night.segment(night.midnight + Duration::hours(9)),
            Segment::Daylight
        );
    }

    #[test]
    fn midsummer_in_the_arctic_has_no_sunset() {
        let date = NaiveDate::from_ymd_opt(2026, 6, 21).unwrap();
        assert_eq!(crossing(date, 78.2, 15.6, HORIZON_DEG, false), Crossing::AlwaysAbove);
        let date = NaiveDate::from_ymd_opt(2026, 12, 21).unwrap();
        assert_eq!(crossing(date, 78.2, 15.6, HORIZON_DEG, false), Crossing::AlwaysBelow);
    }
}
