use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use super::sun::{night_of, Night};

/// The fixed observing location every pass is predicted for.
#[derive(Debug, Clone)]
pub struct Site {
    pub name: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub height_m: f64,
    pub timezone: Tz,
}

impl Site {
    /// Parses "lat, lon" the same way station coordinates are written in config files.
    pub fn from_coordinates(
        name: &str,
        coordinates: &str,
        height_m: Option<f64>,
        timezone: Tz,
    ) -> Option<Self> {
        let parts: Vec<_> = coordinates.split(',').map(|s| s.trim()).collect();
        if parts.len() != 2 {
            return None;
        }
        let lat: f64 = parts[0].parse().ok()?;
        let lon: f64 = parts[1].parse().ok()?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            latitude_deg: lat,
            longitude_deg: lon,
            height_m: height_m.unwrap_or(0.0),
            timezone,
        })
    }

    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.timezone).date_naive()
    }

    /// Night boundaries around `at`, see [`night_of`].
    pub fn night(&self, at: DateTime<Utc>) -> Night {
        night_of(self, at)
    }

    /// `lat;lon` with six decimals, the form used by the GEO property.
    pub fn geo(&self) -> String {
        format!("{:.6};{:.6}", self.latitude_deg, self.longitude_deg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_coordinates_with_spaces() {
        let site = Site::from_coordinates("KUPT", " 33.5990, 130.2120 ", Some(40.0), Tz::Asia__Tokyo)
            .unwrap();
        assert_eq!(site.latitude_deg, 33.599);
        assert_eq!(site.longitude_deg, 130.212);
        assert_eq!(site.height_m, 40.0);
        assert_eq!(site.geo(), "33.599000;130.212000");
    }

    #[test]
    fn rejects_out_of_range_or_malformed_coordinates() {
        assert!(Site::from_coordinates("x", "95.0, 10.0", None, Tz::UTC).is_none());
        assert!(Site::from_coordinates("x", "10.0", None, Tz::UTC).is_none());
        assert!(Site::from_coordinates("x", "a, b", None, Tz::UTC).is_none());
    }
}
