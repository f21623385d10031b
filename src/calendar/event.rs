use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::predict::{PassPoint, PassRecord};
use crate::site::{Crossing, Site};
use crate::weather::{AnnotatedPass, HourlyWeather};

pub const UID_DOMAIN: &str = "satpass";

pub const CREDITS: &str = "Data provided by Heavens-Above (https://www.heavens-above.com) \
and meteoblue (https://www.meteoblue.com)";

/// Deterministic identity of a pass: satellite id plus start second.
pub fn identity_key(satellite_id: &str, start: DateTime<Utc>) -> String {
    let id: String = satellite_id
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    format!("{}-{}@{}", id, start.format("%Y%m%dT%H%M%SZ"), UID_DOMAIN)
}

/// One calendar entry, as kept in the store and rendered to the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub uid: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub summary: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Last time the event was inserted or changed.
    pub updated_at: DateTime<Utc>,
}

impl CalendarEvent {
    /// Equal in every rendered attribute; `updated_at` is bookkeeping.
    pub fn same_content(&self, other: &CalendarEvent) -> bool {
        self.uid == other.uid
            && self.start == other.start
            && self.end == other.end
            && self.summary == other.summary
            && self.description == other.description
            && self.location == other.location
            && self.geo == other.geo
            && self.url == other.url
    }
}

/// Renders annotated passes into calendar events for one site.
pub struct EventRenderer<'a> {
    site: &'a Site,
}

impl<'a> EventRenderer<'a> {
    pub fn new(site: &'a Site) -> Self {
        Self { site }
    }

    /// Render `annotated`; `updated_at` is only kept if the content changes.
    pub fn render(&self, annotated: &AnnotatedPass, now: DateTime<Utc>) -> CalendarEvent {
        let pass = &annotated.pass;
        let summary = match &annotated.weather {
            Some(w) if !w.emoji().is_empty() => format!("{} {}", w.emoji(), pass.satellite),
            _ => pass.satellite.clone(),
        };

        CalendarEvent {
            uid: identity_key(&pass.satellite_id(), pass.start.time),
            start: pass.start.time,
            end: pass.end.time,
            summary,
            description: self.description(pass, annotated.weather.as_ref()),
            location: Some(self.site.name.clone()),
            geo: Some(self.site.geo()),
            url: pass.detail_url.clone(),
            updated_at: now,
        }
    }

    fn description(&self, pass: &PassRecord, weather: Option<&HourlyWeather>) -> String {
        let tz = self.site.timezone;
        let mut lines = vec![format!("Satellite : {}", pass.satellite)];
        if let Some(id) = pass.norad_id {
            lines.push(format!("NORAD ID : {}", id));
        }
        lines.push(match pass.magnitude {
            Some(m) => format!("Magnitude : {:.1}", m),
            None => "Magnitude : unknown".to_string(),
        });
        lines.push(format!("Duration : {}", format_duration(pass.duration_seconds)));
        lines.push(format!("Max altitude : {:.0}°", pass.max_altitude_deg));
        lines.push(String::new());

        lines.push(format!("Start : {}", point(&pass.start, tz)));
        lines.push(format!("Highest : {}", point(&pass.peak, tz)));
        lines.push(format!("End : {}", point(&pass.end, tz)));
        lines.push(String::new());

        let night = &pass.night;
        lines.push(format!("Sunset : {}", crossing(night.sunset, tz)));
        lines.push(format!("Astronomical dusk : {}", crossing(night.dusk, tz)));
        lines.push(format!("Astronomical dawn : {}", crossing(night.dawn, tz)));
        lines.push(format!("Sunrise : {}", crossing(night.sunrise, tz)));
        lines.push(String::new());

        match weather {
            Some(w) => {
                let sky = w.sky().map(|p| p.description).unwrap_or("unknown sky");
                lines.push(format!("Weather : {} {}", w.emoji(), sky));
                lines.push(format!(
                    "Clouds : {:.0}% (L:{:.0} M:{:.0} H:{:.0})",
                    w.total_cloud_pct, w.low_cloud_pct, w.mid_cloud_pct, w.high_cloud_pct
                ));
                lines.push(format!(
                    "Temperature : {:.1} °C / Wind : {:.1} m/s",
                    w.temperature_c, w.wind_speed_ms
                ));
            }
            None => lines.push("Weather : unknown".to_string()),
        }
        lines.push(String::new());
        lines.push(CREDITS.to_string());
        lines.join("\n")
    }
}

/// `4 min 05 sec`
pub fn format_duration(seconds: i64) -> String {
    format!("{} min {:02} sec", seconds / 60, seconds % 60)
}

fn point(p: &PassPoint, tz: Tz) -> String {
    let mut s = p
        .time
        .with_timezone(&tz)
        .format("%Y-%m-%d %H:%M:%S %Z")
        .to_string();
    let mut extra = Vec::new();
    if let Some(alt) = p.altitude_deg {
        extra.push(format!("el {:.0}°", alt));
    }
    if let Some(az) = &p.azimuth {
        extra.push(format!("az {}", az));
    }
    if !extra.is_empty() {
        s.push_str(&format!(" ({})", extra.join(", ")));
    }
    s
}

fn crossing(c: Crossing, tz: Tz) -> String {
    match c {
        Crossing::At(t) => t.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z").to_string(),
        Crossing::AlwaysAbove => "none (sun stays up)".to_string(),
        Crossing::AlwaysBelow => "none (sun stays down)".to_string(),
    }
}
