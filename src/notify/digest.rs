use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::calendar::{format_duration, CREDITS};
use crate::predict::PREDICTION_HORIZON_DAYS;
use crate::site::Site;
use crate::visibility::{GroupMode, NotificationCriteria};
use crate::weather::{pictocode, AnnotatedPass, HourlyWeather};

const TITLE: &str = "Satellite pass digest";

/// Renders the chat digest of the qualifying passes.
pub struct DigestFormatter<'a> {
    site: &'a Site,
    criteria: &'a NotificationCriteria,
    calendar_url: Option<&'a str>,
}

impl<'a> DigestFormatter<'a> {
    pub fn new(
        site: &'a Site,
        criteria: &'a NotificationCriteria,
        calendar_url: Option<&'a str>,
    ) -> Self {
        Self {
            site,
            criteria,
            calendar_url,
        }
    }

    pub fn format(
        &self,
        passes: &[AnnotatedPass],
        mode: GroupMode,
        created_at: DateTime<Utc>,
    ) -> String {
        let mut lines = vec![
            format!("🛰️ {} : {}", TITLE, self.site.name),
            format!("Filter : {}", self.criteria.describe()),
            String::new(),
        ];

        if passes.is_empty() {
            lines.push(no_passes_message());
        } else {
            match mode {
                GroupMode::ByDate => self.by_date(&mut lines, passes),
                GroupMode::BySatellite => self.by_satellite(&mut lines, passes),
            }
        }

        lines.push(String::new());
        if let Some(url) = self.calendar_url {
            lines.push(format!("Calendar : {}", url));
        }
        lines.push(CREDITS.to_string());
        lines.push(format!(
            "Created at {}",
            created_at
                .with_timezone(&self.site.timezone)
                .format("%Y-%m-%d %H:%M %Z")
        ));
        lines.join("\n")
    }

    fn by_date(&self, lines: &mut Vec<String>, passes: &[AnnotatedPass]) {
        let mut groups: BTreeMap<NaiveDate, Vec<&AnnotatedPass>> = BTreeMap::new();
        for p in passes {
            groups
                .entry(self.site.local_date(p.pass.peak.time))
                .or_default()
                .push(p);
        }

        for (date, mut group) in groups {
            group.sort_by(|a, b| {
                a.pass
                    .peak
                    .time
                    .cmp(&b.pass.peak.time)
                    .then_with(|| a.pass.satellite.cmp(&b.pass.satellite))
            });
            lines.push(format!(
                "{} : {}",
                date.format("%Y-%m-%d (%a)"),
                count(group.len())
            ));
            if let Some(summary) = weather_summary(&group) {
                lines.push(summary);
            }
            for p in group {
                lines.push(format!(
                    "  {}  {}  {}",
                    self.local_time(p, "%H:%M:%S"),
                    p.pass.satellite,
                    details(p)
                ));
            }
        }
    }

    fn by_satellite(&self, lines: &mut Vec<String>, passes: &[AnnotatedPass]) {
        let mut groups: BTreeMap<(String, String), Vec<&AnnotatedPass>> = BTreeMap::new();
        for p in passes {
            groups
                .entry((p.pass.satellite.clone(), p.pass.satellite_id()))
                .or_default()
                .push(p);
        }

        for ((name, id), mut group) in groups {
            group.sort_by_key(|p| p.pass.peak.time);
            let title = if id == name {
                name
            } else {
                format!("{} (NORAD {})", name, id)
            };
            lines.push(format!("{} : {}", title, count(group.len())));
            for p in group {
                lines.push(format!(
                    "  {}  {}",
                    self.local_time(p, "%m-%d %H:%M:%S"),
                    details(p)
                ));
            }
        }
    }

    fn local_time(&self, p: &AnnotatedPass, format: &str) -> String {
        p.pass
            .peak
            .time
            .with_timezone(&self.site.timezone)
            .format(format)
            .to_string()
    }
}

fn no_passes_message() -> String {
    format!(
        "No passes match the filter in the next {} days.",
        PREDICTION_HORIZON_DAYS
    )
}

fn count(n: usize) -> String {
    if n == 1 {
        "1 pass".to_string()
    } else {
        format!("{} passes", n)
    }
}

/// Weather line for one day, summarising the passes with a known forecast.
///
/// `None` when no pass of the day has a forecast.
fn weather_summary(group: &[&AnnotatedPass]) -> Option<String> {
    let known: Vec<&HourlyWeather> = group.iter().filter_map(|p| p.weather.as_ref()).collect();
    let worst = known.iter().map(|w| w.pictocode).max()?;
    let n = known.len() as f64;
    let mean = |f: fn(&HourlyWeather) -> f64| known.iter().map(|w| f(w)).sum::<f64>() / n;
    let clouds = known.iter().map(|w| w.total_cloud_pct);
    let max = clouds.clone().fold(f64::MIN, f64::max);
    let min = clouds.fold(f64::MAX, f64::min);

    let sky = match pictocode::lookup(worst) {
        Some(p) => format!("{} {}", p.emoji, p.description),
        None => format!("Pictocode {}", worst),
    };
    Some(format!(
        "{} | {:.0}°C | Wind {:.1} m/s | Clouds max:{:.0}% avg:{:.0}% min:{:.0}%",
        sky,
        mean(|w: &HourlyWeather| w.temperature_c),
        mean(|w: &HourlyWeather| w.wind_speed_ms),
        max,
        mean(|w: &HourlyWeather| w.total_cloud_pct),
        min
    ))
}

/// Altitude, duration, magnitude and, when known, the weather.
fn details(p: &AnnotatedPass) -> String {
    let pass = &p.pass;
    let mut line = format!(
        "alt {:.0}°  {}",
        pass.max_altitude_deg,
        format_duration(pass.duration_seconds)
    );
    if let Some(m) = pass.magnitude {
        line.push_str(&format!("  mag {:.1}", m));
    }
    if let Some(w) = &p.weather {
        line.push_str(&format!("  {} clouds {:.0}%", w.emoji(), w.total_cloud_pct));
    }
    line
}
