use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::site::Site;
use crate::visibility::{GroupMode, NotificationCriteria, TimeWindow};
use crate::weather::WeatherPolicy;

pub const MIN_ALT_RANGE: std::ops::RangeInclusive<i64> = 11..=89;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid {option} {value:?}: {reason}")]
    Invalid {
        option: &'static str,
        value: String,
        reason: String,
    },
    #[error("{0} must be set when SEND_NOTICE=send")]
    MissingForDelivery(&'static str),
}

/// Whether a run posts its digest to chat
///
/// Accepts `send`/`suppress` and, for older configurations, booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SendNotice {
    Send,
    Suppress,
}

impl<'de> Deserialize<'de> for SendNotice {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(true) => Ok(SendNotice::Send),
            Raw::Flag(false) => Ok(SendNotice::Suppress),
            Raw::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "send" | "true" => Ok(SendNotice::Send),
                "suppress" | "false" => Ok(SendNotice::Suppress),
                _ => Err(serde::de::Error::custom(format!(
                    "unknown value {:?}, expected `send` or `suppress`",
                    text
                ))),
            },
        }
    }
}

/// The configuration file as written on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default = "default_satellites")]
    pub satellites: Vec<SatelliteConfig>,
    pub output: OutputConfig,
    #[serde(default)]
    pub options: OptionsConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub slack: SlackConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub coordinates: String,
    pub height_m: Option<f64>,
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SatelliteConfig {
    pub norad_id: u32,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub dir: PathBuf,
    #[serde(default = "default_calendar_name")]
    pub calendar_name: String,
    pub calendar_url: Option<String>,
}

fn default_calendar_name() -> String {
    "Satellite Passes".to_string()
}

/// Run options; the integers are range-checked in [`Config::resolve`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    pub send_notice: SendNotice,
    pub meteoblue_update: WeatherPolicy,
    pub notify_type: GroupMode,
    pub time_window: TimeWindow,
    pub min_alt: i64,
    pub min_duration: i64,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            send_notice: SendNotice::Suppress,
            meteoblue_update: WeatherPolicy::Daily,
            notify_type: GroupMode::ByDate,
            time_window: TimeWindow::All,
            min_alt: 30,
            min_duration: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout: String,
    pub request_delay: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: "30s".to_string(),
            request_delay: "250ms".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub grace: String,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            grace: "1h".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackConfig {
    pub channel: Option<String>,
}

fn default_satellites() -> Vec<SatelliteConfig> {
    [
        (20580, "HST"),
        (25544, "ISS"),
        (27386, "ENVISAT"),
        (48274, "CSS"),
        (53807, "BLUEWALKER 3"),
        (59588, "ACS 3"),
        (60235, "OBJECT A"),
        (67073, "RAISE-4"),
        (61047, "SPACEMOBILE-001"),
        (61048, "SPACEMOBILE-002"),
        (61045, "SPACEMOBILE-003"),
        (61049, "SPACEMOBILE-004"),
        (61046, "SPACEMOBILE-005"),
        (67232, "SPACEMOBILE-006"),
    ]
    .into_iter()
    .map(|(norad_id, name)| SatelliteConfig {
        norad_id,
        name: Some(name.to_string()),
    })
    .collect()
}

/// Slack credentials, present only when the digest is sent.
#[derive(Debug, Clone)]
pub struct SlackSettings {
    pub token: String,
    pub channel: String,
}

/// Fully validated settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub site: Site,
    pub satellites: Vec<SatelliteConfig>,
    pub output: OutputConfig,
    pub criteria: NotificationCriteria,
    pub send_notice: SendNotice,
    pub weather_policy: WeatherPolicy,
    pub http_timeout: Duration,
    pub request_delay: Duration,
    pub grace: chrono::Duration,
    pub slack: Option<SlackSettings>,
    pub meteoblue_api_key: Option<String>,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Reads the file, applies process environment overrides and validates.
    pub fn load(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
        Self::from_file(path)?.resolve(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `env` and validates every option.
    pub fn resolve(
        mut self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Settings, ConfigError> {
        self.apply_overrides(&env)?;

        let timezone: Tz = self
            .site
            .timezone
            .parse()
            .map_err(|e| invalid("site.timezone", &self.site.timezone, e))?;
        let site = Site::from_coordinates(
            &self.site.name,
            &self.site.coordinates,
            self.site.height_m,
            timezone,
        )
        .ok_or_else(|| {
            invalid(
                "site.coordinates",
                &self.site.coordinates,
                "expected \"lat, lon\" in degrees",
            )
        })?;

        let options = &self.options;
        if !MIN_ALT_RANGE.contains(&options.min_alt) {
            return Err(invalid(
                "MIN_ALT",
                &options.min_alt.to_string(),
                "must be an integer between 11 and 89",
            ));
        }
        let min_duration = u32::try_from(options.min_duration)
            .ok()
            .filter(|d| *d > 0)
            .ok_or_else(|| {
                invalid(
                    "MIN_DURATION",
                    &options.min_duration.to_string(),
                    "must be a positive number of seconds",
                )
            })?;
        let criteria = NotificationCriteria {
            window: options.time_window,
            min_altitude_deg: options.min_alt as u32,
            min_duration_seconds: min_duration,
            grouping: options.notify_type,
        };

        if self.satellites.is_empty() {
            return Err(invalid("satellites", "[]", "at least one satellite is required"));
        }

        let http_timeout = parse_duration("http.timeout", &self.http.timeout)?;
        let request_delay = parse_duration("http.request_delay", &self.http.request_delay)?;
        let grace = parse_duration("calendar.grace", &self.calendar.grace)?;
        let grace = chrono::Duration::from_std(grace)
            .map_err(|e| invalid("calendar.grace", &self.calendar.grace, e))?;

        let slack = match options.send_notice {
            SendNotice::Suppress => None,
            SendNotice::Send => {
                let token = secret(&env, "SLACK_TOKEN")
                    .ok_or(ConfigError::MissingForDelivery("SLACK_TOKEN"))?;
                let channel = self
                    .slack
                    .channel
                    .clone()
                    .filter(|c| !c.trim().is_empty())
                    .ok_or(ConfigError::MissingForDelivery("SLACK_CHANNEL"))?;
                Some(SlackSettings { token, channel })
            }
        };

        Ok(Settings {
            site,
            criteria,
            send_notice: options.send_notice,
            weather_policy: options.meteoblue_update,
            http_timeout,
            request_delay,
            grace,
            slack,
            meteoblue_api_key: secret(&env, "METEOBLUE_API_KEY"),
            satellites: self.satellites,
            output: self.output,
        })
    }

    fn apply_overrides(
        &mut self,
        env: &impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let options = &mut self.options;
        if let Some(v) = env("SEND_NOTICE") {
            options.send_notice = parse_choice("SEND_NOTICE", &v)?;
        }
        if let Some(v) = env("METEOBLUE_UPDATE") {
            options.meteoblue_update = parse_choice("METEOBLUE_UPDATE", &v)?;
        }
        if let Some(v) = env("NOTIFY_TYPE") {
            options.notify_type = parse_choice("NOTIFY_TYPE", &v)?;
        }
        if let Some(v) = env("TIME_WINDOW") {
            options.time_window = parse_choice("TIME_WINDOW", &v)?;
        }
        if let Some(v) = env("MIN_ALT") {
            options.min_alt = parse_integer("MIN_ALT", &v)?;
        }
        if let Some(v) = env("MIN_DURATION") {
            options.min_duration = parse_integer("MIN_DURATION", &v)?;
        }
        if let Some(v) = env("SLACK_CHANNEL") {
            self.slack.channel = Some(v.trim().to_string());
        }
        Ok(())
    }
}

impl Settings {
    /// Effective options, one per line, with secrets masked.
    pub fn summary(&self) -> Vec<String> {
        let masked = |s: &Option<String>| if s.is_some() { "set" } else { "not set" };
        vec![
            format!(
                "site: {} ({:.4}, {:.4}, {} m, {})",
                self.site.name,
                self.site.latitude_deg,
                self.site.longitude_deg,
                self.site.height_m,
                self.site.timezone
            ),
            format!(
                "satellites: {}",
                self.satellites
                    .iter()
                    .map(|s| s.norad_id.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            format!("output: {}", self.output.dir.display()),
            format!("SEND_NOTICE: {}", self.send_notice),
            format!("METEOBLUE_UPDATE: {}", self.weather_policy),
            format!("NOTIFY_TYPE: {}", self.criteria.grouping),
            format!("TIME_WINDOW: {}", self.criteria.window),
            format!("MIN_ALT: {}", self.criteria.min_altitude_deg),
            format!("MIN_DURATION: {}", self.criteria.min_duration_seconds),
            format!("http timeout: {}", humantime::format_duration(self.http_timeout)),
            format!(
                "calendar grace: {}",
                humantime::format_duration(self.grace.to_std().unwrap_or_default())
            ),
            format!(
                "SLACK_CHANNEL: {}",
                self.slack.as_ref().map(|s| s.channel.as_str()).unwrap_or("-")
            ),
            format!(
                "METEOBLUE_API_KEY: {}",
                masked(&self.meteoblue_api_key)
            ),
        ]
    }
}

fn parse_choice<T: DeserializeOwned>(option: &'static str, value: &str) -> Result<T, ConfigError> {
    serde_yaml::from_value(serde_yaml::Value::String(value.trim().to_string()))
        .map_err(|e| invalid(option, value, e))
}

fn parse_integer(option: &'static str, value: &str) -> Result<i64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|e| invalid(option, value, e))
}

fn parse_duration(option: &'static str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value).map_err(|e| invalid(option, value, e))
}

fn secret(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    env(key).filter(|v| !v.trim().is_empty())
}

fn invalid(option: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        option,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
