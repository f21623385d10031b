use chrono::{NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::site::Site;
use crate::weather::error::WeatherError;
use crate::weather::source::WeatherSource;
use crate::weather::types::HourlyWeather;

pub const METEOBLUE_URL: &str = "https://my.meteoblue.com/packages/trendpro-1h";

/// Hourly trend forecast from meteoblue, requested in UTC.
pub struct Meteoblue {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl Meteoblue {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

impl WeatherSource for Meteoblue {
    async fn forecast(&self, site: &Site) -> Result<Vec<HourlyWeather>, WeatherError> {
        let api_key = self.api_key.as_deref().ok_or(WeatherError::MissingApiKey)?;
        log::info!("Retrieving weather forecast from meteoblue");

        let response = self
            .client
            .get(METEOBLUE_URL)
            .query(&[
                ("lat", format!("{:.6}", site.latitude_deg)),
                ("lon", format!("{:.6}", site.longitude_deg)),
                ("asl", format!("{:.0}", site.height_m)),
                ("apikey", api_key.to_string()),
                ("format", "json".to_string()),
                ("tz", "UTC".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Status(status));
        }
        parse_trend(&response.text().await?)
    }
}

#[derive(Deserialize)]
struct TrendResponse {
    trend_1h: Trend1h,
}

#[derive(Deserialize)]
struct Trend1h {
    time: Vec<String>,
    totalcloudcover: Vec<Option<f64>>,
    lowclouds: Vec<Option<f64>>,
    midclouds: Vec<Option<f64>>,
    highclouds: Vec<Option<f64>>,
    temperature: Vec<Option<f64>>,
    windspeed: Vec<Option<f64>>,
    pictocode: Vec<Option<u8>>,
}

/// Parse a `trendpro-1h` JSON payload. Hours with missing values are dropped.
pub fn parse_trend(json: &str) -> Result<Vec<HourlyWeather>, WeatherError> {
    let payload: TrendResponse =
        serde_json::from_str(json).map_err(|e| WeatherError::Payload(e.to_string()))?;
    let t = payload.trend_1h;

    let columns = [
        t.totalcloudcover.len(),
        t.lowclouds.len(),
        t.midclouds.len(),
        t.highclouds.len(),
        t.temperature.len(),
        t.windspeed.len(),
        t.pictocode.len(),
    ];
    if columns.iter().any(|len| *len != t.time.len()) {
        return Err(WeatherError::Payload(
            "trend_1h columns differ in length".to_string(),
        ));
    }

    let mut hours = Vec::with_capacity(t.time.len());
    for (i, time) in t.time.iter().enumerate() {
        let naive = NaiveDateTime::parse_from_str(time, "%Y-%m-%d %H:%M")
            .map_err(|_| WeatherError::Payload(format!("bad time {:?}", time)))?;
        let row = (|| {
            Some(HourlyWeather {
                time: Utc.from_utc_datetime(&naive),
                total_cloud_pct: t.totalcloudcover[i]?,
                low_cloud_pct: t.lowclouds[i]?,
                mid_cloud_pct: t.midclouds[i]?,
                high_cloud_pct: t.highclouds[i]?,
                temperature_c: t.temperature[i]?,
                wind_speed_ms: t.windspeed[i]?,
                pictocode: t.pictocode[i]?,
            })
        })();
        match row {
            Some(hour) => hours.push(hour),
            None => log::debug!("Forecast hour {} is incomplete", time),
        }
    }

    if hours.is_empty() {
        return Err(WeatherError::Payload("no forecast hours".to_string()));
    }
    Ok(hours)
}
