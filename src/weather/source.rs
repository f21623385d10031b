use crate::site::Site;
use crate::weather::{HourlyWeather, WeatherError};

/// Supplies an hourly forecast for the site, covering the next days.
#[allow(async_fn_in_trait)]
pub trait WeatherSource {
    async fn forecast(&self, site: &Site) -> Result<Vec<HourlyWeather>, WeatherError>;
}
