mod annotator;
mod cache;
mod error;
mod meteoblue;
pub mod pictocode;
mod source;
mod types;

pub use annotator::WeatherAnnotator;
pub use cache::{WeatherCache, CACHE_FILE};
pub use error::WeatherError;
pub use meteoblue::Meteoblue;
pub use source::WeatherSource;
pub use types::{AnnotatedPass, HourlyWeather, WeatherPolicy};
