mod catalog;
mod error;
mod heavens_above;
mod normalize;
mod replay;
mod source;
mod types;

pub use catalog::Catalog;
pub use error::SourceError;
pub use heavens_above::HeavensAbove;
pub use normalize::{Normalizer, PREDICTION_HORIZON_DAYS};
pub use replay::ReplaySource;
pub use source::PredictionSource;
pub use types::{PassPoint, PassRecord, RawPassEntry, SatelliteInfo};
