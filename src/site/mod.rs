mod station;
pub mod sun;

pub use station::Site;
pub use sun::{Crossing, Night, Segment};
