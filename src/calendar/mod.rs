mod error;
mod event;
mod ics;
mod merge;
mod store;

pub use error::StoreError;
pub use event::{format_duration, EventRenderer, CREDITS};
pub use ics::{render_checked, IcsFile};
pub use merge::{merge, MergeReport, MergeWindow};
pub use store::StoreFile;
