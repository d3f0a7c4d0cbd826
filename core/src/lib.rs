pub mod calendar;
pub mod error;
pub mod features;
pub mod merge;
pub mod model;
pub mod reading;
pub mod resample;

pub use calendar::{UnitedStates, WorkCalendar};
pub use features::*;
pub use merge::{JoinReport, JoinedRow, MergeKey};
pub use reading::{DemandReading, Reading, StateReading};
pub use resample::Resampled;

pub static CORE_VERSION: &str = env!("CARGO_PKG_VERSION");
