//! Motion unit conversion
//!
//! Converts between chip units (microsteps, TSTEP register values) and
//! physical units (steps per mm, mm/s).

pub mod threshold;

pub use threshold::{to_speed, to_threshold_register, THRESHOLD_CLOCK};
