//! Driver thermal monitoring
//!
//! Polls every configured driver's over-temperature flags, latches
//! pre-warnings and reports transitions.

pub mod monitor;

pub use monitor::{CurrentStepDown, MonitorConfig, MonitorSummary, TmcMonitor};
