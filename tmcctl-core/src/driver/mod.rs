//! Driver handles
//!
//! A [`TmcDriver`] composes a chip implementation with the identity and
//! state the control layer keeps for it. [`TmcHandle`] is the uniform,
//! object-safe surface the command layer and monitor loop work through.

pub mod handle;
pub mod identity;
pub mod state;

pub use handle::{ThermalPoll, TmcDriver, TmcHandle};
pub use identity::DriverIdentity;
pub use state::{DriverState, OtpwState};
