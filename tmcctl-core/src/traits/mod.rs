//! Hardware abstraction traits
//!
//! These traits define the interface between the control layer and
//! chip-specific Trinamic driver implementations.

pub mod chip;

pub use chip::{ChipError, ChipFamily, ThermalStatus, TmcChip, DEFAULT_HOLD_MULTIPLIER};
