//! stealthChop threshold conversion
//!
//! TPWMTHRS holds the TSTEP value (time between 1/256 microsteps in
//! driver clock ticks) below which the chip stays in stealthChop. The
//! conversion to and from linear speed is
//!
//! ```text
//! register = K * microsteps / (256 * speed * steps_per_mm)
//! speed    = K * microsteps / (256 * register * steps_per_mm)
//! ```
//!
//! with `K = 12_650_000` (12 MHz driver clock scaled for existing
//! calibrations). The numerator is formed before dividing, so results
//! truncate exactly like firmware that configured these drivers before.

use crate::error::TmcError;

/// Clock-derived constant relating TSTEP ticks to steps per second
pub const THRESHOLD_CLOCK: u64 = 12_650_000;

/// Convert a speed threshold (mm/s) into a TPWMTHRS register value
///
/// A zero threshold is the "hybrid mode disabled" sentinel and must be
/// handled by the caller; it is rejected here with
/// [`TmcError::DivisionByZero`], as is a zero `steps_per_mm`. Negative
/// thresholds, and threshold/steps-per-mm products too large for 64-bit
/// arithmetic, are [`TmcError::InvalidArgument`].
pub fn to_threshold_register(
    microsteps: u16,
    speed_threshold: i32,
    steps_per_mm: u32,
) -> Result<u32, TmcError> {
    if speed_threshold < 0 {
        return Err(TmcError::InvalidArgument);
    }
    divide(microsteps, speed_threshold as u64, steps_per_mm)
}

/// Convert a TPWMTHRS register value back into a speed (mm/s)
///
/// Register value 0 means stealthChop has no upper limit and is
/// rejected with [`TmcError::DivisionByZero`].
pub fn to_speed(microsteps: u16, register: u32, steps_per_mm: u32) -> Result<u32, TmcError> {
    divide(microsteps, register as u64, steps_per_mm)
}

// Denominator is at least 256, so the quotient is bounded by
// K * u16::MAX / 256 < u32::MAX. A denominator past u64::MAX is
// rejected rather than wrapped.
fn divide(microsteps: u16, divisor: u64, steps_per_mm: u32) -> Result<u32, TmcError> {
    if divisor == 0 || steps_per_mm == 0 {
        return Err(TmcError::DivisionByZero);
    }
    let numerator = THRESHOLD_CLOCK * microsteps as u64;
    let denominator = (256 * divisor)
        .checked_mul(steps_per_mm as u64)
        .ok_or(TmcError::InvalidArgument)?;
    u32::try_from(numerator / denominator).map_err(|_| TmcError::InvalidArgument)
}
