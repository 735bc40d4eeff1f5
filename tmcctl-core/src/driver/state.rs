//! Per-driver state kept outside the chip
//!
//! Holds the commanded current cache and the latched over-temperature
//! pre-warning. The pre-warning is sticky: only an explicit clear moves
//! it back to [`OtpwState::Normal`].

/// Over-temperature pre-warning latch state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OtpwState {
    /// No pre-warning seen since the last clear
    Normal,
    /// Pre-warning observed, waiting for acknowledgement
    PreWarned,
}

/// Mutable per-driver state
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriverState {
    /// Last current written through the owning handle (mA)
    commanded_ma: u16,
    /// Latched pre-warning flag
    otpw_flag: bool,
    /// Number of Normal -> PreWarned transitions, saturating
    otpw_count: u8,
    /// Consecutive monitor ticks with the live signal asserted
    otpw_ticks: u8,
}

impl DriverState {
    /// Fresh state: no current commanded, Normal, zero events
    pub const fn new() -> Self {
        Self {
            commanded_ma: 0,
            otpw_flag: false,
            otpw_count: 0,
            otpw_ticks: 0,
        }
    }

    /// Last commanded RMS current in mA
    pub fn commanded_ma(&self) -> u16 {
        self.commanded_ma
    }

    /// Latched pre-warning flag (not the live chip signal)
    pub fn otpw_flag(&self) -> bool {
        self.otpw_flag
    }

    /// Number of distinct pre-warning events, survives clears
    pub fn otpw_count(&self) -> u8 {
        self.otpw_count
    }

    /// Consecutive ticks the live pre-warning has been asserted
    pub fn otpw_ticks(&self) -> u8 {
        self.otpw_ticks
    }

    /// Latch state
    pub fn otpw_state(&self) -> OtpwState {
        if self.otpw_flag {
            OtpwState::PreWarned
        } else {
            OtpwState::Normal
        }
    }

    pub(crate) fn set_commanded_ma(&mut self, ma: u16) {
        self.commanded_ma = ma;
    }

    /// Feed one monitor observation of the live pre-warning signal
    ///
    /// Returns `true` when this observation moved the latch from Normal
    /// to PreWarned (and counted an event). A de-asserted signal never
    /// clears the latch.
    pub(crate) fn record_otpw(&mut self, asserted: bool) -> bool {
        if !asserted {
            self.otpw_ticks = 0;
            return false;
        }

        self.otpw_ticks = self.otpw_ticks.saturating_add(1);
        if self.otpw_flag {
            return false;
        }
        self.otpw_flag = true;
        self.otpw_count = self.otpw_count.saturating_add(1);
        true
    }

    /// Acknowledge the pre-warning; the event count is kept
    pub(crate) fn clear_otpw(&mut self) {
        self.otpw_flag = false;
    }
}
