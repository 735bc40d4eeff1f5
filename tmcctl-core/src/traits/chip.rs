//! Trinamic chip capability set
//!
//! Every chip family (SPI-addressed or UART-addressed) that implements
//! [`TmcChip`] can be wrapped in a [`crate::driver::TmcDriver`].

use core::fmt;
use core::ops::RangeInclusive;

/// Hold current as a fraction of run current when none is given
pub const DEFAULT_HOLD_MULTIPLIER: f32 = 0.5;

/// How the chip is addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipFamily {
    /// Chip select + 40-bit SPI frames (TMC2130, TMC5160)
    Spi,
    /// Single-wire UART datagrams (TMC2208, TMC2209)
    Uart,
}

/// Transport-level failures reported by a chip driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipError {
    /// The SPI/UART peripheral reported an error
    Bus,
    /// Invalid sync byte in a UART reply
    InvalidSync,
    /// CRC mismatch in a UART reply
    CrcMismatch,
    /// No (or a short) reply from the chip
    Timeout,
}

impl fmt::Display for ChipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChipError::Bus => "bus error",
            ChipError::InvalidSync => "invalid sync",
            ChipError::CrcMismatch => "crc mismatch",
            ChipError::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// Live thermal flags read from the chip's DRV_STATUS register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ThermalStatus {
    /// Over-temperature pre-warning (~120°C)
    pub prewarning: bool,
    /// Over-temperature shutdown (~150°C), the driver has switched off
    pub shutdown: bool,
}

/// Capability set of a Trinamic driver chip
///
/// Register-level encoding (IRUN/IHOLD, vsense, MRES, SGT) is the
/// implementation's concern; this trait speaks in milliamps, microsteps
/// and raw threshold register values.
pub trait TmcChip {
    /// Addressing family of this chip
    fn family(&self) -> ChipFamily;

    /// Homing sensitivity values the chip accepts
    fn sensitivity_range(&self) -> RangeInclusive<i16>;

    /// RMS run current as currently programmed, in mA
    fn rms_current(&mut self) -> Result<u16, ChipError>;

    /// Program the RMS run current with an explicit hold multiplier
    fn set_rms_current_with_hold(&mut self, ma: u16, hold_multiplier: f32)
        -> Result<(), ChipError>;

    /// Program the RMS run current with the default hold multiplier
    fn set_rms_current(&mut self, ma: u16) -> Result<(), ChipError> {
        self.set_rms_current_with_hold(ma, DEFAULT_HOLD_MULTIPLIER)
    }

    /// Microstep resolution (1..=256)
    fn microsteps(&mut self) -> Result<u16, ChipError>;

    /// Raw TPWMTHRS value
    fn tpwmthrs(&mut self) -> Result<u32, ChipError>;

    /// Write the raw TPWMTHRS value
    fn set_tpwmthrs(&mut self, value: u32) -> Result<(), ChipError>;

    /// StallGuard sensitivity as the chip encodes it
    fn sensitivity(&mut self) -> Result<i16, ChipError>;

    /// Write the StallGuard sensitivity
    ///
    /// Callers guarantee the value lies in [`TmcChip::sensitivity_range`].
    fn set_sensitivity(&mut self, value: i16) -> Result<(), ChipError>;

    /// Read the live over-temperature flags
    fn thermal_status(&mut self) -> Result<ThermalStatus, ChipError>;

    /// Switch stall detection for sensorless homing on or off
    fn set_stall_detection(&mut self, enable: bool) -> Result<(), ChipError>;
}
