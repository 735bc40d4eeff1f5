//! One chip type covering both interface families
//!
//! Boards mixing SPI and UART drivers can keep them in a single array of
//! `TmcDriver<TmcVariant<..>>` without boxing.

use core::ops::RangeInclusive;

use embedded_hal::spi::SpiDevice;
use embedded_io::{Read, Write};
use tmcctl_core::traits::{ChipError, ChipFamily, ThermalStatus, TmcChip};

use super::registers::DrvStatus;
use super::tmc2130::Tmc2130;
use super::tmc2209::Tmc2209;

/// A TMC2130 or a TMC2209
pub enum TmcVariant<SPI, U> {
    /// TMC2130 on an SPI device
    Spi(Tmc2130<SPI>),
    /// TMC2209 on a single-wire UART
    Uart(Tmc2209<U>),
}

macro_rules! dispatch {
    ($self:ident, $chip:ident => $body:expr) => {
        match $self {
            TmcVariant::Spi($chip) => $body,
            TmcVariant::Uart($chip) => $body,
        }
    };
}

impl<SPI: SpiDevice, U: Read + Write> TmcVariant<SPI, U> {
    /// Program the base configuration
    pub fn init(&mut self, microsteps: u16, stealthchop: bool) -> Result<(), ChipError> {
        dispatch!(self, chip => chip.init(microsteps, stealthchop))
    }

    /// Parsed DRV_STATUS
    pub fn drv_status(&mut self) -> Result<DrvStatus, ChipError> {
        dispatch!(self, chip => chip.drv_status())
    }
}

impl<SPI, U> From<Tmc2130<SPI>> for TmcVariant<SPI, U> {
    fn from(chip: Tmc2130<SPI>) -> Self {
        Self::Spi(chip)
    }
}

impl<SPI, U> From<Tmc2209<U>> for TmcVariant<SPI, U> {
    fn from(chip: Tmc2209<U>) -> Self {
        Self::Uart(chip)
    }
}

impl<SPI: SpiDevice, U: Read + Write> TmcChip for TmcVariant<SPI, U> {
    fn family(&self) -> ChipFamily {
        dispatch!(self, chip => chip.family())
    }

    fn sensitivity_range(&self) -> RangeInclusive<i16> {
        dispatch!(self, chip => chip.sensitivity_range())
    }

    fn rms_current(&mut self) -> Result<u16, ChipError> {
        dispatch!(self, chip => chip.rms_current())
    }

    fn set_rms_current_with_hold(
        &mut self,
        ma: u16,
        hold_multiplier: f32,
    ) -> Result<(), ChipError> {
        dispatch!(self, chip => chip.set_rms_current_with_hold(ma, hold_multiplier))
    }

    fn microsteps(&mut self) -> Result<u16, ChipError> {
        dispatch!(self, chip => chip.microsteps())
    }

    fn tpwmthrs(&mut self) -> Result<u32, ChipError> {
        dispatch!(self, chip => chip.tpwmthrs())
    }

    fn set_tpwmthrs(&mut self, value: u32) -> Result<(), ChipError> {
        dispatch!(self, chip => chip.set_tpwmthrs(value))
    }

    fn sensitivity(&mut self) -> Result<i16, ChipError> {
        dispatch!(self, chip => chip.sensitivity())
    }

    fn set_sensitivity(&mut self, value: i16) -> Result<(), ChipError> {
        dispatch!(self, chip => chip.set_sensitivity(value))
    }

    fn thermal_status(&mut self) -> Result<ThermalStatus, ChipError> {
        dispatch!(self, chip => chip.thermal_status())
    }

    fn set_stall_detection(&mut self, enable: bool) -> Result<(), ChipError> {
        dispatch!(self, chip => chip.set_stall_detection(enable))
    }
}
