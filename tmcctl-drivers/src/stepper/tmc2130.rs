//! TMC2130 stepper driver (SPI mode)
//!
//! # SPI Protocol
//!
//! SPI mode 3, chip select active low, MSB first. Every access is one
//! 40-bit frame:
//! - Address byte (bit 7 set for a write)
//! - Data (4 bytes, big-endian)
//!
//! The chip answers each frame with its SPI_STATUS byte followed by the
//! data requested by the *previous* read, so a read costs two frames.
//!
//! IHOLD_IRUN, TPWMTHRS, TCOOLTHRS and COOLCONF are write-only; this
//! driver keeps shadow copies to answer reads of them.

use core::ops::RangeInclusive;

use embedded_hal::spi::SpiDevice;
use tmcctl_core::traits::{ChipError, ChipFamily, ThermalStatus, TmcChip};

use super::current::{ihold_irun, irun_of, CurrentSetting};
use super::registers::{self, DrvStatus, CHOPCONF_VSENSE, TCOOLTHRS_ALWAYS};

/// TMC2130 Register addresses
pub mod reg {
    /// General configuration
    pub const GCONF: u8 = 0x00;
    /// Global status flags
    pub const GSTAT: u8 = 0x01;
    /// Hold/run current settings
    pub const IHOLD_IRUN: u8 = 0x10;
    /// Power down delay
    pub const TPOWERDOWN: u8 = 0x11;
    /// Upper velocity for StealthChop
    pub const TPWMTHRS: u8 = 0x13;
    /// Lower velocity for CoolStep/StallGuard
    pub const TCOOLTHRS: u8 = 0x14;
    /// Chopper configuration
    pub const CHOPCONF: u8 = 0x6C;
    /// CoolStep and StallGuard2 configuration
    pub const COOLCONF: u8 = 0x6D;
    /// Driver status
    pub const DRV_STATUS: u8 = 0x6F;
    /// StealthChop PWM configuration
    pub const PWMCONF: u8 = 0x70;
}

const WRITE_BIT: u8 = 0x80;

/// GCONF: stealthChop voltage PWM mode
const GCONF_EN_PWM_MODE: u32 = 1 << 2;
/// GCONF: DIAG1 signals a stall
const GCONF_DIAG1_STALL: u32 = 1 << 8;
/// GCONF: DIAG1 is push-pull
const GCONF_DIAG1_PUSHPULL: u32 = 1 << 13;

/// COOLCONF: SGT field (7-bit two's complement)
const COOLCONF_SGT_SHIFT: u32 = 16;
const COOLCONF_SGT_MASK: u32 = 0x7F << COOLCONF_SGT_SHIFT;

/// Delay before dropping to hold current
const HOLD_DELAY: u8 = 6;

/// TMC2130 driver over an SPI device with its own chip select
pub struct Tmc2130<SPI> {
    spi: SPI,
    rsense: f32,
    stealthchop: bool,
    status: u8,
    ihold_irun: u32,
    tpwmthrs: u32,
    tcoolthrs: u32,
    coolconf: u32,
}

impl<SPI: SpiDevice> Tmc2130<SPI> {
    /// Create a driver; `rsense` is the sense resistor in ohms
    pub fn new(spi: SPI, rsense: f32) -> Self {
        Self {
            spi,
            rsense,
            stealthchop: false,
            status: 0,
            ihold_irun: 0,
            tpwmthrs: 0,
            tcoolthrs: 0,
            coolconf: 0,
        }
    }

    /// Program the base configuration
    pub fn init(&mut self, microsteps: u16, stealthchop: bool) -> Result<(), ChipError> {
        self.stealthchop = stealthchop;

        let mut gconf = 0;
        if stealthchop {
            gconf |= GCONF_EN_PWM_MODE;
        }
        self.write_register(reg::GCONF, gconf)?;
        self.write_register(reg::CHOPCONF, registers::chopconf(microsteps))?;
        self.write_register(reg::TPOWERDOWN, 128)?;
        // PWM_AMPL = 200, PWM_GRAD = 1, pwm_autoscale = 1
        self.write_register(reg::PWMCONF, 200 | (1 << 8) | (1 << 18))?;
        // Clear reset/error flags
        self.write_register(reg::GSTAT, 0b111)?;
        Ok(())
    }

    /// SPI_STATUS byte returned with the last frame
    pub fn spi_status(&self) -> u8 {
        self.status
    }

    #[cfg(test)]
    pub(crate) fn bus_mut(&mut self) -> &mut SPI {
        &mut self.spi
    }

    /// Release the SPI device
    pub fn release(self) -> SPI {
        self.spi
    }

    /// Write a register
    pub fn write_register(&mut self, reg: u8, value: u32) -> Result<(), ChipError> {
        self.frame(reg | WRITE_BIT, value)?;
        match reg {
            reg::IHOLD_IRUN => self.ihold_irun = value,
            reg::TPWMTHRS => self.tpwmthrs = value,
            reg::TCOOLTHRS => self.tcoolthrs = value,
            reg::COOLCONF => self.coolconf = value,
            _ => {}
        }
        Ok(())
    }

    /// Read a register
    pub fn read_register(&mut self, reg: u8) -> Result<u32, ChipError> {
        self.frame(reg, 0)?;
        self.frame(reg, 0)
    }

    /// Parsed DRV_STATUS
    pub fn drv_status(&mut self) -> Result<DrvStatus, ChipError> {
        Ok(DrvStatus::from_tmc2130(self.read_register(reg::DRV_STATUS)?))
    }

    fn frame(&mut self, address: u8, value: u32) -> Result<u32, ChipError> {
        let data = value.to_be_bytes();
        let mut frame = [address, data[0], data[1], data[2], data[3]];
        self.spi
            .transfer_in_place(&mut frame)
            .map_err(|_| ChipError::Bus)?;
        self.status = frame[0];
        Ok(u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]))
    }

    fn modify_register(
        &mut self,
        reg: u8,
        clear: u32,
        set: u32,
    ) -> Result<(), ChipError> {
        let value = self.read_register(reg)?;
        self.write_register(reg, (value & !clear) | set)
    }
}

impl<SPI: SpiDevice> TmcChip for Tmc2130<SPI> {
    fn family(&self) -> ChipFamily {
        ChipFamily::Spi
    }

    fn sensitivity_range(&self) -> RangeInclusive<i16> {
        -64..=63
    }

    fn rms_current(&mut self) -> Result<u16, ChipError> {
        let vsense = self.read_register(reg::CHOPCONF)? & CHOPCONF_VSENSE != 0;
        Ok(CurrentSetting::to_rms(
            irun_of(self.ihold_irun),
            vsense,
            self.rsense,
        ))
    }

    fn set_rms_current_with_hold(
        &mut self,
        ma: u16,
        hold_multiplier: f32,
    ) -> Result<(), ChipError> {
        let setting = CurrentSetting::from_rms(ma, hold_multiplier, self.rsense);
        let vsense = if setting.vsense { CHOPCONF_VSENSE } else { 0 };
        self.modify_register(reg::CHOPCONF, CHOPCONF_VSENSE, vsense)?;
        self.write_register(reg::IHOLD_IRUN, ihold_irun(setting, HOLD_DELAY))
    }

    fn microsteps(&mut self) -> Result<u16, ChipError> {
        Ok(registers::microsteps_of(self.read_register(reg::CHOPCONF)?))
    }

    fn tpwmthrs(&mut self) -> Result<u32, ChipError> {
        Ok(self.tpwmthrs)
    }

    fn set_tpwmthrs(&mut self, value: u32) -> Result<(), ChipError> {
        self.write_register(reg::TPWMTHRS, registers::tpwmthrs(value))
    }

    fn sensitivity(&mut self) -> Result<i16, ChipError> {
        let raw = ((self.coolconf & COOLCONF_SGT_MASK) >> COOLCONF_SGT_SHIFT) as u8;
        // Sign-extend the 7-bit field
        Ok(((raw << 1) as i8 >> 1) as i16)
    }

    fn set_sensitivity(&mut self, value: i16) -> Result<(), ChipError> {
        let raw = (value as u32 & 0x7F) << COOLCONF_SGT_SHIFT;
        let coolconf = (self.coolconf & !COOLCONF_SGT_MASK) | raw;
        self.write_register(reg::COOLCONF, coolconf)
    }

    fn thermal_status(&mut self) -> Result<ThermalStatus, ChipError> {
        Ok(self.drv_status()?.thermal())
    }

    fn set_stall_detection(&mut self, enable: bool) -> Result<(), ChipError> {
        // stallGuard2 only works in spreadCycle
        let pwm_mode = if self.stealthchop && !enable {
            GCONF_EN_PWM_MODE
        } else {
            0
        };
        let diag = if enable {
            GCONF_DIAG1_STALL | GCONF_DIAG1_PUSHPULL
        } else {
            0
        };
        self.modify_register(
            reg::GCONF,
            GCONF_EN_PWM_MODE | GCONF_DIAG1_STALL | GCONF_DIAG1_PUSHPULL,
            pwm_mode | diag,
        )?;
        self.write_register(reg::TCOOLTHRS, if enable { TCOOLTHRS_ALWAYS } else { 0 })
    }
}
