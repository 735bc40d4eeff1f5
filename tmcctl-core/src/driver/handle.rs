//! Polymorphic driver handle

use core::fmt;

use super::identity::DriverIdentity;
use super::state::DriverState;
use crate::error::TmcError;
use crate::traits::{ChipFamily, ThermalStatus, TmcChip};

/// Result of one thermal poll through a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ThermalPoll {
    /// Live flags as read from the chip
    pub status: ThermalStatus,
    /// This poll latched a new pre-warning event
    pub triggered: bool,
}

/// Uniform interface over any wrapped chip family
///
/// Object safe, so drivers of different families can be iterated as
/// `&mut dyn TmcHandle`.
pub trait TmcHandle {
    /// Identity used for diagnostic labels
    fn identity(&self) -> DriverIdentity;

    /// Addressing family of the wrapped chip
    fn family(&self) -> ChipFamily;

    /// Control-layer state for this driver
    fn state(&self) -> &DriverState;

    /// Last commanded current in mA (cached, never read from the chip)
    fn current_ma(&self) -> u16 {
        self.state().commanded_ma()
    }

    /// Current as the chip reports it, in mA
    fn measured_current_ma(&mut self) -> Result<u16, TmcError>;

    /// Program run current with the chip's default hold multiplier
    fn set_current_ma(&mut self, ma: u16) -> Result<(), TmcError>;

    /// Program run current with an explicit hold multiplier
    fn set_current_ma_with_hold(&mut self, ma: u16, hold_multiplier: f32)
        -> Result<(), TmcError>;

    /// Microstep resolution
    fn microsteps(&mut self) -> Result<u16, TmcError>;

    /// Raw stealthChop threshold register (TPWMTHRS)
    fn threshold_register(&mut self) -> Result<u32, TmcError>;

    /// Write the raw stealthChop threshold register
    fn set_threshold_register(&mut self, value: u32) -> Result<(), TmcError>;

    /// Sensorless homing sensitivity
    fn sensitivity(&mut self) -> Result<i16, TmcError>;

    /// Set sensorless homing sensitivity, range checked for the chip
    fn set_sensitivity(&mut self, value: i16) -> Result<(), TmcError>;

    /// Enable or disable stall detection for sensorless homing
    fn set_stall_detection(&mut self, enable: bool) -> Result<(), TmcError>;

    /// Read the live thermal flags and latch a pre-warning into state
    fn poll_thermal(&mut self) -> Result<ThermalPoll, TmcError>;

    /// Acknowledge the latched pre-warning
    fn clear_otpw(&mut self);

    /// Write the identity label to a console sink
    fn print_label(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{}", self.identity())
    }
}

/// A chip implementation plus the identity and state kept for it
pub struct TmcDriver<C> {
    chip: C,
    identity: DriverIdentity,
    state: DriverState,
}

impl<C: TmcChip> TmcDriver<C> {
    /// Wrap a constructed chip driver
    pub fn new(chip: C, identity: DriverIdentity) -> Self {
        Self {
            chip,
            identity,
            state: DriverState::new(),
        }
    }

    /// Access the wrapped chip
    pub fn chip(&self) -> &C {
        &self.chip
    }

    /// Mutable access to the wrapped chip
    ///
    /// Writes made through this bypass the cached state.
    pub fn chip_mut(&mut self) -> &mut C {
        &mut self.chip
    }

    /// Unwrap the chip, dropping identity and state
    pub fn into_chip(self) -> C {
        self.chip
    }
}

impl<C: TmcChip> TmcHandle for TmcDriver<C> {
    fn identity(&self) -> DriverIdentity {
        self.identity
    }

    fn family(&self) -> ChipFamily {
        self.chip.family()
    }

    fn state(&self) -> &DriverState {
        &self.state
    }

    fn measured_current_ma(&mut self) -> Result<u16, TmcError> {
        Ok(self.chip.rms_current()?)
    }

    fn set_current_ma(&mut self, ma: u16) -> Result<(), TmcError> {
        self.chip.set_rms_current(ma)?;
        self.state.set_commanded_ma(ma);
        Ok(())
    }

    fn set_current_ma_with_hold(
        &mut self,
        ma: u16,
        hold_multiplier: f32,
    ) -> Result<(), TmcError> {
        if !(0.0..=1.0).contains(&hold_multiplier) {
            return Err(TmcError::InvalidArgument);
        }
        self.chip.set_rms_current_with_hold(ma, hold_multiplier)?;
        self.state.set_commanded_ma(ma);
        Ok(())
    }

    fn microsteps(&mut self) -> Result<u16, TmcError> {
        Ok(self.chip.microsteps()?)
    }

    fn threshold_register(&mut self) -> Result<u32, TmcError> {
        Ok(self.chip.tpwmthrs()?)
    }

    fn set_threshold_register(&mut self, value: u32) -> Result<(), TmcError> {
        Ok(self.chip.set_tpwmthrs(value)?)
    }

    fn sensitivity(&mut self) -> Result<i16, TmcError> {
        Ok(self.chip.sensitivity()?)
    }

    fn set_sensitivity(&mut self, value: i16) -> Result<(), TmcError> {
        if !self.chip.sensitivity_range().contains(&value) {
            return Err(TmcError::InvalidArgument);
        }
        Ok(self.chip.set_sensitivity(value)?)
    }

    fn set_stall_detection(&mut self, enable: bool) -> Result<(), TmcError> {
        Ok(self.chip.set_stall_detection(enable)?)
    }

    fn poll_thermal(&mut self) -> Result<ThermalPoll, TmcError> {
        let status = self.chip.thermal_status()?;
        let triggered = self.state.record_otpw(status.prewarning);
        Ok(ThermalPoll { status, triggered })
    }

    fn clear_otpw(&mut self) {
        self.state.clear_otpw();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChip;
    use crate::traits::ChipError;

    #[test]
    fn test_current_cache_tracks_last_write() {
        let mut drv = TmcDriver::new(MockChip::new(), DriverIdentity::X);

        drv.set_current_ma(800).unwrap();
        assert_eq!(drv.current_ma(), 800);

        drv.set_current_ma_with_hold(600, 0.3).unwrap();
        drv.set_current_ma_with_hold(700, 0.7).unwrap();
        drv.set_current_ma(800).unwrap();
        assert_eq!(drv.current_ma(), 800);
        assert_eq!(drv.chip().hold_multiplier, 0.5);
    }

    #[test]
    fn test_failed_write_leaves_cache() {
        let mut drv = TmcDriver::new(MockChip::new(), DriverIdentity::X);
        drv.set_current_ma(500).unwrap();
        drv.chip.fail = Some(ChipError::Timeout);

        assert_eq!(
            drv.set_current_ma(900),
            Err(TmcError::DriverCommunication(ChipError::Timeout))
        );
        assert_eq!(drv.current_ma(), 500);
    }

    #[test]
    fn test_measured_current_comes_from_chip() {
        let mut drv = TmcDriver::new(MockChip::new(), DriverIdentity::Y);
        drv.set_current_ma(800).unwrap();
        // Mock quantizes to 10 mA steps
        assert_eq!(drv.measured_current_ma(), Ok(800));
        drv.set_current_ma(805).unwrap();
        assert_eq!(drv.measured_current_ma(), Ok(800));
        assert_eq!(drv.current_ma(), 805);
    }

    #[test]
    fn test_hold_multiplier_range() {
        let mut drv = TmcDriver::new(MockChip::new(), DriverIdentity::X);
        assert_eq!(
            drv.set_current_ma_with_hold(800, 1.5),
            Err(TmcError::InvalidArgument)
        );
        assert_eq!(drv.current_ma(), 0);
    }

    #[test]
    fn test_sensitivity_range_checked() {
        let mut drv = TmcDriver::new(MockChip::new(), DriverIdentity::X);
        assert_eq!(drv.set_sensitivity(-64), Ok(()));
        assert_eq!(drv.sensitivity(), Ok(-64));
        assert_eq!(drv.set_sensitivity(64), Err(TmcError::InvalidArgument));
        assert_eq!(drv.sensitivity(), Ok(-64));
    }

    #[test]
    fn test_threshold_passthrough() {
        let mut drv = TmcDriver::new(MockChip::new(), DriverIdentity::Z2);
        drv.set_threshold_register(2530).unwrap();
        assert_eq!(drv.threshold_register(), Ok(2530));
        assert_eq!(drv.family(), ChipFamily::Spi);
    }

    #[test]
    fn test_poll_latches_prewarn() {
        let mut drv = TmcDriver::new(MockChip::new(), DriverIdentity::E1);
        drv.chip.thermal.prewarning = true;

        let poll = drv.poll_thermal().unwrap();
        assert!(poll.triggered);
        assert!(drv.state().otpw_flag());

        drv.chip.thermal.prewarning = false;
        let poll = drv.poll_thermal().unwrap();
        assert!(!poll.triggered);
        assert!(drv.state().otpw_flag());

        drv.clear_otpw();
        assert!(!drv.state().otpw_flag());
        assert_eq!(drv.state().otpw_count(), 1);
    }

    #[test]
    fn test_print_label() {
        let drv = TmcDriver::new(MockChip::new(), DriverIdentity::Z2);
        let mut out: heapless::String<8> = heapless::String::new();
        drv.print_label(&mut out).unwrap();

        let x = TmcDriver::new(MockChip::new(), DriverIdentity::X);
        x.print_label(&mut out).unwrap();
        assert_eq!(out.as_str(), "Z2X");
    }

    #[test]
    fn test_chip_fault_propagates() {
        let mut chip = MockChip::new();
        chip.fail = Some(ChipError::CrcMismatch);
        let mut drv = TmcDriver::new(chip, DriverIdentity::X);

        assert_eq!(
            drv.poll_thermal(),
            Err(TmcError::DriverCommunication(ChipError::CrcMismatch))
        );
        assert!(!drv.state().otpw_flag());
    }
}
