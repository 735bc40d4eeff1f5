//! In-memory chip used by unit tests

use core::ops::RangeInclusive;

use crate::traits::{ChipError, ChipFamily, ThermalStatus, TmcChip};

/// Register-free chip model
///
/// Current reads back quantized to 10 mA, like a real chip's CS steps.
#[derive(Debug, Clone)]
pub(crate) struct MockChip {
    pub(crate) current_ma: u16,
    pub(crate) hold_multiplier: f32,
    pub(crate) microsteps: u16,
    pub(crate) tpwmthrs: u32,
    pub(crate) sgt: i16,
    pub(crate) stall_detection: bool,
    pub(crate) thermal: ThermalStatus,
    pub(crate) fail: Option<ChipError>,
}

impl MockChip {
    pub(crate) fn new() -> Self {
        Self {
            current_ma: 0,
            hold_multiplier: 0.0,
            microsteps: 16,
            tpwmthrs: 0,
            sgt: 0,
            stall_detection: false,
            thermal: ThermalStatus::default(),
            fail: None,
        }
    }

    fn check(&self) -> Result<(), ChipError> {
        match self.fail {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl TmcChip for MockChip {
    fn family(&self) -> ChipFamily {
        ChipFamily::Spi
    }

    fn sensitivity_range(&self) -> RangeInclusive<i16> {
        -64..=63
    }

    fn rms_current(&mut self) -> Result<u16, ChipError> {
        self.check()?;
        Ok(self.current_ma / 10 * 10)
    }

    fn set_rms_current_with_hold(
        &mut self,
        ma: u16,
        hold_multiplier: f32,
    ) -> Result<(), ChipError> {
        self.check()?;
        self.current_ma = ma;
        self.hold_multiplier = hold_multiplier;
        Ok(())
    }

    fn microsteps(&mut self) -> Result<u16, ChipError> {
        self.check()?;
        Ok(self.microsteps)
    }

    fn tpwmthrs(&mut self) -> Result<u32, ChipError> {
        self.check()?;
        Ok(self.tpwmthrs)
    }

    fn set_tpwmthrs(&mut self, value: u32) -> Result<(), ChipError> {
        self.check()?;
        self.tpwmthrs = value;
        Ok(())
    }

    fn sensitivity(&mut self) -> Result<i16, ChipError> {
        self.check()?;
        Ok(self.sgt)
    }

    fn set_sensitivity(&mut self, value: i16) -> Result<(), ChipError> {
        self.check()?;
        self.sgt = value;
        Ok(())
    }

    fn thermal_status(&mut self) -> Result<ThermalStatus, ChipError> {
        self.check()?;
        Ok(self.thermal)
    }

    fn set_stall_detection(&mut self, enable: bool) -> Result<(), ChipError> {
        self.check()?;
        self.stall_detection = enable;
        Ok(())
    }
}
