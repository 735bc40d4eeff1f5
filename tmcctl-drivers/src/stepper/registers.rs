//! Register fields shared by the TMC2130 and TMC2209

use tmcctl_core::traits::ThermalStatus;

/// CHOPCONF: vsense (low full-scale sense voltage)
pub const CHOPCONF_VSENSE: u32 = 1 << 17;
/// CHOPCONF: MRES field shift
const CHOPCONF_MRES_SHIFT: u32 = 24;
const CHOPCONF_MRES_MASK: u32 = 0x0F << CHOPCONF_MRES_SHIFT;

/// TCOOLTHRS value keeping stall detection active at every speed
pub const TCOOLTHRS_ALWAYS: u32 = 0xFFFFF;

/// Largest TPWMTHRS value (20-bit field)
pub const TPWMTHRS_MAX: u32 = 0xFFFFF;

/// Fit a threshold register into TPWMTHRS
///
/// Values past the field width saturate: stealthChop then stays on up
/// to the slowest speed the chip can express instead of wrapping to an
/// unrelated one.
pub fn tpwmthrs(value: u32) -> u32 {
    value.min(TPWMTHRS_MAX)
}

/// Microsteps to MRES field value (unsupported counts fall back to 16)
pub fn mres(microsteps: u16) -> u8 {
    match microsteps {
        256 => 0,
        128 => 1,
        64 => 2,
        32 => 3,
        16 => 4,
        8 => 5,
        4 => 6,
        2 => 7,
        1 => 8,
        _ => 4,
    }
}

/// Microstep resolution encoded in a CHOPCONF value
pub fn microsteps_of(chopconf: u32) -> u16 {
    let mres = (chopconf & CHOPCONF_MRES_MASK) >> CHOPCONF_MRES_SHIFT;
    // MRES values above 8 also select full steps
    256 >> mres.min(8)
}

/// Base CHOPCONF for spreadCycle/stealthChop operation
///
/// TOFF = 5, HSTRT = 4, HEND = 0, TBL = 2, intpol = 1.
pub fn chopconf(microsteps: u16) -> u32 {
    let mut chopconf = 5u32;
    chopconf |= 4 << 4;
    chopconf |= 2 << 15;
    chopconf |= (mres(microsteps) as u32) << CHOPCONF_MRES_SHIFT;
    chopconf |= 1 << 28;
    chopconf
}

/// Thermal bits of the DRV_STATUS register
///
/// The two chips place them differently: TMC2130 has `ot` at bit 25 and
/// `otpw` at bit 26, TMC2209 has `otpw` at bit 0 and `ot` at bit 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DrvStatus {
    /// Overtemperature pre-warning (120°C)
    pub ot_prewarning: bool,
    /// Overtemperature shutdown (150°C)
    pub ot_shutdown: bool,
}

impl DrvStatus {
    /// Parse a TMC2130 DRV_STATUS value
    pub fn from_tmc2130(value: u32) -> Self {
        Self {
            ot_shutdown: value & (1 << 25) != 0,
            ot_prewarning: value & (1 << 26) != 0,
        }
    }

    /// Parse a TMC2209 DRV_STATUS value
    pub fn from_tmc2209(value: u32) -> Self {
        Self {
            ot_prewarning: value & (1 << 0) != 0,
            ot_shutdown: value & (1 << 1) != 0,
        }
    }

    /// Thermal flags for the monitor
    pub fn thermal(&self) -> ThermalStatus {
        ThermalStatus {
            prewarning: self.ot_prewarning,
            shutdown: self.ot_shutdown,
        }
    }
}
