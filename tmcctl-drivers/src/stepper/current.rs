//! RMS current to IRUN/IHOLD conversion
//!
//! Trinamic chips scale motor current with a 5-bit current scale (CS)
//! against the sense resistor voltage. Full-scale voltage is 0.325 V,
//! or 0.180 V with `vsense` set for better resolution at low currents.
//!
//! ```text
//! CS = 32 * sqrt(2) * I_rms * (Rsense + 0.02) / Vfs - 1
//! I_rms = (CS + 1) / 32 * Vfs / (Rsense + 0.02) / sqrt(2)
//! ```

/// Full-scale sense voltage with vsense = 0
const VFS_HIGH: f32 = 0.325;
/// Full-scale sense voltage with vsense = 1
const VFS_LOW: f32 = 0.180;
const SQRT2: f32 = 1.41421;
/// Internal resistance added to the external sense resistor
const RSENSE_OFFSET: f32 = 0.02;

/// Register-level encoding of a current request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CurrentSetting {
    /// Run current scale (0-31)
    pub irun: u8,
    /// Hold current scale (0-31)
    pub ihold: u8,
    /// Use the low full-scale voltage
    pub vsense: bool,
}

impl CurrentSetting {
    /// Encode an RMS current for a given sense resistor
    ///
    /// Prefers vsense = 0 and switches to the low range when the scale
    /// would drop below 16, keeping at least half the CS resolution.
    pub fn from_rms(ma: u16, hold_multiplier: f32, rsense: f32) -> Self {
        let scale = 32.0 * SQRT2 * ma as f32 / 1000.0 * (rsense + RSENSE_OFFSET);

        let mut vsense = false;
        let mut cs = (scale / VFS_HIGH - 1.0) as u8;
        if cs < 16 {
            vsense = true;
            cs = (scale / VFS_LOW - 1.0) as u8;
        }
        let irun = cs.min(31);
        let ihold = ((irun as f32 * hold_multiplier) as u8).min(31);

        Self {
            irun,
            ihold,
            vsense,
        }
    }

    /// Decode the RMS run current in mA
    pub fn to_rms(irun: u8, vsense: bool, rsense: f32) -> u16 {
        let vfs = if vsense { VFS_LOW } else { VFS_HIGH };
        ((irun as f32 + 1.0) / 32.0 * vfs / (rsense + RSENSE_OFFSET) / SQRT2 * 1000.0) as u16
    }
}

/// Build IHOLD_IRUN with the given hold delay
pub fn ihold_irun(setting: CurrentSetting, hold_delay: u8) -> u32 {
    ((hold_delay as u32 & 0x0F) << 16)
        | ((setting.irun as u32 & 0x1F) << 8)
        | (setting.ihold as u32 & 0x1F)
}

/// IRUN field of an IHOLD_IRUN value
pub fn irun_of(ihold_irun: u32) -> u8 {
    ((ihold_irun >> 8) & 0x1F) as u8
}
