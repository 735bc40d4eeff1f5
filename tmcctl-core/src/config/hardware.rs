//! Driver hardware configuration
//!
//! Which chip family sits on which axis, how it is wired and what it is
//! programmed with at boot.

use heapless::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::driver::{DriverIdentity, TmcHandle};
use crate::error::TmcError;
use crate::motion::to_threshold_register;
use crate::safety::MonitorConfig;
use crate::traits::ChipFamily;

/// One slot per label: X, Y, Z, X2, Y2, Z2, E0..E4
pub const MAX_DRIVERS: usize = 11;

/// Configuration format version
pub const CONFIG_VERSION: u8 = 1;

/// Upper bound on the serialized configuration size
pub const MAX_CONFIG_SIZE: usize = 1024;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// More than [`MAX_DRIVERS`] drivers
    TooManyDrivers,
    /// Serialization failed (buffer too small)
    Serialize,
    /// Deserialization failed
    Deserialize,
    /// Config version mismatch
    VersionMismatch,
    /// A driver entry holds an out-of-range value
    Invalid(DriverIdentity),
}

/// How a driver is connected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TransportConfig {
    /// SPI bus with a dedicated chip select
    Spi {
        /// Chip select GPIO
        cs_pin: u8,
    },
    /// Single-wire UART
    Uart {
        /// Slave address (0-3, set by MS1/MS2)
        address: u8,
        /// TX and RX share one wire, so every request echoes back
        half_duplex: bool,
    },
}

/// Per-driver configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TmcDriverConfig {
    /// Axis letter and index
    pub identity: DriverIdentity,
    /// Wiring
    pub transport: TransportConfig,
    /// Sense resistor in ohms (0.11 on most stepsticks)
    pub sense_resistor_ohms: f32,
    /// RMS run current in mA
    pub run_current_ma: u16,
    /// Hold current as a fraction of run current
    pub hold_multiplier: f32,
    /// Microstep resolution (1..=256, power of two)
    pub microsteps: u16,
    /// stealthChop upper speed in mm/s, 0 keeps stealthChop at all speeds
    pub hybrid_threshold: i32,
    /// Axis steps per mm
    pub steps_per_mm: u32,
    /// Sensorless homing sensitivity, if the axis homes sensorless
    pub homing_sensitivity: Option<i16>,
}

impl TmcDriverConfig {
    /// Chip family implied by the transport
    pub fn family(&self) -> ChipFamily {
        match self.transport {
            TransportConfig::Spi { .. } => ChipFamily::Spi,
            TransportConfig::Uart { .. } => ChipFamily::Uart,
        }
    }

    /// Check ranges that do not depend on the chip
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = ConfigError::Invalid(self.identity);

        if !self.microsteps.is_power_of_two() || self.microsteps > 256 {
            return Err(invalid);
        }
        if self.sense_resistor_ohms.is_nan() || self.sense_resistor_ohms <= 0.0 {
            return Err(invalid);
        }
        if !(0.0..=1.0).contains(&self.hold_multiplier) {
            return Err(invalid);
        }
        if self.hybrid_threshold < 0 || (self.hybrid_threshold > 0 && self.steps_per_mm == 0) {
            return Err(invalid);
        }
        if let TransportConfig::Uart { address, .. } = self.transport {
            if address > 3 {
                return Err(invalid);
            }
        }
        Ok(())
    }

    /// Program current, stealthChop threshold and homing sensitivity
    pub fn apply(&self, drv: &mut dyn TmcHandle) -> Result<(), TmcError> {
        drv.set_current_ma_with_hold(self.run_current_ma, self.hold_multiplier)?;

        let register = if self.hybrid_threshold == 0 {
            0
        } else {
            let microsteps = drv.microsteps()?;
            to_threshold_register(microsteps, self.hybrid_threshold, self.steps_per_mm)?
        };
        drv.set_threshold_register(register)?;

        if let Some(sensitivity) = self.homing_sensitivity {
            drv.set_sensitivity(sensitivity)?;
        }
        Ok(())
    }
}

/// Complete driver configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TmcConfig {
    /// Configuration version for compatibility checks
    pub version: u8,
    /// Driver entries
    pub drivers: Vec<TmcDriverConfig, MAX_DRIVERS>,
    /// Monitor settings
    pub monitor: MonitorConfig,
}

impl Default for TmcConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            drivers: Vec::new(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl TmcConfig {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a driver entry after validating it
    pub fn push(&mut self, driver: TmcDriverConfig) -> Result<(), ConfigError> {
        driver.validate()?;
        self.drivers
            .push(driver)
            .map_err(|_| ConfigError::TooManyDrivers)
    }

    /// Entry for a driver identity
    pub fn driver(&self, identity: DriverIdentity) -> Option<&TmcDriverConfig> {
        self.drivers.iter().find(|d| d.identity == identity)
    }

    /// Validate every entry
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::VersionMismatch);
        }
        self.drivers.iter().try_for_each(TmcDriverConfig::validate)
    }

    /// Serialize into `buf`, returning the used length
    #[cfg(feature = "serde")]
    pub fn to_bytes(&self, buf: &mut [u8]) -> Result<usize, ConfigError> {
        let used = postcard::to_slice(self, buf).map_err(|_| ConfigError::Serialize)?;
        Ok(used.len())
    }

    /// Deserialize and validate a stored configuration
    #[cfg(feature = "serde")]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: TmcConfig =
            postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)?;
        config.validate()?;
        Ok(config)
    }
}
