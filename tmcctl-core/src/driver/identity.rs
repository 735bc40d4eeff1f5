//! Driver identity used for diagnostic labels

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Axis letter plus driver index, e.g. `Z`/`'2'` for the second Z driver
///
/// Index `'0'` is the only (or first) driver on the axis and is left
/// out of the label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DriverIdentity {
    axis: char,
    index: char,
}

impl DriverIdentity {
    pub const X: Self = Self::new('X', '0');
    pub const Y: Self = Self::new('Y', '0');
    pub const Z: Self = Self::new('Z', '0');
    pub const X2: Self = Self::new('X', '2');
    pub const Y2: Self = Self::new('Y', '2');
    pub const Z2: Self = Self::new('Z', '2');
    pub const E0: Self = Self::new('E', '0');
    pub const E1: Self = Self::new('E', '1');
    pub const E2: Self = Self::new('E', '2');
    pub const E3: Self = Self::new('E', '3');
    pub const E4: Self = Self::new('E', '4');

    /// Create an identity from an axis letter and driver index
    pub const fn new(axis: char, index: char) -> Self {
        Self { axis, index }
    }

    /// Axis letter
    pub fn axis(&self) -> char {
        self.axis
    }

    /// Driver index character
    pub fn index(&self) -> char {
        self.index
    }
}

impl fmt::Display for DriverIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use fmt::Write;

        f.write_char(self.axis)?;
        if self.index > '0' {
            f.write_char(self.index)?;
        }
        Ok(())
    }
}
