//! Error types for the driver control layer

use core::fmt;

use crate::traits::ChipError;

/// Errors surfaced by driver handles, conversions and commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TmcError {
    /// A threshold conversion was asked to divide by zero
    /// (zero speed threshold, zero register value or zero steps-per-mm)
    DivisionByZero,
    /// Argument outside the range the chip or conversion accepts
    InvalidArgument,
    /// The chip driver failed at the transport level
    DriverCommunication(ChipError),
    /// The console sink refused the diagnostic line
    Output,
}

impl From<ChipError> for TmcError {
    fn from(e: ChipError) -> Self {
        TmcError::DriverCommunication(e)
    }
}

impl From<fmt::Error> for TmcError {
    fn from(_: fmt::Error) -> Self {
        TmcError::Output
    }
}

impl fmt::Display for TmcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TmcError::DivisionByZero => f.write_str("division by zero"),
            TmcError::InvalidArgument => f.write_str("invalid argument"),
            TmcError::DriverCommunication(e) => write!(f, "driver communication error: {}", e),
            TmcError::Output => f.write_str("console output failed"),
        }
    }
}
