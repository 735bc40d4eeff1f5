//! Board-agnostic control layer for Trinamic stepper drivers
//!
//! This crate normalizes SPI- and UART-addressed TMC chips behind one
//! per-driver interface keyed by axis letter and driver index:
//!
//! - Chip capability trait ([`traits::TmcChip`])
//! - Driver handle with identity and cached state ([`driver`])
//! - stealthChop threshold unit conversion ([`motion`])
//! - Over-temperature pre-warning monitor ([`safety`])
//! - Command layer emitting operator diagnostics ([`command`])
//! - Driver configuration ([`config`])

#![no_std]
#![deny(unsafe_code)]

pub mod command;
pub mod config;
pub mod driver;
pub mod error;
pub mod motion;
pub mod safety;
pub mod traits;

#[cfg(test)]
mod testing;

pub use error::TmcError;
