//! Trinamic chip implementations
//!
//! Concrete [`TmcChip`](tmcctl_core::traits::TmcChip) implementations
//! for the two interface families:
//!
//! - TMC2130 over SPI (`embedded_hal::spi::SpiDevice`)
//! - TMC2209 over single-wire UART (`embedded_io::{Read, Write}`)
//!
//! [`TmcVariant`](stepper::TmcVariant) holds either, so mixed boards can
//! keep every driver in one array.

#![no_std]
#![deny(unsafe_code)]

pub mod stepper;

pub use stepper::{Tmc2130, Tmc2209, TmcVariant};
