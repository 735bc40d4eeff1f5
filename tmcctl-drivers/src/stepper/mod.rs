//! Trinamic stepper driver implementations

pub mod current;
pub mod registers;
pub mod tmc2130;
pub mod tmc2209;
pub mod variant;

#[cfg(test)]
mod mock;

pub use registers::DrvStatus;
pub use tmc2130::Tmc2130;
pub use tmc2209::Tmc2209;
pub use variant::TmcVariant;
