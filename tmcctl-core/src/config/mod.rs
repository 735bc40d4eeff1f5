//! Configuration types
//!
//! Board-agnostic driver configuration, stored as postcard binary data.

pub mod hardware;

pub use hardware::*;
