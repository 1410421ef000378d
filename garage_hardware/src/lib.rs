//! GPIO backends for the garage door controller.
//!
//! `SimulatedGpio` is always available; the rppal-backed `RpiGpio` is built
//! with the `hardware` feature on Linux.

pub mod error;
pub mod sim;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod rpi;

pub use error::HwError;
pub use sim::{PinWrite, SimulatedGpio};

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use rpi::RpiGpio;
