//! Hardware Driver Traits for Halcyon
//!
//! This crate defines the trait interfaces that hardware drivers implement,
//! plus the seam types drivers use to reach platform services (PCI
//! configuration space, DMA page allocation, the monotonic clock) without
//! knowing the concrete implementation behind them.
//!
//! # Debug Features
//!
//! Enable debug output for specific subsystems at compile time:
//! ```toml
//! halcyon-driver-traits = { path = "...", features = ["debug-storage"] }
//! ```
//!
//! Available features:
//! - `debug-all`: Enable all debug output
//! - `debug-storage`: storage controller bring-up and commands
//! - `debug-bus`: bus enumeration

#![no_std]

extern crate alloc;

pub mod bus;
mod debug;
pub mod dma;
pub mod time;

pub use bus::*;
pub use debug::*;
pub use dma::*;
pub use time::*;

/// Common error type for driver operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// Device not found or not responding
    DeviceNotFound,
    /// Operation timed out
    Timeout,
    /// Invalid parameter
    InvalidParameter,
    /// Invalid state for this operation
    InvalidState,
    /// Device busy
    Busy,
    /// I/O error
    IoError,
    /// Not supported by this device
    NotSupported,
    /// Buffer too small
    BufferTooSmall,
    /// No physical memory left for the request
    OutOfMemory,
    /// Device-specific error
    DeviceError(u32),
}

pub type DriverResult<T> = Result<T, DriverError>;

/// Driver lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Driver is loaded but not initialized
    Loaded,
    /// Driver is initialized and ready to start
    Ready,
    /// Driver is active and operational
    Active,
    /// Driver is stopped
    Stopped,
    /// Driver encountered an error
    Error,
}

/// Static driver information
#[derive(Debug, Clone, Copy)]
pub struct DriverInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub author: &'static str,
    pub description: &'static str,
}

/// Base trait for all drivers
pub trait Driver {
    /// Get driver information
    fn info(&self) -> DriverInfo;

    /// Get current driver state
    fn state(&self) -> DriverState;

    /// Initialize the driver
    fn init(&mut self) -> Result<(), DriverError>;

    /// Start the driver (after init)
    fn start(&mut self) -> Result<(), DriverError>;

    /// Stop the driver
    fn stop(&mut self) -> Result<(), DriverError>;
}
