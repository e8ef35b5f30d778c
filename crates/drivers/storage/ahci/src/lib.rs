//! Halcyon AHCI (SATA) Driver
//!
//! Brings an AHCI host controller from its BIOS-owned power-on state into
//! OS control, discovers attached drives, and issues ATA commands to them:
//!
//! - BIOS/OS ownership handoff (the BOHC semaphore protocol)
//! - per-port stop/start/reset state machine with the hardware-mandated
//!   timeout budgets
//! - command list / received-FIS / command table DMA layout
//! - polled command submission with task-file error decoding
//!
//! # Usage
//!
//! ```rust,ignore
//! use halcyon_driver_ahci::Controller;
//! use halcyon_driver_traits::Driver;
//!
//! let mut ahci = halcyon_driver_ahci::probe(clock, dma, halcyon_mem::map_mmio)
//!     .expect("no AHCI controller found");
//! ahci.init().expect("controller bring-up failed");
//! ahci.start().expect("identify failed");
//! ```
//!
//! Everything is synchronous and polling-based; there is no interrupt
//! completion path. Callers should expect controller initialization to
//! block for several seconds (ownership handoff and port settle times are
//! mandated by the AHCI specification).

#![no_std]

extern crate alloc;

pub mod ata;
pub mod command;
pub mod controller;
pub mod fis;
pub mod pool;
pub mod port;
pub mod regs;

mod poll;

#[cfg(test)]
pub(crate) mod mock;

pub use ata::IdentifyInfo;
pub use controller::{probe, probe_with_pci, Controller};
pub use port::{DeviceKind, Port};
pub use regs::{AbarWindow, HbaMmio};

use halcyon_driver_traits::DriverError;

/// AHCI-specific failures.
///
/// Controller-scope errors (`InvalidDevice`, `OwnershipTimeout`) abort
/// initialization of that controller. Port-scope errors are isolated to
/// the port they occurred on; sibling ports keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AhciError {
    /// Not a usable AHCI controller (wrong class or dead BAR5)
    InvalidDevice,
    /// BIOS never released the ownership semaphore
    OwnershipTimeout,
    /// Device detection did not report an established link after COMRESET
    PortResetTimeout,
    /// Port exists but is not in a state to accept the request
    PortNotReady,
    /// Task-file error byte reported by the device during a command
    DeviceError(u8),
    /// Dispatched command never completed within the poll budget
    CommandTimeout,
    /// DMA page allocation failed
    OutOfMemory,
}

pub type AhciResult<T> = Result<T, AhciError>;

impl From<DriverError> for AhciError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::OutOfMemory => AhciError::OutOfMemory,
            DriverError::Timeout => AhciError::CommandTimeout,
            _ => AhciError::InvalidDevice,
        }
    }
}

impl From<AhciError> for DriverError {
    fn from(err: AhciError) -> Self {
        match err {
            AhciError::InvalidDevice => DriverError::DeviceNotFound,
            AhciError::OwnershipTimeout => DriverError::Timeout,
            AhciError::PortResetTimeout => DriverError::Timeout,
            AhciError::PortNotReady => DriverError::Busy,
            AhciError::DeviceError(e) => DriverError::DeviceError(e as u32),
            AhciError::CommandTimeout => DriverError::Timeout,
            AhciError::OutOfMemory => DriverError::OutOfMemory,
        }
    }
}
