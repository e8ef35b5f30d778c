//! PCI Bus Driver for Halcyon
//!
//! Configuration space access, device enumeration, and BAR decoding with
//! size probing. Enumeration walks every bus/device/function, honoring the
//! multi-function header bit, and records class words, BARs (with their
//! probed sizes) and interrupt routing for each function found.
//!
//! Configuration access itself sits behind the `ConfigAccess` seam;
//! [`PortIoConfig`] is the production implementation over the legacy
//! 0xCF8/0xCFC mechanism.

#![no_std]

extern crate alloc;

use alloc::vec::Vec;
use core::arch::asm;

use halcyon_driver_traits::bus::{
    pci_class, ConfigAccess, PciAddress, PciBar, PciBus, PciDeviceId, PciDeviceInfo,
};
use halcyon_driver_traits::{debug_bus, Driver, DriverError, DriverInfo, DriverState};

// PCI configuration ports
const PCI_CONFIG_ADDRESS: u16 = 0xCF8;
const PCI_CONFIG_DATA: u16 = 0xCFC;

// Configuration header registers
const REG_ID: u8 = 0x00;
const REG_COMMAND: u8 = 0x04;
const REG_CLASS: u8 = 0x08;
const REG_HEADER: u8 = 0x0C;
const REG_BAR0: u8 = 0x10;
const REG_INTERRUPT: u8 = 0x3C;

// Command register bits
const COMMAND_IO_SPACE: u32 = 0x01;
const COMMAND_MEMORY_SPACE: u32 = 0x02;
const COMMAND_BUS_MASTER: u32 = 0x04;

/// Build configuration address for PCI access
fn config_address(addr: PciAddress, offset: u8) -> u32 {
    0x80000000
        | ((addr.bus as u32) << 16)
        | ((addr.device as u32) << 11)
        | ((addr.function as u32) << 8)
        | ((offset as u32) & 0xFC)
}

/// Configuration access through the legacy 0xCF8/0xCFC port pair
#[derive(Debug, Default)]
pub struct PortIoConfig;

impl ConfigAccess for PortIoConfig {
    fn read(&self, addr: PciAddress, offset: u8) -> u32 {
        let address = config_address(addr, offset);
        unsafe {
            asm!("out dx, eax", in("dx") PCI_CONFIG_ADDRESS, in("eax") address, options(nostack));
            let value: u32;
            asm!("in eax, dx", in("dx") PCI_CONFIG_DATA, out("eax") value, options(nostack));
            value
        }
    }

    fn write(&self, addr: PciAddress, offset: u8, value: u32) {
        let address = config_address(addr, offset);
        unsafe {
            asm!("out dx, eax", in("dx") PCI_CONFIG_ADDRESS, in("eax") address, options(nostack));
            asm!("out dx, eax", in("dx") PCI_CONFIG_DATA, in("eax") value, options(nostack));
        }
    }
}

/// PCI bus driver
pub struct PciDriver<A: ConfigAccess> {
    access: A,
    state: DriverState,
    devices: Vec<PciDeviceInfo>,
}

impl PciDriver<PortIoConfig> {
    pub const fn new() -> Self {
        Self::with_access(PortIoConfig)
    }
}

impl Default for PciDriver<PortIoConfig> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ConfigAccess> PciDriver<A> {
    pub const fn with_access(access: A) -> Self {
        PciDriver {
            access,
            state: DriverState::Loaded,
            devices: Vec::new(),
        }
    }

    /// Check if a device exists at the given address
    fn device_exists(&self, addr: PciAddress) -> bool {
        let vendor = self.access.read(addr, REG_ID) & 0xFFFF;
        vendor != 0xFFFF
    }

    /// Probe which BAR address bits are writable: write all-ones, read the
    /// result back, restore the original value.
    fn probe_bar_mask(&self, addr: PciAddress, bar_offset: u8, original: u32) -> u32 {
        self.access.write(addr, bar_offset, 0xFFFF_FFFF);
        let mask = self.access.read(addr, bar_offset);
        self.access.write(addr, bar_offset, original);
        mask
    }

    /// Read device information
    fn read_device_info(&self, addr: PciAddress) -> Option<PciDeviceInfo> {
        if !self.device_exists(addr) {
            return None;
        }

        let reg0 = self.access.read(addr, REG_ID);
        let reg2 = self.access.read(addr, REG_CLASS);
        let reg3c = self.access.read(addr, REG_INTERRUPT);

        let id = PciDeviceId {
            vendor: (reg0 & 0xFFFF) as u16,
            device: ((reg0 >> 16) & 0xFFFF) as u16,
            class: ((reg2 >> 24) & 0xFF) as u8,
            subclass: ((reg2 >> 16) & 0xFF) as u8,
            prog_if: ((reg2 >> 8) & 0xFF) as u8,
            revision: (reg2 & 0xFF) as u8,
        };

        let mut bars = [PciBar::None; 6];
        let mut i = 0;
        while i < 6 {
            let bar_offset = REG_BAR0 + (i as u8 * 4);
            let bar = self.access.read(addr, bar_offset);

            if bar == 0 {
                i += 1;
                continue;
            }

            if bar & 1 == 1 {
                // I/O BAR
                let mask = self.probe_bar_mask(addr, bar_offset, bar) & 0xFFFF_FFFC;
                let size = if mask == 0 { 0 } else { (!mask).wrapping_add(1) };
                bars[i] = PciBar::Io {
                    port: bar & 0xFFFF_FFFC,
                    size,
                };
            } else {
                // Memory BAR
                let is_64bit = (bar >> 1) & 3 == 2;
                let prefetchable = (bar >> 3) & 1 == 1;

                let low_mask = self.probe_bar_mask(addr, bar_offset, bar) & 0xFFFF_FFF0;

                let (address, size) = if is_64bit && i < 5 {
                    // Writable bits span both halves of a 64-bit BAR
                    let high_offset = bar_offset + 4;
                    let high = self.access.read(addr, high_offset);
                    let high_mask = self.probe_bar_mask(addr, high_offset, high);

                    let mask = ((high_mask as u64) << 32) | (low_mask as u64);
                    let size = if mask == 0 { 0 } else { (!mask).wrapping_add(1) };

                    (((high as u64) << 32) | ((bar & 0xFFFF_FFF0) as u64), size)
                } else {
                    let size = if low_mask == 0 {
                        0
                    } else {
                        (!low_mask).wrapping_add(1) as u64
                    };
                    ((bar & 0xFFFF_FFF0) as u64, size)
                };

                bars[i] = PciBar::Memory {
                    address,
                    size,
                    prefetchable,
                    is_64bit,
                };

                if is_64bit {
                    i += 1; // Skip next BAR (used for high bits)
                }
            }
            i += 1;
        }

        Some(PciDeviceInfo {
            address: addr,
            id,
            bars,
            interrupt_line: (reg3c & 0xFF) as u8,
            interrupt_pin: ((reg3c >> 8) & 0xFF) as u8,
        })
    }

    /// Scan all PCI buses
    fn scan_buses(&mut self) {
        self.devices.clear();

        for bus in 0..=255u8 {
            for device in 0..32u8 {
                for function in 0..8u8 {
                    let addr = PciAddress::new(bus, device, function);
                    if let Some(info) = self.read_device_info(addr) {
                        debug_bus!(
                            "{:02x}:{:02x}.{} {:04x}:{:04x} class {:02x}:{:02x}",
                            bus,
                            device,
                            function,
                            info.id.vendor,
                            info.id.device,
                            info.id.class,
                            info.id.subclass
                        );
                        self.devices.push(info);

                        // If function 0 is not multi-function, skip other functions
                        if function == 0 {
                            let header = self.access.read(addr, REG_HEADER);
                            if (header >> 16) & 0x80 == 0 {
                                break;
                            }
                        }
                    } else if function == 0 {
                        break; // No device at function 0 means no device at all
                    }
                }
            }
        }
    }
}

impl<A: ConfigAccess> Driver for PciDriver<A> {
    fn info(&self) -> DriverInfo {
        DriverInfo {
            name: "pci",
            version: "0.1.0",
            author: "Halcyon",
            description: "PCI bus driver",
        }
    }

    fn state(&self) -> DriverState {
        self.state
    }

    fn init(&mut self) -> Result<(), DriverError> {
        self.scan_buses();
        self.state = DriverState::Ready;
        Ok(())
    }

    fn start(&mut self) -> Result<(), DriverError> {
        self.state = DriverState::Active;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DriverError> {
        self.state = DriverState::Ready;
        Ok(())
    }
}

impl<A: ConfigAccess> PciBus for PciDriver<A> {
    fn enumerate(&mut self) -> Vec<PciDeviceInfo> {
        self.devices.clone()
    }

    fn find_by_class(&self, class: u8, subclass: u8) -> Vec<PciDeviceInfo> {
        self.devices
            .iter()
            .filter(|d| d.id.class == class && d.id.subclass == subclass)
            .cloned()
            .collect()
    }

    fn find_by_id(&self, vendor: u16, device: u16) -> Option<PciDeviceInfo> {
        self.devices
            .iter()
            .find(|d| d.id.vendor == vendor && d.id.device == device)
            .cloned()
    }

    fn config_read(&self, addr: PciAddress, offset: u8) -> u32 {
        self.access.read(addr, offset)
    }

    fn config_write(&self, addr: PciAddress, offset: u8, value: u32) {
        self.access.write(addr, offset, value);
    }

    fn enable_bus_master(&self, addr: PciAddress) {
        let cmd = self.access.read(addr, REG_COMMAND);
        self.access.write(addr, REG_COMMAND, cmd | COMMAND_BUS_MASTER);
    }

    fn enable_memory_space(&self, addr: PciAddress) {
        let cmd = self.access.read(addr, REG_COMMAND);
        self.access.write(addr, REG_COMMAND, cmd | COMMAND_MEMORY_SPACE);
    }

    fn enable_io_space(&self, addr: PciAddress) {
        let cmd = self.access.read(addr, REG_COMMAND);
        self.access.write(addr, REG_COMMAND, cmd | COMMAND_IO_SPACE);
    }
}

/// Find an AHCI controller on the PCI bus
pub fn find_ahci(pci: &dyn PciBus) -> Option<PciDeviceInfo> {
    let devices = pci.find_by_class(pci_class::MASS_STORAGE, pci_class::SATA);
    devices
        .into_iter()
        .find(|d| d.id.prog_if == pci_class::AHCI)
}
