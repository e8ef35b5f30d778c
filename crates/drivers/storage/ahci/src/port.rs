//! Port state machine and prober
//!
//! A port moves between stopped and running through the Start/FRE bits in
//! its command register; COMRESET goes through the SATA control
//! device-detection field. The budgets here are the AHCI-mandated ones: a
//! stop that does not quiesce in ~500 ms is logged and tolerated, a reset
//! that does not re-establish the link in ~1 s fails that port.

use core::mem::size_of;
use core::ptr::write_bytes;

use halcyon_driver_traits::{debug_storage, Clock};

use crate::fis::CommandHeader;
use crate::poll::poll_until;
use crate::pool::Region;
use crate::regs::*;
use crate::{AhciError, AhciResult};

const STOP_ATTEMPTS: u32 = 500;
const START_ATTEMPTS: u32 = 1000;
const RESET_HOLD_MS: u64 = 10;
const DETECT_ATTEMPTS: u32 = 1000;
const READY_ATTEMPTS: u32 = 1000;
const POLL_MS: u64 = 1;

/// What the signature and link state say is attached to a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceKind {
    #[default]
    Unknown,
    Sata,
    Atapi,
}

/// Classify a port from its SATA status and signature registers.
///
/// Pure: identical register snapshots always classify identically. A port
/// without an established, active link is `Unknown` regardless of the
/// stale signature it may report.
pub fn classify(ssts: u32, sig: u32) -> DeviceKind {
    if ssts_det(ssts) != SSTS_DET_PRESENT {
        return DeviceKind::Unknown;
    }
    if ssts_ipm(ssts) != SSTS_IPM_ACTIVE {
        return DeviceKind::Unknown;
    }
    match sig {
        SIG_ATA => DeviceKind::Sata,
        SIG_ATAPI => DeviceKind::Atapi,
        _ => DeviceKind::Unknown,
    }
}

/// One implemented HBA port and the DMA structures it owns.
pub struct Port {
    pub index: u32,
    pub kind: DeviceKind,
    cmd_list: Region,
    received_fis: Region,
}

impl Port {
    /// `cmd_list` must be a 1 KiB command-list region, `received_fis` a
    /// 256-byte received-FIS region, both from the DMA pools.
    pub fn new(index: u32, cmd_list: Region, received_fis: Region) -> Self {
        Port {
            index,
            kind: DeviceKind::Unknown,
            cmd_list,
            received_fis,
        }
    }

    fn reg(&self, reg: u32) -> u32 {
        port_reg(self.index, reg)
    }

    pub(crate) fn header_ptr(&self, slot: usize) -> *mut CommandHeader {
        self.cmd_list.ptr.wrapping_add(slot * size_of::<CommandHeader>()) as *mut CommandHeader
    }

    /// Stop the command engine: clear Start, wait for both running bits to
    /// drop, then disable FIS receive.
    ///
    /// A quiesce timeout is logged but not fatal; bring-up continues
    /// against possibly-unresponsive hardware, as the handoff procedure
    /// requires.
    pub fn stop<M: HbaMmio, C: Clock>(&self, hba: &M, clock: &C) {
        let cmd_reg = self.reg(PORT_CMD);

        let cmd = hba.read32(cmd_reg);
        hba.write32(cmd_reg, cmd & !CMD_ST);

        let quiesced = poll_until(clock, POLL_MS, STOP_ATTEMPTS, || {
            hba.read32(cmd_reg) & (CMD_FR | CMD_CR) == 0
        });
        if !quiesced {
            debug_storage!("ahci: timeout waiting for port {} to stop", self.index);
        }

        let cmd = hba.read32(cmd_reg);
        hba.write32(cmd_reg, cmd & !CMD_FRE);
    }

    /// Start the command engine: wait for the command list to go idle,
    /// then set FIS receive enable and Start together.
    ///
    /// This path assumes a prior [`Port::stop`] guaranteed quiescence; the
    /// wait is a defensive bound, not part of the protocol.
    pub fn start<M: HbaMmio, C: Clock>(&self, hba: &M, clock: &C) {
        let cmd_reg = self.reg(PORT_CMD);

        let idle = poll_until(clock, POLL_MS, START_ATTEMPTS, || {
            hba.read32(cmd_reg) & CMD_CR == 0
        });
        if !idle {
            debug_storage!("ahci: port {} command list still running", self.index);
        }

        let cmd = hba.read32(cmd_reg);
        hba.write32(cmd_reg, cmd | CMD_FRE | CMD_ST);
    }

    /// COMRESET the port interface (AHCI 10.4.2) and wait for a device.
    ///
    /// The port is started only after device detection reports an
    /// established link; on a detection timeout the Start bit stays clear
    /// and the port is left stopped.
    pub fn reset<M: HbaMmio, C: Clock>(&self, hba: &M, clock: &C) -> AhciResult<()> {
        self.stop(hba, clock);

        debug_storage!("ahci: resetting port {}", self.index);
        let sctl_reg = self.reg(PORT_SCTL);
        let sctl = hba.read32(sctl_reg);
        hba.write32(sctl_reg, (sctl & !SCTL_DET_MASK) | SCTL_DET_INIT);
        clock.sleep_ms(RESET_HOLD_MS);
        hba.write32(sctl_reg, sctl & !SCTL_DET_MASK);

        let ssts_reg = self.reg(PORT_SSTS);
        let detected = poll_until(clock, POLL_MS, DETECT_ATTEMPTS, || {
            ssts_det(hba.read32(ssts_reg)) == SSTS_DET_PRESENT
        });
        if !detected {
            debug_storage!("ahci: timeout waiting for port {} to reset", self.index);
            return Err(AhciError::PortResetTimeout);
        }

        self.start(hba, clock);
        hba.write32(self.reg(PORT_SERR), u32::MAX);

        let tfd_reg = self.reg(PORT_TFD);
        let ready = poll_until(clock, POLL_MS, READY_ATTEMPTS, || {
            hba.read32(tfd_reg) & (TFD_STS_BSY | TFD_STS_DRQ | TFD_STS_ERR) == 0
        });
        if !ready {
            debug_storage!("ahci: timeout waiting for device on port {}", self.index);
            return Err(AhciError::PortNotReady);
        }

        Ok(())
    }

    /// Point the hardware at this port's command list and received-FIS
    /// buffers. Stops the port first and zeroes both buffers; must run
    /// before the port is ever started.
    pub fn init_memory<M: HbaMmio, C: Clock>(&self, hba: &M, clock: &C) {
        self.stop(hba, clock);

        unsafe {
            write_bytes(self.cmd_list.ptr, 0, self.cmd_list.len);
        }
        hba.write32(self.reg(PORT_CLB), self.cmd_list.phys as u32);
        hba.write32(self.reg(PORT_CLBU), (self.cmd_list.phys >> 32) as u32);

        unsafe {
            write_bytes(self.received_fis.ptr, 0, self.received_fis.len);
        }
        hba.write32(self.reg(PORT_FB), self.received_fis.phys as u32);
        hba.write32(self.reg(PORT_FBU), (self.received_fis.phys >> 32) as u32);
    }

    /// Read the link state and signature and classify the attached device.
    /// Non-mutating on the hardware side; safe to call repeatedly.
    pub fn probe<M: HbaMmio>(&mut self, hba: &M) -> DeviceKind {
        let ssts = hba.read32(self.reg(PORT_SSTS));
        let sig = hba.read32(self.reg(PORT_SIG));
        self.kind = classify(ssts, sig);
        self.kind
    }
}
