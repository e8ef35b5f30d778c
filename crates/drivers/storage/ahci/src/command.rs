//! Command slot programming
//!
//! Filling in one command slot means three writes into DMA memory: the
//! header in the port's command list, the PRDT in the command table, and
//! the host-to-device FIS in the table's FIS area. The caller stops the
//! port before rewriting any of this so the controller never reads a
//! half-programmed slot, then dispatches through the Commands-Issued
//! register (see `controller`).

use core::mem::{offset_of, size_of};
use core::ptr::{write_bytes, write_volatile};

use crate::fis::{CommandHeader, CommandTable, FisRegH2D, PrdtEntry, PRDT_CAPACITY};
use crate::pool::Region;
use crate::port::Port;

/// Interval between completion polls
pub(crate) const COMMAND_POLL_MS: u64 = 1;

/// Completion poll budget. The original bring-up code waited forever here;
/// a dead device would hang the caller, so the wait is bounded and a
/// timeout is reported distinct from a device error.
pub(crate) const COMMAND_ATTEMPTS: u32 = 5000;

/// Program `slot` on `port`: header, PRDT, and FIS.
///
/// `table` must be a dedicated command-table region; `entries` describe
/// the whole transfer and must match what the FIS asks the device to
/// move. The port must be stopped.
pub(crate) fn program_slot(
    port: &Port,
    slot: usize,
    table: &Region,
    entries: &[PrdtEntry],
    fis: &FisRegH2D,
    flags: u16,
) {
    debug_assert!(entries.len() <= PRDT_CAPACITY);

    let header = CommandHeader::new(table.phys, entries.len() as u16, flags);

    unsafe {
        write_volatile(port.header_ptr(slot), header);

        write_bytes(table.ptr, 0, size_of::<CommandTable>());
        write_volatile(table.ptr as *mut FisRegH2D, *fis);

        let prdt = table.ptr.add(offset_of!(CommandTable, prdt)) as *mut PrdtEntry;
        for (i, entry) in entries.iter().enumerate() {
            write_volatile(prdt.add(i), *entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ata::ATA_CMD_IDENTIFY;
    use crate::fis::{header_flags, H2D_FIS_DWORDS};
    use crate::mock::FakeDma;
    use crate::pool::StructurePool;
    use crate::port::Port;
    use core::ptr::read;
    use halcyon_driver_traits::DmaAllocator;

    #[test]
    fn test_program_slot_writes_all_three_structures() {
        let mut dma = FakeDma::new();
        let mut lists = StructurePool::for_command_lists(&mut dma).unwrap();
        let mut fises = StructurePool::for_received_fis(&mut dma).unwrap();
        let port = Port::new(0, lists.alloc(&mut dma).unwrap(), fises.alloc(&mut dma).unwrap());

        let table = Region::from_page(dma.alloc_page().unwrap());
        let data_phys = 0x7F_0000u64;
        let fis = FisRegH2D::command(ATA_CMD_IDENTIFY, 0x40, 0, 1);

        program_slot(
            &port,
            1,
            &table,
            &[PrdtEntry::new(data_phys, 4096)],
            &fis,
            header_flags(H2D_FIS_DWORDS, false, false, false),
        );

        let header = unsafe { read(port.header_ptr(1)) };
        assert_eq!(header.table_phys(), table.phys);
        assert_eq!(header.prdt_len(), 1);
        assert_eq!(header.flags(), 0x0004);

        let written_fis = unsafe { read(table.ptr as *const FisRegH2D) };
        assert!(written_fis.is_command());
        assert_eq!(written_fis.command_byte(), ATA_CMD_IDENTIFY);

        let entry = unsafe {
            read(table.ptr.add(offset_of!(CommandTable, prdt)) as *const PrdtEntry)
        };
        assert_eq!(entry.data_phys(), data_phys);
        assert_eq!(entry.byte_count(), 4096);
    }

    #[test]
    fn test_slots_do_not_overlap() {
        let mut dma = FakeDma::new();
        let mut lists = StructurePool::for_command_lists(&mut dma).unwrap();
        let mut fises = StructurePool::for_received_fis(&mut dma).unwrap();
        let port = Port::new(0, lists.alloc(&mut dma).unwrap(), fises.alloc(&mut dma).unwrap());

        let t0 = Region::from_page(dma.alloc_page().unwrap());
        let t1 = Region::from_page(dma.alloc_page().unwrap());
        let flags = header_flags(H2D_FIS_DWORDS, false, false, false);

        program_slot(&port, 0, &t0, &[PrdtEntry::new(0x1000, 512)], &FisRegH2D::control(0), flags);
        program_slot(&port, 1, &t1, &[PrdtEntry::new(0x2000, 512)], &FisRegH2D::control(0), flags);

        let h0 = unsafe { read(port.header_ptr(0)) };
        let h1 = unsafe { read(port.header_ptr(1)) };
        assert_eq!(h0.table_phys(), t0.phys);
        assert_eq!(h1.table_phys(), t1.phys);
        assert_eq!(
            port.header_ptr(1) as usize - port.header_ptr(0) as usize,
            size_of::<CommandHeader>()
        );
    }
}
