//! DMA structure pools
//!
//! The AHCI per-port structures are small and fixed-size: a 1 KiB command
//! list (32 headers) and a 256-byte received-FIS area. Burning a whole
//! page on each would waste most of the DMA region, so pools pack several
//! per page and pull a fresh page when one fills up. Callers get typed
//! regions back and never compute byte offsets themselves.

use halcyon_driver_traits::{DmaAllocator, DmaPage, DriverResult, DMA_PAGE_SIZE};

/// Command list size: 32 headers of 32 bytes
pub const COMMAND_LIST_SIZE: usize = 1024;
/// Command lists that fit one DMA page
pub const COMMAND_LISTS_PER_PAGE: usize = DMA_PAGE_SIZE / COMMAND_LIST_SIZE;

/// Received-FIS area size
pub const RECEIVED_FIS_SIZE: usize = 256;
/// Received-FIS areas that fit one DMA page
pub const RECEIVED_FIS_PER_PAGE: usize = DMA_PAGE_SIZE / RECEIVED_FIS_SIZE;

/// A carved-out piece of a DMA page.
///
/// Zero-filled when handed out (the backing page arrives zeroed and slots
/// are never reissued).
#[derive(Debug, Clone, Copy)]
pub struct Region {
    pub phys: u64,
    pub ptr: *mut u8,
    pub len: usize,
}

impl Region {
    /// A whole page as one region.
    pub fn from_page(page: DmaPage) -> Self {
        Region {
            phys: page.phys,
            ptr: page.ptr,
            len: DMA_PAGE_SIZE,
        }
    }
}

/// Packs fixed-size structures into DMA pages.
pub struct StructurePool {
    stride: usize,
    per_page: usize,
    page: DmaPage,
    used: usize,
}

impl StructurePool {
    fn new(stride: usize, per_page: usize, dma: &mut dyn DmaAllocator) -> DriverResult<Self> {
        Ok(StructurePool {
            stride,
            per_page,
            page: dma.alloc_page()?,
            used: 0,
        })
    }

    /// Pool of per-port command lists.
    pub fn for_command_lists(dma: &mut dyn DmaAllocator) -> DriverResult<Self> {
        Self::new(COMMAND_LIST_SIZE, COMMAND_LISTS_PER_PAGE, dma)
    }

    /// Pool of per-port received-FIS areas.
    pub fn for_received_fis(dma: &mut dyn DmaAllocator) -> DriverResult<Self> {
        Self::new(RECEIVED_FIS_SIZE, RECEIVED_FIS_PER_PAGE, dma)
    }

    /// Hand out the next slot, pulling a fresh page when this one is full.
    pub fn alloc(&mut self, dma: &mut dyn DmaAllocator) -> DriverResult<Region> {
        if self.used == self.per_page {
            self.page = dma.alloc_page()?;
            self.used = 0;
        }

        let offset = self.used * self.stride;
        self.used += 1;

        Ok(Region {
            phys: self.page.phys + offset as u64,
            ptr: self.page.ptr.wrapping_add(offset),
            len: self.stride,
        })
    }
}
