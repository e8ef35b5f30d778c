//! DMA buffer allocation seam
//!
//! Storage and network controllers read descriptor structures straight out
//! of physical memory, so their buffers must be physically contiguous and
//! addressable both by the CPU and by the device. This trait is the only
//! way drivers obtain such memory; the concrete allocator lives in the
//! memory crate.

use crate::DriverResult;

/// Size of one DMA page handed out by [`DmaAllocator`].
pub const DMA_PAGE_SIZE: usize = 4096;

/// One page of DMA-capable memory.
///
/// `phys` is the address the device sees, `ptr` the address the CPU uses.
/// The page is zero-filled before it is handed out, so stale bytes are
/// never interpreted as live descriptors by the hardware.
#[derive(Debug, Clone, Copy)]
pub struct DmaPage {
    pub phys: u64,
    pub ptr: *mut u8,
}

/// Allocator for zeroed, page-aligned, physically contiguous DMA pages.
pub trait DmaAllocator {
    /// Allocate one zeroed [`DMA_PAGE_SIZE`] page.
    ///
    /// Returns [`crate::DriverError::OutOfMemory`] when the backing region
    /// is exhausted. There is no free path; pages live until shutdown.
    fn alloc_page(&mut self) -> DriverResult<DmaPage>;
}
