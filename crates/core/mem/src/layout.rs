//! Physical memory layout
//!
//! Single source of truth for the physical addresses the storage bring-up
//! path relies on. No magic numbers at call sites: if a region moves, it
//! moves here.
//!
//! Everything below `PHYS_IDENTITY_MAP_END` is identity-mapped by the boot
//! page tables, so physical addresses in that range double as pointers.

/// Page size (4 KiB)
pub const PAGE_SIZE: usize = 0x1000;
pub const PAGE_SIZE_U64: u64 = PAGE_SIZE as u64;

/// Kernel heap region (3 MB mark, 4 MiB)
pub const PHYS_KERNEL_HEAP: u64 = 0x30_0000;
pub const PHYS_KERNEL_HEAP_SIZE: u64 = 0x40_0000;

/// DMA region for device descriptor structures and bounce buffers
/// (7 MB mark, 1 MiB = 256 pages)
pub const PHYS_DMA_BASE: u64 = 0x70_0000;
pub const PHYS_DMA_SIZE: u64 = 0x10_0000;

/// Number of pages in the DMA region
pub const DMA_PAGES: usize = (PHYS_DMA_SIZE / PAGE_SIZE_U64) as usize;

/// End of the boot identity mapping (8 MiB)
pub const PHYS_IDENTITY_MAP_END: u64 = 0x80_0000;
