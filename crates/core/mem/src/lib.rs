//! Halcyon Memory Services
//!
//! - `layout` - single source of truth for physical memory addresses
//! - `dma` - DMA page allocator over the reserved DMA region
//! - `mmio` - mapping of device register windows
//! - `heap` - kernel heap allocation
//!
//! Full page-table management (per-process address spaces, user mappings)
//! is a collaborator outside this crate; drivers only ever ask for "one
//! zeroed DMA page" and "map this register window", which is exactly what
//! is provided here.

#![no_std]

pub mod dma;
pub mod heap;
pub mod layout;
pub mod mmio;

pub use dma::SystemDma;
pub use heap::{init as init_heap, ALLOCATOR};
pub use layout::PAGE_SIZE;
pub use mmio::map_mmio;
