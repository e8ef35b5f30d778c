//! Heap Allocator
//!
//! Provides the kernel heap for Halcyon using linked_list_allocator. The
//! heap must be initialized early in kernel startup, before anything
//! allocates (the PCI device list is the first customer on the storage
//! path).
//!
//! Note: The `global-allocator` feature must be enabled to use this
//! crate's allocator as the global allocator. Otherwise, the main kernel
//! provides one.

use linked_list_allocator::LockedHeap;

use crate::layout::{PHYS_KERNEL_HEAP, PHYS_KERNEL_HEAP_SIZE};

/// Heap allocator instance
///
/// Must be initialized with `init()` before any heap allocations.
#[cfg_attr(feature = "global-allocator", global_allocator)]
pub static ALLOCATOR: LockedHeap = LockedHeap::empty();

/// Initialize the heap allocator
///
/// # Safety
///
/// Must be called exactly once, before any heap allocations. The region
/// `[heap_start, heap_start + heap_size)` must be valid, mapped memory
/// that nothing else uses.
pub unsafe fn init(heap_start: usize, heap_size: usize) {
    ALLOCATOR.lock().init(heap_start as *mut u8, heap_size);
}

/// Initialize the heap over the layout's kernel heap region.
///
/// # Safety
///
/// Same requirements as [`init`].
pub unsafe fn init_default() {
    init(PHYS_KERNEL_HEAP as usize, PHYS_KERNEL_HEAP_SIZE as usize);
}

/// Get current heap usage statistics
pub fn stats() -> HeapStats {
    let allocator = ALLOCATOR.lock();
    HeapStats {
        used: allocator.used(),
        free: allocator.free(),
        total: allocator.size(),
    }
}

/// Heap usage statistics
#[derive(Debug, Clone, Copy)]
pub struct HeapStats {
    /// Bytes currently allocated
    pub used: usize,
    /// Bytes available for allocation
    pub free: usize,
    /// Total heap size
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use core::alloc::Layout;

    use linked_list_allocator::Heap;

    #[test]
    fn test_heap_alloc_and_free() {
        static mut ARENA: [u8; 16 * 1024] = [0; 16 * 1024];

        let mut heap = Heap::empty();
        unsafe {
            let arena = core::ptr::addr_of_mut!(ARENA);
            heap.init(arena as *mut u8, 16 * 1024);
        }

        let layout = Layout::from_size_align(256, 8).unwrap();
        let a = heap.allocate_first_fit(layout).unwrap();
        let b = heap.allocate_first_fit(layout).unwrap();
        assert_ne!(a, b);
        assert!(heap.used() >= 512);

        unsafe {
            heap.deallocate(a, layout);
            heap.deallocate(b, layout);
        }
        assert_eq!(heap.used(), 0);
    }
}
