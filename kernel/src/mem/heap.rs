/// Kernel heap backing Rust's `alloc` crate.
///
/// A linked-list allocator over a single contiguous region carved out of
/// the largest usable entry in the boot memory map, accessed through the
/// HHDM. Enough for the shell's line/argument buffers, the device and
/// filesystem tables, and directory listings.
use linked_list_allocator::LockedHeap;

use super::PhysAddr;

#[global_allocator]
static HEAP: LockedHeap = LockedHeap::empty();

/// Cap the heap so a huge memory map entry does not get swallowed whole.
const MAX_HEAP_BYTES: usize = 16 * 1024 * 1024;

/// Initialize the kernel heap from a usable physical region.
///
/// # Safety
/// The region must be usable RAM, HHDM-mapped, and not touched by anything
/// else afterwards. Must be called exactly once, before any allocation.
pub unsafe fn init_heap(base: PhysAddr, len: usize) {
    let size = len.min(MAX_HEAP_BYTES);
    HEAP.lock().init(base.as_ptr::<u8>(), size);
}
