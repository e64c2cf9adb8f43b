/// Kernel memory — HHDM bookkeeping and the heap.
mod heap;

pub use heap::init_heap;

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

/// Higher-Half Direct Map offset, set once at boot from Limine's HHDM
/// response. All physical memory is linearly mapped at (phys + HHDM_OFFSET).
static HHDM_OFFSET: AtomicU64 = AtomicU64::new(0);

/// Set the HHDM offset. Must be called once during early boot before any
/// PhysAddr::as_ptr() calls.
pub fn set_hhdm_offset(offset: u64) {
    HHDM_OFFSET.store(offset, Ordering::Relaxed);
}

/// A physical address. Transparent wrapper for clarity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct PhysAddr(pub u64);

impl PhysAddr {
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Convert to a virtual pointer via the HHDM: virt = phys + hhdm_offset.
    pub fn as_ptr<T>(self) -> *mut T {
        let offset = HHDM_OFFSET.load(Ordering::Relaxed);
        (self.0 + offset) as *mut T
    }
}

impl fmt::Debug for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysAddr({:#x})", self.0)
    }
}
