/// Device registry — opens block devices by name and unit.
///
/// Devices register once at boot. `open` hands out a `DeviceHandle`; the
/// handle is the device descriptor of a mount attempt and releases on drop
/// (flushes the device, decrements the open count), so every exit path of
/// an attempt releases it without explicit close calls.
use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};
use spin::Mutex;

use super::block_device::{BlockDevice, StorageError};

type SharedDevice = Arc<Mutex<Box<dyn BlockDevice>>>;

struct DeviceSlot {
    name: &'static str,
    unit: u32,
    dev: SharedDevice,
    opens: Arc<AtomicU32>,
}

pub struct DeviceRegistry {
    slots: Mutex<Vec<DeviceSlot>>,
}

impl DeviceRegistry {
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
        }
    }

    /// Register a device under a class name and unit number. A second
    /// registration for the same (name, unit) replaces the first.
    pub fn register(&self, name: &'static str, unit: u32, dev: Box<dyn BlockDevice>) {
        let mut slots = self.slots.lock();
        slots.retain(|s| !(s.name == name && s.unit == unit));
        slots.push(DeviceSlot {
            name,
            unit,
            dev: Arc::new(Mutex::new(dev)),
            opens: Arc::new(AtomicU32::new(0)),
        });
    }

    /// Open a device by name and unit.
    pub fn open(&self, name: &str, unit: u32) -> Result<DeviceHandle, StorageError> {
        let slots = self.slots.lock();
        let slot = slots
            .iter()
            .find(|s| s.name == name && s.unit == unit)
            .ok_or(StorageError::NoSuchDevice)?;
        slot.opens.fetch_add(1, Ordering::AcqRel);
        Ok(DeviceHandle {
            name: slot.name,
            unit: slot.unit,
            dev: slot.dev.clone(),
            opens: slot.opens.clone(),
        })
    }

    /// How many handles to (name, unit) are currently open.
    pub fn open_count(&self, name: &str, unit: u32) -> u32 {
        self.slots
            .lock()
            .iter()
            .find(|s| s.name == name && s.unit == unit)
            .map(|s| s.opens.load(Ordering::Acquire))
            .unwrap_or(0)
    }
}

/// An open block device. Dropping the handle releases the device.
pub struct DeviceHandle {
    name: &'static str,
    unit: u32,
    dev: SharedDevice,
    opens: Arc<AtomicU32>,
}

impl DeviceHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn unit(&self) -> u32 {
        self.unit
    }

    /// Run a closure against the underlying device.
    pub fn with<R>(&self, f: impl FnOnce(&mut dyn BlockDevice) -> R) -> R {
        let mut guard = self.dev.lock();
        f(guard.as_mut())
    }

    pub fn read_blocks(&self, lba: u64, buf: &mut [u8]) -> Result<(), StorageError> {
        self.with(|d| d.read_blocks(lba, buf))
    }

    pub fn write_blocks(&self, lba: u64, buf: &[u8]) -> Result<(), StorageError> {
        self.with(|d| d.write_blocks(lba, buf))
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.with(|d| d.flush())
    }

    pub fn block_size(&self) -> u32 {
        self.with(|d| d.block_size())
    }

    pub fn total_blocks(&self) -> u64 {
        self.with(|d| d.total_blocks())
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        let _ = self.dev.lock().flush();
        self.opens.fetch_sub(1, Ordering::AcqRel);
    }
}
