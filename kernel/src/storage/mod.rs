mod block_device;
mod ramdisk;
mod registry;

pub use block_device::{BlockDevice, StorageError};
pub use ramdisk::RamDisk;
pub use registry::{DeviceHandle, DeviceRegistry};

#[cfg(test)]
mod tests;
