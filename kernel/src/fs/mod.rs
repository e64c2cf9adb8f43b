/// Filesystem layer — the trait boundary the shell mounts and walks, plus
/// the driver registry and the simplefs implementation.
///
/// A filesystem driver turns an open block device into a `Volume`; a volume
/// yields its root `DirHandle`; directory handles walk paths, list entries,
/// create subdirectories, and open files. Listing is an ordered, finite
/// sequence of names — call `entries()` again to restart it. Nothing here
/// touches hardware directly, so the whole layer runs in host-target tests
/// over a RamDisk.
mod simplefs;

pub use simplefs::{SimpleFsDriver, SimpleFsVolume, SIMPLEFS};


use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use spin::Mutex;

use crate::storage::{DeviceHandle, StorageError};

bitflags::bitflags! {
    /// File open flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const CREATE = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// Path does not exist.
    NotFound,
    /// Path exists but is not a directory.
    NotADirectory,
    /// Path exists but is a directory.
    IsADirectory,
    /// Name already taken in this directory.
    Exists,
    /// Write requested on a read-only volume or handle.
    ReadOnly,
    /// Empty name, embedded separator, or name too long.
    InvalidName,
    /// No free entry or data block left on the volume.
    NoSpace,
    /// The device does not hold a volume this driver recognizes.
    BadVolume,
    /// Block-layer failure underneath the filesystem.
    Io(StorageError),
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::NotFound => write!(f, "not found"),
            FsError::NotADirectory => write!(f, "not a directory"),
            FsError::IsADirectory => write!(f, "is a directory"),
            FsError::Exists => write!(f, "already exists"),
            FsError::ReadOnly => write!(f, "read-only filesystem"),
            FsError::InvalidName => write!(f, "invalid name"),
            FsError::NoSpace => write!(f, "no space left on volume"),
            FsError::BadVolume => write!(f, "unrecognized volume"),
            FsError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl From<StorageError> for FsError {
    fn from(e: StorageError) -> Self {
        FsError::Io(e)
    }
}

/// An open file.
pub trait FileHandle {
    /// File length in bytes.
    fn size(&self) -> u64;

    /// Read from the current position. Returns the number of bytes read;
    /// 0 means end of file.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError>;
}

/// An open directory.
pub trait DirHandle {
    /// The directory's entry names, in listing order. Directories carry a
    /// trailing '/'. Calling again restarts the listing.
    fn entries(&mut self) -> Result<Vec<String>, FsError>;

    /// Resolve `path` relative to this directory (leading '/' rebases at
    /// the volume root) and open it as a directory.
    fn open_dir(&mut self, path: &str) -> Result<Box<dyn DirHandle>, FsError>;

    /// Resolve `path` and open it as a file.
    fn open_file(&mut self, path: &str, flags: OpenFlags) -> Result<Box<dyn FileHandle>, FsError>;

    /// Create a subdirectory of this directory.
    fn mkdir(&mut self, name: &str) -> Result<Box<dyn DirHandle>, FsError>;
}

/// An open volume.
pub trait Volume {
    /// The volume's root directory.
    fn root(&mut self) -> Result<Box<dyn DirHandle>, FsError>;
}

/// A filesystem driver, looked up by type name at mount time.
pub trait FsDriver: Sync {
    /// Type name used by `mount <device> <unit> <fstype>`.
    fn name(&self) -> &'static str;

    /// Open a volume on the device. Consumes the handle; on failure the
    /// handle is dropped, which releases the device.
    fn open_volume(&self, dev: DeviceHandle) -> Result<Box<dyn Volume>, FsError>;
}

/// Driver registry — filesystem type name to driver.
pub struct FsRegistry {
    drivers: Mutex<Vec<&'static dyn FsDriver>>,
}

impl FsRegistry {
    pub const fn new() -> Self {
        Self {
            drivers: Mutex::new(Vec::new()),
        }
    }

    /// Register a driver. A second registration under the same name
    /// replaces the first.
    pub fn register(&self, driver: &'static dyn FsDriver) {
        let mut drivers = self.drivers.lock();
        drivers.retain(|d| d.name() != driver.name());
        drivers.push(driver);
    }

    /// Look up a driver by filesystem type name.
    pub fn lookup(&self, name: &str) -> Option<&'static dyn FsDriver> {
        self.drivers.lock().iter().find(|d| d.name() == name).copied()
    }
}
