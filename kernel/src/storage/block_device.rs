/// BlockDevice trait — abstracts block I/O behind the device registry.
///
/// Real drivers and the RAM-backed boot disk implement this trait; the
/// filesystem layer only ever sees it. Buffers are whole blocks: a buffer
/// length that is not a multiple of the block size is an error, not a
/// partial transfer.
use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// LBA range extends past the end of the device.
    OutOfRange,
    /// Buffer length is not a multiple of the block size.
    Misaligned,
    /// No device registered under the requested name and unit.
    NoSuchDevice,
    /// Device-level I/O failure.
    Io,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::OutOfRange => write!(f, "block range out of bounds"),
            StorageError::Misaligned => write!(f, "buffer not block-aligned"),
            StorageError::NoSuchDevice => write!(f, "no such device"),
            StorageError::Io => write!(f, "device I/O error"),
        }
    }
}

/// Abstract block device.
pub trait BlockDevice: Send {
    /// Read whole blocks starting at `lba` into `buf`.
    fn read_blocks(&mut self, lba: u64, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Write whole blocks starting at `lba` from `buf`.
    fn write_blocks(&mut self, lba: u64, buf: &[u8]) -> Result<(), StorageError>;

    /// Flush all writes to stable storage.
    fn flush(&mut self) -> Result<(), StorageError>;

    /// Block size in bytes.
    fn block_size(&self) -> u32;

    /// Total number of blocks on the device.
    fn total_blocks(&self) -> u64;
}
