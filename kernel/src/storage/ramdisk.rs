/// RAM-backed block device.
///
/// Two jobs: the boot disk (a Limine module copied into memory and
/// registered as `ata` unit 0) and the test double for everything above
/// the block layer.
use alloc::vec;
use alloc::vec::Vec;

use super::block_device::{BlockDevice, StorageError};

pub struct RamDisk {
    data: Vec<u8>,
    block_size: u32,
    total_blocks: u64,
    flush_count: u64,
}

impl RamDisk {
    /// Create a zeroed RAM disk with the given geometry.
    pub fn new(total_blocks: u64, block_size: u32) -> Self {
        let total_bytes = total_blocks as usize * block_size as usize;
        Self {
            data: vec![0u8; total_bytes],
            block_size,
            total_blocks,
            flush_count: 0,
        }
    }

    /// Create a RAM disk holding a copy of `image`, padded up to a whole
    /// number of blocks.
    pub fn from_image(image: &[u8], block_size: u32) -> Self {
        let bs = block_size as usize;
        let total_blocks = ((image.len() + bs - 1) / bs).max(1) as u64;
        let mut disk = Self::new(total_blocks, block_size);
        disk.data[..image.len()].copy_from_slice(image);
        disk
    }

    /// How many times flush() was called (for testing).
    pub fn flush_count(&self) -> u64 {
        self.flush_count
    }

    /// Read raw bytes at an offset (for test verification).
    pub fn read_raw(&self, offset: usize, len: usize) -> &[u8] {
        &self.data[offset..offset + len]
    }

    fn span(&self, lba: u64, len: usize) -> Result<(usize, usize), StorageError> {
        let bs = self.block_size as usize;
        if len == 0 || len % bs != 0 {
            return Err(StorageError::Misaligned);
        }
        let start = lba as usize * bs;
        if start + len > self.data.len() {
            return Err(StorageError::OutOfRange);
        }
        Ok((start, len))
    }
}

impl BlockDevice for RamDisk {
    fn read_blocks(&mut self, lba: u64, buf: &mut [u8]) -> Result<(), StorageError> {
        let (start, len) = self.span(lba, buf.len())?;
        buf.copy_from_slice(&self.data[start..start + len]);
        Ok(())
    }

    fn write_blocks(&mut self, lba: u64, buf: &[u8]) -> Result<(), StorageError> {
        let (start, len) = self.span(lba, buf.len())?;
        self.data[start..start + len].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        self.flush_count += 1;
        Ok(())
    }

    fn block_size(&self) -> u32 {
        self.block_size
    }

    fn total_blocks(&self) -> u64 {
        self.total_blocks
    }
}
