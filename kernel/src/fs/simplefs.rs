/// simplefs — the native EmberOS volume format.
///
/// On-disk layout:
///   LBA 0:                superblock (magic, version, geometry, watermark)
///   LBA 1..table blocks:  entry table (fixed-size entries, hierarchical)
///   data_start_lba..:     data blocks
///
/// Each entry names a file or directory and links to its parent entry, so
/// the hierarchy lives entirely in the table; file data occupies a single
/// contiguous extent. Data blocks are bump-allocated from a watermark and
/// never reclaimed — nothing on the shell surface deletes files.
///
/// The table and superblock are cached in RAM and written back after every
/// mutation.
use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::mem::size_of;
use spin::Mutex;

use crate::storage::DeviceHandle;
use super::{DirHandle, FileHandle, FsDriver, FsError, OpenFlags, Volume};

/// Superblock magic: "EMBERFS\x01" in little-endian.
const SUPERBLOCK_MAGIC: u64 = 0x0153_4652_4542_4D45;

/// Superblock version.
const SUPERBLOCK_VERSION: u32 = 1;

/// Maximum name length (including the terminating NUL on disk).
const MAX_NAME_LEN: usize = 64;

/// Maximum entries in the table. 128 entries x 96 bytes = 12 KiB.
const MAX_ENTRIES: usize = 128;

/// Entry index of the root directory.
const ROOT_INDEX: u32 = 0;

/// On-disk superblock at LBA 0.
#[repr(C)]
#[derive(Clone, Copy)]
struct Superblock {
    magic: u64,
    version: u32,
    block_size: u32,
    total_blocks: u64,
    table_start_lba: u64,
    table_block_count: u64,
    data_start_lba: u64,
    /// Bump watermark for data allocation, relative to data_start_lba.
    next_free_block: u64,
}

// The superblock must fit the smallest supported block size.
static_assertions::const_assert!(size_of::<Superblock>() <= 512);

impl Superblock {
    fn is_valid(&self) -> bool {
        self.magic == SUPERBLOCK_MAGIC && self.version == SUPERBLOCK_VERSION
    }
}

/// A single on-disk entry — 96 bytes.
#[repr(C)]
#[derive(Clone, Copy)]
struct RawEntry {
    /// Name, null-terminated. Never contains '/'.
    name: [u8; MAX_NAME_LEN],
    /// Entry index of the parent directory; the root is its own parent.
    parent: u32,
    /// Bit 0 = in_use, bit 1 = directory.
    flags: u32,
    /// First data block, relative to data_start_lba (files only).
    start_block: u64,
    /// Blocks in the extent.
    block_count: u64,
    /// Byte length (may be less than block_count * block_size).
    byte_length: u64,
}

static_assertions::const_assert_eq!(size_of::<RawEntry>(), 96);

const FLAG_IN_USE: u32 = 1 << 0;
const FLAG_DIR: u32 = 1 << 1;

impl RawEntry {
    const fn empty() -> Self {
        Self {
            name: [0u8; MAX_NAME_LEN],
            parent: 0,
            flags: 0,
            start_block: 0,
            block_count: 0,
            byte_length: 0,
        }
    }

    fn is_in_use(&self) -> bool {
        self.flags & FLAG_IN_USE != 0
    }

    fn is_dir(&self) -> bool {
        self.flags & FLAG_DIR != 0
    }

    fn name_bytes(&self) -> &[u8] {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(MAX_NAME_LEN);
        &self.name[..len]
    }

    fn set_name(&mut self, name: &str) {
        let bytes = name.as_bytes();
        let copy_len = bytes.len().min(MAX_NAME_LEN - 1);
        self.name = [0u8; MAX_NAME_LEN];
        self.name[..copy_len].copy_from_slice(&bytes[..copy_len]);
    }
}

/// In-memory volume state shared by the volume, directory, and file handles.
struct FsInner {
    dev: DeviceHandle,
    sb: Superblock,
    table: Vec<RawEntry>,
}

impl FsInner {
    fn table_bytes(block_size: u32) -> usize {
        let raw = MAX_ENTRIES * size_of::<RawEntry>();
        let bs = block_size as usize;
        (raw + bs - 1) / bs * bs
    }

    /// Read and validate the superblock and entry table.
    fn load(dev: DeviceHandle) -> Result<Self, FsError> {
        let bs = dev.block_size();
        let mut block = vec![0u8; bs as usize];
        dev.read_blocks(0, &mut block)?;

        let sb = unsafe { core::ptr::read_unaligned(block.as_ptr() as *const Superblock) };
        if !sb.is_valid() || sb.block_size != bs || sb.total_blocks > dev.total_blocks() {
            return Err(FsError::BadVolume);
        }

        let mut table_buf = vec![0u8; Self::table_bytes(bs)];
        dev.read_blocks(sb.table_start_lba, &mut table_buf)?;

        let mut table = Vec::with_capacity(MAX_ENTRIES);
        for i in 0..MAX_ENTRIES {
            let offset = i * size_of::<RawEntry>();
            let entry = unsafe {
                core::ptr::read_unaligned(table_buf.as_ptr().add(offset) as *const RawEntry)
            };
            table.push(entry);
        }

        Ok(Self { dev, sb, table })
    }

    /// Write a fresh, empty volume onto the device: superblock, zeroed
    /// table, root directory entry.
    fn format(dev: DeviceHandle) -> Result<Self, FsError> {
        let bs = dev.block_size();
        let table_blocks = (Self::table_bytes(bs) / bs as usize) as u64;

        let sb = Superblock {
            magic: SUPERBLOCK_MAGIC,
            version: SUPERBLOCK_VERSION,
            block_size: bs,
            total_blocks: dev.total_blocks(),
            table_start_lba: 1,
            table_block_count: table_blocks,
            data_start_lba: 1 + table_blocks,
            next_free_block: 0,
        };

        let mut root = RawEntry::empty();
        root.set_name("/");
        root.parent = ROOT_INDEX;
        root.flags = FLAG_IN_USE | FLAG_DIR;

        let mut table = vec![RawEntry::empty(); MAX_ENTRIES];
        table[ROOT_INDEX as usize] = root;

        let mut inner = Self { dev, sb, table };
        inner.flush()?;
        Ok(inner)
    }

    /// Write the superblock and entry table back to the device.
    fn flush(&mut self) -> Result<(), FsError> {
        let bs = self.sb.block_size as usize;

        let mut block = vec![0u8; bs];
        unsafe {
            core::ptr::copy_nonoverlapping(
                &self.sb as *const Superblock as *const u8,
                block.as_mut_ptr(),
                size_of::<Superblock>(),
            );
        }
        self.dev.write_blocks(0, &block)?;

        let mut table_buf = vec![0u8; Self::table_bytes(self.sb.block_size)];
        for (i, entry) in self.table.iter().enumerate() {
            let offset = i * size_of::<RawEntry>();
            unsafe {
                core::ptr::copy_nonoverlapping(
                    entry as *const RawEntry as *const u8,
                    table_buf.as_mut_ptr().add(offset),
                    size_of::<RawEntry>(),
                );
            }
        }
        self.dev.write_blocks(self.sb.table_start_lba, &table_buf)?;
        self.dev.flush()?;
        Ok(())
    }

    fn entry(&self, index: u32) -> Option<&RawEntry> {
        let entry = self.table.get(index as usize)?;
        entry.is_in_use().then_some(entry)
    }

    /// Find an in-use child of `parent` by name.
    fn find_child(&self, parent: u32, name: &str) -> Option<u32> {
        self.table.iter().enumerate().find_map(|(i, e)| {
            (i as u32 != parent
                && e.is_in_use()
                && e.parent == parent
                && e.name_bytes() == name.as_bytes())
            .then_some(i as u32)
        })
    }

    /// Walk `path` starting at `from`. A leading '/' rebases at the root.
    /// Returns the index of the final component.
    fn walk(&self, from: u32, path: &str) -> Result<u32, FsError> {
        let mut cur = if path.starts_with('/') { ROOT_INDEX } else { from };

        for comp in path.split('/').filter(|c| !c.is_empty()) {
            let entry = self.entry(cur).ok_or(FsError::NotFound)?;
            match comp {
                "." => {}
                ".." => cur = entry.parent,
                _ => {
                    if !entry.is_dir() {
                        return Err(FsError::NotADirectory);
                    }
                    cur = self.find_child(cur, comp).ok_or(FsError::NotFound)?;
                }
            }
        }

        self.entry(cur).ok_or(FsError::NotFound)?;
        Ok(cur)
    }

    /// Reserve `count` contiguous data blocks from the watermark.
    fn alloc_blocks(&mut self, count: u64) -> Result<u64, FsError> {
        let start = self.sb.next_free_block;
        let data_blocks = self
            .sb
            .total_blocks
            .saturating_sub(self.sb.data_start_lba);
        if start + count > data_blocks {
            return Err(FsError::NoSpace);
        }
        self.sb.next_free_block += count;
        Ok(start)
    }

    /// Create a fresh entry under `parent`. Validates the name and checks
    /// for duplicates.
    fn create_entry(&mut self, parent: u32, name: &str, dir: bool) -> Result<u32, FsError> {
        if name.is_empty() || name.contains('/') || name.len() >= MAX_NAME_LEN {
            return Err(FsError::InvalidName);
        }
        if self.find_child(parent, name).is_some() {
            return Err(FsError::Exists);
        }

        let slot = self
            .table
            .iter()
            .position(|e| !e.is_in_use())
            .ok_or(FsError::NoSpace)? as u32;

        let entry = &mut self.table[slot as usize];
        *entry = RawEntry::empty();
        entry.set_name(name);
        entry.parent = parent;
        entry.flags = FLAG_IN_USE | if dir { FLAG_DIR } else { 0 };
        Ok(slot)
    }
}

/// The simplefs driver singleton.
pub struct SimpleFsDriver;

pub static SIMPLEFS: SimpleFsDriver = SimpleFsDriver;

impl FsDriver for SimpleFsDriver {
    fn name(&self) -> &'static str {
        "simplefs"
    }

    fn open_volume(&self, dev: DeviceHandle) -> Result<Box<dyn Volume>, FsError> {
        Ok(Box::new(SimpleFsVolume::open(dev)?))
    }
}

/// An open simplefs volume.
pub struct SimpleFsVolume {
    inner: Arc<Mutex<FsInner>>,
}

impl SimpleFsVolume {
    /// Open an existing volume on the device.
    pub fn open(dev: DeviceHandle) -> Result<Self, FsError> {
        Ok(Self {
            inner: Arc::new(Mutex::new(FsInner::load(dev)?)),
        })
    }

    /// Format the device and open the fresh volume.
    pub fn format(dev: DeviceHandle) -> Result<Self, FsError> {
        Ok(Self {
            inner: Arc::new(Mutex::new(FsInner::format(dev)?)),
        })
    }

    /// Create a file with the given content under `dir_path`. This is the
    /// population surface used by the boot formatter and by image tooling;
    /// the shell itself only reads.
    pub fn create_file(&mut self, dir_path: &str, name: &str, data: &[u8]) -> Result<(), FsError> {
        let mut inner = self.inner.lock();

        let dir = inner.walk(ROOT_INDEX, dir_path)?;
        if !inner.entry(dir).is_some_and(|e| e.is_dir()) {
            return Err(FsError::NotADirectory);
        }

        let bs = inner.sb.block_size as u64;
        let block_count = (data.len() as u64 + bs - 1) / bs;
        let start_block = if block_count > 0 {
            inner.alloc_blocks(block_count)?
        } else {
            0
        };

        let slot = inner.create_entry(dir, name, false)?;
        {
            let entry = &mut inner.table[slot as usize];
            entry.start_block = start_block;
            entry.block_count = block_count;
            entry.byte_length = data.len() as u64;
        }

        // Write the extent, padding the last block with zeros.
        let mut buf = vec![0u8; (block_count * bs) as usize];
        buf[..data.len()].copy_from_slice(data);
        let lba = inner.sb.data_start_lba + start_block;
        if !buf.is_empty() {
            inner.dev.write_blocks(lba, &buf)?;
        }

        inner.flush()
    }
}

impl Volume for SimpleFsVolume {
    fn root(&mut self) -> Result<Box<dyn DirHandle>, FsError> {
        let inner = self.inner.lock();
        if !inner.entry(ROOT_INDEX).is_some_and(|e| e.is_dir()) {
            return Err(FsError::NotFound);
        }
        drop(inner);
        Ok(Box::new(SimpleFsDir {
            inner: self.inner.clone(),
            index: ROOT_INDEX,
        }))
    }
}

struct SimpleFsDir {
    inner: Arc<Mutex<FsInner>>,
    index: u32,
}

impl DirHandle for SimpleFsDir {
    fn entries(&mut self) -> Result<Vec<String>, FsError> {
        let inner = self.inner.lock();
        inner.entry(self.index).ok_or(FsError::NotFound)?;

        let mut names = Vec::new();
        for (i, e) in inner.table.iter().enumerate() {
            if i as u32 == self.index || !e.is_in_use() || e.parent != self.index {
                continue;
            }
            let mut name = String::from_utf8_lossy(e.name_bytes()).into_owned();
            if e.is_dir() {
                name.push('/');
            }
            names.push(name);
        }
        Ok(names)
    }

    fn open_dir(&mut self, path: &str) -> Result<Box<dyn DirHandle>, FsError> {
        let inner = self.inner.lock();
        let index = inner.walk(self.index, path)?;
        if !inner.entry(index).is_some_and(|e| e.is_dir()) {
            return Err(FsError::NotADirectory);
        }
        drop(inner);
        Ok(Box::new(SimpleFsDir {
            inner: self.inner.clone(),
            index,
        }))
    }

    fn open_file(&mut self, path: &str, flags: OpenFlags) -> Result<Box<dyn FileHandle>, FsError> {
        if flags.intersects(OpenFlags::WRITE | OpenFlags::CREATE) {
            return Err(FsError::ReadOnly);
        }

        let inner = self.inner.lock();
        let index = inner.walk(self.index, path)?;
        if inner.entry(index).is_some_and(|e| e.is_dir()) {
            return Err(FsError::IsADirectory);
        }
        drop(inner);
        Ok(Box::new(SimpleFsFile {
            inner: self.inner.clone(),
            index,
            pos: 0,
        }))
    }

    fn mkdir(&mut self, name: &str) -> Result<Box<dyn DirHandle>, FsError> {
        let mut inner = self.inner.lock();
        if !inner.entry(self.index).is_some_and(|e| e.is_dir()) {
            return Err(FsError::NotADirectory);
        }
        let slot = inner.create_entry(self.index, name, true)?;
        inner.flush()?;
        drop(inner);
        Ok(Box::new(SimpleFsDir {
            inner: self.inner.clone(),
            index: slot,
        }))
    }
}

struct SimpleFsFile {
    inner: Arc<Mutex<FsInner>>,
    index: u32,
    pos: u64,
}

impl FileHandle for SimpleFsFile {
    fn size(&self) -> u64 {
        let inner = self.inner.lock();
        inner.entry(self.index).map(|e| e.byte_length).unwrap_or(0)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        let inner = self.inner.lock();
        let entry = inner.entry(self.index).ok_or(FsError::NotFound)?;

        let remaining = entry.byte_length.saturating_sub(self.pos);
        let want = (buf.len() as u64).min(remaining) as usize;
        if want == 0 {
            return Ok(0);
        }

        let bs = inner.sb.block_size as u64;
        let extent_lba = inner.sb.data_start_lba + entry.start_block;
        let mut block = vec![0u8; bs as usize];
        let mut copied = 0usize;

        while copied < want {
            let pos = self.pos + copied as u64;
            let block_idx = pos / bs;
            let offset = (pos % bs) as usize;

            inner.dev.read_blocks(extent_lba + block_idx, &mut block)?;

            let chunk = (want - copied).min(bs as usize - offset);
            buf[copied..copied + chunk].copy_from_slice(&block[offset..offset + chunk]);
            copied += chunk;
        }

        drop(inner);
        self.pos += copied as u64;
        Ok(copied)
    }
}
