/// Unit tests for the block layer — RamDisk geometry/IO and the device
/// registry's open/release accounting.
///
/// These tests exercise pure in-memory logic without any hardware I/O.
/// Run with: cargo test --target x86_64-unknown-linux-gnu --lib
use alloc::boxed::Box;
use alloc::vec;

use super::*;

// ---- RamDisk ----

#[test]
fn ramdisk_write_read_roundtrip() {
    let mut disk = RamDisk::new(8, 512);
    let block = [0xABu8; 512];
    disk.write_blocks(3, &block).unwrap();

    let mut out = [0u8; 512];
    disk.read_blocks(3, &mut out).unwrap();
    assert_eq!(out, block);
    // Neighboring block untouched
    disk.read_blocks(4, &mut out).unwrap();
    assert_eq!(out, [0u8; 512]);
}

#[test]
fn ramdisk_rejects_out_of_range() {
    let mut disk = RamDisk::new(4, 512);
    let mut buf = [0u8; 1024];
    assert_eq!(disk.read_blocks(3, &mut buf), Err(StorageError::OutOfRange));
    assert_eq!(disk.write_blocks(4, &buf[..512]), Err(StorageError::OutOfRange));
}

#[test]
fn ramdisk_rejects_misaligned_buffer() {
    let mut disk = RamDisk::new(4, 512);
    let mut buf = [0u8; 100];
    assert_eq!(disk.read_blocks(0, &mut buf), Err(StorageError::Misaligned));
    let mut empty: [u8; 0] = [];
    assert_eq!(disk.read_blocks(0, &mut empty), Err(StorageError::Misaligned));
}

#[test]
fn ramdisk_from_image_pads_to_whole_blocks() {
    let image = vec![0x11u8; 1000];
    let disk = RamDisk::from_image(&image, 512);
    assert_eq!(disk.total_blocks(), 2);
    assert_eq!(disk.read_raw(0, 1000), &image[..]);
    assert_eq!(disk.read_raw(1000, 24), &[0u8; 24]);
}

#[test]
fn ramdisk_counts_flushes() {
    let mut disk = RamDisk::new(1, 512);
    assert_eq!(disk.flush_count(), 0);
    disk.flush().unwrap();
    disk.flush().unwrap();
    assert_eq!(disk.flush_count(), 2);
}

// ---- DeviceRegistry ----

#[test]
fn registry_open_unknown_device() {
    let reg = DeviceRegistry::new();
    assert!(matches!(reg.open("ata", 0), Err(StorageError::NoSuchDevice)));

    reg.register("ata", 0, Box::new(RamDisk::new(4, 512)));
    assert!(matches!(reg.open("ata", 1), Err(StorageError::NoSuchDevice)));
    assert!(matches!(reg.open("atapi", 0), Err(StorageError::NoSuchDevice)));
}

#[test]
fn registry_handle_reads_device() {
    let reg = DeviceRegistry::new();
    reg.register("ata", 0, Box::new(RamDisk::new(4, 512)));

    let handle = reg.open("ata", 0).unwrap();
    assert_eq!(handle.name(), "ata");
    assert_eq!(handle.unit(), 0);
    assert_eq!(handle.block_size(), 512);
    assert_eq!(handle.total_blocks(), 4);

    let block = [0x5Au8; 512];
    handle.write_blocks(1, &block).unwrap();
    let mut out = [0u8; 512];
    handle.read_blocks(1, &mut out).unwrap();
    assert_eq!(out, block);
}

#[test]
fn registry_tracks_open_and_release() {
    let reg = DeviceRegistry::new();
    reg.register("ata", 0, Box::new(RamDisk::new(4, 512)));
    assert_eq!(reg.open_count("ata", 0), 0);

    let a = reg.open("ata", 0).unwrap();
    let b = reg.open("ata", 0).unwrap();
    assert_eq!(reg.open_count("ata", 0), 2);

    drop(a);
    assert_eq!(reg.open_count("ata", 0), 1);
    drop(b);
    assert_eq!(reg.open_count("ata", 0), 0);
}

#[test]
fn registry_reregister_replaces() {
    let reg = DeviceRegistry::new();
    reg.register("ata", 0, Box::new(RamDisk::new(4, 512)));
    reg.register("ata", 0, Box::new(RamDisk::new(16, 512)));

    let handle = reg.open("ata", 0).unwrap();
    assert_eq!(handle.total_blocks(), 16);
}
