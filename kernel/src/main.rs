//! EmberOS kernel — entry point.
//!
//! Booted by Limine. The bootloader sets up long mode, page tables
//! (kernel in the upper half + HHDM for all physical memory), and jumps
//! to kmain, which brings up the console, memory, the boot disk, and the
//! interactive shell.
#![no_std]
#![no_main]

extern crate alloc;

use alloc::boxed::Box;
use core::panic::PanicInfo;

use limine::memory_map::EntryType;
use limine::request::{
    FramebufferRequest, HhdmRequest, MemoryMapRequest, ModuleRequest,
    RequestsEndMarker, RequestsStartMarker,
};
use limine::BaseRevision;

use emberos_kernel::arch::x86_64::{self, serial, timer};
use emberos_kernel::console::SerialConsole;
use emberos_kernel::fs::{FsRegistry, SimpleFsVolume, SIMPLEFS};
use emberos_kernel::platform::X86Platform;
use emberos_kernel::proc::{NullExec, ProcessTable};
use emberos_kernel::shell::{self, DisplayInfo, MountSlot, ShellContext};
use emberos_kernel::storage::{DeviceRegistry, RamDisk};
use emberos_kernel::{mem, serial_println};

// ---- Limine requests ----
// Must be #[used] and in .requests section for Limine to discover them.

#[used]
#[link_section = ".requests"]
static BASE_REVISION: BaseRevision = BaseRevision::new();

#[used]
#[link_section = ".requests"]
static HHDM_REQUEST: HhdmRequest = HhdmRequest::new();

#[used]
#[link_section = ".requests"]
static MEMMAP_REQUEST: MemoryMapRequest = MemoryMapRequest::new();

#[used]
#[link_section = ".requests"]
static FRAMEBUFFER_REQUEST: FramebufferRequest = FramebufferRequest::new();

#[used]
#[link_section = ".requests"]
static MODULE_REQUEST: ModuleRequest = ModuleRequest::new();

#[used]
#[link_section = ".requests_start_marker"]
static _START_MARKER: RequestsStartMarker = RequestsStartMarker::new();

#[used]
#[link_section = ".requests_end_marker"]
static _END_MARKER: RequestsEndMarker = RequestsEndMarker::new();

/// Kernel-wide registries. The shell reaches them through its context.
static DEVICES: DeviceRegistry = DeviceRegistry::new();
static FS_DRIVERS: FsRegistry = FsRegistry::new();

const BOOT_DISK_BLOCK_SIZE: u32 = 512;
/// Fallback RAM disk when no boot module is supplied: 2 MiB.
const BLANK_DISK_BLOCKS: u64 = 4096;

/// Kernel entry point — called by Limine after setting up long mode, page
/// tables, and a stack.
#[no_mangle]
pub extern "C" fn kmain() -> ! {
    // 1. Serial console first: everything below reports through it.
    serial::SERIAL.lock().init();
    serial_println!("EmberOS v{} — booting...", env!("CARGO_PKG_VERSION"));

    // 2. Verify the Limine boot protocol.
    assert!(BASE_REVISION.is_supported(), "Limine base revision not supported");
    serial_println!("[boot] Limine protocol OK");

    // 3. HHDM offset — all PhysAddr::as_ptr() calls use this.
    let hhdm = HHDM_REQUEST.get_response().expect("Limine HHDM response missing");
    mem::set_hhdm_offset(hhdm.offset());
    serial_println!("[boot] HHDM offset: {:#x}", hhdm.offset());

    // 4. Exception reporting; IRQs stay masked (the kernel polls).
    unsafe { x86_64::idt::init(); }
    x86_64::mask_legacy_pics();
    serial_println!("[cpu] exception handlers active, IRQs masked");

    // 5. Heap from the largest usable region in the memory map.
    let memmap = MEMMAP_REQUEST
        .get_response()
        .expect("Limine memory map response missing");
    let mut heap_base = 0u64;
    let mut heap_len = 0u64;
    for entry in memmap.entries() {
        if entry.entry_type == EntryType::USABLE && entry.length > heap_len {
            heap_base = entry.base;
            heap_len = entry.length;
        }
    }
    assert!(heap_len > 0, "no usable memory for the kernel heap");
    unsafe { mem::init_heap(mem::PhysAddr::new(heap_base), heap_len as usize); }
    serial_println!("[mem] heap at {:#x} ({} KiB region)", heap_base, heap_len / 1024);

    // 6. Timing for operator-visible delays.
    timer::calibrate_tsc();
    serial_println!("[timer] TSC calibrated");

    // 7. Framebuffer geometry for the banner.
    let display = match FRAMEBUFFER_REQUEST
        .get_response()
        .and_then(|r| r.framebuffers().next())
    {
        Some(fb) => {
            serial_println!("[video] {}x{} framebuffer", fb.width(), fb.height());
            DisplayInfo { width: fb.width(), height: fb.height() }
        }
        None => {
            serial_println!("[video] no framebuffer");
            DisplayInfo::default()
        }
    };

    // 8. Boot disk: the first Limine module if present, else a blank disk.
    let disk = match MODULE_REQUEST
        .get_response()
        .and_then(|r| r.modules().first().copied())
    {
        Some(file) => {
            let image =
                unsafe { core::slice::from_raw_parts(file.addr(), file.size() as usize) };
            serial_println!("[disk] boot module: {} KiB", image.len() / 1024);
            RamDisk::from_image(image, BOOT_DISK_BLOCK_SIZE)
        }
        None => {
            serial_println!("[disk] no boot module, using a blank RAM disk");
            RamDisk::new(BLANK_DISK_BLOCKS, BOOT_DISK_BLOCK_SIZE)
        }
    };
    DEVICES.register("ata", 0, Box::new(disk));
    FS_DRIVERS.register(&SIMPLEFS);
    prepare_boot_volume();

    // 9. Shell context and the boot sequence the operator sees:
    // automount, banner, GUI attempt, then the interactive loop.
    let mut console = SerialConsole;
    let mut platform = X86Platform;
    let mut procs = ProcessTable::new(NullExec);
    let mut mount = MountSlot::empty();
    let mut ctx = ShellContext {
        console: &mut console,
        devices: &DEVICES,
        fs: &FS_DRIVERS,
        proc: &mut procs,
        platform: &mut platform,
        mount: &mut mount,
        display,
    };

    serial_println!();
    serial_println!("Mounting root filesystem");
    shell::automount(&mut ctx);

    shell::banner(&mut ctx);
    shell::start_gui(&mut ctx);

    shell::run(&mut ctx);

    // run() only comes back when a terminal transition failed to take
    // effect on the platform.
    x86_64::power::halt_forever();
}

/// Format the boot disk with an empty simplefs when it does not already
/// hold a recognizable volume, and seed a welcome file.
fn prepare_boot_volume() {
    let dev = match DEVICES.open("ata", 0) {
        Ok(dev) => dev,
        Err(_) => return,
    };

    if SimpleFsVolume::open(dev).is_ok() {
        serial_println!("[disk] existing simplefs volume found");
        return;
    }

    // The probe consumed (and released) the handle; take a fresh one.
    let dev = match DEVICES.open("ata", 0) {
        Ok(dev) => dev,
        Err(_) => return,
    };
    match SimpleFsVolume::format(dev) {
        Ok(mut vol) => {
            let welcome = b"Welcome to EmberOS.\nType 'help' for commands.\n";
            if let Err(e) = vol.create_file("/", "readme.txt", welcome) {
                serial_println!("[disk] couldn't seed readme: {}", e);
            }
            serial_println!("[disk] formatted blank volume");
        }
        Err(e) => serial_println!("[disk] format failed: {}", e),
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    serial_println!("!!! KERNEL PANIC !!!");
    serial_println!("{}", info);
    x86_64::power::halt_forever();
}
