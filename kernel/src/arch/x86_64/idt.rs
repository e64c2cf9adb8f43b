/// Interrupt Descriptor Table — exception reporting.
///
/// The kernel never enables interrupt delivery (devices are polled), so the
/// IDT exists to turn CPU exceptions into a readable serial report instead
/// of a silent triple fault. Gates reuse whatever code segment the
/// bootloader installed, read from CS at init time.
use crate::serial_println;

/// IDT entry (16 bytes on x86_64).
#[repr(C, packed)]
#[derive(Clone, Copy)]
struct IdtEntry {
    offset_low: u16,
    selector: u16,
    ist: u8,
    type_attr: u8,
    offset_mid: u16,
    offset_high: u32,
    _reserved: u32,
}

impl IdtEntry {
    const fn missing() -> Self {
        Self {
            offset_low: 0,
            selector: 0,
            ist: 0,
            type_attr: 0, // not present
            offset_mid: 0,
            offset_high: 0,
            _reserved: 0,
        }
    }

    /// Present interrupt gate (DPL=0) for the given handler address.
    fn interrupt_gate(handler: u64, selector: u16) -> Self {
        Self {
            offset_low: handler as u16,
            selector,
            ist: 0,
            type_attr: 0x8E, // present | interrupt gate | DPL=0
            offset_mid: (handler >> 16) as u16,
            offset_high: (handler >> 32) as u32,
            _reserved: 0,
        }
    }
}

/// Exception vectors only — the kernel has no IRQ handlers.
const IDT_ENTRIES: usize = 32;

#[repr(C, align(16))]
struct Idt {
    entries: [IdtEntry; IDT_ENTRIES],
}

#[repr(C, packed)]
struct IdtPointer {
    limit: u16,
    base: u64,
}

/// Stack frame pushed by the CPU on exception entry.
#[repr(C)]
pub struct ExceptionFrame {
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

static IDT: spin::Once<Idt> = spin::Once::new();

/// Read the current code segment selector.
fn current_cs() -> u16 {
    let cs: u16;
    unsafe {
        core::arch::asm!("mov {0:x}, cs", out(reg) cs, options(nostack, nomem, preserves_flags));
    }
    cs
}

/// Build the IDT with exception handlers and load it.
///
/// # Safety
/// Must be called exactly once, early in boot.
pub unsafe fn init() {
    let cs = current_cs();

    let idt = IDT.call_once(|| {
        let mut idt = Idt {
            entries: [IdtEntry::missing(); IDT_ENTRIES],
        };
        idt.entries[0] = IdtEntry::interrupt_gate(divide_error as usize as u64, cs);
        idt.entries[3] = IdtEntry::interrupt_gate(breakpoint as usize as u64, cs);
        idt.entries[6] = IdtEntry::interrupt_gate(invalid_opcode as usize as u64, cs);
        idt.entries[8] = IdtEntry::interrupt_gate(double_fault as usize as u64, cs);
        idt.entries[13] = IdtEntry::interrupt_gate(general_protection as usize as u64, cs);
        idt.entries[14] = IdtEntry::interrupt_gate(page_fault as usize as u64, cs);
        idt
    });

    let ptr = IdtPointer {
        limit: (core::mem::size_of::<Idt>() - 1) as u16,
        base: idt as *const _ as u64,
    };
    core::arch::asm!("lidt [{}]", in(reg) &ptr, options(nostack));
}

fn fatal(name: &str, frame: &ExceptionFrame, code: Option<u64>) -> ! {
    serial_println!();
    serial_println!("!!! CPU EXCEPTION: {} !!!", name);
    if let Some(code) = code {
        serial_println!("  error code: {:#x}", code);
    }
    serial_println!("  rip={:#x} rsp={:#x} rflags={:#x}", frame.rip, frame.rsp, frame.rflags);
    super::cli();
    loop {
        super::hlt();
    }
}

extern "x86-interrupt" fn divide_error(frame: ExceptionFrame) {
    fatal("divide error (#DE)", &frame, None);
}

extern "x86-interrupt" fn breakpoint(frame: ExceptionFrame) {
    let rip = frame.rip;
    serial_println!("breakpoint (#BP) at {:#x}", rip);
}

extern "x86-interrupt" fn invalid_opcode(frame: ExceptionFrame) {
    fatal("invalid opcode (#UD)", &frame, None);
}

extern "x86-interrupt" fn double_fault(frame: ExceptionFrame, code: u64) -> ! {
    fatal("double fault (#DF)", &frame, Some(code));
}

extern "x86-interrupt" fn general_protection(frame: ExceptionFrame, code: u64) {
    fatal("general protection fault (#GP)", &frame, Some(code));
}

extern "x86-interrupt" fn page_fault(frame: ExceptionFrame, code: u64) {
    let cr2: u64;
    unsafe {
        core::arch::asm!("mov {}, cr2", out(reg) cr2, options(nostack, nomem, preserves_flags));
    }
    serial_println!("page fault address: {:#x}", cr2);
    fatal("page fault (#PF)", &frame, Some(code));
}
