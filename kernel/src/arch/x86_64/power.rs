/// Power control — ACPI power-off, reset pulse, halt.
///
/// QEMU, Bochs, and most ACPI firmware accept a write of SLP_TYPa|SLP_EN to
/// the PM1a control block. Real boards with a different PM1a port need a
/// full ACPI table walk, which this kernel does not do; callers must treat
/// `power_off` as best-effort and be prepared for it to return.
use super::{outb, outw};

/// QEMU/Bochs PM1a control port.
const PM1A_CNT_QEMU: u16 = 0x604;
/// Legacy PM1a control port seen on older chipsets.
const PM1A_CNT_LEGACY: u16 = 0xB004;
/// SLP_TYP=5 | SLP_EN — the S5 soft-off request.
const SLP_S5: u16 = 0x2000;

/// Keyboard controller command port.
const KBD_CMD: u16 = 0x64;
/// Pulse the CPU reset line.
const KBD_RESET: u8 = 0xFE;

/// Request ACPI soft-off. Returns only if no port accepted the request.
pub fn power_off() {
    outw(PM1A_CNT_QEMU, SLP_S5);
    outw(PM1A_CNT_LEGACY, SLP_S5);
}

/// Pulse the reset line via the keyboard controller. Returns only if the
/// controller ignored the pulse.
pub fn reset() {
    outb(KBD_CMD, KBD_RESET);
}

/// Stop the CPU for good. Interrupts are disabled first so `hlt` never
/// wakes; recovery requires an external power cycle.
pub fn halt_forever() -> ! {
    super::cli();
    loop {
        super::hlt();
    }
}
