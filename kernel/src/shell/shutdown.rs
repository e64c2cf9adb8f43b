/// Shutdown sequencer.
///
/// Running -> Terminating -> Unmounting -> PoweringOff -> Halted, with no
/// rollback: once Terminating is entered the sequence always ends in a
/// power-off or a halt. Terminating and Unmounting are never skipped, even
/// with an empty process table or mount slot. The observed transitions are
/// returned so tests can assert the exact path.
use alloc::vec;
use alloc::vec::Vec;

use crate::console::CLEAR_SCREEN;
use crate::proc::Pid;
use super::commands::Flow;
use super::ShellContext;
use crate::{con_print, con_println};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownStage {
    Running,
    Terminating,
    Unmounting,
    PoweringOff,
    Halted,
}

/// Process-table range swept during Terminating. Pid 1 is the shell.
pub const KILL_PID_FIRST: u32 = 2;
pub const KILL_PID_LAST: u32 = 100;

/// Drive the full shutdown sequence.
pub fn shutdown(ctx: &mut ShellContext) -> Flow {
    run_sequence(ctx);
    Flow::Halted
}

/// The sequence proper, returning the stage trace.
pub fn run_sequence(ctx: &mut ShellContext) -> Vec<ShutdownStage> {
    let mut trace = vec![ShutdownStage::Running];

    // Running -> Terminating: sweep the pid range, fire-and-forget. No
    // confirmation is awaited; most slots will simply not exist.
    trace.push(ShutdownStage::Terminating);
    con_print!(ctx.console, "{}", CLEAR_SCREEN);
    con_println!(ctx.console, "Powering off...");
    for pid in KILL_PID_FIRST..=KILL_PID_LAST {
        let _ = ctx.proc.kill(Pid(pid));
    }

    // Terminating -> Unmounting: release the slot if populated.
    trace.push(ShutdownStage::Unmounting);
    if ctx.mount.clear() {
        con_println!(ctx.console, "unmounted root filesystem");
    }

    ctx.platform.delay();
    con_println!(ctx.console, "Done");
    ctx.platform.delay();

    // Unmounting -> PoweringOff.
    trace.push(ShutdownStage::PoweringOff);
    ctx.platform.power_off();

    // PoweringOff -> Halted: reached only when power-off did not take
    // effect. No further input is accepted; recovery is a power cycle.
    trace.push(ShutdownStage::Halted);
    con_print!(ctx.console, "{}", CLEAR_SCREEN);
    con_println!(ctx.console, "System halted.");
    con_println!(ctx.console, "Automatic power-off failed; turn the machine off manually.");
    ctx.platform.halt();

    trace
}

/// Reboot: reset pulse, then halt if the pulse did not take effect.
pub fn reboot(ctx: &mut ShellContext) -> Flow {
    con_println!(ctx.console, "Rebooting...");
    ctx.platform.reboot();
    ctx.platform.halt();
    Flow::Halted
}
