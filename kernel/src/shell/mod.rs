/// EmberOS interactive shell.
///
/// The operator surface of the kernel: reads a line from the console,
/// tokenizes it, and dispatches to a built-in handler. Everything the
/// handlers touch — console, device and filesystem registries, process
/// table, platform control, the mount slot — arrives through
/// `ShellContext`, so the shell core has no global state and runs whole
/// under host tests. The loop is re-entered after every command; only the
/// shutdown/reboot/halt transitions leave it.
mod commands;
mod launch;
mod line;
mod mount;
mod shutdown;
mod token;

#[cfg(test)]
mod tests;

pub use commands::{banner, cowsay, dispatch, start_gui, CommandSpec, Flow, COMMANDS, LIST_MAX};
pub use line::{LineError, LineReader, LINE_CAP};
pub use mount::{automount, MountError, MountSlot, AUTOMOUNT_CANDIDATES, AUTOMOUNT_UNITS};
pub use shutdown::{ShutdownStage, KILL_PID_FIRST, KILL_PID_LAST};
pub use token::{tokenize, TokenError, MAX_ARGS};

use crate::console::Console;
use crate::fs::FsRegistry;
use crate::platform::PlatformControl;
use crate::proc::ProcessOps;
use crate::storage::DeviceRegistry;
use crate::{con_print, con_println};

const PROMPT: &str = "ember% ";

/// Framebuffer geometry for the banner; zero when none was found.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayInfo {
    pub width: u64,
    pub height: u64,
}

/// Everything a command handler may touch. Built once at boot, torn down
/// only by the terminal transitions.
pub struct ShellContext<'a> {
    pub console: &'a mut dyn Console,
    pub devices: &'a DeviceRegistry,
    pub fs: &'a FsRegistry,
    pub proc: &'a mut dyn ProcessOps,
    pub platform: &'a mut dyn PlatformControl,
    pub mount: &'a mut MountSlot,
    pub display: DisplayInfo,
}

/// Run the interactive shell. Leaves the loop only through a terminal
/// shutdown/reboot transition; on hardware those never return, so this
/// effectively runs forever.
pub fn run(ctx: &mut ShellContext) {
    let mut reader = LineReader::new();

    loop {
        con_print!(ctx.console, "\n{}", PROMPT);

        let line = match reader.read_line(&mut *ctx.console) {
            Ok(line) => line,
            Err(LineError::Overflow) => {
                con_println!(ctx.console);
                con_println!(
                    ctx.console,
                    "shell: input exceeded {} bytes and was discarded",
                    LINE_CAP
                );
                continue;
            }
        };

        let args = match token::tokenize(line) {
            Ok(args) => args,
            Err(TokenError::TooManyArgs) => {
                con_println!(ctx.console, "shell: too many arguments (max {})", MAX_ARGS);
                continue;
            }
        };
        if args.is_empty() {
            continue;
        }

        if commands::dispatch(ctx, &args) == Flow::Halted {
            break;
        }
    }
}
