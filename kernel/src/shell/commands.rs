/// Built-in shell commands.
///
/// A static table maps each verb to its usage strings and handler; the
/// dispatcher looks the verb up once and the `help` output is generated
/// from the same table, so the two cannot drift apart. Each handler
/// validates arity and argument types itself before touching a
/// collaborator — a validation failure prints usage and returns with no
/// side effects. Nothing here panics or leaves the loop; every failure is
/// reported and the prompt comes back, except for the terminal
/// shutdown/reboot transitions.
use alloc::string::String;
use alloc::vec;

use crate::console::CLEAR_SCREEN;
use crate::fs::{FsError, OpenFlags};
use crate::proc::Pid;
use super::{launch, mount, shutdown, ShellContext};
use crate::{con_print, con_println};

/// What the loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Halted,
}

pub struct CommandSpec {
    pub name: &'static str,
    pub summary: &'static str,
    pub usage: &'static str,
    pub help: &'static [&'static str],
    run: fn(&mut ShellContext, &[&str]) -> Flow,
}

/// Entries shown per `list` invocation before the output is cut.
pub const LIST_MAX: usize = 256;

/// Read buffer for `contents` and the GUI image.
const CONTENT_BUF: usize = 4096;

/// The GUI hand-off image on the mounted root.
pub const GUI_IMAGE_PATH: &str = "/core/gui/main.ebx";

pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "start",
        summary: "start a program without waiting for it",
        usage: "use: start <path> [args...]",
        help: &[
            "Spawns the program at <path> and returns to the prompt at once.",
            "The process keeps its table entry after it terminates (a zombie)",
            "until it is reclaimed.",
        ],
        run: cmd_start,
    },
    CommandSpec {
        name: "run",
        summary: "run a program and wait for it to finish",
        usage: "use: run <path> [args...]",
        help: &[
            "Spawns the program at <path>, waits until that process (and only",
            "that process) terminates, reports its exit status, and reclaims it.",
        ],
        run: cmd_run,
    },
    CommandSpec {
        name: "list",
        summary: "list a directory",
        usage: "use: list [path]",
        help: &[
            "Lists the entries of <path>, or of the mounted root when no path",
            "is given. Directories carry a trailing '/'.",
        ],
        run: cmd_list,
    },
    CommandSpec {
        name: "mount",
        summary: "mount a filesystem as the root",
        usage: "use: mount <device> <unit> <fstype>",
        help: &[
            "Opens <device> unit <unit>, resolves the <fstype> driver, opens a",
            "volume, and installs its root directory as the mount slot.",
            "Example: mount ata 0 simplefs",
        ],
        run: cmd_mount,
    },
    CommandSpec {
        name: "unmount",
        summary: "release the mounted root filesystem",
        usage: "use: unmount",
        help: &["Releases the mount slot. With nothing mounted this is a no-op."],
        run: cmd_unmount,
    },
    CommandSpec {
        name: "automount",
        summary: "probe the standard boot devices and mount the first hit",
        usage: "use: automount",
        help: &[
            "Tries atapi units 0-3 as cdromfs, then ata units 0-3 as simplefs,",
            "stopping at the first successful mount. One pass, no retries.",
        ],
        run: cmd_automount,
    },
    CommandSpec {
        name: "kill",
        summary: "force-terminate a process",
        usage: "use: kill <pid>",
        help: &[
            "Requests termination of process <pid>. Does not reclaim the entry;",
            "an unknown or already-terminated pid is reported and ignored.",
        ],
        run: cmd_kill,
    },
    CommandSpec {
        name: "mkdir",
        summary: "create a subdirectory",
        usage: "use: mkdir <parent-dir> <name>",
        help: &["Creates directory <name> inside <parent-dir>."],
        run: cmd_mkdir,
    },
    CommandSpec {
        name: "contents",
        summary: "show a file on a cleared screen",
        usage: "use: contents <path>",
        help: &[
            "Reads up to 4 KiB of <path>, clears the screen, and displays it.",
        ],
        run: cmd_contents,
    },
    CommandSpec {
        name: "reboot",
        summary: "reset the machine",
        usage: "use: reboot",
        help: &["Pulses the platform reset line. Everything running is lost."],
        run: cmd_reboot,
    },
    CommandSpec {
        name: "shutdown",
        summary: "terminate everything, unmount, and power off",
        usage: "use: shutdown [cowsay <message...>]",
        help: &[
            "Sweeps the process table, releases the mount slot, and requests",
            "platform power-off; halts if the request does not take effect.",
            "The optional cowsay prints a goodbye first.",
        ],
        run: cmd_shutdown,
    },
    CommandSpec {
        name: "clear",
        summary: "clear the screen",
        usage: "use: clear",
        help: &["Wipes the display. Files are not touched."],
        run: cmd_clear,
    },
    CommandSpec {
        name: "neofetch",
        summary: "show the system banner",
        usage: "use: neofetch",
        help: &["Prints OS version, architecture, shell, and video geometry."],
        run: cmd_neofetch,
    },
    CommandSpec {
        name: "startGUI",
        summary: "hand the display over to the GUI",
        usage: "use: startGUI",
        help: &[
            "Loads /core/gui/main.ebx from the mounted root and displays it.",
            "On failure the text shell keeps running.",
        ],
        run: cmd_start_gui,
    },
    CommandSpec {
        name: "cowsay",
        summary: "a cow says your message",
        usage: "use: cowsay <message...>",
        help: &["Example: cowsay moo"],
        run: cmd_cowsay,
    },
    CommandSpec {
        name: "help",
        summary: "list commands or show details for one",
        usage: "use: help [command]",
        help: &[
            "Without an argument, lists every command with a summary.",
            "With one, shows that command's usage and details.",
        ],
        run: cmd_help,
    },
];

/// Dispatch a tokenized command line. `args[0]` is the verb.
pub fn dispatch(ctx: &mut ShellContext, args: &[&str]) -> Flow {
    let verb = args[0];
    match COMMANDS.iter().find(|c| c.name == verb) {
        Some(cmd) => (cmd.run)(ctx, &args[1..]),
        None => {
            con_println!(ctx.console, "{}: command not found", verb);
            Flow::Continue
        }
    }
}

// ---- process commands ----

fn cmd_start(ctx: &mut ShellContext, args: &[&str]) -> Flow {
    if args.is_empty() {
        con_println!(ctx.console, "use: start <path> [args...]");
        return Flow::Continue;
    }
    launch::start(ctx, args);
    Flow::Continue
}

fn cmd_run(ctx: &mut ShellContext, args: &[&str]) -> Flow {
    if args.is_empty() {
        con_println!(ctx.console, "use: run <path> [args...]");
        return Flow::Continue;
    }
    launch::run(ctx, args);
    Flow::Continue
}

fn cmd_kill(ctx: &mut ShellContext, args: &[&str]) -> Flow {
    let &[pid] = args else {
        con_println!(ctx.console, "use: kill <pid>");
        return Flow::Continue;
    };
    match pid.parse::<u32>() {
        Ok(n) => launch::kill(ctx, Pid(n)),
        Err(_) => con_println!(ctx.console, "kill: expected process id number but got {}", pid),
    }
    Flow::Continue
}

// ---- filesystem commands ----

fn cmd_list(ctx: &mut ShellContext, args: &[&str]) -> Flow {
    match args {
        &[] => list_path(ctx, None),
        &[path] => list_path(ctx, Some(path)),
        _ => con_println!(ctx.console, "use: list [path]"),
    }
    Flow::Continue
}

fn list_path(ctx: &mut ShellContext, path: Option<&str>) {
    let Some(root) = ctx.mount.root_mut() else {
        con_println!(ctx.console, "list: no filesystem mounted");
        return;
    };

    let result = match path {
        None => root.entries(),
        Some(p) => root.open_dir(p).and_then(|mut dir| dir.entries()),
    };
    let shown = path.unwrap_or("/");

    match result {
        Ok(entries) => {
            for name in entries.iter().take(LIST_MAX) {
                con_println!(ctx.console, "{}", name);
            }
            if entries.len() > LIST_MAX {
                con_println!(
                    ctx.console,
                    "list: showing first {} of {} entries",
                    LIST_MAX,
                    entries.len()
                );
            }
        }
        Err(FsError::NotADirectory) => {
            con_println!(ctx.console, "list: {} is not a directory", shown)
        }
        Err(FsError::NotFound) => con_println!(ctx.console, "list: {} does not exist", shown),
        Err(e) => con_println!(ctx.console, "list: {}: {}", shown, e),
    }
}

fn cmd_mount(ctx: &mut ShellContext, args: &[&str]) -> Flow {
    let &[device, unit, fstype] = args else {
        con_println!(ctx.console, "use: mount <device> <unit> <fstype>");
        return Flow::Continue;
    };

    let unit: u32 = match unit.parse() {
        Ok(u) => u,
        Err(_) => {
            con_println!(ctx.console, "mount: expected unit number but got {}", unit);
            return Flow::Continue;
        }
    };

    match mount::mount(ctx, device, unit, fstype) {
        Ok(()) => con_println!(ctx.console, "mounted {} on {} unit {}", fstype, device, unit),
        Err(mount::MountError::AlreadyMounted) => {
            con_println!(ctx.console, "root filesystem already mounted, please unmount first")
        }
        Err(mount::MountError::DeviceNotFound) => {
            con_println!(ctx.console, "mount: couldn't open device {} unit {}", device, unit)
        }
        Err(mount::MountError::UnknownFsType) => {
            con_println!(ctx.console, "mount: invalid fs type: {}", fstype)
        }
        Err(mount::MountError::VolumeOpenFailed(e)) => con_println!(
            ctx.console,
            "mount: couldn't mount {} on {} unit {}: {}",
            fstype,
            device,
            unit,
            e
        ),
        Err(mount::MountError::NoRootDirectory(e)) => con_println!(
            ctx.console,
            "mount: couldn't find root dir on {} unit {}: {}",
            device,
            unit,
            e
        ),
    }
    Flow::Continue
}

fn cmd_unmount(ctx: &mut ShellContext, args: &[&str]) -> Flow {
    if !args.is_empty() {
        con_println!(ctx.console, "use: unmount");
        return Flow::Continue;
    }
    mount::unmount(ctx);
    Flow::Continue
}

fn cmd_automount(ctx: &mut ShellContext, args: &[&str]) -> Flow {
    if !args.is_empty() {
        con_println!(ctx.console, "use: automount");
        return Flow::Continue;
    }
    mount::automount(ctx);
    Flow::Continue
}

fn cmd_mkdir(ctx: &mut ShellContext, args: &[&str]) -> Flow {
    let &[parent, name] = args else {
        con_println!(ctx.console, "use: mkdir <parent-dir> <name>");
        return Flow::Continue;
    };

    let Some(root) = ctx.mount.root_mut() else {
        con_println!(ctx.console, "mkdir: no filesystem mounted");
        return Flow::Continue;
    };

    match root.open_dir(parent) {
        Ok(mut dir) => {
            if let Err(e) = dir.mkdir(name) {
                con_println!(ctx.console, "mkdir: couldn't create {}: {}", name, e);
            }
        }
        Err(e) => con_println!(ctx.console, "mkdir: couldn't open {}: {}", parent, e),
    }
    Flow::Continue
}

fn cmd_contents(ctx: &mut ShellContext, args: &[&str]) -> Flow {
    let &[path] = args else {
        con_println!(ctx.console, "use: contents <path>");
        return Flow::Continue;
    };

    let Some(root) = ctx.mount.root_mut() else {
        con_println!(ctx.console, "contents: no filesystem mounted");
        return Flow::Continue;
    };

    let mut file = match root.open_file(path, OpenFlags::READ) {
        Ok(file) => file,
        Err(e) => {
            con_println!(ctx.console, "contents: couldn't open {}: {}", path, e);
            return Flow::Continue;
        }
    };

    let mut buf = vec![0u8; CONTENT_BUF];
    match file.read(&mut buf) {
        Ok(0) => con_println!(ctx.console, "contents: {} is empty", path),
        Ok(n) => {
            con_print!(ctx.console, "{}", CLEAR_SCREEN);
            match core::str::from_utf8(&buf[..n]) {
                Ok(text) => con_println!(ctx.console, "{}", text),
                Err(_) => con_println!(ctx.console, "(binary file, {} bytes)", n),
            }
            // Leave the content on screen for a beat before the prompt.
            ctx.platform.delay();
        }
        Err(e) => con_println!(ctx.console, "contents: read failed: {}", e),
    }
    Flow::Continue
}

// ---- system commands ----

fn cmd_reboot(ctx: &mut ShellContext, args: &[&str]) -> Flow {
    if !args.is_empty() {
        con_println!(ctx.console, "use: reboot");
        return Flow::Continue;
    }
    shutdown::reboot(ctx)
}

fn cmd_shutdown(ctx: &mut ShellContext, args: &[&str]) -> Flow {
    match args {
        [] => shutdown::shutdown(ctx),
        ["cowsay", msg @ ..] if !msg.is_empty() => {
            let message = msg.join(" ");
            cowsay(ctx, &message);
            shutdown::shutdown(ctx)
        }
        ["cowsay"] => {
            con_println!(ctx.console, "use: shutdown cowsay <message...>");
            Flow::Continue
        }
        _ => {
            con_println!(ctx.console, "use: shutdown [cowsay <message...>]");
            Flow::Continue
        }
    }
}

fn cmd_clear(ctx: &mut ShellContext, args: &[&str]) -> Flow {
    if !args.is_empty() {
        con_println!(ctx.console, "use: clear");
        return Flow::Continue;
    }
    con_print!(ctx.console, "{}", CLEAR_SCREEN);
    Flow::Continue
}

fn cmd_neofetch(ctx: &mut ShellContext, args: &[&str]) -> Flow {
    if !args.is_empty() {
        con_println!(ctx.console, "use: neofetch");
        return Flow::Continue;
    }
    banner(ctx);
    Flow::Continue
}

/// The system banner. Also printed once at boot.
pub fn banner(ctx: &mut ShellContext) {
    con_println!(ctx.console);
    con_println!(ctx.console, "|----------------------------------------------------------|");
    con_println!(ctx.console, "|                    EmberOS v{:<8}                     |", env!("CARGO_PKG_VERSION"));
    con_println!(ctx.console, "|              a small kernel, a small shell               |");
    con_println!(ctx.console, "|----------------------------------------------------------|");
    con_println!(ctx.console, "| Architecture: x86_64");
    con_println!(ctx.console, "| Shell: ember");
    if ctx.display.width > 0 && ctx.display.height > 0 {
        con_println!(ctx.console, "| Video: {} x {}", ctx.display.width, ctx.display.height);
    } else {
        con_println!(ctx.console, "| Video: none detected");
    }
    con_println!(ctx.console, "|----------------------------------------------------------|");
    con_println!(ctx.console);
}

fn cmd_start_gui(ctx: &mut ShellContext, args: &[&str]) -> Flow {
    if !args.is_empty() {
        con_println!(ctx.console, "use: startGUI");
        return Flow::Continue;
    }
    start_gui(ctx);
    Flow::Continue
}

/// Load and display the GUI image. Failures leave the text shell running;
/// also attempted once at boot.
pub fn start_gui(ctx: &mut ShellContext) {
    con_println!(ctx.console, "loading the GUI, this can take a moment...");
    ctx.platform.delay();

    let Some(root) = ctx.mount.root_mut() else {
        con_println!(ctx.console, "startGUI: no filesystem mounted");
        return;
    };

    let mut file = match root.open_file(GUI_IMAGE_PATH, OpenFlags::READ) {
        Ok(file) => file,
        Err(e) => {
            con_println!(ctx.console, "startGUI: couldn't open {}: {}", GUI_IMAGE_PATH, e);
            return;
        }
    };

    let mut buf = vec![0u8; CONTENT_BUF];
    match file.read(&mut buf) {
        Ok(n) if n > 0 => {
            con_print!(ctx.console, "{}", CLEAR_SCREEN);
            match core::str::from_utf8(&buf[..n]) {
                Ok(text) => con_println!(ctx.console, "{}", text),
                Err(_) => con_println!(ctx.console, "(binary GUI image, {} bytes)", n),
            }
            ctx.platform.delay();
        }
        Ok(_) => con_println!(ctx.console, "startGUI: {} is empty", GUI_IMAGE_PATH),
        Err(e) => con_println!(ctx.console, "startGUI: read failed: {}", e),
    }
}

fn cmd_cowsay(ctx: &mut ShellContext, args: &[&str]) -> Flow {
    if args.is_empty() {
        con_println!(ctx.console, "use: cowsay <message...>");
        return Flow::Continue;
    }
    let message = args.join(" ");
    cowsay(ctx, &message);
    Flow::Continue
}

/// Speech bubble sized to the message, then the cow.
pub fn cowsay(ctx: &mut ShellContext, message: &str) {
    let width = message.chars().count() + 2;
    let top: String = "_".repeat(width);
    let bottom: String = "-".repeat(width);

    con_println!(ctx.console, " {}", top);
    con_println!(ctx.console, "< {} >", message);
    con_println!(ctx.console, " {}", bottom);
    con_println!(ctx.console, "        \\   ^__^");
    con_println!(ctx.console, "         \\  (oo)\\_______");
    con_println!(ctx.console, "            (__)\\       )\\/\\");
    con_println!(ctx.console, "                ||----w |");
    con_println!(ctx.console, "                ||     ||");
}

fn cmd_help(ctx: &mut ShellContext, args: &[&str]) -> Flow {
    match args {
        [] => {
            con_println!(ctx.console);
            con_println!(ctx.console, "Commands:");
            for cmd in COMMANDS {
                con_println!(ctx.console, "  {:<12} {}", cmd.name, cmd.summary);
            }
        }
        [verb] => match COMMANDS.iter().find(|c| c.name == *verb) {
            Some(cmd) => {
                con_println!(ctx.console, "{}", cmd.usage);
                for line in cmd.help {
                    con_println!(ctx.console, "{}", line);
                }
            }
            None => {
                con_println!(ctx.console, "no detailed help available for '{}'", verb);
                con_println!(ctx.console, "try: help");
            }
        },
        _ => con_println!(ctx.console, "use: help [command]"),
    }
    Flow::Continue
}
