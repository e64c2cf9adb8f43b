/// Unit tests for the shell core — line editing, tokenizing, dispatch and
/// argument validation, the mount protocol, automount probing order, the
/// launcher lifecycle, and the shutdown sequencer.
use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::console::Console;
use crate::fs::{DirHandle, FsDriver, FsError, FsRegistry, SimpleFsVolume, Volume, SIMPLEFS};
use crate::platform::PlatformControl;
use crate::proc::{Pid, ProcState, ProcessTable, ScriptedExec, SpawnOutcome, FIRST_PID};
use crate::storage::{DeviceHandle, DeviceRegistry, RamDisk};
use super::*;

// ---- test doubles ----

struct MockConsole {
    input: VecDeque<u8>,
    output: String,
}

impl MockConsole {
    fn new(script: &str) -> Self {
        Self {
            input: script.bytes().collect(),
            output: String::new(),
        }
    }
}

impl Console for MockConsole {
    fn read_byte(&mut self) -> u8 {
        self.input.pop_front().expect("console input script exhausted")
    }

    fn write_byte(&mut self, byte: u8) {
        self.output.push(byte as char);
    }

    fn write_str(&mut self, s: &str) {
        self.output.push_str(s);
    }
}

struct MockPlatform {
    calls: Vec<&'static str>,
}

impl PlatformControl for MockPlatform {
    fn delay(&mut self) {
        self.calls.push("delay");
    }

    fn power_off(&mut self) {
        self.calls.push("power_off");
    }

    fn reboot(&mut self) {
        self.calls.push("reboot");
    }

    fn halt(&mut self) {
        self.calls.push("halt");
    }
}

/// Driver whose volumes open fine but never produce a root directory.
struct NoRootFs;
struct NoRootVolume;

impl Volume for NoRootVolume {
    fn root(&mut self) -> Result<Box<dyn DirHandle>, FsError> {
        Err(FsError::NotFound)
    }
}

impl FsDriver for NoRootFs {
    fn name(&self) -> &'static str {
        "norootfs"
    }

    fn open_volume(&self, _dev: DeviceHandle) -> Result<Box<dyn Volume>, FsError> {
        Ok(Box::new(NoRootVolume))
    }
}

static NOROOT_FS: NoRootFs = NoRootFs;

fn elf_image() -> Vec<u8> {
    let mut image = vec![0x7F, b'E', b'L', b'F'];
    image.extend_from_slice(&[0u8; 60]);
    image
}

// ---- harness ----

struct Harness {
    console: MockConsole,
    devices: DeviceRegistry,
    fs: FsRegistry,
    procs: ProcessTable<ScriptedExec>,
    platform: MockPlatform,
    mount: MountSlot,
    display: DisplayInfo,
}

impl Harness {
    fn new() -> Self {
        Self {
            console: MockConsole::new(""),
            devices: DeviceRegistry::new(),
            fs: FsRegistry::new(),
            procs: ProcessTable::new(ScriptedExec::new()),
            platform: MockPlatform { calls: Vec::new() },
            mount: MountSlot::empty(),
            display: DisplayInfo { width: 1280, height: 800 },
        }
    }

    /// Register `ata` unit 0 with a populated simplefs volume.
    fn with_boot_disk(self) -> Self {
        self.devices.register("ata", 0, Box::new(RamDisk::new(64, 512)));
        self.fs.register(&SIMPLEFS);

        let mut vol = SimpleFsVolume::format(self.devices.open("ata", 0).unwrap()).unwrap();
        vol.create_file("/", "init.elf", &elf_image()).unwrap();
        vol.create_file("/", "notes.txt", b"hello from emberos\n").unwrap();
        {
            let mut root = vol.root().unwrap();
            let mut core_dir = root.mkdir("core").unwrap();
            core_dir.mkdir("gui").unwrap();
        }
        vol.create_file("/core/gui", "main.ebx", b"[ember gui v0]").unwrap();
        self
    }

    fn ctx(&mut self) -> ShellContext<'_> {
        ShellContext {
            console: &mut self.console,
            devices: &self.devices,
            fs: &self.fs,
            proc: &mut self.procs,
            platform: &mut self.platform,
            mount: &mut self.mount,
            display: self.display,
        }
    }

    /// Tokenize and dispatch one command line.
    fn exec(&mut self, command: &str) -> Flow {
        let args = tokenize(command).unwrap();
        if args.is_empty() {
            return Flow::Continue;
        }
        let mut ctx = self.ctx();
        dispatch(&mut ctx, &args)
    }

    fn output(&self) -> &str {
        &self.console.output
    }
}

// ---- line reader ----

#[test]
fn line_reader_returns_on_cr() {
    let mut con = MockConsole::new("hi\r");
    let mut reader = LineReader::new();
    assert_eq!(reader.read_line(&mut con), Ok("hi"));
    // Both characters echoed, newline echoed on submit.
    assert_eq!(con.output, "hi\n");
}

#[test]
fn line_reader_empty_line_is_valid() {
    let mut con = MockConsole::new("\r");
    let mut reader = LineReader::new();
    assert_eq!(reader.read_line(&mut con), Ok(""));
}

#[test]
fn line_reader_backspace_edits() {
    let mut con = MockConsole::new("ab\x08c\r");
    let mut reader = LineReader::new();
    assert_eq!(reader.read_line(&mut con), Ok("ac"));
    assert!(con.output.contains("\x08 \x08"));
}

#[test]
fn line_reader_backspace_at_column_zero_is_noop() {
    let mut con = MockConsole::new("\x08\x7Fa\r");
    let mut reader = LineReader::new();
    assert_eq!(reader.read_line(&mut con), Ok("a"));
    assert_eq!(con.output, "a\n");
}

#[test]
fn line_reader_ignores_non_printable_input() {
    let mut con = MockConsole::new("a\x01\x02\x1bb\r");
    let mut reader = LineReader::new();
    assert_eq!(reader.read_line(&mut con), Ok("ab"));
}

#[test]
fn line_reader_reports_overflow_at_capacity() {
    let mut script = String::new();
    for _ in 0..LINE_CAP + 10 {
        script.push('x');
    }
    script.push('\r');

    let mut con = MockConsole::new(&script);
    let mut reader = LineReader::new();
    assert_eq!(reader.read_line(&mut con), Err(LineError::Overflow));
}

#[test]
fn line_reader_accepts_line_exactly_at_capacity() {
    let mut script = String::new();
    for _ in 0..LINE_CAP {
        script.push('y');
    }
    script.push('\r');

    let mut con = MockConsole::new(&script);
    let mut reader = LineReader::new();
    let line = reader.read_line(&mut con).unwrap();
    assert_eq!(line.len(), LINE_CAP);
}

// ---- tokenizer ----

#[test]
fn tokenizer_splits_on_runs_of_whitespace() {
    assert_eq!(tokenize("a  b c").unwrap(), vec!["a", "b", "c"]);
    assert_eq!(tokenize("  mount ata\t0  ").unwrap(), vec!["mount", "ata", "0"]);
}

#[test]
fn tokenizer_yields_nothing_for_blank_lines() {
    assert!(tokenize("").unwrap().is_empty());
    assert!(tokenize("   \t  ").unwrap().is_empty());
}

#[test]
fn tokenizer_bounds_argument_count() {
    let mut line = String::new();
    for _ in 0..MAX_ARGS + 1 {
        line.push_str("a ");
    }
    assert_eq!(tokenize(&line), Err(TokenError::TooManyArgs));
}

// ---- dispatch & validation ----

#[test]
fn command_verbs_are_unique() {
    for (i, a) in COMMANDS.iter().enumerate() {
        for b in &COMMANDS[i + 1..] {
            assert_ne!(a.name, b.name, "duplicate verb in command table");
        }
    }
}

#[test]
fn unknown_verb_is_reported() {
    let mut h = Harness::new();
    assert_eq!(h.exec("frobnicate now"), Flow::Continue);
    assert!(h.output().contains("frobnicate: command not found"));
}

#[test]
fn mount_validates_arity_and_types() {
    let mut h = Harness::new().with_boot_disk();

    h.exec("mount ata 0");
    assert!(h.output().contains("use: mount <device> <unit> <fstype>"));
    assert!(!h.mount.is_mounted());

    h.exec("mount ata zero simplefs");
    assert!(h.output().contains("mount: expected unit number but got zero"));
    assert!(!h.mount.is_mounted());
}

#[test]
fn kill_validates_pid_argument() {
    let mut h = Harness::new();
    h.exec("kill");
    assert!(h.output().contains("use: kill <pid>"));
    h.exec("kill abc");
    assert!(h.output().contains("kill: expected process id number but got abc"));
}

#[test]
fn help_lists_every_verb() {
    let mut h = Harness::new();
    h.exec("help");
    for cmd in COMMANDS {
        assert!(h.output().contains(cmd.name), "help output missing {}", cmd.name);
    }
}

#[test]
fn help_shows_detail_and_generic_usage() {
    let mut h = Harness::new();
    h.exec("help mount");
    assert!(h.output().contains("use: mount <device> <unit> <fstype>"));

    h.exec("help bogus");
    assert!(h.output().contains("no detailed help available for 'bogus'"));

    h.exec("help a b");
    assert!(h.output().contains("use: help [command]"));
}

#[test]
fn neofetch_shows_video_geometry() {
    let mut h = Harness::new();
    h.exec("neofetch");
    assert!(h.output().contains("EmberOS"));
    assert!(h.output().contains("1280 x 800"));
}

#[test]
fn cowsay_wraps_the_message() {
    let mut h = Harness::new();
    h.exec("cowsay hello there");
    assert!(h.output().contains("< hello there >"));
    assert!(h.output().contains("(oo)"));

    h.exec("cowsay");
    assert!(h.output().contains("use: cowsay <message...>"));
}

// ---- mount / unmount / automount ----

#[test]
fn unmount_on_empty_slot_is_a_noop() {
    let mut h = Harness::new();
    assert_eq!(h.exec("unmount"), Flow::Continue);
    assert!(h.output().contains("nothing currently mounted"));
    assert!(!h.mount.is_mounted());
}

#[test]
fn mount_then_remount_conflicts_until_unmount() {
    let mut h = Harness::new().with_boot_disk();

    h.exec("mount ata 0 simplefs");
    assert!(h.output().contains("mounted simplefs on ata unit 0"));
    assert!(h.mount.is_mounted());

    h.exec("mount ata 0 simplefs");
    assert!(h.output().contains("root filesystem already mounted"));

    h.exec("unmount");
    assert!(h.output().contains("unmounting root directory"));
    assert!(!h.mount.is_mounted());

    h.exec("mount ata 0 simplefs");
    assert!(h.mount.is_mounted());
}

#[test]
fn mount_reports_missing_device() {
    let mut h = Harness::new();
    h.fs.register(&SIMPLEFS);
    h.exec("mount ata 0 simplefs");
    assert!(h.output().contains("mount: couldn't open device ata unit 0"));
}

#[test]
fn mount_releases_device_on_unknown_fstype() {
    let mut h = Harness::new().with_boot_disk();
    h.exec("mount ata 0 vfat");
    assert!(h.output().contains("mount: invalid fs type: vfat"));
    assert!(!h.mount.is_mounted());
    // The descriptor opened for the attempt was released again.
    assert_eq!(h.devices.open_count("ata", 0), 0);
}

#[test]
fn mount_releases_device_when_volume_open_fails() {
    let mut h = Harness::new().with_boot_disk();
    // Unit 1 holds garbage — no superblock.
    h.devices.register("ata", 1, Box::new(RamDisk::new(16, 512)));

    h.exec("mount ata 1 simplefs");
    assert!(h.output().contains("mount: couldn't mount simplefs on ata unit 1"));
    assert_eq!(h.devices.open_count("ata", 1), 0);
}

#[test]
fn mount_releases_device_when_root_is_missing() {
    let mut h = Harness::new().with_boot_disk();
    h.fs.register(&NOROOT_FS);

    h.exec("mount ata 0 norootfs");
    assert!(h.output().contains("mount: couldn't find root dir on ata unit 0"));
    assert!(!h.mount.is_mounted());
    assert_eq!(h.devices.open_count("ata", 0), 0);
}

#[test]
fn automount_probes_all_candidates_in_order() {
    let mut h = Harness::new();
    h.fs.register(&SIMPLEFS);
    // No devices at all: every candidate fails.
    h.exec("automount");

    let out = h.output();
    assert_eq!(out.matches("automount: trying").count(), 8);
    for unit in 0..4 {
        assert!(out.contains(&alloc::format!("trying atapi unit {}", unit)));
        assert!(out.contains(&alloc::format!("trying ata unit {}", unit)));
    }
    // Optical class exhausted before the disk class starts.
    let last_atapi = out.find("trying atapi unit 3").unwrap();
    let first_ata = out.find("trying ata unit 0").unwrap();
    assert!(last_atapi < first_ata);
    assert!(out.contains("automount: no bootable devices available"));
    assert!(!h.mount.is_mounted());
}

#[test]
fn automount_stops_at_first_success() {
    let mut h = Harness::new().with_boot_disk();
    h.exec("automount");

    let out = h.output();
    // atapi 0-3 fail, ata 0 succeeds; nothing after is probed.
    assert_eq!(out.matches("automount: trying").count(), 5);
    assert!(out.contains("automount: mounted simplefs on ata unit 0"));
    assert!(h.mount.is_mounted());
}

// ---- directory listing ----

#[test]
fn list_defaults_to_the_mount_root() {
    let mut h = Harness::new().with_boot_disk();
    h.exec("mount ata 0 simplefs");
    h.exec("list");

    assert!(h.output().contains("init.elf"));
    assert!(h.output().contains("notes.txt"));
    assert!(h.output().contains("core/"));
}

#[test]
fn list_walks_subdirectories() {
    let mut h = Harness::new().with_boot_disk();
    h.exec("mount ata 0 simplefs");
    h.exec("list /core/gui");
    assert!(h.output().contains("main.ebx"));
}

#[test]
fn list_on_a_file_reports_not_a_directory() {
    let mut h = Harness::new().with_boot_disk();
    h.exec("mount ata 0 simplefs");
    h.exec("list notes.txt");
    assert!(h.output().contains("list: notes.txt is not a directory"));
    // And it listed nothing.
    assert!(!h.output().contains("hello from emberos"));
}

#[test]
fn list_reports_missing_paths_and_missing_mount() {
    let mut h = Harness::new();
    h.exec("list");
    assert!(h.output().contains("list: no filesystem mounted"));

    let mut h = Harness::new().with_boot_disk();
    h.exec("mount ata 0 simplefs");
    h.exec("list /nope");
    assert!(h.output().contains("list: /nope does not exist"));
}

#[test]
fn mkdir_creates_a_visible_subdirectory() {
    let mut h = Harness::new().with_boot_disk();
    h.exec("mount ata 0 simplefs");

    h.exec("mkdir / data");
    h.exec("list");
    assert!(h.output().contains("data/"));

    h.exec("mkdir /nope child");
    assert!(h.output().contains("mkdir: couldn't open /nope"));
}

#[test]
fn contents_displays_a_file_with_a_pause() {
    let mut h = Harness::new().with_boot_disk();
    h.exec("mount ata 0 simplefs");

    h.exec("contents notes.txt");
    assert!(h.output().contains("hello from emberos"));
    assert!(h.platform.calls.contains(&"delay"));

    h.exec("contents missing.txt");
    assert!(h.output().contains("contents: couldn't open missing.txt"));
}

#[test]
fn start_gui_shows_the_gui_image() {
    let mut h = Harness::new().with_boot_disk();
    h.exec("mount ata 0 simplefs");
    h.exec("startGUI");
    assert!(h.output().contains("[ember gui v0]"));
}

#[test]
fn start_gui_failure_keeps_the_shell() {
    let mut h = Harness::new();
    assert_eq!(h.exec("startGUI"), Flow::Continue);
    assert!(h.output().contains("startGUI: no filesystem mounted"));
}

// ---- process launcher ----

#[test]
fn start_spawns_detached_and_leaves_a_zombie() {
    let mut h = Harness::new().with_boot_disk();
    h.exec("mount ata 0 simplefs");

    assert_eq!(h.exec("start /init.elf arg1"), Flow::Continue);
    assert!(h.output().contains(&alloc::format!("started process {}", FIRST_PID)));

    // The default script exits after one round; the entry persists as a
    // zombie until someone reclaims it.
    let mut ctx = h.ctx();
    ctx.proc.yield_now();
    ctx.proc.yield_now();
    assert_eq!(h.procs.state(Pid(FIRST_PID)), Some(ProcState::Zombie(0)));
}

#[test]
fn run_waits_for_its_own_pid_and_reports_the_exit_code() {
    let mut h = Harness::new().with_boot_disk();
    h.exec("mount ata 0 simplefs");

    // A detached process that dies quickly, then the waited-on process
    // that takes longer and exits 42.
    h.procs.backend_mut().plan(SpawnOutcome::Exit { after_polls: 1, code: 7 });
    h.procs.backend_mut().plan(SpawnOutcome::Exit { after_polls: 6, code: 42 });

    h.exec("start /init.elf bg");
    let waited = Pid(FIRST_PID + 1);
    h.exec("run /init.elf a b");

    assert!(h
        .output()
        .contains(&alloc::format!("process {} exited with status 42", waited)));
    // The detached process's earlier termination did not satisfy the wait;
    // it is still there, as a zombie.
    assert_eq!(h.procs.state(Pid(FIRST_PID)), Some(ProcState::Zombie(7)));
    // The waited process was reclaimed by run.
    assert_eq!(h.procs.state(waited), None);
}

#[test]
fn start_reports_missing_files_and_spawn_failures() {
    let mut h = Harness::new();
    h.exec("start /init.elf");
    assert!(h.output().contains("start: no filesystem mounted"));

    let mut h = Harness::new().with_boot_disk();
    h.exec("mount ata 0 simplefs");

    h.exec("start /missing.elf");
    assert!(h.output().contains("start: couldn't find /missing.elf"));

    // Not an ELF image: the spawn itself fails.
    h.exec("run notes.txt");
    assert!(h.output().contains("run: couldn't start notes.txt"));

    // Backend refusal surfaces the same way.
    h.procs.backend_mut().plan(SpawnOutcome::Reject);
    h.exec("start /init.elf");
    assert!(h.output().contains("start: couldn't start /init.elf"));
}

#[test]
fn kill_unknown_pid_is_nonfatal() {
    let mut h = Harness::new();
    assert_eq!(h.exec("kill 99"), Flow::Continue);
    assert!(h.output().contains("kill: 99: no such process"));
}

#[test]
fn kill_requests_termination_of_a_running_process() {
    let mut h = Harness::new().with_boot_disk();
    h.exec("mount ata 0 simplefs");

    h.procs.backend_mut().plan(SpawnOutcome::RunUntilKilled);
    h.exec("start /init.elf daemon");
    h.exec(&alloc::format!("kill {}", FIRST_PID));

    assert_eq!(h.procs.backend_mut().kill_requests(), &[Pid(FIRST_PID)]);
}

// ---- shutdown sequencer ----

#[test]
fn shutdown_walks_every_stage_with_empty_mount() {
    let mut h = Harness::new();
    let mut ctx = h.ctx();
    let trace = super::shutdown::run_sequence(&mut ctx);

    assert_eq!(
        trace,
        vec![
            ShutdownStage::Running,
            ShutdownStage::Terminating,
            ShutdownStage::Unmounting,
            ShutdownStage::PoweringOff,
            ShutdownStage::Halted,
        ]
    );
    assert_eq!(h.platform.calls, vec!["delay", "delay", "power_off", "halt"]);
    assert!(h.output().contains("System halted."));
}

#[test]
fn shutdown_unmounts_a_populated_slot() {
    let mut h = Harness::new().with_boot_disk();
    h.exec("mount ata 0 simplefs");
    assert!(h.mount.is_mounted());

    let mut ctx = h.ctx();
    let trace = super::shutdown::run_sequence(&mut ctx);
    assert!(trace.contains(&ShutdownStage::Unmounting));
    assert!(!h.mount.is_mounted());
    assert!(h.output().contains("unmounted root filesystem"));
}

#[test]
fn shutdown_sweeps_running_processes() {
    let mut h = Harness::new().with_boot_disk();
    h.exec("mount ata 0 simplefs");

    h.procs.backend_mut().plan(SpawnOutcome::RunUntilKilled);
    h.procs.backend_mut().plan(SpawnOutcome::RunUntilKilled);
    h.exec("start /init.elf one");
    h.exec("start /init.elf two");

    assert_eq!(h.exec("shutdown"), Flow::Halted);
    let kills = h.procs.backend_mut().kill_requests().to_vec();
    assert!(kills.contains(&Pid(FIRST_PID)));
    assert!(kills.contains(&Pid(FIRST_PID + 1)));
}

#[test]
fn shutdown_cowsay_requires_a_message() {
    let mut h = Harness::new();
    assert_eq!(h.exec("shutdown cowsay"), Flow::Continue);
    assert!(h.output().contains("use: shutdown cowsay <message...>"));
    // No side effects: the platform was never touched.
    assert!(h.platform.calls.is_empty());
}

#[test]
fn shutdown_cowsay_prints_then_powers_off() {
    let mut h = Harness::new();
    assert_eq!(h.exec("shutdown cowsay so long"), Flow::Halted);

    let out = h.output();
    let bubble = out.find("< so long >").unwrap();
    let powering = out.find("Powering off...").unwrap();
    assert!(bubble < powering);
    assert!(h.platform.calls.contains(&"power_off"));
}

#[test]
fn reboot_resets_then_halts() {
    let mut h = Harness::new();
    assert_eq!(h.exec("reboot"), Flow::Halted);
    assert_eq!(h.platform.calls, vec!["reboot", "halt"]);
}

// ---- the full loop ----

#[test]
fn loop_dispatches_until_shutdown() {
    let mut h = Harness::new();
    h.console = MockConsole::new("help\rbogus\rshutdown\r");

    let mut ctx = h.ctx();
    run(&mut ctx);

    let out = h.output();
    assert!(out.contains("Commands:"));
    assert!(out.contains("bogus: command not found"));
    assert!(out.contains("System halted."));
}

#[test]
fn loop_discards_overflowing_input_without_dispatch() {
    let mut h = Harness::new();
    let mut script = String::new();
    for _ in 0..LINE_CAP + 1 {
        script.push('z');
    }
    // No CR before the overflow; afterwards shut the loop down cleanly.
    script.push_str("\rshutdown\r");
    h.console = MockConsole::new(&script);

    let mut ctx = h.ctx();
    run(&mut ctx);

    let out = h.output();
    assert!(out.contains("input exceeded"));
    // The oversized junk never reached the dispatcher.
    assert!(!out.contains("command not found"));
}
