/// Process launcher — the start/run/kill surface over the process table.
///
/// `start` spawns and returns to the prompt; whoever started the process
/// is responsible for reclaiming it, so a terminated-but-unreclaimed
/// process stays visible as a zombie. `run` spawns, waits for exactly that
/// pid, reports the exit code, and reclaims it.
use crate::fs::OpenFlags;
use crate::proc::Pid;
use super::ShellContext;
use crate::con_println;

/// Open `argv[0]` under the mount root and spawn it. Reports failures;
/// returns the pid on success.
fn spawn(ctx: &mut ShellContext, verb: &str, argv: &[&str]) -> Option<Pid> {
    let path = argv[0];

    let Some(root) = ctx.mount.root_mut() else {
        con_println!(ctx.console, "{}: no filesystem mounted", verb);
        return None;
    };

    let mut file = match root.open_file(path, OpenFlags::READ) {
        Ok(file) => file,
        Err(_) => {
            con_println!(ctx.console, "{}: couldn't find {}", verb, path);
            return None;
        }
    };

    match ctx.proc.spawn(file.as_mut(), argv) {
        Ok(pid) => {
            con_println!(ctx.console, "started process {}", pid);
            // Let the fresh process get a first slice of CPU.
            ctx.proc.yield_now();
            Some(pid)
        }
        Err(_) => {
            con_println!(ctx.console, "{}: couldn't start {}", verb, path);
            None
        }
    }
}

/// Spawn detached: return to the prompt immediately. Reclaiming the
/// process later is the operator's job.
pub fn start(ctx: &mut ShellContext, argv: &[&str]) {
    let _ = spawn(ctx, "start", argv);
}

/// Spawn, block until precisely that pid terminates, report its exit code,
/// and reclaim it.
pub fn run(ctx: &mut ShellContext, argv: &[&str]) {
    let Some(pid) = spawn(ctx, "run", argv) else {
        return;
    };

    match ctx.proc.wait_for(pid) {
        Ok(code) => {
            con_println!(ctx.console, "process {} exited with status {}", pid, code);
            if let Err(e) = ctx.proc.reclaim(pid) {
                con_println!(ctx.console, "run: reclaim {}: {}", pid, e);
            }
        }
        Err(e) => con_println!(ctx.console, "run: wait for {}: {}", pid, e),
    }
}

/// Request forced termination. Does not reclaim; failures are reported and
/// the loop continues.
pub fn kill(ctx: &mut ShellContext, pid: Pid) {
    if let Err(e) = ctx.proc.kill(pid) {
        con_println!(ctx.console, "kill: {}: {}", pid, e);
    }
}
