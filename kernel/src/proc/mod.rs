/// Process management — pid allocation, the zombie lifecycle, and the
/// execution-backend boundary.
///
/// The shell's launcher talks to `ProcessOps`; `ProcessTable` implements it
/// and owns the bookkeeping. Actual execution sits behind `ExecBackend`,
/// which is the scheduler's seam: `ScriptedExec` drives the host tests, and
/// the kernel wires `NullExec` until the scheduler lands.
mod table;
mod scripted;

pub use scripted::{ScriptedExec, SpawnOutcome, KILLED_EXIT_CODE};
pub use table::{ProcessTable, FIRST_PID};

#[cfg(test)]
mod tests;

use core::fmt;

use crate::fs::FileHandle;

/// Process identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcError {
    /// The image could not be loaded or the backend refused to run it.
    SpawnFailed,
    /// No process with that identifier.
    NoSuchProcess,
    /// The process already terminated (it may still be a zombie).
    AlreadyTerminated,
    /// Reclaim attempted on a process that has not terminated.
    StillRunning,
}

impl fmt::Display for ProcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcError::SpawnFailed => write!(f, "could not start process"),
            ProcError::NoSuchProcess => write!(f, "no such process"),
            ProcError::AlreadyTerminated => write!(f, "process already terminated"),
            ProcError::StillRunning => write!(f, "process still running"),
        }
    }
}

/// Observable process states. A terminated process stays a zombie, holding
/// its exit code, until it is explicitly reclaimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    Running,
    Zombie(i32),
}

/// The scheduler boundary. Launches images, reports terminations, accepts
/// kill requests.
pub trait ExecBackend {
    /// Start executing `image` under `pid`.
    fn launch(&mut self, pid: Pid, image: &[u8], argv: &[&str]) -> Result<(), ProcError>;

    /// Next pending termination event, if any.
    fn poll(&mut self) -> Option<(Pid, i32)>;

    /// Request forced termination. Returns whether the backend knew the pid.
    fn kill(&mut self, pid: Pid) -> bool;

    /// Give the backend a chance to run something else.
    fn yield_hint(&mut self) {}
}

/// The process interface the shell consumes.
pub trait ProcessOps {
    /// Load an executable image from `file` and spawn it with `argv`.
    /// Returns immediately with the new pid.
    fn spawn(&mut self, file: &mut dyn FileHandle, argv: &[&str]) -> Result<Pid, ProcError>;

    /// Block until `pid` — and only `pid` — terminates; return its exit
    /// code. The process remains a zombie until reclaimed.
    fn wait_for(&mut self, pid: Pid) -> Result<i32, ProcError>;

    /// Request forced termination of `pid`. Does not reclaim.
    fn kill(&mut self, pid: Pid) -> Result<(), ProcError>;

    /// Release a terminated process's entry.
    fn reclaim(&mut self, pid: Pid) -> Result<(), ProcError>;

    /// Yield once so fresh processes get to run.
    fn yield_now(&mut self);
}

/// Backend used by the kernel until the scheduler lands: every launch is
/// refused, so `start`/`run` report spawn failure at the prompt.
pub struct NullExec;

impl ExecBackend for NullExec {
    fn launch(&mut self, _pid: Pid, _image: &[u8], _argv: &[&str]) -> Result<(), ProcError> {
        Err(ProcError::SpawnFailed)
    }

    fn poll(&mut self) -> Option<(Pid, i32)> {
        None
    }

    fn kill(&mut self, _pid: Pid) -> bool {
        false
    }
}
