/// The process table — pid allocation and lifecycle bookkeeping over an
/// execution backend.
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::fs::FileHandle;
use super::{ExecBackend, Pid, ProcError, ProcState, ProcessOps};

/// First pid handed out. Pid 1 is reserved for the shell itself.
pub const FIRST_PID: u32 = 2;

/// Executable images are ELF.
const ELF_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];

pub struct ProcessTable<B: ExecBackend> {
    backend: B,
    entries: BTreeMap<u32, ProcState>,
    next_pid: u32,
}

impl<B: ExecBackend> ProcessTable<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            entries: BTreeMap::new(),
            next_pid: FIRST_PID,
        }
    }

    /// Current state of `pid`, if it has an entry.
    pub fn state(&self, pid: Pid) -> Option<ProcState> {
        self.entries.get(&pid.0).copied()
    }

    /// Direct access to the execution backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Terminated-but-unreclaimed processes.
    pub fn zombie_count(&self) -> usize {
        self.entries
            .values()
            .filter(|s| matches!(s, ProcState::Zombie(_)))
            .count()
    }

    /// Absorb pending termination events from the backend.
    fn drain_terminations(&mut self) {
        while let Some((pid, code)) = self.backend.poll() {
            if let Some(state) = self.entries.get_mut(&pid.0) {
                if *state == ProcState::Running {
                    *state = ProcState::Zombie(code);
                }
            }
        }
    }

    fn read_image(file: &mut dyn FileHandle) -> Result<Vec<u8>, ProcError> {
        let mut image = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = file.read(&mut chunk).map_err(|_| ProcError::SpawnFailed)?;
            if n == 0 {
                break;
            }
            image.extend_from_slice(&chunk[..n]);
        }
        Ok(image)
    }
}

impl<B: ExecBackend> ProcessOps for ProcessTable<B> {
    fn spawn(&mut self, file: &mut dyn FileHandle, argv: &[&str]) -> Result<Pid, ProcError> {
        let image = Self::read_image(file)?;
        if !image.starts_with(&ELF_MAGIC) {
            return Err(ProcError::SpawnFailed);
        }

        let pid = Pid(self.next_pid);
        self.backend.launch(pid, &image, argv)?;
        self.next_pid += 1;
        self.entries.insert(pid.0, ProcState::Running);
        Ok(pid)
    }

    fn wait_for(&mut self, pid: Pid) -> Result<i32, ProcError> {
        if !self.entries.contains_key(&pid.0) {
            return Err(ProcError::NoSuchProcess);
        }

        // Terminations of other pids are absorbed into the table as zombies
        // but never satisfy this wait; only the target resumes us.
        loop {
            self.drain_terminations();
            match self.entries.get(&pid.0) {
                Some(ProcState::Zombie(code)) => return Ok(*code),
                Some(ProcState::Running) => {
                    self.backend.yield_hint();
                    core::hint::spin_loop();
                }
                None => return Err(ProcError::NoSuchProcess),
            }
        }
    }

    fn kill(&mut self, pid: Pid) -> Result<(), ProcError> {
        self.drain_terminations();
        match self.entries.get(&pid.0) {
            None => Err(ProcError::NoSuchProcess),
            Some(ProcState::Zombie(_)) => Err(ProcError::AlreadyTerminated),
            Some(ProcState::Running) => {
                // Fire-and-forget; the termination arrives via poll later.
                self.backend.kill(pid);
                Ok(())
            }
        }
    }

    fn reclaim(&mut self, pid: Pid) -> Result<(), ProcError> {
        self.drain_terminations();
        match self.entries.get(&pid.0) {
            None => Err(ProcError::NoSuchProcess),
            Some(ProcState::Running) => Err(ProcError::StillRunning),
            Some(ProcState::Zombie(_)) => {
                self.entries.remove(&pid.0);
                Ok(())
            }
        }
    }

    fn yield_now(&mut self) {
        self.backend.yield_hint();
        self.drain_terminations();
    }
}
