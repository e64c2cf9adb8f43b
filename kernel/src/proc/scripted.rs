/// Scripted execution backend — exercises the launcher and process table
/// without a scheduler. Each spawn consumes the next planned outcome;
/// terminations are delivered through `poll` after a scripted number of
/// polling rounds, so waits make progress deterministically.
use alloc::collections::VecDeque;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use super::{ExecBackend, Pid, ProcError};

/// Exit code reported for killed processes.
pub const KILLED_EXIT_CODE: i32 = -1;

/// What the next launched process should do.
#[derive(Debug, Clone, Copy)]
pub enum SpawnOutcome {
    /// Refuse the launch.
    Reject,
    /// Terminate with `code` after `after_polls` polling rounds.
    Exit { after_polls: u32, code: i32 },
    /// Keep running until killed.
    RunUntilKilled,
}

struct LiveProc {
    pid: Pid,
    polls_left: u64,
    code: i32,
}

pub struct ScriptedExec {
    script: VecDeque<SpawnOutcome>,
    live: Vec<LiveProc>,
    launches: Vec<(Pid, Vec<String>)>,
    kill_requests: Vec<Pid>,
    yields: u64,
}

impl ScriptedExec {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            live: Vec::new(),
            launches: Vec::new(),
            kill_requests: Vec::new(),
            yields: 0,
        }
    }

    /// Queue the outcome for the next unplanned launch. Launches beyond the
    /// script exit immediately with code 0.
    pub fn plan(&mut self, outcome: SpawnOutcome) {
        self.script.push_back(outcome);
    }

    /// Every launch seen, with its argv.
    pub fn launches(&self) -> &[(Pid, Vec<String>)] {
        &self.launches
    }

    /// Every kill request seen, in order.
    pub fn kill_requests(&self) -> &[Pid] {
        &self.kill_requests
    }

    /// How often the table yielded into the backend.
    pub fn yield_count(&self) -> u64 {
        self.yields
    }
}

impl ExecBackend for ScriptedExec {
    fn launch(&mut self, pid: Pid, _image: &[u8], argv: &[&str]) -> Result<(), ProcError> {
        let outcome = self
            .script
            .pop_front()
            .unwrap_or(SpawnOutcome::Exit { after_polls: 1, code: 0 });

        match outcome {
            SpawnOutcome::Reject => Err(ProcError::SpawnFailed),
            SpawnOutcome::Exit { after_polls, code } => {
                self.live.push(LiveProc {
                    pid,
                    polls_left: after_polls as u64,
                    code,
                });
                self.launches
                    .push((pid, argv.iter().map(|a| a.to_string()).collect()));
                Ok(())
            }
            SpawnOutcome::RunUntilKilled => {
                self.live.push(LiveProc {
                    pid,
                    polls_left: u64::MAX,
                    code: 0,
                });
                self.launches
                    .push((pid, argv.iter().map(|a| a.to_string()).collect()));
                Ok(())
            }
        }
    }

    fn poll(&mut self) -> Option<(Pid, i32)> {
        if let Some(idx) = self.live.iter().position(|p| p.polls_left == 0) {
            let done = self.live.swap_remove(idx);
            return Some((done.pid, done.code));
        }

        // Advance every countdown by one round; processes pinned at
        // u64::MAX only terminate via kill.
        for proc in &mut self.live {
            if proc.polls_left != u64::MAX {
                proc.polls_left -= 1;
            }
        }
        None
    }

    fn kill(&mut self, pid: Pid) -> bool {
        self.kill_requests.push(pid);
        match self.live.iter_mut().find(|p| p.pid == pid) {
            Some(proc) => {
                proc.polls_left = 0;
                proc.code = KILLED_EXIT_CODE;
                true
            }
            None => false,
        }
    }

    fn yield_hint(&mut self) {
        self.yields += 1;
    }
}
