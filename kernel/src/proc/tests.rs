/// Unit tests for the process table — spawn validation, the zombie
/// lifecycle, targeted waits, and kill semantics, all over the scripted
/// backend.
use alloc::vec;
use alloc::vec::Vec;

use crate::fs::{FileHandle, FsError};
use super::*;

/// In-memory executable image for spawning.
struct MemFile {
    data: Vec<u8>,
    pos: usize,
}

impl MemFile {
    fn elf() -> Self {
        let mut data = vec![0x7F, b'E', b'L', b'F'];
        data.extend_from_slice(&[0u8; 60]);
        Self { data, pos: 0 }
    }

    fn text(content: &[u8]) -> Self {
        Self {
            data: content.to_vec(),
            pos: 0,
        }
    }
}

impl FileHandle for MemFile {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

fn table() -> ProcessTable<ScriptedExec> {
    ProcessTable::new(ScriptedExec::new())
}

#[test]
fn spawn_rejects_non_elf_images() {
    let mut procs = table();
    let mut file = MemFile::text(b"#!/bin/sh\necho hi\n");
    assert_eq!(
        procs.spawn(&mut file, &["script"]),
        Err(ProcError::SpawnFailed)
    );
}

#[test]
fn spawn_allocates_increasing_pids() {
    let mut procs = table();
    let a = procs.spawn(&mut MemFile::elf(), &["a"]).unwrap();
    let b = procs.spawn(&mut MemFile::elf(), &["b"]).unwrap();
    assert_eq!(a, Pid(FIRST_PID));
    assert_eq!(b, Pid(FIRST_PID + 1));
}

#[test]
fn null_exec_refuses_every_launch() {
    let mut procs = ProcessTable::new(NullExec);
    assert_eq!(
        procs.spawn(&mut MemFile::elf(), &["a"]),
        Err(ProcError::SpawnFailed)
    );
    // A refused launch leaves no entry behind.
    assert_eq!(procs.state(Pid(FIRST_PID)), None);
}

#[test]
fn wait_returns_the_target_exit_code() {
    let mut backend = ScriptedExec::new();
    backend.plan(SpawnOutcome::Exit { after_polls: 4, code: 42 });
    let mut procs = ProcessTable::new(backend);

    let pid = procs.spawn(&mut MemFile::elf(), &["job"]).unwrap();
    assert_eq!(procs.wait_for(pid), Ok(42));
    // Waited but not reclaimed: still a zombie.
    assert_eq!(procs.state(pid), Some(ProcState::Zombie(42)));
}

#[test]
fn wait_ignores_unrelated_terminations() {
    let mut backend = ScriptedExec::new();
    // The detached process dies almost immediately; the waited-on process
    // takes several more rounds.
    backend.plan(SpawnOutcome::Exit { after_polls: 1, code: 7 });
    backend.plan(SpawnOutcome::Exit { after_polls: 6, code: 42 });
    let mut procs = ProcessTable::new(backend);

    let detached = procs.spawn(&mut MemFile::elf(), &["bg"]).unwrap();
    let waited = procs.spawn(&mut MemFile::elf(), &["fg"]).unwrap();

    // The wait must be satisfied by `waited` alone, with `detached`'s
    // earlier termination absorbed as a zombie along the way.
    assert_eq!(procs.wait_for(waited), Ok(42));
    assert_eq!(procs.state(detached), Some(ProcState::Zombie(7)));
}

#[test]
fn wait_for_unknown_pid_fails() {
    let mut procs = table();
    assert_eq!(procs.wait_for(Pid(99)), Err(ProcError::NoSuchProcess));
}

#[test]
fn zombie_persists_until_reclaimed() {
    let mut procs = table();
    let pid = procs.spawn(&mut MemFile::elf(), &["job"]).unwrap();

    // Let the default script (exit after one round) run its course.
    procs.yield_now();
    procs.yield_now();
    assert_eq!(procs.state(pid), Some(ProcState::Zombie(0)));
    assert_eq!(procs.zombie_count(), 1);

    assert_eq!(procs.reclaim(pid), Ok(()));
    assert_eq!(procs.state(pid), None);
    assert_eq!(procs.reclaim(pid), Err(ProcError::NoSuchProcess));
}

#[test]
fn reclaim_refuses_running_process() {
    let mut backend = ScriptedExec::new();
    backend.plan(SpawnOutcome::RunUntilKilled);
    let mut procs = ProcessTable::new(backend);

    let pid = procs.spawn(&mut MemFile::elf(), &["daemon"]).unwrap();
    assert_eq!(procs.reclaim(pid), Err(ProcError::StillRunning));
}

#[test]
fn kill_terminates_without_reclaiming() {
    let mut backend = ScriptedExec::new();
    backend.plan(SpawnOutcome::RunUntilKilled);
    let mut procs = ProcessTable::new(backend);

    let pid = procs.spawn(&mut MemFile::elf(), &["daemon"]).unwrap();
    assert_eq!(procs.kill(pid), Ok(()));

    // Termination arrives asynchronously; the entry stays a zombie.
    procs.yield_now();
    procs.yield_now();
    assert_eq!(procs.state(pid), Some(ProcState::Zombie(KILLED_EXIT_CODE)));

    // Killing again is a reported failure, not an escalation.
    assert_eq!(procs.kill(pid), Err(ProcError::AlreadyTerminated));
    assert_eq!(procs.kill(Pid(1234)), Err(ProcError::NoSuchProcess));
}

#[test]
fn run_sequence_wait_then_reclaim() {
    let mut backend = ScriptedExec::new();
    backend.plan(SpawnOutcome::Exit { after_polls: 3, code: 5 });
    let mut procs = ProcessTable::new(backend);

    let pid = procs.spawn(&mut MemFile::elf(), &["job", "arg"]).unwrap();
    let code = procs.wait_for(pid).unwrap();
    assert_eq!(code, 5);
    assert_eq!(procs.reclaim(pid), Ok(()));
    assert_eq!(procs.zombie_count(), 0);
}
