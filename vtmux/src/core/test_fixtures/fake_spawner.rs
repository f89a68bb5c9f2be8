// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{cell::{Cell, RefCell},
          collections::HashSet,
          os::{fd::OwnedFd, unix::net::UnixStream},
          path::PathBuf,
          rc::Rc};

use nix::sys::signal::Signal;

use crate::{ChildHandle, ChildState, PtySpawner, ShellCommand, SpawnError, SpawnedPty,
            WindowSize};

/// What was done to a [`FakeChild`], in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildCall {
    Signal(Signal),
    TryWait,
    WaitBlocking,
}

/// Scripted [`ChildHandle`]. Clones share the call log.
#[derive(Debug, Clone)]
pub struct FakeChild {
    pid: i32,
    exit_after_polls: Option<usize>,
    polls: usize,
    calls: Rc<RefCell<Vec<ChildCall>>>,
}

impl FakeChild {
    /// A child that never exits on its own.
    pub fn new(pid: i32) -> Self {
        Self {
            pid,
            exit_after_polls: None,
            polls: 0,
            calls: Rc::default(),
        }
    }

    /// The child is gone on the `polls + 1`-th [`ChildHandle::try_wait()`].
    #[must_use]
    pub fn exit_after_polls(mut self, polls: usize) -> Self {
        self.exit_after_polls = Some(polls);
        self
    }

    pub fn calls(&self) -> Vec<ChildCall> { self.calls.borrow().clone() }
}

impl ChildHandle for FakeChild {
    fn pid(&self) -> i32 { self.pid }

    fn send_signal(&mut self, signal: Signal) -> std::io::Result<()> {
        self.calls.borrow_mut().push(ChildCall::Signal(signal));
        Ok(())
    }

    fn try_wait(&mut self) -> ChildState {
        self.calls.borrow_mut().push(ChildCall::TryWait);
        let gone = self.exit_after_polls.is_some_and(|limit| self.polls >= limit);
        self.polls += 1;
        if gone { ChildState::Gone } else { ChildState::Running }
    }

    fn wait_blocking(&mut self) { self.calls.borrow_mut().push(ChildCall::WaitBlocking); }
}

/// One child started by a [`FakeSpawner`].
#[derive(Debug)]
pub struct FakeSpawn {
    pub pid: i32,
    pub program: String,
    pub size: WindowSize,
    /// The "shell" end of the socket pair standing in for the pty.
    pub shell_end: UnixStream,
    pub child: FakeChild,
}

/// [`PtySpawner`] that hands out socket pairs instead of ptys. Children exit as soon as
/// they are asked to.
#[derive(Debug)]
pub struct FakeSpawner {
    next_pid: Cell<i32>,
    fail_all: Cell<bool>,
    failing: RefCell<HashSet<String>>,
    spawns: RefCell<Vec<FakeSpawn>>,
}

impl Default for FakeSpawner {
    fn default() -> Self {
        Self {
            next_pid: Cell::new(1000),
            fail_all: Cell::new(false),
            failing: RefCell::default(),
            spawns: RefCell::default(),
        }
    }
}

impl FakeSpawner {
    pub fn fail_program(&self, program: &str) {
        self.failing.borrow_mut().insert(program.to_string());
    }

    /// Every program fails to start, including the fallbacks.
    pub fn fail_all(&self) { self.fail_all.set(true); }

    pub fn spawned_programs(&self) -> Vec<String> {
        self.spawns
            .borrow()
            .iter()
            .map(|it| it.program.clone())
            .collect()
    }

    pub fn spawned_sizes(&self) -> Vec<WindowSize> {
        self.spawns.borrow().iter().map(|it| it.size).collect()
    }

    pub fn pids(&self) -> Vec<i32> { self.spawns.borrow().iter().map(|it| it.pid).collect() }

    /// A handle on the shell side of `pid`'s pty.
    pub fn shell_end(&self, pid: i32) -> UnixStream {
        self.spawns
            .borrow()
            .iter()
            .find(|it| it.pid == pid)
            .map(|it| it.shell_end.try_clone().unwrap())
            .unwrap()
    }

    pub fn child_calls(&self, pid: i32) -> Vec<ChildCall> {
        self.spawns
            .borrow()
            .iter()
            .find(|it| it.pid == pid)
            .map(|it| it.child.calls())
            .unwrap_or_default()
    }
}

impl PtySpawner for FakeSpawner {
    fn spawn(&self, command: &ShellCommand, size: WindowSize) -> Result<SpawnedPty, SpawnError> {
        if self.fail_all.get() || self.failing.borrow().contains(&command.program) {
            return Err(SpawnError::Exec {
                program: command.program.clone(),
                message: "scripted failure".into(),
            });
        }

        let (master, shell_end) = UnixStream::pair().map_err(|error| SpawnError::OpenPty {
            message: error.to_string(),
        })?;

        let pid = self.next_pid.get();
        self.next_pid.set(pid + 1);
        let child = FakeChild::new(pid).exit_after_polls(0);

        self.spawns.borrow_mut().push(FakeSpawn {
            pid,
            program: command.program.clone(),
            size,
            shell_end,
            child: child.clone(),
        });

        Ok(SpawnedPty {
            pid,
            master: OwnedFd::from(master),
            slave_path: Some(PathBuf::from(format!("/dev/pts/fake{pid}"))),
            child: Box::new(child),
        })
    }
}
