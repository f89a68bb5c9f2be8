// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words waitpid WNOHANG ECHILD EINTR SIGKILL

use std::time::Duration;

use nix::{errno::Errno,
          sys::{signal::{Signal, kill},
                wait::{WaitPidFlag, WaitStatus, waitpid}},
          unistd::Pid};

/// What a non-blocking wait found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildState {
    Running,
    /// Reaped now, or already reaped by someone else (`ECHILD`).
    Gone,
}

/// The child process of a session, as far as reaping is concerned.
pub trait ChildHandle {
    fn pid(&self) -> i32;

    /// # Errors
    /// The `kill` error.
    fn send_signal(&mut self, signal: Signal) -> std::io::Result<()>;

    fn try_wait(&mut self) -> ChildState;

    /// Block until the child is gone.
    fn wait_blocking(&mut self);
}

/// How long [`reap_child()`] waits for a child to exit after `SIGTERM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReapPolicy {
    pub polls: usize,
    pub interval: Duration,
}

impl Default for ReapPolicy {
    fn default() -> Self {
        Self {
            polls: 5,
            interval: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapOutcome {
    /// Exited on `SIGTERM` (or was already gone).
    Terminated,
    /// Needed `SIGKILL`.
    Killed,
}

/// Stop and reap `child`: `SIGTERM`, yield, and poll per `policy`; if it's still
/// around, `SIGKILL` and a blocking wait.
pub fn reap_child(child: &mut dyn ChildHandle, policy: ReapPolicy) -> ReapOutcome {
    if let Err(error) = child.send_signal(Signal::SIGTERM) {
        tracing::debug!(
            message = "reap_child -> SIGTERM failed",
            pid = child.pid(),
            error = %error
        );
    }
    std::thread::yield_now();

    if child.try_wait() == ChildState::Gone {
        return ReapOutcome::Terminated;
    }

    for _ in 0..policy.polls {
        std::thread::sleep(policy.interval);
        if child.try_wait() == ChildState::Gone {
            return ReapOutcome::Terminated;
        }
    }

    tracing::debug!(message = "reap_child -> escalating to SIGKILL", pid = child.pid());
    if let Err(error) = child.send_signal(Signal::SIGKILL) {
        tracing::debug!(
            message = "reap_child -> SIGKILL failed",
            pid = child.pid(),
            error = %error
        );
    }
    child.wait_blocking();
    ReapOutcome::Killed
}

/// [`ChildHandle`] for a real process, by pid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnixChild {
    pid: Pid,
}

impl UnixChild {
    #[must_use]
    pub fn new(pid: i32) -> Self { Self { pid: Pid::from_raw(pid) } }
}

impl ChildHandle for UnixChild {
    fn pid(&self) -> i32 { self.pid.as_raw() }

    fn send_signal(&mut self, signal: Signal) -> std::io::Result<()> {
        kill(self.pid, signal).map_err(std::io::Error::from)
    }

    fn try_wait(&mut self) -> ChildState {
        loop {
            match waitpid(self.pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => return ChildState::Running,
                Ok(_) | Err(Errno::ECHILD) => return ChildState::Gone,
                Err(Errno::EINTR) => {}
                Err(errno) => {
                    tracing::debug!(
                        message = "UnixChild::try_wait -> waitpid failed",
                        pid = self.pid.as_raw(),
                        error = %errno
                    );
                    return ChildState::Running;
                }
            }
        }
    }

    fn wait_blocking(&mut self) {
        loop {
            match waitpid(self.pid, None) {
                Err(Errno::EINTR) => {}
                Ok(WaitStatus::Stopped(..) | WaitStatus::Continued(_)) => {}
                _ => return,
            }
        }
    }
}
