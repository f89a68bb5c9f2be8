// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words SIGCHLD SIGUSR SIGPIPE WNOHANG ECHILD EINTR waitpid

use libc::c_int;
use mio::event::Source;
use nix::{errno::Errno,
          sys::{signal::{SigHandler, Signal, signal},
                wait::{WaitPidFlag, WaitStatus, waitpid}},
          unistd::Pid};
use signal_hook::consts::{SIGCHLD, SIGHUP, SIGTERM, SIGUSR1, SIGUSR2};
use signal_hook_mio::v1_0::Signals;
use smallvec::SmallVec;

use super::SignalInstallError;

/// Signals the controller handles. All of them are delivered through the self-pipe and
/// nowhere else.
pub const HANDLED_SIGNALS: [c_int; 5] = [SIGCHLD, SIGUSR1, SIGUSR2, SIGTERM, SIGHUP];

/// The kernel asks this process to let go of the VT with this signal...
pub const VT_RELEASE_SIGNAL: c_int = SIGUSR1;
/// ...and announces it got the VT back with this one.
pub const VT_ACQUIRE_SIGNAL: c_int = SIGUSR2;

/// What a delivered signal means to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// `SIGTERM` or `SIGHUP`.
    Stop,
    /// `SIGUSR1`: another VT is being switched to.
    ReleaseVt,
    /// `SIGUSR2`: this VT is being switched to.
    AcquireVt,
    /// `SIGCHLD`.
    ChildExited,
}

impl ControlSignal {
    #[must_use]
    pub fn from_raw(signal: c_int) -> Option<Self> {
        match signal {
            SIGTERM | SIGHUP => Some(ControlSignal::Stop),
            VT_RELEASE_SIGNAL => Some(ControlSignal::ReleaseVt),
            VT_ACQUIRE_SIGNAL => Some(ControlSignal::AcquireVt),
            SIGCHLD => Some(ControlSignal::ChildExited),
            _ => None,
        }
    }
}

/// [`HANDLED_SIGNALS`] as readiness on the dispatcher's poll.
#[allow(missing_debug_implementations)]
pub struct SignalChannel {
    signals: Signals,
}

impl SignalChannel {
    /// Install handlers for [`HANDLED_SIGNALS`]. From here on those signals only make
    /// the pipe readable; `SIGTERM` and `SIGHUP` no longer terminate the process.
    ///
    /// # Errors
    ///
    /// [`SignalInstallError`] if a handler can't be installed.
    pub fn new() -> Result<Self, SignalInstallError> {
        let signals = Signals::new(HANDLED_SIGNALS).map_err(SignalInstallError)?;
        Ok(Self { signals })
    }

    /// The pipe, for registration with the dispatcher.
    pub fn source_mut(&mut self) -> &mut impl Source { &mut self.signals }

    /// Drain the pipe. Unknown signal numbers are skipped.
    pub fn pending(&mut self) -> SmallVec<[ControlSignal; 4]> {
        self.signals
            .pending()
            .filter_map(ControlSignal::from_raw)
            .collect()
    }
}

/// Ignore `SIGPIPE`, so writing to a pty whose shell is gone fails with `EPIPE`.
pub fn ignore_sigpipe() {
    // SAFETY: SIG_IGN installs no handler code.
    if let Err(errno) = unsafe { signal(Signal::SIGPIPE, SigHandler::SigIgn) } {
        tracing::debug!(message = "ignore_sigpipe -> failed", error = %errno);
    }
}

/// Reap every child that has exited, without blocking. Returns their pids.
#[must_use]
pub fn reap_exited_children() -> SmallVec<[i32; 4]> {
    let mut pids = SmallVec::new();
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(pid, _) | WaitStatus::Signaled(pid, _, _)) => {
                pids.push(pid.as_raw());
            }
            Err(Errno::EINTR) => {}
            Ok(_) | Err(Errno::ECHILD) => break,
            Err(errno) => {
                tracing::debug!(message = "reap_exited_children -> waitpid failed", error = %errno);
                break;
            }
        }
    }
    pids
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(SIGTERM => Some(ControlSignal::Stop))]
    #[test_case(SIGHUP => Some(ControlSignal::Stop))]
    #[test_case(SIGUSR1 => Some(ControlSignal::ReleaseVt))]
    #[test_case(SIGUSR2 => Some(ControlSignal::AcquireVt))]
    #[test_case(SIGCHLD => Some(ControlSignal::ChildExited))]
    #[test_case(libc::SIGWINCH => None)]
    fn test_from_raw(signal: c_int) -> Option<ControlSignal> { ControlSignal::from_raw(signal) }
}
