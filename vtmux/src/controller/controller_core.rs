// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words RELDISP SIGCHLD

use std::os::fd::RawFd;

use super::{ControlSignal, reap_exited_children};
use crate::{ConsoleDriver, Continuation, SessionManager, SharedConsole, SpawnError};

/// Everything the readiness loop drives, minus the loop itself and the signal pipe.
///
/// # Signal protocol
///
/// | Signal              | Effect                                                     |
/// |---------------------|------------------------------------------------------------|
/// | `SIGTERM`, `SIGHUP` | stop the loop                                              |
/// | `SIGUSR1`           | sessions leave the VT, then `VT_RELDISP 1`                 |
/// | `SIGUSR2`           | console raw mode (first time only), then sessions enter    |
/// | `SIGCHLD`           | once running, reap every exited child and match it by pid |
#[allow(missing_debug_implementations)]
pub struct ControllerCore {
    manager: SessionManager,
    console_driver: ConsoleDriver,
    console: SharedConsole,
    running: bool,
}

impl ControllerCore {
    #[must_use]
    pub fn new(
        manager: SessionManager,
        console_driver: ConsoleDriver,
        console: SharedConsole,
    ) -> Self {
        Self {
            manager,
            console_driver,
            console,
            running: false,
        }
    }

    #[must_use]
    pub fn manager(&self) -> &SessionManager { &self.manager }

    pub fn manager_mut(&mut self) -> &mut SessionManager { &mut self.manager }

    #[must_use]
    pub fn console_driver(&self) -> &ConsoleDriver { &self.console_driver }

    #[must_use]
    pub fn is_running(&self) -> bool { self.running }

    /// Take the VT as if the kernel had just handed it over, and start the first
    /// session.
    ///
    /// # Errors
    ///
    /// [`SpawnError`] if the first session can't be started.
    pub fn start(&mut self) -> Result<(), SpawnError> {
        self.handle_signal(ControlSignal::AcquireVt);
        self.manager.create_session()?;
        self.running = true;
        Ok(())
    }

    pub fn handle_signal(&mut self, signal: ControlSignal) -> Continuation {
        tracing::debug!(message = "ControllerCore::handle_signal", signal = ?signal);
        match signal {
            ControlSignal::Stop => return Continuation::Stop,
            ControlSignal::ReleaseVt => {
                self.manager.switch_vt(false);
                self.console_driver.switch_vc(false);
                if let Err(error) = self.console.release_display() {
                    tracing::warn!(message = "VT_RELDISP failed", error = %error);
                }
            }
            ControlSignal::AcquireVt => {
                self.console_driver.switch_vc(true);
                self.manager.switch_vt(true);
            }
            ControlSignal::ChildExited => {
                if self.running {
                    return self.handle_child_exits(reap_exited_children());
                }
            }
        }
        self.after_event()
    }

    /// Children `pids` were reaped.
    pub fn handle_child_exits(&mut self, pids: impl IntoIterator<Item = i32>) -> Continuation {
        for pid in pids {
            if !self.manager.child_process_exited(pid) {
                tracing::debug!(message = "ControllerCore -> reaped a child with no session", pid);
            }
        }
        self.after_event()
    }

    fn is_console(&self, fd: RawFd) -> bool { self.console_driver.raw_fd() == Some(fd) }

    pub fn on_descriptor_readable(&mut self, fd: RawFd) -> Continuation {
        if self.is_console(fd) {
            self.console_driver.on_readable(&mut self.manager);
        } else if !self.manager.on_session_readable(fd) {
            tracing::debug!(message = "ControllerCore -> readable descriptor with no owner", fd);
        }
        self.after_event()
    }

    pub fn on_descriptor_hangup(&mut self, fd: RawFd) -> Continuation {
        if self.is_console(fd) {
            tracing::warn!(message = "Console input hung up, stopping", fd);
            return Continuation::Stop;
        }
        self.manager.on_session_hangup(fd);
        self.after_event()
    }

    /// Run after every event: apply asynchronous IME output and stop once the last
    /// session is gone.
    fn after_event(&mut self) -> Continuation {
        self.manager.pump_ime_events();
        if self.manager.take_shutdown_request() {
            Continuation::Stop
        } else {
            Continuation::Continue
        }
    }

    /// Leaving the loop: if this VT is on screen, let go of it the way a release
    /// request would.
    pub fn stop(&mut self) {
        match self.console.is_active_vt() {
            Ok(true) => {
                self.handle_signal(ControlSignal::ReleaseVt);
            }
            Ok(false) => {}
            Err(error) => {
                tracing::debug!(message = "ControllerCore::stop -> VT_GETSTATE failed", error = %error);
            }
        }
        self.running = false;
    }

    /// Destroy all sessions, restore the console, and give VT switching back to the
    /// kernel.
    pub fn teardown(&mut self) {
        self.manager.shutdown();
        self.console_driver.destroy();
        if let Err(error) = self.console.set_vt_auto_mode() {
            tracing::debug!(message = "ControllerCore::teardown -> VT_AUTO failed", error = %error);
        }
    }
}
