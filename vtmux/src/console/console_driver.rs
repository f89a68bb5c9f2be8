// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words termios cfmakeraw

use std::os::fd::{AsFd, OwnedFd, RawFd};

use smallvec::SmallVec;

use super::{ConsoleSetupError, KbMode, KeyboardMode, SavedTermios, SharedConsole};
use crate::{NonBlockingChannel, SessionManager, ShellAction, SourceRegistrar,
            complete_prefix_len};

/// What the console looked like before the driver took it over.
#[derive(Debug, Clone)]
struct SavedConsoleState {
    termios: SavedTermios,
    kb_mode: KbMode,
}

/// Keyboard input from the controlling terminal, and the terminal modes that go
/// with it.
///
/// Raw mode is entered the first time this process acquires the VT
/// ([`switch_vc(true)`]) and kept from then on, across later releases and
/// acquisitions. [`destroy()`] puts the keyboard mode and termios back, once.
///
/// [`switch_vc(true)`]: Self::switch_vc
/// [`destroy()`]: Self::destroy
#[allow(missing_debug_implementations)]
pub struct ConsoleDriver {
    channel: NonBlockingChannel,
    console: SharedConsole,
    keyboard_mode: KeyboardMode,
    initialized: bool,
    saved: Option<SavedConsoleState>,
}

impl ConsoleDriver {
    /// Bind a duplicate of stdin.
    ///
    /// # Errors
    ///
    /// [`ConsoleSetupError`] if stdin can't be duplicated or made non-blocking.
    pub fn new(
        registrar: SourceRegistrar,
        console: SharedConsole,
        keyboard_mode: KeyboardMode,
    ) -> Result<Self, ConsoleSetupError> {
        let fd = rustix::io::fcntl_dupfd_cloexec(std::io::stdin().as_fd(), 0)
            .map_err(|errno| ConsoleSetupError::DupStdin(errno.into()))?;
        Self::with_fd(registrar, console, keyboard_mode, fd)
    }

    /// Bind `fd` as the keyboard input.
    ///
    /// # Errors
    ///
    /// [`ConsoleSetupError::Bind`] if `fd` can't be made non-blocking.
    pub fn with_fd(
        registrar: SourceRegistrar,
        console: SharedConsole,
        keyboard_mode: KeyboardMode,
        fd: OwnedFd,
    ) -> Result<Self, ConsoleSetupError> {
        let mut channel = NonBlockingChannel::new(registrar);
        channel.bind(Some(fd))?;
        Ok(Self {
            channel,
            console,
            keyboard_mode,
            initialized: false,
            saved: None,
        })
    }

    #[must_use]
    pub fn raw_fd(&self) -> Option<RawFd> { self.channel.raw_fd() }

    #[must_use]
    pub fn is_initialized(&self) -> bool { self.initialized }

    /// Read keyboard input and hand it to the active session. Without one, the input
    /// is dropped. Shortcuts the session recognizes are run on `manager`.
    ///
    /// In [`KeyboardMode::MediumRaw`], a keycode record split across reads is held
    /// back until the rest of it arrives.
    pub fn on_readable(&mut self, manager: &mut SessionManager) -> usize {
        let keyboard_mode = self.keyboard_mode;
        let mut actions: SmallVec<[ShellAction; 4]> = SmallVec::new();

        let read = self.channel.on_readable(|bytes| {
            let complete = match keyboard_mode {
                KeyboardMode::Unicode => bytes.len(),
                KeyboardMode::MediumRaw => complete_prefix_len(bytes),
            };
            if complete == 0 {
                return 0;
            }
            match manager.active_session_mut() {
                Some(session) => actions.extend(session.on_key_input(&bytes[..complete])),
                None => tracing::trace!(
                    message = "ConsoleDriver::on_readable -> no active session, input dropped",
                    len = complete
                ),
            }
            complete
        });

        for action in actions {
            manager.apply_action(action);
        }
        read
    }

    /// The VT was acquired (`enter`) or released. The first acquisition saves termios
    /// and keyboard mode, then switches to the configured keyboard mode and raw
    /// termios (`VMIN=1`, `VTIME=0`, `TCSAFLUSH`). Everything else is a no-op.
    pub fn switch_vc(&mut self, enter: bool) {
        if !enter || self.initialized {
            return;
        }
        self.initialized = true;

        let kb_mode = self.console.keyboard_mode().unwrap_or_else(|error| {
            tracing::warn!(
                message = "ConsoleDriver::switch_vc -> KDGKBMODE failed, assuming xlate",
                error = %error
            );
            KbMode::Xlate
        });

        if let Err(error) = self.console.set_keyboard_mode(self.keyboard_mode.into()) {
            tracing::warn!(
                message = "ConsoleDriver::switch_vc -> KDSKBMODE failed",
                mode = %self.keyboard_mode,
                error = %error
            );
        }

        let termios = self.console.enter_raw_mode().unwrap_or_else(|error| {
            tracing::warn!(
                message = "ConsoleDriver::switch_vc -> raw mode failed",
                error = %error
            );
            SavedTermios::default()
        });

        tracing::debug!(
            message = "ConsoleDriver::switch_vc -> console taken over",
            previous_kb_mode = ?kb_mode,
            kb_mode = %self.keyboard_mode
        );
        self.saved = Some(SavedConsoleState { termios, kb_mode });
    }

    /// Put back what [`switch_vc()`](Self::switch_vc) changed. Runs at most once; a
    /// driver that never took the console over does nothing.
    pub fn destroy(&mut self) {
        let Some(saved) = self.saved.take() else {
            return;
        };

        if let Err(error) = self.console.set_keyboard_mode(saved.kb_mode) {
            tracing::warn!(
                message = "ConsoleDriver::destroy -> restoring keyboard mode failed",
                error = %error
            );
        }
        if let Err(error) = self.console.restore_termios(&saved.termios) {
            tracing::warn!(
                message = "ConsoleDriver::destroy -> restoring termios failed",
                error = %error
            );
        }
        tracing::debug!(message = "ConsoleDriver::destroy -> console restored");
    }
}

impl Drop for ConsoleDriver {
    fn drop(&mut self) { self.destroy(); }
}
