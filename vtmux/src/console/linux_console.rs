// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words termios seteuid getuid rdev TCSAFLUSH VMIN VTIME RELDISP GETSTATE
// cspell:words SETMODE TIOCCONS TIOCGWINSZ kbentry kbsentry

use std::{fs::{File, OpenOptions},
          os::fd::{AsFd, OwnedFd},
          path::Path};

use nix::unistd::{Uid, getuid, seteuid};
use rustix::termios::{OptionalActions, SpecialCodeIndex, tcgetattr, tcgetwinsize, tcsetattr};

use super::{ConsoleDevice, KbMode, MetaMode, SavedTermios, WindowSize,
            kd_ioctl::{FUNC_STRING_LEN, KDGKBENT, KDGKBLED, KDGKBMETA, KDGKBMODE,
                       KDGKBSENT, KDSKBLED, KDSKBMODE, KbEntry, KbsEntry, TIOCCONS,
                       VT_ACTIVATE, VT_AUTO, VT_GETSTATE, VT_PROCESS, VT_RELDISP,
                       VT_SETMODE, VtMode, VtStat, ioctl_with_ptr, ioctl_with_value}};

/// Path of the controlling terminal, used for geometry and to undo console redirection.
pub const CONTROLLING_TTY_PATH: &str = "/dev/tty";

/// The kernel only clears a `TIOCCONS` redirect when the ioctl is issued on this device.
pub const SYSTEM_CONSOLE_PATH: &str = "/dev/console";

/// [`ConsoleDevice`] backed by the real Linux virtual console.
///
/// Holds a duplicate of stdin, so the controller's stdin stays untouched for the
/// [`ConsoleDriver`]'s own duplicate.
///
/// [`ConsoleDriver`]: crate::ConsoleDriver
#[derive(Debug)]
pub struct LinuxConsole {
    fd: OwnedFd,
}

impl LinuxConsole {
    /// # Errors
    ///
    /// Returns the `dup` error.
    pub fn from_stdin() -> std::io::Result<Self> {
        let fd = rustix::io::dup(std::io::stdin().as_fd())?;
        Ok(Self { fd })
    }
}

/// Temporarily raises the effective uid to root for a privileged ioctl, and drops it
/// again on drop. If the process isn't setuid root the raise fails silently and the
/// ioctl runs with the caller's own privilege.
#[derive(Debug)]
pub struct PrivilegeGuard {
    elevated: bool,
}

impl PrivilegeGuard {
    #[must_use]
    pub fn acquire() -> Self {
        let elevated = match seteuid(Uid::from_raw(0)) {
            Ok(()) => true,
            Err(errno) => {
                tracing::debug!(
                    message = "PrivilegeGuard::acquire -> seteuid(0) failed, continuing",
                    error = %errno
                );
                false
            }
        };
        Self { elevated }
    }
}

impl Drop for PrivilegeGuard {
    fn drop(&mut self) {
        if self.elevated
            && let Err(errno) = seteuid(getuid())
        {
            tracing::warn!(
                message = "PrivilegeGuard::drop -> failed to restore effective uid",
                error = %errno
            );
        }
    }
}

fn open_tty(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().read(true).write(true).open(path)
}

impl ConsoleDevice for LinuxConsole {
    fn keyboard_mode(&self) -> std::io::Result<KbMode> {
        let mut raw: libc::c_int = 0;
        ioctl_with_ptr(self.fd.as_fd(), KDGKBMODE, &mut raw)?;
        KbMode::from_raw(raw).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unknown keyboard mode {raw}"),
            )
        })
    }

    fn set_keyboard_mode(&self, mode: KbMode) -> std::io::Result<()> {
        let raw = libc::c_ulong::try_from(mode.to_raw()).unwrap_or_default();
        ioctl_with_value(self.fd.as_fd(), KDSKBMODE, raw).map(drop)
    }

    fn enter_raw_mode(&self) -> std::io::Result<SavedTermios> {
        let saved = tcgetattr(&self.fd)?;
        let mut raw = saved.clone();
        raw.make_raw();
        raw.special_codes[SpecialCodeIndex::VMIN] = 1;
        raw.special_codes[SpecialCodeIndex::VTIME] = 0;
        tcsetattr(&self.fd, OptionalActions::Flush, &raw)?;
        Ok(SavedTermios(Some(saved)))
    }

    fn restore_termios(&self, saved: &SavedTermios) -> std::io::Result<()> {
        if let Some(termios) = saved.0.as_ref() {
            tcsetattr(&self.fd, OptionalActions::Flush, termios)?;
        }
        Ok(())
    }

    fn leds(&self) -> std::io::Result<u8> {
        let mut leds: libc::c_uchar = 0;
        ioctl_with_ptr(self.fd.as_fd(), KDGKBLED, &mut leds)?;
        Ok(leds)
    }

    fn set_leds(&self, leds: u8) -> std::io::Result<()> {
        ioctl_with_value(self.fd.as_fd(), KDSKBLED, libc::c_ulong::from(leds)).map(drop)
    }

    fn keymap_entry(&self, table: u8, index: u8) -> std::io::Result<u16> {
        let mut entry = KbEntry {
            kb_table: table,
            kb_index: index,
            kb_value: 0,
        };
        ioctl_with_ptr(self.fd.as_fd(), KDGKBENT, &mut entry)?;
        Ok(entry.kb_value)
    }

    fn function_string(&self, func: u8) -> std::io::Result<Vec<u8>> {
        let mut entry = KbsEntry {
            kb_func: func,
            kb_string: [0; FUNC_STRING_LEN],
        };
        ioctl_with_ptr(self.fd.as_fd(), KDGKBSENT, &mut entry)?;
        let len = entry
            .kb_string
            .iter()
            .position(|byte| *byte == 0)
            .unwrap_or(FUNC_STRING_LEN);
        Ok(entry.kb_string[..len].to_vec())
    }

    fn meta_mode(&self) -> std::io::Result<MetaMode> {
        let mut raw: libc::c_int = 0;
        ioctl_with_ptr(self.fd.as_fd(), KDGKBMETA, &mut raw)?;
        Ok(MetaMode::from_raw(raw))
    }

    fn window_size(&self) -> std::io::Result<WindowSize> {
        let _privilege = PrivilegeGuard::acquire();
        // The controlling tty reports the real size, tty0 does not.
        let tty = open_tty(Path::new(CONTROLLING_TTY_PATH))?;
        let size = tcgetwinsize(&tty)?;
        Ok(WindowSize {
            rows: size.ws_row,
            cols: size.ws_col,
        })
    }

    fn redirect_console(&self, slave: Option<&Path>) -> std::io::Result<()> {
        let _privilege = PrivilegeGuard::acquire();
        let target = open_tty(slave.unwrap_or_else(|| Path::new(SYSTEM_CONSOLE_PATH)))?;
        ioctl_with_value(target.as_fd(), TIOCCONS, 0).map(drop)
    }

    fn set_vt_process_mode(
        &self,
        release_signal: i32,
        acquire_signal: i32,
    ) -> std::io::Result<()> {
        let to_short = |signal: i32| {
            libc::c_short::try_from(signal).map_err(|_| {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "signal out of range")
            })
        };
        let mut mode = VtMode {
            mode: VT_PROCESS,
            waitv: 0,
            relsig: to_short(release_signal)?,
            acqsig: to_short(acquire_signal)?,
            frsig: 0,
        };
        ioctl_with_ptr(self.fd.as_fd(), VT_SETMODE, &mut mode).map(drop)
    }

    fn set_vt_auto_mode(&self) -> std::io::Result<()> {
        let mut mode = VtMode {
            mode: VT_AUTO,
            ..Default::default()
        };
        ioctl_with_ptr(self.fd.as_fd(), VT_SETMODE, &mut mode).map(drop)
    }

    fn release_display(&self) -> std::io::Result<()> {
        ioctl_with_value(self.fd.as_fd(), VT_RELDISP, 1).map(drop)
    }

    fn is_active_vt(&self) -> std::io::Result<bool> {
        let mut state = VtStat::default();
        ioctl_with_ptr(self.fd.as_fd(), VT_GETSTATE, &mut state)?;
        let stat = rustix::fs::fstat(&self.fd)?;
        let minor = rustix::fs::minor(stat.st_rdev);
        Ok(u32::from(state.v_active) == minor)
    }

    fn activate_vt(&self, number: u16) -> std::io::Result<()> {
        ioctl_with_value(self.fd.as_fd(), VT_ACTIVATE, libc::c_ulong::from(number)).map(drop)
    }
}
