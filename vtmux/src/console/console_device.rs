// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words termios XLATE MEDIUMRAW METABIT ESCPREFIX

use std::{path::Path, rc::Rc};

use rustix::termios::Termios;
use strum_macros::{Display, EnumString};

use super::kd_ioctl::{K_MEDIUMRAW, K_METABIT, K_OFF, K_RAW, K_UNICODE, K_XLATE};

/// Single-threaded shared handle to the console. Sessions, the keyboard codec, the
/// console driver and the controller all hold one.
pub type SharedConsole = Rc<dyn ConsoleDevice>;

/// Scroll lock LED / lock bit.
pub const LED_SCROLL_LOCK: u8 = 0x01;
/// Num lock LED / lock bit.
pub const LED_NUM_LOCK: u8 = 0x02;
/// Caps lock LED / lock bit.
pub const LED_CAPS_LOCK: u8 = 0x04;

/// The kernel's keyboard delivery mode (`KDGKBMODE` / `KDSKBMODE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KbMode {
    Raw,
    Xlate,
    MediumRaw,
    Unicode,
    Off,
}

impl KbMode {
    #[must_use]
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            K_RAW => Some(KbMode::Raw),
            K_XLATE => Some(KbMode::Xlate),
            K_MEDIUMRAW => Some(KbMode::MediumRaw),
            K_UNICODE => Some(KbMode::Unicode),
            K_OFF => Some(KbMode::Off),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_raw(self) -> i32 {
        match self {
            KbMode::Raw => K_RAW,
            KbMode::Xlate => K_XLATE,
            KbMode::MediumRaw => K_MEDIUMRAW,
            KbMode::Unicode => K_UNICODE,
            KbMode::Off => K_OFF,
        }
    }
}

/// How the multiplexer asks the kernel to deliver keys while it owns the VT.
///
/// - [`Unicode`] delivers UTF-8 text, which goes to the shell verbatim.
/// - [`MediumRaw`] delivers keycodes, which the [`KeyboardCodec`] translates. Only this
///   mode sees the session shortcuts.
///
/// [`Unicode`]: Self::Unicode
/// [`MediumRaw`]: Self::MediumRaw
/// [`KeyboardCodec`]: crate::KeyboardCodec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum KeyboardMode {
    #[default]
    Unicode,
    MediumRaw,
}

impl From<KeyboardMode> for KbMode {
    fn from(mode: KeyboardMode) -> Self {
        match mode {
            KeyboardMode::Unicode => KbMode::Unicode,
            KeyboardMode::MediumRaw => KbMode::MediumRaw,
        }
    }
}

/// How the keymap encodes the meta modifier (`KDGKBMETA`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetaMode {
    /// Set the high bit of the byte.
    MetaBit,
    /// Prefix the byte with `ESC`.
    #[default]
    EscPrefix,
}

impl MetaMode {
    #[must_use]
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            K_METABIT => MetaMode::MetaBit,
            _ => MetaMode::EscPrefix,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub rows: u16,
    pub cols: u16,
}

impl Default for WindowSize {
    fn default() -> Self { Self { rows: 25, cols: 80 } }
}

impl WindowSize {
    /// Size handed to a shell: everything but the status row.
    #[must_use]
    pub fn shell_area(self) -> WindowSize {
        WindowSize {
            rows: self.rows.saturating_sub(1).max(1),
            cols: self.cols,
        }
    }
}

/// Terminal attributes captured before entering raw mode. A device that has no real
/// termios (a test double) saves [`None`].
#[derive(Debug, Clone, Default)]
pub struct SavedTermios(pub Option<Termios>);

/// The ioctl-level console collaborator.
///
/// Everything takes `&self`; implementations talk to the kernel (or record calls) and
/// keep no state the caller relies on. Errors are plain [`std::io::Error`]s; callers
/// decide whether a failure is fatal.
pub trait ConsoleDevice {
    /// # Errors
    /// `KDGKBMODE` failed (not a VT).
    fn keyboard_mode(&self) -> std::io::Result<KbMode>;

    /// # Errors
    /// `KDSKBMODE` failed.
    fn set_keyboard_mode(&self, mode: KbMode) -> std::io::Result<()>;

    /// Save the current termios, then apply raw mode with `VMIN=1`, `VTIME=0` using
    /// `TCSAFLUSH`. Returns what was saved.
    ///
    /// # Errors
    /// `tcgetattr` or `tcsetattr` failed.
    fn enter_raw_mode(&self) -> std::io::Result<SavedTermios>;

    /// # Errors
    /// `tcsetattr` failed.
    fn restore_termios(&self, saved: &SavedTermios) -> std::io::Result<()>;

    /// Lock LED bits ([`LED_SCROLL_LOCK`], [`LED_NUM_LOCK`], [`LED_CAPS_LOCK`]).
    ///
    /// # Errors
    /// `KDGKBLED` failed.
    fn leds(&self) -> std::io::Result<u8>;

    /// # Errors
    /// `KDSKBLED` failed.
    fn set_leds(&self, leds: u8) -> std::io::Result<()>;

    /// Keysym at `index` in keymap `table` (`KDGKBENT`).
    ///
    /// # Errors
    /// `KDGKBENT` failed.
    fn keymap_entry(&self, table: u8, index: u8) -> std::io::Result<u16>;

    /// String bound to function key `func` (`KDGKBSENT`), without the NUL.
    ///
    /// # Errors
    /// `KDGKBSENT` failed.
    fn function_string(&self, func: u8) -> std::io::Result<Vec<u8>>;

    /// # Errors
    /// `KDGKBMETA` failed.
    fn meta_mode(&self) -> std::io::Result<MetaMode>;

    /// Console geometry. Needs privilege on some systems.
    ///
    /// # Errors
    /// `TIOCGWINSZ` failed.
    fn window_size(&self) -> std::io::Result<WindowSize>;

    /// Send kernel console messages to `slave` (`TIOCCONS`), or back to the console
    /// when `None`. Needs privilege.
    ///
    /// # Errors
    /// Opening the tty or `TIOCCONS` failed.
    fn redirect_console(&self, slave: Option<&Path>) -> std::io::Result<()>;

    /// `VT_SETMODE` with `VT_PROCESS`: the kernel asks before switching away, with
    /// `release_signal`, and announces the switch back with `acquire_signal`.
    ///
    /// # Errors
    /// `VT_SETMODE` failed (not a VT).
    fn set_vt_process_mode(&self, release_signal: i32, acquire_signal: i32)
    -> std::io::Result<()>;

    /// # Errors
    /// `VT_SETMODE` failed.
    fn set_vt_auto_mode(&self) -> std::io::Result<()>;

    /// Acknowledge a release request (`VT_RELDISP 1`).
    ///
    /// # Errors
    /// `VT_RELDISP` failed.
    fn release_display(&self) -> std::io::Result<()>;

    /// Whether this VT is the one the kernel is showing.
    ///
    /// # Errors
    /// `VT_GETSTATE` or `fstat` failed.
    fn is_active_vt(&self) -> std::io::Result<bool>;

    /// Switch to VT `number` (1 based).
    ///
    /// # Errors
    /// `VT_ACTIVATE` failed.
    fn activate_vt(&self, number: u16) -> std::io::Result<()>;
}
