// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words KDGKBMODE KDSKBMODE KDGKBLED KDSKBLED KDGKBENT KDGKBSENT KDGKBMETA
// cspell:words TIOCCONS RELDISP GETSTATE SETMODE XLATE MEDIUMRAW METABIT ESCPREFIX
// cspell:words kbentry kbsentry relsig acqsig frsig waitv ioctls

//! Linux console ioctls that `libc` doesn't name. Request numbers and struct layouts
//! are from `<linux/kd.h>` and `<linux/vt.h>`.

use std::os::fd::{AsRawFd, BorrowedFd};

use libc::{c_int, c_short, c_uchar, c_ushort};

// ╭──────────────────────────────────────────────────────────╮
// │ Request numbers                                          │
// ╰──────────────────────────────────────────────────────────╯

pub const KDGKBMODE: u64 = 0x4B44;
pub const KDSKBMODE: u64 = 0x4B45;
pub const KDGKBENT: u64 = 0x4B46;
pub const KDGKBSENT: u64 = 0x4B48;
pub const KDGKBMETA: u64 = 0x4B62;
pub const KDGKBLED: u64 = 0x4B64;
pub const KDSKBLED: u64 = 0x4B65;
pub const VT_SETMODE: u64 = 0x5602;
pub const VT_GETSTATE: u64 = 0x5603;
pub const VT_RELDISP: u64 = 0x5605;
pub const VT_ACTIVATE: u64 = 0x5606;
pub const TIOCCONS: u64 = 0x541D;

// ╭──────────────────────────────────────────────────────────╮
// │ Argument values                                          │
// ╰──────────────────────────────────────────────────────────╯

pub const K_RAW: c_int = 0x00;
pub const K_XLATE: c_int = 0x01;
pub const K_MEDIUMRAW: c_int = 0x02;
pub const K_UNICODE: c_int = 0x03;
pub const K_OFF: c_int = 0x04;

pub const K_METABIT: c_int = 0x03;
pub const K_ESCPREFIX: c_int = 0x04;

pub const VT_AUTO: i8 = 0x00;
pub const VT_PROCESS: i8 = 0x01;

/// Max length of a function key string, including the terminating NUL.
pub const FUNC_STRING_LEN: usize = 512;

// ╭──────────────────────────────────────────────────────────╮
// │ Argument structs                                         │
// ╰──────────────────────────────────────────────────────────╯

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct KbEntry {
    pub kb_table: c_uchar,
    pub kb_index: c_uchar,
    pub kb_value: c_ushort,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct KbsEntry {
    pub kb_func: c_uchar,
    pub kb_string: [c_uchar; FUNC_STRING_LEN],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct VtMode {
    pub mode: i8,
    pub waitv: i8,
    pub relsig: c_short,
    pub acqsig: c_short,
    pub frsig: c_short,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct VtStat {
    pub v_active: c_ushort,
    pub v_signal: c_ushort,
    pub v_state: c_ushort,
}

// ╭──────────────────────────────────────────────────────────╮
// │ Wrappers                                                 │
// ╰──────────────────────────────────────────────────────────╯

fn check(result: c_int) -> std::io::Result<c_int> {
    if result == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(result)
    }
}

/// `ioctl(fd, request, arg)` where `arg` is passed by value.
pub fn ioctl_with_value(fd: BorrowedFd<'_>, request: u64, arg: libc::c_ulong) -> std::io::Result<c_int> {
    // SAFETY: the request takes an integer argument, no memory is shared.
    check(unsafe { libc::ioctl(fd.as_raw_fd(), request as _, arg) })
}

/// `ioctl(fd, request, &mut arg)`.
pub fn ioctl_with_ptr<T>(fd: BorrowedFd<'_>, request: u64, arg: &mut T) -> std::io::Result<c_int> {
    // SAFETY: `T` is the `#[repr(C)]` struct (or integer) `request` reads and writes,
    // and it outlives the call.
    check(unsafe { libc::ioctl(fd.as_raw_fd(), request as _, std::ptr::from_mut(arg)) })
}
