// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words DECSC DECRC DECSTBM

//! The handful of console escape sequences the multiplexer writes itself. Everything
//! else on screen comes verbatim from the shells.

use std::fmt::Write as _;

/// `DECSC`.
pub const SAVE_CURSOR: &str = "\x1b7";
/// `DECRC`.
pub const RESTORE_CURSOR: &str = "\x1b8";
/// Device status report; the console answers with `ESC [ row ; col R`.
pub const REQUEST_CURSOR_POSITION: &str = "\x1b[6n";
pub const INVERSE: &str = "\x1b[7m";
/// Stands in for underline, which the Linux console can't draw.
pub const BLUE_BACKGROUND: &str = "\x1b[44m";
pub const RESET_ATTRIBUTES: &str = "\x1b[m";
pub const ERASE_TO_END_OF_LINE: &str = "\x1b[K";
pub const CLEAR_SCREEN: &str = "\x1b[H\x1b[J";
pub const DISABLE_CURSOR_BLINK: &str = "\x1b[?12l";

/// `CUP`, 1 based.
pub fn push_move_cursor(acc: &mut String, row: u16, col: u16) {
    // Writing to a String can't fail.
    _ = write!(acc, "\x1b[{row};{col}H");
}

/// `DECSTBM`, 1 based and inclusive.
pub fn push_scrolling_region(acc: &mut String, top: u16, bottom: u16) {
    _ = write!(acc, "\x1b[{top};{bottom}r");
}
