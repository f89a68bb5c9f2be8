// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words keysym keysyms keymap ALTGR CAPSSHIFT NOSUCHMAP CAPSON BARENUMLOCK
// cspell:words PGUP PGDN

//! Kernel keymap values, from `<linux/keyboard.h>`. A keysym is `(kind << 8) | value`.

/// A kernel keymap value.
pub type Keysym = u16;

#[must_use]
pub const fn make_keysym(kind: u8, value: u8) -> Keysym { ((kind as u16) << 8) | value as u16 }

#[must_use]
pub const fn keysym_kind(keysym: Keysym) -> u8 { (keysym >> 8) as u8 }

#[must_use]
pub const fn keysym_value(keysym: Keysym) -> u8 { (keysym & 0xff) as u8 }

// ╭──────────────────────────────────────────────────────────╮
// │ Table sizes                                              │
// ╰──────────────────────────────────────────────────────────╯

pub const NR_KEYS: usize = 256;
pub const NR_SHIFT: usize = 9;
pub const NR_PAD: u8 = 20;
pub const NR_ASCII: u8 = 26;

// ╭──────────────────────────────────────────────────────────╮
// │ Kinds                                                    │
// ╰──────────────────────────────────────────────────────────╯

pub const KT_LATIN: u8 = 0;
pub const KT_FN: u8 = 1;
pub const KT_SPEC: u8 = 2;
pub const KT_PAD: u8 = 3;
pub const KT_DEAD: u8 = 4;
pub const KT_CONS: u8 = 5;
pub const KT_CUR: u8 = 6;
pub const KT_SHIFT: u8 = 7;
pub const KT_META: u8 = 8;
pub const KT_ASCII: u8 = 9;
pub const KT_LOCK: u8 = 10;
pub const KT_LETTER: u8 = 11;

// ╭──────────────────────────────────────────────────────────╮
// │ Shift kinds (bit index in the shift state)               │
// ╰──────────────────────────────────────────────────────────╯

pub const KG_SHIFT: u8 = 0;
pub const KG_ALTGR: u8 = 1;
pub const KG_CTRL: u8 = 2;
pub const KG_ALT: u8 = 3;
pub const KG_CAPSSHIFT: u8 = 8;

// ╭──────────────────────────────────────────────────────────╮
// │ Specific keysyms                                         │
// ╰──────────────────────────────────────────────────────────╯

pub const K_HOLE: Keysym = make_keysym(KT_SPEC, 0);
pub const K_ENTER: Keysym = make_keysym(KT_SPEC, 1);
pub const K_CAPS: Keysym = make_keysym(KT_SPEC, 7);
pub const K_NUM: Keysym = make_keysym(KT_SPEC, 8);
pub const K_CAPSON: Keysym = make_keysym(KT_SPEC, 12);
pub const K_BARENUMLOCK: Keysym = make_keysym(KT_SPEC, 19);
pub const K_NOSUCHMAP: Keysym = make_keysym(KT_SPEC, 127);

pub const K_FIND: Keysym = make_keysym(KT_FN, 20);
pub const K_INSERT: Keysym = make_keysym(KT_FN, 21);
pub const K_REMOVE: Keysym = make_keysym(KT_FN, 22);
pub const K_SELECT: Keysym = make_keysym(KT_FN, 23);
pub const K_PGUP: Keysym = make_keysym(KT_FN, 24);
pub const K_PGDN: Keysym = make_keysym(KT_FN, 25);

pub const K_P0: Keysym = make_keysym(KT_PAD, 0);
pub const K_P5: Keysym = make_keysym(KT_PAD, 5);

pub const K_DOWN: Keysym = make_keysym(KT_CUR, 0);
pub const K_LEFT: Keysym = make_keysym(KT_CUR, 1);
pub const K_RIGHT: Keysym = make_keysym(KT_CUR, 2);
pub const K_UP: Keysym = make_keysym(KT_CUR, 3);

pub const K_SHIFT: Keysym = make_keysym(KT_SHIFT, KG_SHIFT);
pub const K_CTRL: Keysym = make_keysym(KT_SHIFT, KG_CTRL);
pub const K_ALT: Keysym = make_keysym(KT_SHIFT, KG_ALT);
pub const K_CAPSSHIFT: Keysym = make_keysym(KT_SHIFT, KG_CAPSSHIFT);

pub const K_ASC0: Keysym = make_keysym(KT_ASCII, 0);
pub const K_HEX0: Keysym = make_keysym(KT_ASCII, 10);

/// Latin values reserved for multiplexer actions; they never reach the shell as text.
pub const ACTION_RANGE: std::ops::RangeInclusive<u8> = 0x80..=0x9f;
