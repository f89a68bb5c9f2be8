// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words keycode keysym keymap npadch numlock capslock ESCO applic

use std::collections::HashMap;

use smallvec::SmallVec;

use super::{keysym::*, ShellAction};
use crate::{ConsoleDevice, LED_CAPS_LOCK, LED_NUM_LOCK, MetaMode, TermModes};

/// Bytes for one key. Function key strings can be longer and spill to the heap.
pub type TermBytes = SmallVec<[u8; 8]>;

/// Keypad keysyms with num lock on, indexed by pad value.
const KEYPAD_NUM_MAP: [Keysym; 21] = [
    make_keysym(KT_LATIN, b'0'),
    make_keysym(KT_LATIN, b'1'),
    make_keysym(KT_LATIN, b'2'),
    make_keysym(KT_LATIN, b'3'),
    make_keysym(KT_LATIN, b'4'),
    make_keysym(KT_LATIN, b'5'),
    make_keysym(KT_LATIN, b'6'),
    make_keysym(KT_LATIN, b'7'),
    make_keysym(KT_LATIN, b'8'),
    make_keysym(KT_LATIN, b'9'),
    make_keysym(KT_LATIN, b'+'),
    make_keysym(KT_LATIN, b'-'),
    make_keysym(KT_LATIN, b'*'),
    make_keysym(KT_LATIN, b'/'),
    K_ENTER,
    make_keysym(KT_LATIN, b','),
    make_keysym(KT_LATIN, b'.'),
    make_keysym(KT_LATIN, b'?'),
    make_keysym(KT_LATIN, b'('),
    make_keysym(KT_LATIN, b')'),
    make_keysym(KT_LATIN, b'#'),
];

/// Keypad keysyms with num lock off.
const KEYPAD_FN_MAP: [Keysym; 21] = [
    K_INSERT,
    K_SELECT,
    K_DOWN,
    K_PGDN,
    K_LEFT,
    K_P5,
    K_RIGHT,
    K_FIND,
    K_UP,
    K_PGUP,
    make_keysym(KT_LATIN, b'+'),
    make_keysym(KT_LATIN, b'-'),
    make_keysym(KT_LATIN, b'*'),
    make_keysym(KT_LATIN, b'/'),
    K_ENTER,
    K_REMOVE,
    K_REMOVE,
    make_keysym(KT_LATIN, b'?'),
    make_keysym(KT_LATIN, b'('),
    make_keysym(KT_LATIN, b')'),
    make_keysym(KT_LATIN, b'#'),
];

/// Final byte of the application keypad sequence `ESC O x`, indexed by pad value.
const APPLICATION_KEYPAD_FINAL: &[u8; 21] = b"pqrstuvwxylSRQMnnmPQS";

/// Final byte of the cursor key sequences, indexed by cursor value.
const CURSOR_FINAL: &[u8; 4] = b"BDCA";

/// Stateful keycode → keysym → terminal bytes translation, mirroring what the kernel
/// does in `K_XLATE` / `K_UNICODE` mode, for a process that reads medium-raw keycodes.
///
/// The keymap itself stays in the kernel; entries are read through the
/// [`ConsoleDevice`] on first use and cached until the next [`reset()`].
///
/// [`reset()`]: Self::reset
#[derive(Debug, Clone)]
pub struct KeyboardCodec {
    /// Alt + keypad digits typed so far.
    npadch: Option<u32>,
    /// Bit `n` set while shift kind `n` is held; selects the keymap table.
    shift_state: u8,
    key_down: [bool; NR_KEYS],
    shift_down: [u8; NR_SHIFT],
    /// [`LED_SCROLL_LOCK`] | [`LED_NUM_LOCK`] | [`LED_CAPS_LOCK`].
    ///
    /// [`LED_SCROLL_LOCK`]: crate::LED_SCROLL_LOCK
    lock_state: u8,
    keymap: HashMap<(u8, u8), Keysym>,
}

impl Default for KeyboardCodec {
    fn default() -> Self { Self::new() }
}

impl KeyboardCodec {
    #[must_use]
    pub fn new() -> Self {
        Self {
            npadch: None,
            shift_state: 0,
            key_down: [false; NR_KEYS],
            shift_down: [0; NR_SHIFT],
            lock_state: 0,
            keymap: HashMap::new(),
        }
    }

    /// Forget all key state, drop the cached keymap, and read the lock LEDs.
    pub fn reset(&mut self, console: &dyn ConsoleDevice) {
        self.npadch = None;
        self.shift_state = 0;
        self.key_down = [false; NR_KEYS];
        self.shift_down = [0; NR_SHIFT];
        self.keymap.clear();
        self.lock_state = console.leds().unwrap_or_else(|error| {
            tracing::debug!(message = "KeyboardCodec::reset -> KDGKBLED failed", error = %error);
            0
        });
    }

    #[must_use]
    pub fn lock_state(&self) -> u8 { self.lock_state }

    #[must_use]
    pub fn shift_state(&self) -> u8 { self.shift_state }

    #[must_use]
    pub fn is_held(&self, shift_kind: u8) -> bool { self.shift_state & (1 << shift_kind) != 0 }

    fn lookup(&mut self, console: &dyn ConsoleDevice, table: u8, index: u8) -> Option<Keysym> {
        if let Some(keysym) = self.keymap.get(&(table, index)) {
            return Some(*keysym);
        }
        match console.keymap_entry(table, index) {
            Ok(keysym) => {
                self.keymap.insert((table, index), keysym);
                Some(keysym)
            }
            Err(error) => {
                tracing::debug!(
                    message = "KeyboardCodec::lookup -> KDGKBENT failed",
                    table,
                    index,
                    error = %error
                );
                None
            }
        }
    }

    fn update_leds(&self, console: &dyn ConsoleDevice) {
        if let Err(error) = console.set_leds(self.lock_state) {
            tracing::debug!(message = "KeyboardCodec -> KDSKBLED failed", error = %error);
        }
    }

    /// Translate a keycode event to its keysym, updating lock and shift state.
    ///
    /// Unmapped keys and keymap read failures give [`K_HOLE`].
    pub fn keycode_to_keysym(
        &mut self,
        console: &dyn ConsoleDevice,
        keycode: u16,
        down: bool,
        modes: &TermModes,
    ) -> Keysym {
        let Ok(index) = u8::try_from(keycode) else {
            return K_HOLE;
        };

        let repeat = down && self.key_down[usize::from(index)];
        self.key_down[usize::from(index)] = down;

        let Some(mut keysym) = self.lookup(console, self.shift_state, index) else {
            return K_HOLE;
        };

        if keysym_kind(keysym) == KT_LETTER && self.lock_state & LED_CAPS_LOCK != 0 {
            let Some(flipped) = self.lookup(console, self.shift_state ^ (1 << KG_SHIFT), index)
            else {
                return K_HOLE;
            };
            keysym = flipped;
        }

        if keysym == K_HOLE || keysym == K_NOSUCHMAP {
            return K_HOLE;
        }

        match keysym_kind(keysym) {
            KT_SPEC => self.on_lock_key(console, keysym, down && !repeat, modes),
            KT_SHIFT if !repeat => self.on_shift_key(console, keysym_value(keysym), down),
            _ => {}
        }

        keysym
    }

    fn on_lock_key(
        &mut self,
        console: &dyn ConsoleDevice,
        keysym: Keysym,
        fresh_press: bool,
        modes: &TermModes,
    ) {
        // In application keypad mode Num Lock is a key like any other.
        if keysym == K_NUM && modes.applic_keypad {
            return;
        }
        if !matches!(keysym, K_NUM | K_BARENUMLOCK | K_CAPS | K_CAPSON) || !fresh_press {
            return;
        }
        match keysym {
            K_NUM | K_BARENUMLOCK => self.lock_state ^= LED_NUM_LOCK,
            K_CAPS => self.lock_state ^= LED_CAPS_LOCK,
            _ => self.lock_state |= LED_CAPS_LOCK,
        }
        self.update_leds(console);
    }

    fn on_shift_key(&mut self, console: &dyn ConsoleDevice, value: u8, down: bool) {
        if usize::from(value) >= NR_SHIFT {
            return;
        }

        let mut value = value;
        if value == KG_CAPSSHIFT {
            value = KG_SHIFT;
            if down && self.lock_state & LED_CAPS_LOCK != 0 {
                self.lock_state &= !LED_CAPS_LOCK;
                self.update_leds(console);
            }
        }

        let counter = &mut self.shift_down[usize::from(value)];
        if down {
            *counter = counter.saturating_add(1);
        } else {
            *counter = counter.saturating_sub(1);
        }

        if *counter > 0 {
            self.shift_state |= 1 << value;
        } else {
            self.shift_state &= !(1 << value);
        }
    }

    fn redirect_keypad(&self, keysym: Keysym, modes: &TermModes) -> Keysym {
        let value = keysym_value(keysym);
        if modes.applic_keypad || keysym_kind(keysym) != KT_PAD || value >= NR_PAD {
            return keysym;
        }
        let map = if self.lock_state & LED_NUM_LOCK != 0 {
            &KEYPAD_NUM_MAP
        } else {
            &KEYPAD_FN_MAP
        };
        map[usize::from(value)]
    }

    /// Bytes the shell should receive for `keysym`. Most keys produce nothing on
    /// release; shift releases can complete an Alt + keypad character.
    pub fn keysym_to_term_string(
        &mut self,
        console: &dyn ConsoleDevice,
        keysym: Keysym,
        down: bool,
        modes: &TermModes,
    ) -> TermBytes {
        let mut bytes = TermBytes::new();

        if keysym_kind(keysym) != KT_SHIFT && !down {
            return bytes;
        }

        let keysym = self.redirect_keypad(keysym, modes);
        let value = keysym_value(keysym);

        match keysym_kind(keysym) {
            KT_LATIN | KT_LETTER => {
                if !ACTION_RANGE.contains(&value) {
                    push_char(&mut bytes, u32::from(value));
                }
            }
            KT_FN => match console.function_string(value) {
                Ok(string) => bytes.extend_from_slice(&string),
                Err(error) => tracing::debug!(
                    message = "KeyboardCodec -> KDGKBSENT failed",
                    func = value,
                    error = %error
                ),
            },
            KT_SPEC => {
                if keysym == K_ENTER {
                    bytes.push(b'\r');
                    if modes.cr_with_lf {
                        bytes.push(b'\n');
                    }
                } else if keysym == K_NUM && modes.applic_keypad {
                    bytes.extend_from_slice(b"\x1bOP");
                }
            }
            KT_PAD => {
                if modes.applic_keypad && self.shift_down[usize::from(KG_SHIFT)] == 0 {
                    if let Some(final_byte) = APPLICATION_KEYPAD_FINAL.get(usize::from(value)) {
                        bytes.extend_from_slice(&[0x1b, b'O', *final_byte]);
                    }
                } else if keysym == K_P5 && self.lock_state & LED_NUM_LOCK == 0 {
                    let introducer = if modes.applic_keypad { b'O' } else { b'[' };
                    bytes.extend_from_slice(&[0x1b, introducer, b'G']);
                }
            }
            KT_CUR => {
                if let Some(final_byte) = CURSOR_FINAL.get(usize::from(value)) {
                    let introducer = if modes.cursor_key_esc_o { b'O' } else { b'[' };
                    bytes.extend_from_slice(&[0x1b, introducer, *final_byte]);
                }
            }
            KT_META => match console.meta_mode().unwrap_or_default() {
                MetaMode::MetaBit => bytes.push(0x80 | value),
                MetaMode::EscPrefix => bytes.extend_from_slice(&[0x1b, value]),
            },
            KT_SHIFT => {
                if !down && let Some(code_point) = self.npadch.take() {
                    push_char(&mut bytes, code_point);
                }
            }
            KT_ASCII => {
                if value < NR_ASCII {
                    let hex0 = keysym_value(K_HEX0);
                    let (base, digit) = if value >= hex0 {
                        (16, value - hex0)
                    } else {
                        (10, value)
                    };
                    let digit = u32::from(digit);
                    self.npadch = Some(match self.npadch {
                        None => digit,
                        Some(accumulated) => {
                            accumulated.wrapping_mul(base).wrapping_add(digit)
                        }
                    });
                }
            }
            _ => {}
        }

        bytes
    }

    /// Recognize a session shortcut. Call after [`keycode_to_keysym()`] for the same
    /// event, so the shift state includes this key.
    ///
    /// [`keycode_to_keysym()`]: Self::keycode_to_keysym
    pub fn shortcut(
        &mut self,
        console: &dyn ConsoleDevice,
        keycode: u16,
        keysym: Keysym,
        down: bool,
    ) -> Option<ShellAction> {
        if !down {
            return None;
        }

        if keysym_kind(keysym) == KT_CONS {
            return Some(ShellAction::ActivateVt(u16::from(keysym_value(keysym)) + 1));
        }

        let ctrl_alt = self.is_held(KG_CTRL) && self.is_held(KG_ALT);
        if ctrl_alt {
            let index = u8::try_from(keycode).ok()?;
            let base = self.lookup(console, 0, index)?;
            if !matches!(keysym_kind(base), KT_LATIN | KT_LETTER) {
                return None;
            }
            return match keysym_value(base) {
                digit @ b'1'..=b'9' => Some(ShellAction::SwitchTo(usize::from(digit - b'1'))),
                b'0' => Some(ShellAction::SwitchTo(9)),
                b'c' => Some(ShellAction::Create),
                b'd' => Some(ShellAction::Delete),
                _ => None,
            };
        }

        if self.shift_state == 1 << KG_SHIFT {
            return match keysym {
                K_LEFT => Some(ShellAction::Prev),
                K_RIGHT => Some(ShellAction::Next),
                _ => None,
            };
        }

        None
    }
}

fn push_char(bytes: &mut TermBytes, code_point: u32) {
    if let Some(ch) = char::from_u32(code_point) {
        let mut encoded = [0_u8; 4];
        bytes.extend_from_slice(ch.encode_utf8(&mut encoded).as_bytes());
    }
}
