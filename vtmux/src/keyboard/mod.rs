// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words keysym keycodes

//! Keyboard input in medium-raw mode: decode keycode records, translate them through
//! the kernel keymap into the bytes a shell expects, and recognize session shortcuts.

// Attach sources.
pub mod keyboard_codec;
pub mod keysym;
pub mod medium_raw;
pub mod shell_action;

// Re-export.
pub use keyboard_codec::*;
pub use keysym::*;
pub use medium_raw::*;
pub use shell_action::*;
