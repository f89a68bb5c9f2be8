// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// Session shortcut recognized by the [`KeyboardCodec`] in medium-raw mode, and
/// carried out by [`SessionManager::apply_action()`].
///
/// | Keys                   | Action                 |
/// |------------------------|------------------------|
/// | Ctrl + Alt + `1`..`0`  | [`SwitchTo`] slot 0..9 |
/// | Shift + Right          | [`Next`]               |
/// | Shift + Left           | [`Prev`]               |
/// | Ctrl + Alt + `c`       | [`Create`]             |
/// | Ctrl + Alt + `d`       | [`Delete`]             |
/// | Console keys (`F1`..)  | [`ActivateVt`]         |
///
/// [`KeyboardCodec`]: crate::KeyboardCodec
/// [`SessionManager::apply_action()`]: crate::SessionManager::apply_action
/// [`SwitchTo`]: Self::SwitchTo
/// [`Next`]: Self::Next
/// [`Prev`]: Self::Prev
/// [`Create`]: Self::Create
/// [`Delete`]: Self::Delete
/// [`ActivateVt`]: Self::ActivateVt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellAction {
    SwitchTo(usize),
    Next,
    Prev,
    Create,
    Delete,
    /// Switch the kernel to VT `n` (1 based).
    ActivateVt(u16),
}
