// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words keypress

use super::{FilterOutcome, ImeEvent};

/// One input context of an external input-method service. Each session owns one.
///
/// Implementations wrap whatever protocol client talks to the IME; the session only
/// sees bytes in, leftover bytes and [`ImeEvent`]s out.
pub trait ImeContext {
    /// Offer raw keyboard input to the IME. Whatever it doesn't consume comes back as
    /// [`FilterOutcome::leftover`], in order.
    fn filter_keypress(&mut self, bytes: &[u8]) -> FilterOutcome;

    /// Events the IME produced asynchronously since the last call.
    fn take_pending_events(&mut self) -> Vec<ImeEvent>;

    /// Reload settings; called every time the session gets the display.
    fn load_settings(&mut self);

    /// Answer to [`ImeEvent::SwitcherSwitch`]: the chosen engine index, or [`None`] to
    /// cancel.
    fn switcher_selected(&mut self, index: Option<usize>);
}

/// Creates an [`ImeContext`] per session. Injected into the [`SessionManager`].
///
/// [`SessionManager`]: crate::SessionManager
pub trait ImeFactory {
    fn create_context(&self) -> Box<dyn ImeContext>;
}
