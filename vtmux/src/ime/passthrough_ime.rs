// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words keypress

use super::{FilterOutcome, ImeContext, ImeEvent, ImeFactory};

/// [`ImeContext`] for running without an input method: consumes nothing, produces
/// nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughImeContext;

impl ImeContext for PassthroughImeContext {
    fn filter_keypress(&mut self, bytes: &[u8]) -> FilterOutcome {
        FilterOutcome::passthrough(bytes)
    }

    fn take_pending_events(&mut self) -> Vec<ImeEvent> { vec![] }

    fn load_settings(&mut self) {}

    fn switcher_selected(&mut self, _index: Option<usize>) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughImeFactory;

impl ImeFactory for PassthroughImeFactory {
    fn create_context(&self) -> Box<dyn ImeContext> { Box::new(PassthroughImeContext) }
}
