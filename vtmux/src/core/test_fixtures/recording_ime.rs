// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words keypress

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use crate::{FilterOutcome, ImeContext, ImeEvent, ImeFactory};

#[derive(Debug, Default)]
struct RecordingImeState {
    outcomes: VecDeque<FilterOutcome>,
    pending: Vec<ImeEvent>,
    filtered: Vec<Vec<u8>>,
    settings_loads: usize,
    switcher_answers: Vec<Option<usize>>,
    contexts_created: usize,
}

/// Scripted [`ImeFactory`]. Every context it creates shares one script and one log.
/// With nothing scripted, keypresses pass through untouched.
#[derive(Debug, Clone, Default)]
pub struct RecordingIme {
    state: Rc<RefCell<RecordingImeState>>,
}

impl RecordingIme {
    /// Result of the next [`ImeContext::filter_keypress()`].
    pub fn script_filter(&self, outcome: FilterOutcome) {
        self.state.borrow_mut().outcomes.push_back(outcome);
    }

    /// Returned by the next [`ImeContext::take_pending_events()`].
    pub fn push_pending(&self, event: ImeEvent) {
        self.state.borrow_mut().pending.push(event);
    }

    pub fn filtered(&self) -> Vec<Vec<u8>> { self.state.borrow().filtered.clone() }

    pub fn settings_loads(&self) -> usize { self.state.borrow().settings_loads }

    pub fn switcher_answers(&self) -> Vec<Option<usize>> {
        self.state.borrow().switcher_answers.clone()
    }

    pub fn contexts_created(&self) -> usize { self.state.borrow().contexts_created }
}

impl ImeFactory for RecordingIme {
    fn create_context(&self) -> Box<dyn ImeContext> {
        self.state.borrow_mut().contexts_created += 1;
        Box::new(self.clone())
    }
}

impl ImeContext for RecordingIme {
    fn filter_keypress(&mut self, bytes: &[u8]) -> FilterOutcome {
        let mut state = self.state.borrow_mut();
        state.filtered.push(bytes.to_vec());
        state
            .outcomes
            .pop_front()
            .unwrap_or_else(|| FilterOutcome::passthrough(bytes))
    }

    fn take_pending_events(&mut self) -> Vec<ImeEvent> {
        std::mem::take(&mut self.state.borrow_mut().pending)
    }

    fn load_settings(&mut self) { self.state.borrow_mut().settings_loads += 1; }

    fn switcher_selected(&mut self, index: Option<usize>) {
        self.state.borrow_mut().switcher_answers.push(index);
    }
}
