// Copyright (c) 2023-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// Control flow signal for the readiness loop.
///
/// Used across:
/// - [`IoDispatcher::poll_once()`] sinks, to ask the run loop to stop.
/// - [`TerminalController`] signal handling (SIGTERM / SIGHUP).
/// - [`SessionManager`] when the last session exits.
///
/// [`IoDispatcher::poll_once()`]: crate::IoDispatcher::poll_once
/// [`TerminalController`]: crate::TerminalController
/// [`SessionManager`]: crate::SessionManager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Continuation {
    /// Continue to the next iteration.
    #[default]
    Continue,

    /// Stop processing and exit the loop.
    Stop,
}

impl Continuation {
    /// Folds two results, [`Stop`] wins.
    ///
    /// [`Stop`]: Self::Stop
    #[must_use]
    pub fn and(self, other: Continuation) -> Continuation {
        match (self, other) {
            (Continuation::Continue, Continuation::Continue) => Continuation::Continue,
            _ => Continuation::Stop,
        }
    }
}
