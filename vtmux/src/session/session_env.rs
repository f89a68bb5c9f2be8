// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{fmt, rc::Rc};

use super::{PtySpawner, ReapPolicy};
use crate::{ImeFactory, KeyboardMode, OutputDevice, SharedConsole, SourceRegistrar};

/// Identifies a session for its whole life. Never reused within one manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "#{}", self.0) }
}

/// Collaborators every session is created with. Cheap to clone; all handles are shared.
#[derive(Clone)]
#[allow(missing_debug_implementations)]
pub struct SessionEnv {
    pub registrar: SourceRegistrar,
    pub output: OutputDevice,
    pub console: SharedConsole,
    pub spawner: Rc<dyn PtySpawner>,
    pub ime_factory: Rc<dyn ImeFactory>,
    /// Overrides the shell for every session.
    pub command: Option<Vec<String>>,
    pub keyboard_mode: KeyboardMode,
    pub reap_policy: ReapPolicy,
}
