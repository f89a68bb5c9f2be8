// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words preedit

//! One shell session: the pty it runs in, its keyboard translation state, its input
//! method context, and what gets drawn on the console on its behalf.

// Attach sources.
pub mod ansi_sequences;
pub mod child_reaper;
pub mod composition_renderer;
pub mod pty_session;
pub mod pty_spawner;
pub mod session_env;
pub mod term_modes;

// Re-export.
pub use ansi_sequences::*;
pub use child_reaper::*;
pub use composition_renderer::*;
pub use pty_session::*;
pub use pty_spawner::*;
pub use session_env::*;
pub use term_modes::*;
