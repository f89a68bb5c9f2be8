// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The ring of sessions and the rules for which one has the display.

// Attach sources.
pub mod ring_index;
pub mod session_ring;

// Re-export.
pub use ring_index::*;
pub use session_ring::*;
