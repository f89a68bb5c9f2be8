// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words preedit

//! Seam to an external input-method service. The protocol client lives outside this
//! crate; sessions see it through [`ImeContext`], created per session by an injected
//! [`ImeFactory`].

// Attach sources.
pub mod ime_context;
pub mod ime_types;
pub mod passthrough_ime;

// Re-export.
pub use ime_context::*;
pub use ime_types::*;
pub use passthrough_ime::*;
