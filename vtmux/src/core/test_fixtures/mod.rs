// Copyright (c) 2024-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Fakes for the traits at the edges of the crate (console, pty spawner, IME) and a
//! mock output device, so the session and controller logic runs without a VT.

// Attach sources.
pub mod fake_console;
pub mod fake_spawner;
pub mod output_device_ext;
pub mod recording_ime;
pub mod session_rig;
pub mod stdout_mock;

// Re-export.
pub use fake_console::*;
pub use fake_spawner::*;
pub use output_device_ext::*;
pub use recording_ime::*;
pub use session_rig::*;
pub use stdout_mock::*;
