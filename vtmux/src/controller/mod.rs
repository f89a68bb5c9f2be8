// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Top level wiring: the `VT_PROCESS` signal protocol, the readiness loop, and
//! startup and teardown.

// Attach sources.
pub mod control_signal;
pub mod controller_core;
pub mod controller_errors;
pub mod mux_config;
pub mod terminal_controller;

// Re-export.
pub use control_signal::*;
pub use controller_core::*;
pub use controller_errors::*;
pub use mux_config::*;
pub use terminal_controller::*;
