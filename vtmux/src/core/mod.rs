// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Ambient building blocks shared by every other module: loop control enums, logging
//! setup, the terminal output handle, and test fixtures.

// Attach sources.
pub mod common;
pub mod log;
pub mod terminal_io;

#[cfg(test)]
pub mod test_fixtures;

// Re-export.
pub use common::*;
pub use log::*;
pub use terminal_io::*;

#[cfg(test)]
pub use test_fixtures::*;
