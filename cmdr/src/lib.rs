// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! # `r3bl-vtmux-cmdr`
//!
//! The `vtmux` binary: command line parsing and logging setup in front of
//! [`r3bl_vtmux::TerminalController`].
//!
//! ```text
//! vtmux                          # every session runs $SHELL
//! vtmux --keyboard-mode medium-raw
//! vtmux -l --log-level trace -- htop -d 10
//! ```
//!
//! With `--keyboard-mode medium-raw` the library decodes session shortcuts itself:
//! `ctrl+alt+c` creates a session, `ctrl+alt+d` deletes one, `ctrl+alt+1..0` jumps to
//! a slot, and `shift+left` / `shift+right` walk the ring.

// Attach sources.
pub mod vtmux;

// Re-export.
pub use vtmux::*;
