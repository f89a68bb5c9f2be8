// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words vtmux pty ptys preedit keysym keysyms reldisp tioccons

//! # `r3bl_vtmux`
//!
//! A terminal multiplexer for the Linux virtual console. It owns up to ten shell
//! sessions, each backed by a pty, and arbitrates which one is shown on the VT that
//! this process controls. Input methods plug in through the [`ImeContext`] trait and
//! their composition state (preedit, candidate lookup table, status row) is drawn with
//! plain escape sequences, so the console driver does the glyph rendering.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────── TerminalController ────────────────────────┐
//! │                                                                    │
//! │  SignalChannel ──┐     IoDispatcher (mio::Poll, 32 slots)          │
//! │  ConsoleDriver ──┼──►  poll_once() ──► ReadinessSink               │
//! │  Session ptys ───┘                                                 │
//! │                                                                    │
//! │  SessionManager: [Option<Session>; 10], current index, active id   │
//! │    └─ Session: pty channel, KeyboardCodec, ImeContext, TermModes   │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything runs on one thread. Signals (VT release / acquire, child exit, shutdown)
//! arrive as readiness events on a self-pipe, so every callback runs to completion
//! before the next event is looked at.
//!
//! - [`NonBlockingChannel`] owns one descriptor and a small carry buffer.
//! - [`IoDispatcher`] maps ready tokens back to their owners.
//! - [`SessionManager`] implements ring navigation and the VT enter / leave handshake.
//! - [`ConsoleDriver`] puts the console in raw mode the first time the VT is acquired
//!   and restores it on teardown.
//! - [`TerminalController`] wires it together and speaks the `VT_PROCESS` signal
//!   protocol with the kernel.
//!
//! [`ImeContext`]: crate::ImeContext
//! [`NonBlockingChannel`]: crate::NonBlockingChannel
//! [`IoDispatcher`]: crate::IoDispatcher
//! [`SessionManager`]: crate::SessionManager
//! [`ConsoleDriver`]: crate::ConsoleDriver
//! [`TerminalController`]: crate::TerminalController

// Enforce strict error handling in production library code only. Tests are allowed to
// use .unwrap() (workspace `Cargo.toml` config allows it).
#![cfg_attr(not(test), deny(clippy::unwrap_in_result))]

// Attach modules (re-exported below to provide clean public API).
pub mod console;
pub mod controller;
pub mod core;
pub mod ime;
pub mod io;
pub mod keyboard;
pub mod session;
pub mod session_manager;

// Re-export.
pub use console::*;
pub use controller::*;
pub use core::*;
pub use ime::*;
pub use io::*;
pub use keyboard::*;
pub use session::*;
pub use session_manager::*;
