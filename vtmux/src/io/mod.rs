// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Readiness-based I/O: one [`mio::Poll`] for every descriptor the multiplexer cares
//! about (console input, every session's pty master, the signal self-pipe).
//!
//! - [`IoDispatcher`] blocks in [`IoDispatcher::poll_once()`] and hands ready tokens to
//!   a [`ReadinessSink`].
//! - [`SourceRegistrar`] is the cloneable handle that channels use to register and
//!   unregister themselves. It also holds the bounded slot table.
//! - [`NonBlockingChannel`] owns one descriptor, reads in chunks with a small carry
//!   buffer, and writes with a bounded retry on `EAGAIN`.

// Attach sources.
pub mod io_errors;
pub mod io_dispatcher;
pub mod non_blocking_channel;
pub mod source_registrar;

// Re-export.
pub use io_dispatcher::*;
pub use io_errors::*;
pub use non_blocking_channel::*;
pub use source_registrar::*;
