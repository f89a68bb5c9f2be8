// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::os::fd::RawFd;

use miette::Diagnostic;

// ╭──────────────────────────────────────────────────────────╮
// │ Diagnostic error types for readiness loop setup          │
// ╰──────────────────────────────────────────────────────────╯

/// Failed to create [`mio::Poll`] (epoll creation failed).
#[derive(Debug, thiserror::Error, Diagnostic)]
#[error("Failed to create mio::Poll")]
#[diagnostic(
    code(r3bl_vtmux::io::poll_creation),
    help("This usually means the system ran out of file descriptors")
)]
pub struct PollCreationError(#[source] pub std::io::Error);

/// Failed to clone the [`mio::Registry`] handed out to channels.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[error("Failed to clone mio::Registry")]
#[diagnostic(
    code(r3bl_vtmux::io::registry_clone),
    help("This usually means the system ran out of file descriptors")
)]
pub struct RegistryCloneError(#[source] pub std::io::Error);

/// Failed to register the signal self-pipe with mio.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[error("Failed to register signals with mio")]
#[diagnostic(code(r3bl_vtmux::io::signal_registration))]
pub struct SignalRegistrationError(#[source] pub std::io::Error);

/// Failed to prepare a descriptor for a [`NonBlockingChannel`].
///
/// [`NonBlockingChannel`]: crate::NonBlockingChannel
#[derive(Debug, thiserror::Error, Diagnostic)]
#[error("Failed to bind descriptor {fd} to a non-blocking channel")]
#[diagnostic(
    code(r3bl_vtmux::io::channel_bind),
    help("The descriptor must be open and support O_NONBLOCK")
)]
pub struct ChannelBindError {
    pub fd: RawFd,
    #[source]
    pub source: std::io::Error,
}
