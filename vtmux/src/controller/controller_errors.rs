// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use miette::Diagnostic;

/// Failed to install the signal handlers behind the self-pipe.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[error("Failed to install signal handlers")]
#[diagnostic(
    code(r3bl_vtmux::controller::signal_install),
    help("SIGCHLD, SIGUSR1, SIGUSR2, SIGTERM and SIGHUP must be catchable")
)]
pub struct SignalInstallError(#[source] pub std::io::Error);

/// The readiness loop failed for a reason other than an interrupted wait.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[error("The readiness loop failed")]
#[diagnostic(code(r3bl_vtmux::controller::poll_loop))]
pub struct PollLoopError(#[source] pub std::io::Error);
