// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use miette::Diagnostic;

use crate::ChannelBindError;

/// Failed to take over the controlling terminal.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum ConsoleSetupError {
    #[error("Failed to duplicate stdin")]
    #[diagnostic(
        code(r3bl_vtmux::console::dup_stdin),
        help("vtmux must be started with a Linux virtual console on stdin")
    )]
    DupStdin(#[source] std::io::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Bind(#[from] ChannelBindError),
}
