// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::rc::Rc;

use r3bl_vtmux::{PassthroughImeFactory, TerminalController, TracingConfig,
                 setup_default_miette_global_report_handler,
                 try_initialize_logging_global};

use super::CLIArg;

pub const ISSUES_URL: &str = "https://github.com/r3bl-org/r3bl-open-core/issues/new";

/// Set up error reporting and logging from `cli_arg`, then own the console until the
/// last session exits or the process is told to stop.
///
/// # Errors
///
/// Setup failing (not on a VT, no signal pipe, no pty for the first shell), or the
/// poll loop failing.
pub fn run_app(cli_arg: &CLIArg) -> miette::Result<()> {
    setup_default_miette_global_report_handler(ISSUES_URL);

    let should_log = cli_arg.global_options.enable_logging;

    should_log.then(|| {
        try_initialize_logging_global(TracingConfig::new_file(
            Some(cli_arg.global_options.log_file.clone()),
            cli_arg.global_options.log_level.into(),
        ))
        .ok();
        // % is Display, ? is Debug.
        tracing::debug!(message = "Start logging...", cli_arg = ?cli_arg);
    });

    let config = cli_arg.to_mux_config();
    let result = TerminalController::new(config, Rc::new(PassthroughImeFactory))
        .and_then(TerminalController::run);

    should_log.then(|| {
        tracing::debug!(message = "Stop logging...", ok = result.is_ok());
    });

    result
}
