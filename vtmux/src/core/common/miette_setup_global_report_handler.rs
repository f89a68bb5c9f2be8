// Copyright (c) 2024-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Install a [miette](https://docs.rs/miette/latest/miette/index.html) report hook for
//! the `vtmux` binary.
//!
//! The hook is lazy: it runs only when a [`miette::Report`] is printed, which for this
//! crate happens after the console has been restored (the [`ConsoleDriver`] is torn
//! down before `main` returns its error). So the width can be measured from the real
//! terminal at that moment.
//!
//! [`ConsoleDriver`]: crate::ConsoleDriver

use miette::MietteHandlerOpts;
use tracing::debug;

const FALLBACK_REPORT_WIDTH: usize = 80;

/// Width of the terminal on stderr, or [`FALLBACK_REPORT_WIDTH`] when it can't be read
/// (stderr redirected to a file, for example).
#[must_use]
pub fn report_width() -> usize {
    rustix::termios::tcgetwinsize(std::io::stderr())
        .ok()
        .map(|winsize| usize::from(winsize.ws_col))
        .filter(|cols| *cols > 0)
        .unwrap_or(FALLBACK_REPORT_WIDTH)
}

/// The [`miette::ErrorHook`] is lazily evaluated. Colors are left to miette's own
/// detection because a Linux VT only has 16 of them.
pub fn setup_default_miette_global_report_handler(issues_url: &'static str) {
    miette::set_hook(Box::new(|_report| {
        let terminal_width = report_width();
        debug!(message = "miette::set_hook", terminal_width);
        Box::new(
            MietteHandlerOpts::new()
                .width(terminal_width)
                .wrap_lines(true)
                .unicode(false)
                .context_lines(3)
                .tab_width(4)
                .break_words(true)
                .with_cause_chain()
                .footer(issues_url.to_string())
                .build(),
        )
    }))
    .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_width_is_never_zero() {
        assert!(report_width() > 0);
    }
}
