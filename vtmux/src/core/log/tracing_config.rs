// Copyright (c) 2024-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::fmt::Debug;

use tracing_core::LevelFilter;

/// Default log file, relative to the working directory the binary is started from.
pub const DEFAULT_LOG_FILE_NAME: &str = "vtmux.log";

/// Configure the tracing logging to suit your needs. You can send the logs to a:
/// 1. file,
/// 2. stdout or stderr,
/// 3. both.
///
/// While the multiplexer owns the console, stdout *is* the screen, so the `vtmux`
/// binary only ever uses [`WriterConfig::File`]. The display variants are for tests
/// and for running the core under another terminal while developing.
///
/// Fields:
/// - `writer_config`: [`WriterConfig`] to choose where to write the logs.
/// - `level_filter`: [`LevelFilter`] - The log level to use for tracing.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub writer_config: WriterConfig,
    pub level_filter: LevelFilter,
}

/// - `tracing_log_file_path`: [String] is the file path to use for the log file. Eg:
///   `/tmp/vtmux.log` or `vtmux.log`.
/// - `DisplayPreference`: [`DisplayPreference`] is the preferred display to use for
///   logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterConfig {
    None,
    Display(DisplayPreference),
    File(String /* tracing_log_file_path */),
    DisplayAndFile(DisplayPreference, String /* tracing_log_file_path */),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayPreference {
    Stdout,
    Stderr,
}

impl TracingConfig {
    #[must_use]
    pub fn new_file(filename: Option<String>, level_filter: LevelFilter) -> Self {
        Self {
            writer_config: WriterConfig::File(
                filename.unwrap_or_else(|| DEFAULT_LOG_FILE_NAME.to_string()),
            ),
            level_filter,
        }
    }

    #[must_use]
    pub fn new_display(preferred_display: DisplayPreference) -> Self {
        Self {
            writer_config: WriterConfig::Display(preferred_display),
            level_filter: LevelFilter::DEBUG,
        }
    }

    #[must_use]
    pub fn get_writer_config(&self) -> WriterConfig { self.writer_config.clone() }

    #[must_use]
    pub fn get_level_filter(&self) -> LevelFilter { self.level_filter }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_file_uses_default_name() {
        let config = TracingConfig::new_file(None, LevelFilter::INFO);
        assert_eq!(
            config.get_writer_config(),
            WriterConfig::File(DEFAULT_LOG_FILE_NAME.to_string())
        );
        assert_eq!(config.get_level_filter(), LevelFilter::INFO);
    }

    #[test]
    fn test_new_display_defaults_to_debug() {
        let config = TracingConfig::new_display(DisplayPreference::Stderr);
        assert_eq!(
            config.get_writer_config(),
            WriterConfig::Display(DisplayPreference::Stderr)
        );
        assert_eq!(config.get_level_filter(), LevelFilter::DEBUG);
    }
}
