// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use clap::{Args, Parser, ValueEnum};
use r3bl_vtmux::{DEFAULT_LOG_FILE_NAME, KeyboardMode, MuxConfig, MuxConfigBuilder};
use tracing_core::LevelFilter;

/// More info: <https://docs.rs/clap/latest/clap/_derive/_tutorial/chapter_2/index.html>
#[derive(Debug, Parser)]
#[command(bin_name = "vtmux")]
#[command(about = "Terminal multiplexer for the Linux virtual console")]
#[command(version)]
#[command(next_line_help = true)]
#[command(arg_required_else_help(false))]
/// More info: <https://docs.rs/clap/latest/clap/struct.Command.html#method.help_template>
#[command(
      help_template = "{about}\nVersion: {bin} {version}\n\nRun it on a VT (not under X or another terminal). Every session runs your shell, or the command given after the options.\nUSAGE:\n  vtmux [options] [-- command [args...]]\n\n[options]\n{options}"
  )]
pub struct CLIArg {
    /// Program (and its arguments) that every session runs instead of the shell.
    #[arg(
        name = "command",
        trailing_var_arg = true,
        allow_hyphen_values = true,
        num_args = 0..
    )]
    pub command: Vec<String>,

    #[arg(
        long,
        default_value_t = KeyboardMode::Unicode,
        help = "How the console delivers keys: `unicode` (translated text) or `medium-raw` (keycodes)"
    )]
    pub keyboard_mode: KeyboardMode,

    #[command(flatten)]
    pub global_options: GlobalOption,
}

#[derive(Debug, Args)]
pub struct GlobalOption {
    #[arg(
        global = true,
        long,
        short = 'l',
        help = "Log to a file for debugging. The console is the display, so logs never go to stdout."
    )]
    pub enable_logging: bool,

    #[arg(
        global = true,
        long,
        default_value = DEFAULT_LOG_FILE_NAME,
        help = "Log file used with --enable-logging."
    )]
    pub log_file: String,

    #[arg(global = true, long, value_enum, default_value_t = LogLevel::Debug)]
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

impl CLIArg {
    #[must_use]
    pub fn to_mux_config(&self) -> MuxConfig {
        MuxConfigBuilder::new()
            .command(self.command.iter().cloned())
            .keyboard_mode(self.keyboard_mode)
            .build()
    }
}
