// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::KeyboardMode;

/// Runtime options for a [`TerminalController`].
///
/// [`TerminalController`]: crate::TerminalController
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MuxConfig {
    /// Program and arguments every session runs instead of the user's shell.
    pub command: Option<Vec<String>>,
    pub keyboard_mode: KeyboardMode,
}

#[derive(Debug, Clone, Default)]
pub struct MuxConfigBuilder {
    command: Vec<String>,
    keyboard_mode: KeyboardMode,
}

impl MuxConfigBuilder {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// An empty command means "use the shell".
    #[must_use]
    pub fn command(mut self, command: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn keyboard_mode(mut self, keyboard_mode: KeyboardMode) -> Self {
        self.keyboard_mode = keyboard_mode;
        self
    }

    #[must_use]
    pub fn build(self) -> MuxConfig {
        MuxConfig {
            command: (!self.command.is_empty()).then_some(self.command),
            keyboard_mode: self.keyboard_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_command_is_none() {
        let config = MuxConfigBuilder::new().command(Vec::<String>::new()).build();
        assert_eq!(config, MuxConfig::default());
    }

    #[test]
    fn test_command_and_mode() {
        let config = MuxConfigBuilder::new()
            .command(["htop", "-d", "10"])
            .keyboard_mode(KeyboardMode::MediumRaw)
            .build();
        assert_eq!(
            config.command,
            Some(vec!["htop".to_string(), "-d".to_string(), "10".to_string()])
        );
        assert_eq!(config.keyboard_mode, KeyboardMode::MediumRaw);
    }
}
