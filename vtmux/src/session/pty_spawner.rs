// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words openpty passwd getuid

use std::{os::fd::{BorrowedFd, OwnedFd},
          path::PathBuf};

use miette::Diagnostic;
use nix::unistd::{User, getuid};
use portable_pty::{CommandBuilder, PtySize, native_pty_system};

use super::{ChildHandle, UnixChild};
use crate::{ChannelBindError, WindowSize};

/// Shell used when nothing else can be started.
pub const FALLBACK_SHELL: &str = "/bin/sh";

/// `TERM` for every child; the console understands `linux` sequences only.
pub const CHILD_TERM: &str = "linux";

/// Everything needed to start one program in a pty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env_vars: Vec<(String, String)>,
}

/// Builder for [`ShellCommand`]. `TERM` is always set to [`CHILD_TERM`]; the working
/// directory defaults to the current directory.
#[derive(Debug)]
pub struct ShellCommandBuilder {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env_vars: Vec<(String, String)>,
}

impl ShellCommandBuilder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env_vars: Vec::new(),
        }
    }

    #[must_use]
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn cwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.cwd = Some(path.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn build(self) -> ShellCommand {
        let cwd = self.cwd.or_else(|| std::env::current_dir().ok());
        let mut env_vars = vec![("TERM".to_string(), CHILD_TERM.to_string())];
        env_vars.extend(self.env_vars);
        ShellCommand {
            program: self.program,
            args: self.args,
            cwd,
            env_vars,
        }
    }
}

/// Programs to try, in order, for a new session: the explicit command, `$SHELL`, the
/// passwd shell, then [`FALLBACK_SHELL`]. Empty entries are skipped.
#[must_use]
pub fn shell_candidates(
    explicit: Option<&[String]>,
    env_shell: Option<String>,
    passwd_shell: Option<String>,
) -> Vec<ShellCommand> {
    let mut candidates = vec![];

    if let Some([program, args @ ..]) = explicit
        && !program.is_empty()
    {
        candidates.push(ShellCommandBuilder::new(program.clone()).args(args.iter().cloned()).build());
    }

    for shell in [env_shell, passwd_shell, Some(FALLBACK_SHELL.to_string())]
        .into_iter()
        .flatten()
        .filter(|it| !it.is_empty())
    {
        candidates.push(ShellCommandBuilder::new(shell).build());
    }

    candidates
}

/// [`shell_candidates()`] with `$SHELL` and the passwd entry of the real uid.
#[must_use]
pub fn resolve_shell_candidates(explicit: Option<&[String]>) -> Vec<ShellCommand> {
    let env_shell = std::env::var("SHELL").ok();
    let passwd_shell = match User::from_uid(getuid()) {
        Ok(Some(user)) => Some(user.shell.to_string_lossy().into_owned()),
        Ok(None) => None,
        Err(errno) => {
            tracing::debug!(
                message = "resolve_shell_candidates -> passwd lookup failed",
                error = %errno
            );
            None
        }
    };
    shell_candidates(explicit, env_shell, passwd_shell)
}

/// A child running on the slave side of a fresh pty.
#[allow(missing_debug_implementations)]
pub struct SpawnedPty {
    pub pid: i32,
    pub master: OwnedFd,
    pub slave_path: Option<PathBuf>,
    pub child: Box<dyn ChildHandle>,
}

/// Failed to start a session's child.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum SpawnError {
    #[error("Failed to open a pty: {message}")]
    #[diagnostic(
        code(r3bl_vtmux::session::open_pty),
        help("Check that /dev/ptmx exists and that the pty limit is not reached")
    )]
    OpenPty { message: String },

    #[error("Failed to start `{program}`: {message}")]
    #[diagnostic(code(r3bl_vtmux::session::exec))]
    Exec { program: String, message: String },

    #[error("None of the shell candidates could be started: {tried:?}")]
    #[diagnostic(
        code(r3bl_vtmux::session::no_shell),
        help("Pass a command explicitly, or set $SHELL to an installed shell")
    )]
    Exhausted { tried: Vec<String> },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Bind(#[from] ChannelBindError),
}

/// Starts a program attached to a new pty. The child gets a fresh session with the pty
/// as controlling terminal, default signal dispositions and an empty signal mask.
pub trait PtySpawner {
    /// # Errors
    ///
    /// [`SpawnError::OpenPty`] or [`SpawnError::Exec`].
    fn spawn(&self, command: &ShellCommand, size: WindowSize) -> Result<SpawnedPty, SpawnError>;
}

/// Try `candidates` in order and return the first that starts.
///
/// # Errors
///
/// [`SpawnError::Exhausted`] if none did.
pub fn spawn_first_available(
    spawner: &dyn PtySpawner,
    candidates: &[ShellCommand],
    size: WindowSize,
) -> Result<SpawnedPty, SpawnError> {
    for candidate in candidates {
        match spawner.spawn(candidate, size) {
            Ok(spawned) => return Ok(spawned),
            Err(error) => tracing::warn!(
                message = "spawn_first_available -> candidate failed",
                program = %candidate.program,
                error = %error
            ),
        }
    }
    Err(SpawnError::Exhausted {
        tried: candidates.iter().map(|it| it.program.clone()).collect(),
    })
}

/// [`PtySpawner`] on top of [`portable_pty`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PortablePtySpawner;

impl PtySpawner for PortablePtySpawner {
    fn spawn(&self, command: &ShellCommand, size: WindowSize) -> Result<SpawnedPty, SpawnError> {
        let pair = native_pty_system()
            .openpty(PtySize {
                rows: size.rows,
                cols: size.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| SpawnError::OpenPty {
                message: format!("{e:#}"),
            })?;

        let mut builder = CommandBuilder::new(&command.program);
        builder.args(&command.args);
        if let Some(cwd) = command.cwd.as_ref() {
            builder.cwd(cwd);
        }
        for (key, value) in &command.env_vars {
            builder.env(key, value);
        }

        let exec_error = |message: String| SpawnError::Exec {
            program: command.program.clone(),
            message,
        };

        let child = pair
            .slave
            .spawn_command(builder)
            .map_err(|e| exec_error(format!("{e:#}")))?;
        // The parent must not hold the slave open, or the master never sees hangup.
        drop(pair.slave);

        let pid = child
            .process_id()
            .and_then(|it| i32::try_from(it).ok())
            .ok_or_else(|| exec_error("child has no pid".to_string()))?;

        let raw_master = pair
            .master
            .as_raw_fd()
            .ok_or_else(|| exec_error("pty master has no descriptor".to_string()))?;
        // SAFETY: `pair.master` owns `raw_master` and is alive until the end of scope.
        let borrowed = unsafe { BorrowedFd::borrow_raw(raw_master) };
        let master = rustix::io::fcntl_dupfd_cloexec(borrowed, 0)
            .map_err(|e| exec_error(format!("dup of pty master failed: {e}")))?;

        Ok(SpawnedPty {
            pid,
            master,
            slave_path: pair.master.tty_name(),
            child: Box::new(UnixChild::new(pid)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FakeSpawner;
    use pretty_assertions::assert_eq;

    fn programs(candidates: &[ShellCommand]) -> Vec<&str> {
        candidates.iter().map(|it| it.program.as_str()).collect()
    }

    #[test]
    fn test_candidate_order() {
        let explicit = vec!["htop".to_string(), "-d".to_string(), "10".to_string()];
        let candidates = shell_candidates(
            Some(&explicit),
            Some("/bin/zsh".into()),
            Some("/bin/bash".into()),
        );
        assert_eq!(programs(&candidates), vec!["htop", "/bin/zsh", "/bin/bash", "/bin/sh"]);
        assert_eq!(candidates[0].args, vec!["-d", "10"]);
    }

    #[test]
    fn test_candidates_skip_missing_and_empty() {
        let candidates = shell_candidates(None, Some(String::new()), None);
        assert_eq!(programs(&candidates), vec!["/bin/sh"]);
    }

    #[test]
    fn test_builder_sets_term_first() {
        let command = ShellCommandBuilder::new("sh").env("A", "b").cwd("/tmp").build();
        assert_eq!(command.env_vars, vec![
            ("TERM".to_string(), "linux".to_string()),
            ("A".to_string(), "b".to_string()),
        ]);
        assert_eq!(command.cwd, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_spawn_falls_through_to_next_candidate() {
        let spawner = FakeSpawner::default();
        spawner.fail_program("/bin/zsh");
        let candidates = shell_candidates(None, Some("/bin/zsh".into()), None);

        let spawned = spawn_first_available(&spawner, &candidates, WindowSize::default()).unwrap();
        assert_eq!(spawner.spawned_programs(), vec!["/bin/sh".to_string()]);
        assert!(spawned.pid > 0);
    }

    #[test]
    fn test_spawn_exhausted() {
        let spawner = FakeSpawner::default();
        spawner.fail_program("/bin/sh");
        let candidates = shell_candidates(None, None, None);

        let result = spawn_first_available(&spawner, &candidates, WindowSize::default());
        assert!(matches!(result, Err(SpawnError::Exhausted { tried }) if tried == vec!["/bin/sh"]));
    }
}
