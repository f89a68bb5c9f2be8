// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{rc::Rc, time::Duration};

use crate::{FakeConsole, FakeSpawner, KeyboardMode, OutputDevice, OutputDeviceExt,
            RecordingIme, ReapPolicy, SessionEnv, SharedConsole, SourceRegistrar,
            StdoutMock};

/// A [`SessionEnv`] wired to fakes, plus handles on each fake for assertions.
#[allow(missing_debug_implementations)]
pub struct SessionRig {
    /// Keeps the registry alive.
    pub poll: mio::Poll,
    pub env: SessionEnv,
    pub console: Rc<FakeConsole>,
    pub spawner: Rc<FakeSpawner>,
    pub ime: RecordingIme,
    pub stdout: StdoutMock,
}

impl SessionRig {
    pub fn new(keyboard_mode: KeyboardMode) -> Self {
        let poll = mio::Poll::new().unwrap();
        let registrar = SourceRegistrar::new(poll.registry().try_clone().unwrap());
        let (output, stdout): (OutputDevice, StdoutMock) = OutputDevice::new_mock();
        let console = Rc::new(FakeConsole::default());
        let spawner = Rc::new(FakeSpawner::default());
        let ime = RecordingIme::default();

        let shared_console: SharedConsole = console.clone();
        let env = SessionEnv {
            registrar,
            output,
            console: shared_console,
            spawner: spawner.clone(),
            ime_factory: Rc::new(ime.clone()),
            command: Some(vec!["/bin/fake-shell".to_string()]),
            keyboard_mode,
            reap_policy: ReapPolicy {
                polls: 1,
                interval: Duration::ZERO,
            },
        };

        Self {
            poll,
            env,
            console,
            spawner,
            ime,
            stdout,
        }
    }
}

impl Default for SessionRig {
    fn default() -> Self { Self::new(KeyboardMode::Unicode) }
}
