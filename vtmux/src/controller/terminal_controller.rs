// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words SIGPIPE

use std::rc::Rc;

use super::{ControllerCore, MuxConfig, PollLoopError, SignalChannel, VT_ACQUIRE_SIGNAL,
            VT_RELEASE_SIGNAL, ignore_sigpipe};
use crate::{ConsoleDriver, ConsoleSetupError, Continuation, ImeFactory, IoDispatcher,
            LinuxConsole, OutputDevice, PortablePtySpawner, ReadinessSink, ReapPolicy,
            SessionEnv, SessionManager, SharedConsole, SourceKindReady};

/// The multiplexer: the readiness loop, the signal pipe, and everything they drive.
///
/// ```no_run
/// use std::rc::Rc;
/// use r3bl_vtmux::{MuxConfigBuilder, PassthroughImeFactory, TerminalController};
///
/// # fn main() -> miette::Result<()> {
/// let config = MuxConfigBuilder::new().build();
/// TerminalController::new(config, Rc::new(PassthroughImeFactory))?.run()
/// # }
/// ```
#[allow(missing_debug_implementations)]
pub struct TerminalController {
    dispatcher: IoDispatcher,
    signals: SignalChannel,
    core: ControllerCore,
}

impl TerminalController {
    /// Take over the console on stdin.
    ///
    /// Signal handlers go in before `VT_PROCESS` mode, so a release request can never
    /// hit the default disposition. A stdin that is not a VT only gets a warning.
    ///
    /// # Errors
    ///
    /// Any setup step failing: poll creation, signal handlers, or stdin.
    pub fn new(config: MuxConfig, ime_factory: Rc<dyn ImeFactory>) -> miette::Result<Self> {
        let dispatcher = IoDispatcher::new()?;

        let mut signals = SignalChannel::new()?;
        dispatcher.register_signals(signals.source_mut())?;
        ignore_sigpipe();

        let console: SharedConsole =
            Rc::new(LinuxConsole::from_stdin().map_err(ConsoleSetupError::DupStdin)?);
        if let Err(error) = console.set_vt_process_mode(VT_RELEASE_SIGNAL, VT_ACQUIRE_SIGNAL) {
            tracing::warn!(
                message = "stdin is not a virtual console, VT switching is unmanaged",
                error = %error
            );
        }

        let registrar = dispatcher.registrar();
        let console_driver =
            ConsoleDriver::new(registrar.clone(), console.clone(), config.keyboard_mode)?;

        let env = SessionEnv {
            registrar,
            output: OutputDevice::new_stdout(),
            console: console.clone(),
            spawner: Rc::new(PortablePtySpawner),
            ime_factory,
            command: config.command,
            keyboard_mode: config.keyboard_mode,
            reap_policy: ReapPolicy::default(),
        };

        Ok(Self {
            dispatcher,
            signals,
            core: ControllerCore::new(SessionManager::new(env), console_driver, console),
        })
    }

    /// Start the first session and loop until stopped by a signal, the last session
    /// exiting, or console input going away. The console is restored on every path
    /// out.
    ///
    /// # Errors
    ///
    /// The first session failing to start, or the poll itself failing.
    pub fn run(mut self) -> miette::Result<()> {
        if let Err(error) = self.core.start() {
            self.core.teardown();
            return Err(error.into());
        }
        tracing::debug!(message = "TerminalController::run -> started");

        let result = loop {
            let mut sink = LoopSink {
                core: &mut self.core,
                signals: &mut self.signals,
            };
            match self.dispatcher.poll_once(&mut sink, None) {
                Ok(Continuation::Continue) => {}
                Ok(Continuation::Stop) => break Ok(()),
                Err(error) => break Err(PollLoopError(error)),
            }
        };

        tracing::debug!(message = "TerminalController::run -> stopping");
        self.core.stop();
        self.core.teardown();
        result.map_err(Into::into)
    }
}

/// Routes one poll's readiness to the core, splitting off the signal pipe.
struct LoopSink<'a> {
    core: &'a mut ControllerCore,
    signals: &'a mut SignalChannel,
}

impl ReadinessSink for LoopSink<'_> {
    fn on_readable(&mut self, source: SourceKindReady) -> Continuation {
        match source {
            SourceKindReady::Signals => self
                .signals
                .pending()
                .into_iter()
                .fold(Continuation::Continue, |acc, signal| {
                    acc.and(self.core.handle_signal(signal))
                }),
            SourceKindReady::Descriptor(fd) => self.core.on_descriptor_readable(fd),
            SourceKindReady::Unknown => Continuation::Continue,
        }
    }

    fn on_hangup(&mut self, source: SourceKindReady) -> Continuation {
        match source {
            SourceKindReady::Descriptor(fd) => self.core.on_descriptor_hangup(fd),
            SourceKindReady::Signals | SourceKindReady::Unknown => Continuation::Continue,
        }
    }
}
