// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words EINTR epoll

use std::{io::ErrorKind, time::Duration};

use mio::{Events, Poll, Token, event::{Event, Source}};
use smallvec::SmallVec;

use super::{PollCreationError, RegistryCloneError, SignalRegistrationError, SourceKindReady,
            SourceRegistrar, MAX_SOURCES};
use crate::Continuation;

/// Receives readiness for the tokens an [`IoDispatcher`] reports.
///
/// For one ready token the calls are made in this order, each only if its condition is
/// set: [`on_readable()`], [`on_writable()`], [`on_hangup()`]. Any of them returning
/// [`Continuation::Stop`] ends the current [`IoDispatcher::poll_once()`] after the
/// token in hand.
///
/// [`on_readable()`]: Self::on_readable
/// [`on_writable()`]: Self::on_writable
/// [`on_hangup()`]: Self::on_hangup
pub trait ReadinessSink {
    fn on_readable(&mut self, source: SourceKindReady) -> Continuation;

    fn on_writable(&mut self, _source: SourceKindReady) -> Continuation {
        Continuation::Continue
    }

    /// The peer hung up or the descriptor is in an error state. For a descriptor the
    /// dispatcher has already released its slot before this is called, so the owner's
    /// later unbind won't unregister it a second time.
    fn on_hangup(&mut self, source: SourceKindReady) -> Continuation;
}

/// Snapshot of one [`Event`], taken so the sink can be called with `&mut` while the
/// [`Events`] buffer stays borrowed by nobody.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReadyEvent {
    token: Token,
    readable: bool,
    writable: bool,
    hangup: bool,
}

impl From<&Event> for ReadyEvent {
    fn from(event: &Event) -> Self {
        Self {
            token: event.token(),
            readable: event.is_readable(),
            writable: event.is_writable(),
            hangup: event.is_read_closed() || event.is_error(),
        }
    }
}

/// The single readiness loop for the whole multiplexer.
///
/// Owns the [`Poll`] and its [`Events`] buffer. Everything that wants readiness
/// registers through the [`SourceRegistrar`] returned by [`registrar()`].
///
/// [`registrar()`]: Self::registrar
#[allow(missing_debug_implementations)]
pub struct IoDispatcher {
    poll: Poll,
    events: Events,
    registrar: SourceRegistrar,
}

impl IoDispatcher {
    /// # Errors
    ///
    /// Returns [`PollCreationError`] or [`RegistryCloneError`] if the OS refuses to
    /// create the epoll instance or duplicate it.
    pub fn new() -> miette::Result<Self> {
        let poll = Poll::new().map_err(PollCreationError)?;
        let registry = poll.registry().try_clone().map_err(RegistryCloneError)?;
        Ok(Self {
            poll,
            events: Events::with_capacity(MAX_SOURCES + 1),
            registrar: SourceRegistrar::new(registry),
        })
    }

    #[must_use]
    pub fn registrar(&self) -> SourceRegistrar { self.registrar.clone() }

    /// Register the signal self-pipe under [`SIGNALS_TOKEN`].
    ///
    /// # Errors
    ///
    /// Returns [`SignalRegistrationError`] if `epoll_ctl` fails.
    ///
    /// [`SIGNALS_TOKEN`]: super::SIGNALS_TOKEN
    pub fn register_signals<S: Source + ?Sized>(
        &self,
        signals: &mut S,
    ) -> Result<(), SignalRegistrationError> {
        self.registrar
            .register_signals(signals)
            .map_err(SignalRegistrationError)
    }

    /// Block until something is ready (or `timeout` elapses), then dispatch every ready
    /// token to `sink`.
    ///
    /// An interrupted wait (`EINTR`, a signal arrived) dispatches nothing and returns
    /// [`Continuation::Continue`]; the signal pipe will be ready on the next call.
    ///
    /// # Errors
    ///
    /// Any other poll error is returned as is.
    pub fn poll_once(
        &mut self,
        sink: &mut dyn ReadinessSink,
        timeout: Option<Duration>,
    ) -> std::io::Result<Continuation> {
        if let Err(error) = self.poll.poll(&mut self.events, timeout) {
            if error.kind() == ErrorKind::Interrupted {
                return Ok(Continuation::Continue);
            }
            return Err(error);
        }

        // Breaks the borrow of `self.events` so the sink may re-enter the registrar.
        let ready: SmallVec<[ReadyEvent; MAX_SOURCES + 1]> =
            self.events.iter().map(ReadyEvent::from).collect();

        for event in ready {
            if dispatch_one(&self.registrar, event, sink) == Continuation::Stop {
                return Ok(Continuation::Stop);
            }
        }

        Ok(Continuation::Continue)
    }
}

fn dispatch_one(
    registrar: &SourceRegistrar,
    event: ReadyEvent,
    sink: &mut dyn ReadinessSink,
) -> Continuation {
    let source = SourceKindReady::from_token(event.token);

    if source == SourceKindReady::Unknown {
        tracing::warn!(
            message = "IoDispatcher::poll_once -> unknown token",
            token = ?event.token
        );
        return Continuation::Continue;
    }

    if event.readable && sink.on_readable(source) == Continuation::Stop {
        return Continuation::Stop;
    }

    if event.writable && sink.on_writable(source) == Continuation::Stop {
        return Continuation::Stop;
    }

    if event.hangup {
        if let SourceKindReady::Descriptor(fd) = source {
            // A stale event for a descriptor that was unbound earlier in this batch.
            if !registrar.unregister_source(fd, false) {
                tracing::debug!(
                    message = "IoDispatcher::poll_once -> hangup for released slot ignored",
                    fd
                );
                return Continuation::Continue;
            }
        }
        return sink.on_hangup(source);
    }

    Continuation::Continue
}
