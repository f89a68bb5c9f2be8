// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{cell::RefCell,
          os::fd::RawFd,
          rc::Rc};

use mio::{Interest, Registry, Token, event::Source, unix::SourceFd};

/// Number of descriptor slots. Descriptors numbered at or above this are not
/// registered at all (see [`SourceRegistrar::register_source()`]).
pub const MAX_SOURCES: usize = 32;

/// Token reserved for the signal self-pipe. It sits just past the descriptor slots, so
/// it can never collide with a descriptor token.
pub const SIGNALS_TOKEN: Token = Token(MAX_SOURCES);

/// Identifies which event source became ready.
///
/// This enum is the single source of truth for [`mio`] [`Token`] ↔ source mapping.
/// Descriptor sources use their descriptor number as the token; the signal pipe has
/// its own reserved token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKindReady {
    /// A descriptor registered through [`SourceRegistrar::register_source()`].
    Descriptor(RawFd),
    /// The signal self-pipe registered through [`SourceRegistrar::register_signals()`].
    Signals,
    /// Unknown token - should not happen in normal operation.
    Unknown,
}

impl SourceKindReady {
    /// Returns the [`Token`] for this source kind, or [`None`] for
    /// [`SourceKindReady::Unknown`] and descriptors that can't have a slot.
    #[must_use]
    pub fn to_token(self) -> Option<Token> {
        match self {
            SourceKindReady::Descriptor(fd) => slot_index(fd).map(Token),
            SourceKindReady::Signals => Some(SIGNALS_TOKEN),
            SourceKindReady::Unknown => None,
        }
    }

    #[must_use]
    pub fn from_token(token: Token) -> Self {
        match token {
            SIGNALS_TOKEN => SourceKindReady::Signals,
            Token(index) if index < MAX_SOURCES => match RawFd::try_from(index) {
                Ok(fd) => SourceKindReady::Descriptor(fd),
                Err(_) => SourceKindReady::Unknown,
            },
            _ => SourceKindReady::Unknown,
        }
    }
}

fn slot_index(fd: RawFd) -> Option<usize> {
    usize::try_from(fd).ok().filter(|index| *index < MAX_SOURCES)
}

/// Cloneable handle to the dispatcher's [`Registry`] and its slot table.
///
/// Every [`NonBlockingChannel`] keeps one, so it can register on bind and unregister
/// on unbind without borrowing the [`IoDispatcher`]. The slot table is what makes
/// unregistration happen at most once per registration: the dispatcher releases a
/// slot on hangup, and a channel that unbinds later sees the slot is already free.
///
/// Everything runs on the dispatcher's thread, so this is `Rc` + `RefCell`.
///
/// [`NonBlockingChannel`]: crate::NonBlockingChannel
/// [`IoDispatcher`]: crate::IoDispatcher
#[derive(Clone)]
#[allow(missing_debug_implementations)]
pub struct SourceRegistrar {
    inner: Rc<RegistrarInner>,
}

struct RegistrarInner {
    registry: Registry,
    slots: RefCell<[bool; MAX_SOURCES]>,
}

impl SourceRegistrar {
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self {
            inner: Rc::new(RegistrarInner {
                registry,
                slots: RefCell::new([false; MAX_SOURCES]),
            }),
        }
    }

    /// Register `fd` for read readiness (hangup and error are always reported), and for
    /// write readiness too if `interested_in_writes`.
    ///
    /// Returns `false` without touching the poll if `fd` doesn't fit in the slot table,
    /// or is already registered, or if `epoll_ctl` fails.
    pub fn register_source(&self, fd: RawFd, interested_in_writes: bool) -> bool {
        let Some(index) = slot_index(fd) else {
            tracing::debug!(
                message = "SourceRegistrar::register_source -> descriptor out of range, ignored",
                fd,
                max = MAX_SOURCES
            );
            return false;
        };

        if self.inner.slots.borrow()[index] {
            tracing::debug!(
                message = "SourceRegistrar::register_source -> already registered",
                fd
            );
            return false;
        }

        let interest = interest_for(interested_in_writes);
        match self
            .inner
            .registry
            .register(&mut SourceFd(&fd), Token(index), interest)
        {
            Ok(()) => {
                self.inner.slots.borrow_mut()[index] = true;
                true
            }
            Err(error) => {
                tracing::warn!(
                    message = "SourceRegistrar::register_source -> epoll_ctl failed",
                    fd,
                    error = %error
                );
                false
            }
        }
    }

    /// Remove `fd` from the poll. Returns `false` if it was not registered, which makes
    /// a second call for the same registration a no-op.
    pub fn unregister_source(&self, fd: RawFd, interested_in_writes: bool) -> bool {
        let Some(index) = slot_index(fd) else {
            return false;
        };

        {
            let mut slots = self.inner.slots.borrow_mut();
            if !slots[index] {
                return false;
            }
            slots[index] = false;
        }

        if let Err(error) = self.inner.registry.deregister(&mut SourceFd(&fd)) {
            tracing::debug!(
                message = "SourceRegistrar::unregister_source -> epoll_ctl failed",
                fd,
                interested_in_writes,
                error = %error
            );
        }
        true
    }

    #[must_use]
    pub fn is_registered(&self, fd: RawFd) -> bool {
        slot_index(fd).is_some_and(|index| self.inner.slots.borrow()[index])
    }

    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.inner.slots.borrow().iter().filter(|it| **it).count()
    }

    /// Register a non-descriptor [`Source`] (the signal self-pipe) under
    /// [`SIGNALS_TOKEN`]. It doesn't take a slot.
    ///
    /// # Errors
    ///
    /// Returns the `epoll_ctl` error.
    pub fn register_signals<S: Source + ?Sized>(
        &self,
        source: &mut S,
    ) -> std::io::Result<()> {
        self.inner
            .registry
            .register(source, SIGNALS_TOKEN, Interest::READABLE)
    }

    /// Remove the signal self-pipe from the poll.
    ///
    /// # Errors
    ///
    /// Returns the `epoll_ctl` error.
    pub fn unregister_signals<S: Source + ?Sized>(
        &self,
        source: &mut S,
    ) -> std::io::Result<()> {
        self.inner.registry.deregister(source)
    }
}

fn interest_for(interested_in_writes: bool) -> Interest {
    if interested_in_writes {
        Interest::READABLE | Interest::WRITABLE
    } else {
        Interest::READABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::os::{fd::AsRawFd, unix::net::UnixStream};

    fn new_registrar() -> (mio::Poll, SourceRegistrar) {
        let poll = mio::Poll::new().unwrap();
        let registrar = SourceRegistrar::new(poll.registry().try_clone().unwrap());
        (poll, registrar)
    }

    #[test]
    fn test_token_round_trip_for_descriptor_and_signals() {
        assert_eq!(
            SourceKindReady::from_token(SourceKindReady::Descriptor(7).to_token().unwrap()),
            SourceKindReady::Descriptor(7)
        );
        assert_eq!(
            SourceKindReady::from_token(SIGNALS_TOKEN),
            SourceKindReady::Signals
        );
        assert_eq!(
            SourceKindReady::from_token(Token(usize::MAX)),
            SourceKindReady::Unknown
        );
        assert_eq!(SourceKindReady::Descriptor(MAX_SOURCES as RawFd).to_token(), None);
        assert_eq!(SourceKindReady::Unknown.to_token(), None);
    }

    #[test]
    #[serial]
    fn test_register_then_unregister_once() {
        let (_poll, registrar) = new_registrar();
        let (left, _right) = UnixStream::pair().unwrap();
        let fd = left.as_raw_fd();

        assert!(registrar.register_source(fd, false));
        assert!(registrar.is_registered(fd));
        assert!(!registrar.register_source(fd, false));

        assert!(registrar.unregister_source(fd, false));
        assert!(!registrar.unregister_source(fd, false));
        assert!(!registrar.is_registered(fd));
        assert_eq!(registrar.registered_count(), 0);
    }

    #[test]
    #[serial]
    fn test_descriptor_at_capacity_is_ignored() {
        let (_poll, registrar) = new_registrar();
        assert!(!registrar.register_source(MAX_SOURCES as RawFd, false));
        assert!(!registrar.register_source(-1, false));
        assert_eq!(registrar.registered_count(), 0);
    }
}
