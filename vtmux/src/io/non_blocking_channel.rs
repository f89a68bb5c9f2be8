// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words EAGAIN EINTR CLOEXEC NONBLOCK

use std::{os::fd::{AsRawFd, OwnedFd, RawFd},
          time::Duration};

use rustix::{fs::{OFlags, fcntl_getfl, fcntl_setfl},
             io::{Errno, FdFlags, fcntl_getfd, fcntl_setfd}};
use smallvec::SmallVec;

use super::{ChannelBindError, SourceRegistrar};

/// Size of one read. A pty master rarely has more than this queued.
pub const READ_BUFFER_SIZE: usize = 10 * 1024;

/// Longest tail a consumer may leave unconsumed for the next read (an incomplete
/// scancode escape or UTF-8 sequence). Longer tails are dropped.
pub const CARRY_CAPACITY: usize = 16;

/// Number of `EAGAIN` retries [`NonBlockingChannel::send()`] makes before giving up.
pub const WRITE_RETRY_LIMIT: usize = 5;

/// Sleep between `EAGAIN` retries.
pub const WRITE_RETRY_DELAY: Duration = Duration::from_millis(200);

/// One descriptor as a non-blocking, edge-triggered I/O source.
///
/// # Reads
///
/// [`on_readable()`] is called by the owner when the dispatcher reports read readiness.
/// It reads [`READ_BUFFER_SIZE`] chunks until a short read or `EAGAIN` (the poll is
/// edge-triggered, so anything left unread would not be reported again). The consumer
/// is called once per non-empty chunk with the carried prefix in front of it, and
/// returns how many bytes it accepted. A read of `0` or an error calls nothing.
///
/// # Writes
///
/// [`send()`] writes directly. On `EAGAIN` it sleeps [`WRITE_RETRY_DELAY`] and
/// retries, at most [`WRITE_RETRY_LIMIT`] times per call. Any other error, or running
/// out of retries, abandons the rest of the bytes. That bounds a stuck writer to about
/// one second per call in exchange for never queueing output; a full pty (a child that
/// stopped reading) loses keystrokes rather than growing a buffer.
///
/// # Lifecycle
///
/// [`bind()`] takes ownership of the descriptor. [`unbind()`] (also run on drop)
/// unregisters it, unless the dispatcher already did on hangup, and closes it.
///
/// [`on_readable()`]: Self::on_readable
/// [`send()`]: Self::send
/// [`bind()`]: Self::bind
/// [`unbind()`]: Self::unbind
#[allow(missing_debug_implementations)]
pub struct NonBlockingChannel {
    fd: Option<OwnedFd>,
    registrar: SourceRegistrar,
    carry: SmallVec<[u8; CARRY_CAPACITY]>,
    interested_in_writes: bool,
}

impl NonBlockingChannel {
    #[must_use]
    pub fn new(registrar: SourceRegistrar) -> Self {
        Self {
            fd: None,
            registrar,
            carry: SmallVec::new(),
            interested_in_writes: false,
        }
    }

    /// Replace the bound descriptor. `None` just unbinds.
    ///
    /// The new descriptor gets `O_NONBLOCK` and `FD_CLOEXEC` and is registered for
    /// read readiness. A descriptor that doesn't fit in the dispatcher's slot table is
    /// still owned (and closed on unbind) but never reported ready.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelBindError`] if the descriptor flags can't be changed. The
    /// descriptor is closed in that case.
    pub fn bind(&mut self, fd: Option<OwnedFd>) -> Result<(), ChannelBindError> {
        self.unbind();

        let Some(fd) = fd else {
            return Ok(());
        };

        set_nonblocking_and_cloexec(&fd).map_err(|errno| ChannelBindError {
            fd: fd.as_raw_fd(),
            source: errno.into(),
        })?;

        self.registrar
            .register_source(fd.as_raw_fd(), self.interested_in_writes);
        self.fd = Some(fd);
        Ok(())
    }

    /// Unregister (if still registered) and close the descriptor. Calling this when
    /// nothing is bound is a no-op.
    pub fn unbind(&mut self) {
        if let Some(fd) = self.fd.take() {
            let raw_fd = fd.as_raw_fd();
            if self.registrar.is_registered(raw_fd) {
                self.registrar
                    .unregister_source(raw_fd, self.interested_in_writes);
            }
            self.carry.clear();
            drop(fd);
        }
    }

    #[must_use]
    pub fn raw_fd(&self) -> Option<RawFd> { self.fd.as_ref().map(AsRawFd::as_raw_fd) }

    #[must_use]
    pub fn is_bound(&self) -> bool { self.fd.is_some() }

    #[must_use]
    pub fn carried_len(&self) -> usize { self.carry.len() }

    /// Read what is available and hand it to `consume`, which returns how many of the
    /// bytes it accepted. Returns the number of new bytes read.
    pub fn on_readable(&mut self, mut consume: impl FnMut(&[u8]) -> usize) -> usize {
        let Some(fd) = self.fd.as_ref() else {
            return 0;
        };

        let mut buffer = [0_u8; CARRY_CAPACITY + READ_BUFFER_SIZE];
        let mut total_read = 0;

        loop {
            let carried = self.carry.len();
            buffer[..carried].copy_from_slice(&self.carry);

            match rustix::io::read(fd, &mut buffer[carried..carried + READ_BUFFER_SIZE]) {
                Ok(0) => break,
                Ok(bytes_read) => {
                    total_read += bytes_read;
                    let available = carried + bytes_read;
                    let consumed = consume(&buffer[..available]).min(available);
                    let tail = &buffer[consumed..available];

                    self.carry.clear();
                    if tail.len() <= CARRY_CAPACITY {
                        self.carry.extend_from_slice(tail);
                    } else {
                        tracing::debug!(
                            message = "NonBlockingChannel::on_readable -> unconsumed tail dropped",
                            fd = fd.as_raw_fd(),
                            len = tail.len()
                        );
                    }

                    if bytes_read < READ_BUFFER_SIZE {
                        break;
                    }
                }
                Err(Errno::INTR) => {}
                Err(Errno::AGAIN) => break,
                Err(errno) => {
                    tracing::debug!(
                        message = "NonBlockingChannel::on_readable -> read failed",
                        fd = fd.as_raw_fd(),
                        error = %errno
                    );
                    break;
                }
            }
        }

        total_read
    }

    /// Write `bytes`, retrying on `EAGAIN` as described on the type. Returns how many
    /// bytes were written.
    pub fn send(&self, bytes: &[u8]) -> usize {
        let Some(fd) = self.fd.as_ref() else {
            return 0;
        };

        let mut written = 0;
        let mut retries = 0;

        while written < bytes.len() {
            match rustix::io::write(fd, &bytes[written..]) {
                Ok(0) => break,
                Ok(count) => written += count,
                Err(Errno::INTR) => {}
                Err(Errno::AGAIN) if retries < WRITE_RETRY_LIMIT => {
                    retries += 1;
                    std::thread::sleep(WRITE_RETRY_DELAY);
                }
                Err(errno) => {
                    tracing::debug!(
                        message = "NonBlockingChannel::send -> remaining bytes abandoned",
                        fd = fd.as_raw_fd(),
                        written,
                        abandoned = bytes.len() - written,
                        error = %errno
                    );
                    break;
                }
            }
        }

        written
    }
}

impl Drop for NonBlockingChannel {
    fn drop(&mut self) { self.unbind(); }
}

fn set_nonblocking_and_cloexec(fd: &OwnedFd) -> rustix::io::Result<()> {
    let status_flags = fcntl_getfl(fd)?;
    fcntl_setfl(fd, status_flags | OFlags::NONBLOCK)?;
    let fd_flags = fcntl_getfd(fd)?;
    fcntl_setfd(fd, fd_flags | FdFlags::CLOEXEC)?;
    Ok(())
}
