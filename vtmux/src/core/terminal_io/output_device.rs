// Copyright (c) 2024-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{io::Write,
          sync::{Arc, Mutex, MutexGuard, PoisonError}};

/// Disambiguate the type of `StdMutex` from any other mutex in scope.
pub type StdMutex<T> = Mutex<T>;

/// Type alias for a `Send`-able raw terminal writer.
pub type SendRawTerminal = dyn Write + Send;

/// Type alias for a `Send`-able raw terminal wrapped in an `Arc<StdMutex>`.
pub type SafeRawTerminal = Arc<StdMutex<SendRawTerminal>>;

pub type LockedOutputDevice<'a> = &'a mut dyn Write;

/// Macro to simplify locking and getting a mutable reference to the output device.
/// Don't call this again in the same scope, it will deadlock! A safe approach is to use
/// this macro in a separate block scope.
#[macro_export]
macro_rules! lock_output_device_as_mut {
    ($device:expr) => {
        &mut *$device.lock()
    };
}

/// The controlling terminal's output. Every [`Session`] and the composition renderer
/// write escape sequences and child output through a clone of this.
/// - It is safe to clone.
/// - Writes go straight through: each call to [`Self::write_bytes()`] flushes, so
///   cursor save / restore pairs reach the console in the order they were issued.
///
/// [`Session`]: crate::Session
#[derive(Clone)]
#[allow(missing_debug_implementations)]
pub struct OutputDevice {
    pub resource: SafeRawTerminal,
    pub is_mock: bool,
}

impl Default for OutputDevice {
    fn default() -> Self { Self::new_stdout() }
}

impl OutputDevice {
    #[must_use]
    pub fn new_stdout() -> Self {
        Self {
            resource: Arc::new(StdMutex::new(std::io::stdout())),
            is_mock: false,
        }
    }

    /// Locks the output device for writing. A poisoned lock is recovered, since the
    /// writer has no invariants a panic could have broken.
    pub fn lock(&self) -> MutexGuard<'_, SendRawTerminal> {
        self.resource.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write all of `bytes` and flush. Errors are logged and dropped: losing a frame of
    /// console output is not a reason to tear the multiplexer down.
    pub fn write_bytes(&self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let mut_ref: LockedOutputDevice<'_> = lock_output_device_as_mut!(self);
        if let Err(error) = mut_ref.write_all(bytes).and_then(|()| mut_ref.flush()) {
            // % is Display, ? is Debug.
            tracing::debug!(
                message = "OutputDevice::write_bytes -> write failed",
                len = bytes.len(),
                error = %error
            );
        }
    }

    pub fn write_str(&self, text: &str) { self.write_bytes(text.as_bytes()); }
}
