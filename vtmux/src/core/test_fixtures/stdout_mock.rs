// Copyright (c) 2024-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{io::{Result, Write},
          sync::Arc};

use strip_ansi_escapes::strip;

use crate::StdMutex;

/// You can safely clone this struct, since it only contains an `Arc<StdMutex<Vec<u8>>>`.
/// The inner `buffer` will not be cloned, just the [Arc] will be cloned.
///
/// The main constructors are:
/// - [`StdoutMock::default`]
/// - [`super::OutputDeviceExt::new_mock()`]
#[derive(Clone, Default)]
#[allow(missing_debug_implementations)]
pub struct StdoutMock {
    pub buffer: Arc<StdMutex<Vec<u8>>>,
}

impl StdoutMock {
    pub fn get_copy_of_buffer(&self) -> Vec<u8> { self.buffer.lock().unwrap().clone() }

    pub fn get_copy_of_buffer_as_string(&self) -> String {
        let buffer_data = self.buffer.lock().unwrap();
        String::from_utf8(buffer_data.clone()).expect("utf8")
    }

    pub fn get_copy_of_buffer_as_string_strip_ansi(&self) -> String {
        let buffer_data = self.buffer.lock().unwrap();
        String::from_utf8(strip(buffer_data.as_slice())).expect("utf8")
    }

    /// Drain the buffer, so a test can assert on the output of a single step.
    pub fn take_buffer_as_string(&self) -> String {
        let mut buffer_data = self.buffer.lock().unwrap();
        String::from_utf8(std::mem::take(&mut *buffer_data)).expect("utf8")
    }
}

impl Write for StdoutMock {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> { Ok(()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stdout_mock_no_strip_ansi() {
        let mut stdout_mock = StdoutMock::default();
        let stdout_mock_clone = stdout_mock.clone(); // Points to the same inner value.

        stdout_mock.write_all(b"\x1b[7mhello\x1b[m").unwrap();
        assert_eq!(
            stdout_mock_clone.get_copy_of_buffer_as_string(),
            "\x1b[7mhello\x1b[m"
        );
    }

    #[test]
    fn test_stdout_mock_take_buffer() {
        let mut stdout_mock = StdoutMock::default();
        stdout_mock.write_all(b"one").unwrap();
        assert_eq!(stdout_mock.take_buffer_as_string(), "one");
        stdout_mock.write_all(b"two").unwrap();
        assert_eq!(stdout_mock.take_buffer_as_string(), "two");
    }
}
