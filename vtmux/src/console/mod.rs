// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words ioctl ioctls

//! The Linux virtual console: the ioctl surface behind [`ConsoleDevice`], and the
//! [`ConsoleDriver`] that reads the keyboard and owns the raw-mode transition.

// Attach sources.
pub mod console_device;
pub mod console_driver;
pub mod console_errors;
pub mod kd_ioctl;
pub mod linux_console;

// Re-export.
pub use console_device::*;
pub use console_driver::*;
pub use console_errors::*;
pub use linux_console::*;
