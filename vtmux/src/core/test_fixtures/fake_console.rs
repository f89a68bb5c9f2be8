// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words keymap keysym

use std::{cell::RefCell,
          collections::HashMap,
          io::{Error, ErrorKind, Result},
          path::{Path, PathBuf}};

use crate::{ConsoleDevice, K_HOLE, KbMode, Keysym, MetaMode, SavedTermios, WindowSize};

/// Mutating calls made on a [`FakeConsole`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCall {
    SetKeyboardMode(KbMode),
    EnterRawMode,
    RestoreTermios,
    SetLeds(u8),
    RedirectConsole(Option<PathBuf>),
    SetVtProcessMode { release: i32, acquire: i32 },
    SetVtAutoMode,
    ReleaseDisplay,
    ActivateVt(u16),
}

#[derive(Debug)]
struct FakeConsoleState {
    keymap: HashMap<(u8, u8), Keysym>,
    function_strings: HashMap<u8, Vec<u8>>,
    meta: MetaMode,
    leds: u8,
    kb_mode: KbMode,
    window_size: Option<WindowSize>,
    active_vt: bool,
    calls: Vec<ConsoleCall>,
}

/// In-memory [`ConsoleDevice`]. Missing keymap entries read as [`K_HOLE`].
#[derive(Debug)]
pub struct FakeConsole {
    state: RefCell<FakeConsoleState>,
}

impl Default for FakeConsole {
    fn default() -> Self {
        Self {
            state: RefCell::new(FakeConsoleState {
                keymap: HashMap::new(),
                function_strings: HashMap::new(),
                meta: MetaMode::default(),
                leds: 0,
                kb_mode: KbMode::Xlate,
                window_size: Some(WindowSize::default()),
                active_vt: true,
                calls: vec![],
            }),
        }
    }
}

impl FakeConsole {
    pub fn set_keymap_entry(&self, table: u8, index: u8, keysym: Keysym) {
        self.state.borrow_mut().keymap.insert((table, index), keysym);
    }

    pub fn set_function_string(&self, func: u8, bytes: &[u8]) {
        self.state
            .borrow_mut()
            .function_strings
            .insert(func, bytes.to_vec());
    }

    pub fn set_meta_mode(&self, meta: MetaMode) { self.state.borrow_mut().meta = meta; }

    /// [`None`] makes [`ConsoleDevice::window_size()`] fail.
    pub fn set_window_size(&self, size: Option<WindowSize>) {
        self.state.borrow_mut().window_size = size;
    }

    pub fn set_active_vt(&self, active: bool) { self.state.borrow_mut().active_vt = active; }

    pub fn kb_mode(&self) -> KbMode { self.state.borrow().kb_mode }

    pub fn calls(&self) -> Vec<ConsoleCall> { self.state.borrow().calls.clone() }

    pub fn take_calls(&self) -> Vec<ConsoleCall> {
        std::mem::take(&mut self.state.borrow_mut().calls)
    }

    /// Just the [`ConsoleCall::RedirectConsole`] targets.
    pub fn redirects(&self) -> Vec<Option<PathBuf>> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                ConsoleCall::RedirectConsole(target) => Some(target.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ConsoleCall) { self.state.borrow_mut().calls.push(call); }
}

impl ConsoleDevice for FakeConsole {
    fn keyboard_mode(&self) -> Result<KbMode> { Ok(self.state.borrow().kb_mode) }

    fn set_keyboard_mode(&self, mode: KbMode) -> Result<()> {
        self.state.borrow_mut().kb_mode = mode;
        self.record(ConsoleCall::SetKeyboardMode(mode));
        Ok(())
    }

    fn enter_raw_mode(&self) -> Result<SavedTermios> {
        self.record(ConsoleCall::EnterRawMode);
        Ok(SavedTermios::default())
    }

    fn restore_termios(&self, _saved: &SavedTermios) -> Result<()> {
        self.record(ConsoleCall::RestoreTermios);
        Ok(())
    }

    fn leds(&self) -> Result<u8> { Ok(self.state.borrow().leds) }

    fn set_leds(&self, leds: u8) -> Result<()> {
        self.state.borrow_mut().leds = leds;
        self.record(ConsoleCall::SetLeds(leds));
        Ok(())
    }

    fn keymap_entry(&self, table: u8, index: u8) -> Result<u16> {
        Ok(self
            .state
            .borrow()
            .keymap
            .get(&(table, index))
            .copied()
            .unwrap_or(K_HOLE))
    }

    fn function_string(&self, func: u8) -> Result<Vec<u8>> {
        Ok(self
            .state
            .borrow()
            .function_strings
            .get(&func)
            .cloned()
            .unwrap_or_default())
    }

    fn meta_mode(&self) -> Result<MetaMode> { Ok(self.state.borrow().meta) }

    fn window_size(&self) -> Result<WindowSize> {
        self.state
            .borrow()
            .window_size
            .ok_or_else(|| Error::new(ErrorKind::Unsupported, "no geometry"))
    }

    fn redirect_console(&self, slave: Option<&Path>) -> Result<()> {
        self.record(ConsoleCall::RedirectConsole(slave.map(Path::to_path_buf)));
        Ok(())
    }

    fn set_vt_process_mode(&self, release_signal: i32, acquire_signal: i32) -> Result<()> {
        self.record(ConsoleCall::SetVtProcessMode {
            release: release_signal,
            acquire: acquire_signal,
        });
        Ok(())
    }

    fn set_vt_auto_mode(&self) -> Result<()> {
        self.record(ConsoleCall::SetVtAutoMode);
        Ok(())
    }

    fn release_display(&self) -> Result<()> {
        self.record(ConsoleCall::ReleaseDisplay);
        Ok(())
    }

    fn is_active_vt(&self) -> Result<bool> { Ok(self.state.borrow().active_vt) }

    fn activate_vt(&self, number: u16) -> Result<()> {
        self.record(ConsoleCall::ActivateVt(number));
        Ok(())
    }
}
