// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words preedit keypress TIOCCONS

use std::path::{Path, PathBuf};

use smallvec::SmallVec;

use super::{ChildHandle, CompositionRenderer, DISABLE_CURSOR_BLINK, ReapPolicy, SessionEnv,
            SessionId, SpawnError, TermModeTracker, TermModes, push_scrolling_region,
            reap_child, resolve_shell_candidates, spawn_first_available};
use crate::{ImeContext, ImeEvent, KeyboardCodec, KeyboardMode, NonBlockingChannel,
            OutputDevice, SharedConsole, ShellAction, WindowSize, decode_medium_raw,
            forwarded_key_bytes};

/// Shortcut actions produced by one [`Session::on_key_input()`] call.
pub type ShellActions = SmallVec<[ShellAction; 2]>;

/// One shell running in a pty, plus everything drawn on its behalf.
///
/// # Lifecycle
///
/// ```text
/// create ──► running ──► (vt_enter ⇄ vt_leave)* ──► exited ──► destroy
/// ```
///
/// The [`SessionManager`] owns every session and drives all transitions; a session
/// never reaches back into the manager.
///
/// # Output
///
/// Shell output goes to the console only while the session is active (has the
/// display). Inactive sessions keep reading their pty so the shell never blocks, and
/// their output is dropped; there is no screen buffer to replay.
///
/// [`SessionManager`]: crate::SessionManager
#[allow(missing_debug_implementations)]
pub struct Session {
    id: SessionId,
    pid: i32,
    channel: NonBlockingChannel,
    child: Box<dyn ChildHandle>,
    slave_path: Option<PathBuf>,
    ime: Box<dyn ImeContext>,
    codec: KeyboardCodec,
    modes: TermModes,
    mode_tracker: TermModeTracker,
    renderer: CompositionRenderer,
    size: WindowSize,
    active: bool,
    keyboard_mode: KeyboardMode,
    reap_policy: ReapPolicy,
    output: OutputDevice,
    console: SharedConsole,
}

impl Session {
    /// Start a shell in a new pty sized to the console minus the status row.
    ///
    /// # Errors
    ///
    /// [`SpawnError`] if no candidate shell could be started, or the pty master could
    /// not be made non-blocking.
    pub fn create(id: SessionId, env: &SessionEnv) -> Result<Self, SpawnError> {
        let size = env.console.window_size().unwrap_or_else(|error| {
            tracing::debug!(
                message = "Session::create -> window size unavailable, using default",
                error = %error
            );
            WindowSize::default()
        });

        let candidates = resolve_shell_candidates(env.command.as_deref());
        let spawned = spawn_first_available(env.spawner.as_ref(), &candidates, size.shell_area())?;
        let mut child = spawned.child;

        let mut channel = NonBlockingChannel::new(env.registrar.clone());
        if let Err(error) = channel.bind(Some(spawned.master)) {
            reap_child(child.as_mut(), env.reap_policy);
            return Err(error.into());
        }

        tracing::debug!(
            message = "Session::create -> spawned",
            session = %id,
            pid = spawned.pid,
            slave = ?spawned.slave_path
        );

        Ok(Self {
            id,
            pid: spawned.pid,
            channel,
            child,
            slave_path: spawned.slave_path,
            ime: env.ime_factory.create_context(),
            codec: KeyboardCodec::new(),
            modes: TermModes::default(),
            mode_tracker: TermModeTracker::default(),
            renderer: CompositionRenderer::default(),
            size,
            active: false,
            keyboard_mode: env.keyboard_mode,
            reap_policy: env.reap_policy,
            output: env.output.clone(),
            console: env.console.clone(),
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId { self.id }

    #[must_use]
    pub fn pid(&self) -> i32 { self.pid }

    #[must_use]
    pub fn raw_fd(&self) -> Option<std::os::fd::RawFd> { self.channel.raw_fd() }

    #[must_use]
    pub fn is_active(&self) -> bool { self.active }

    #[must_use]
    pub fn size(&self) -> WindowSize { self.size }

    #[must_use]
    pub fn term_modes(&self) -> TermModes { self.modes }

    #[must_use]
    pub fn slave_path(&self) -> Option<&Path> { self.slave_path.as_deref() }

    #[must_use]
    pub fn renderer(&self) -> &CompositionRenderer { &self.renderer }

    /// Whether `pid` is this session's child.
    #[must_use]
    pub fn child_exited(&self, pid: i32) -> bool { self.pid == pid }

    // ╭──────────────────────────────────────────────────────────╮
    // │ Shell output                                             │
    // ╰──────────────────────────────────────────────────────────╯

    /// Drain the pty. Returns the number of bytes read.
    pub fn on_readable(&mut self) -> usize {
        let output = &self.output;
        let active = self.active;
        let modes = &mut self.modes;
        let tracker = &mut self.mode_tracker;
        self.channel.on_readable(|bytes| {
            tracker.track(modes, bytes);
            forward_child_output(output, active, bytes);
            bytes.len()
        })
    }

    /// Shell output: shown if this session has the display, dropped otherwise.
    pub fn on_child_output(&mut self, bytes: &[u8]) {
        self.mode_tracker.track(&mut self.modes, bytes);
        forward_child_output(&self.output, self.active, bytes);
    }

    // ╭──────────────────────────────────────────────────────────╮
    // │ Keyboard input                                           │
    // ╰──────────────────────────────────────────────────────────╯

    /// Route keyboard input: IME first, then whatever it left to the shell.
    ///
    /// In [`KeyboardMode::MediumRaw`] the leftover is keycodes; they go through the
    /// [`KeyboardCodec`], and shortcut combinations come back as [`ShellAction`]s
    /// instead of reaching the shell.
    pub fn on_key_input(&mut self, bytes: &[u8]) -> ShellActions {
        let mut actions = ShellActions::new();

        let outcome = self.ime.filter_keypress(bytes);
        for event in outcome.events {
            self.apply_ime_event(event);
        }
        self.pump_ime_events();

        if outcome.leftover.is_empty() {
            return actions;
        }

        match self.keyboard_mode {
            KeyboardMode::Unicode => {
                self.channel.send(&outcome.leftover);
            }
            KeyboardMode::MediumRaw => {
                let console = self.console.as_ref();
                let mut to_shell = Vec::new();
                for key in decode_medium_raw(&outcome.leftover).events {
                    let keysym =
                        self.codec
                            .keycode_to_keysym(console, key.keycode, key.down, &self.modes);
                    if let Some(action) =
                        self.codec.shortcut(console, key.keycode, keysym, key.down)
                    {
                        actions.push(action);
                        continue;
                    }
                    to_shell.extend_from_slice(&self.codec.keysym_to_term_string(
                        console, keysym, key.down, &self.modes,
                    ));
                }
                if !to_shell.is_empty() {
                    self.channel.send(&to_shell);
                }
            }
        }

        actions
    }

    // ╭──────────────────────────────────────────────────────────╮
    // │ IME events                                               │
    // ╰──────────────────────────────────────────────────────────╯

    /// Apply events the IME produced on its own since the last call.
    pub fn pump_ime_events(&mut self) {
        for event in self.ime.take_pending_events() {
            self.apply_ime_event(event);
        }
    }

    fn draw(&self, bytes: &str) {
        if self.active && !bytes.is_empty() {
            self.output.write_str(bytes);
        }
    }

    fn redraw_status(&self) { self.draw(&self.renderer.draw_status(self.size)); }

    pub fn apply_ime_event(&mut self, event: ImeEvent) {
        match event {
            ImeEvent::Commit(text) => {
                self.channel.send(text.as_bytes());
            }
            ImeEvent::PreeditChanged {
                text,
                attrs,
                cursor_pos: _,
                visible,
            } => {
                let bytes = self.renderer.preedit_changed(&text, &attrs, visible);
                self.draw(&bytes);
            }
            ImeEvent::UpdateLookupTable { table, visible } => {
                let bytes = self.renderer.update_lookup_table(&table, visible);
                self.draw(&bytes);
            }
            ImeEvent::CursorPosition { row, col } => {
                let bytes = self.renderer.cursor_position(row, col);
                self.draw(&bytes);
            }
            ImeEvent::SwitcherSwitch { engines, key } => {
                let choice = (!engines.is_empty()).then(|| 1 % engines.len());
                tracing::debug!(
                    message = "Session -> engine switcher",
                    session = %self.id,
                    key,
                    choice = ?choice
                );
                self.ime.switcher_selected(choice);
            }
            ImeEvent::EngineChanged(engine) => {
                self.renderer.engine_changed(engine);
                self.redraw_status();
            }
            ImeEvent::RegisterProperties(properties) => {
                self.renderer.register_properties(properties);
                self.redraw_status();
            }
            ImeEvent::UpdateProperty(property) => {
                self.renderer.update_property(property);
                self.redraw_status();
            }
            ImeEvent::ForwardKeyEvent {
                keyval,
                keycode: _,
                state,
            } => {
                if let Some(text) = forwarded_key_bytes(keyval, state) {
                    self.channel.send(text.as_bytes());
                }
            }
            ImeEvent::UserWarning(message) => {
                tracing::warn!(message = "IME warning", session = %self.id, warning = %message);
            }
        }
    }

    // ╭──────────────────────────────────────────────────────────╮
    // │ Display ownership                                        │
    // ╰──────────────────────────────────────────────────────────╯

    /// This session gets the display. `peer` is the session that had it, if any;
    /// without one the multiplexer itself is just getting the VT, so geometry is
    /// re-read and the status row reserved.
    pub fn vt_enter(&mut self, peer: Option<SessionId>) {
        self.active = true;
        let mut acc = String::new();

        if peer.is_none() {
            match self.console.window_size() {
                Ok(size) => self.size = size,
                Err(error) => tracing::debug!(
                    message = "Session::vt_enter -> window size unavailable, keeping previous",
                    error = %error
                ),
            }
            push_scrolling_region(&mut acc, 1, self.size.shell_area().rows);
        }

        // A redirect that is still set makes TIOCCONS fail with EBUSY.
        if let Err(error) = self.console.redirect_console(None) {
            tracing::debug!(
                message = "Session::vt_enter -> undoing TIOCCONS failed",
                error = %error
            );
        }
        if let Some(slave) = self.slave_path.as_deref()
            && let Err(error) = self.console.redirect_console(Some(slave))
        {
            tracing::debug!(
                message = "Session::vt_enter -> TIOCCONS failed",
                slave = ?slave,
                error = %error
            );
        }

        acc.push_str(&self.modes.to_enter_sequences());
        self.codec.reset(self.console.as_ref());
        self.ime.load_settings();
        acc.push_str(&self.renderer.draw_status(self.size));

        self.output.write_str(&acc);
    }

    /// This session loses the display to `peer`, or to another VT when there is none.
    /// Only in the latter case are the console modes put back to safe defaults.
    pub fn vt_leave(&mut self, peer: Option<SessionId>) {
        if peer.is_none() {
            let mut acc = TermModes::default().to_escape_sequences();
            acc.push_str(DISABLE_CURSOR_BLINK);
            self.output.write_str(&acc);

            if let Err(error) = self.console.redirect_console(None) {
                tracing::debug!(
                    message = "Session::vt_leave -> undoing TIOCCONS failed",
                    error = %error
                );
            }
        }
        self.active = false;
    }

    // ╭──────────────────────────────────────────────────────────╮
    // │ Teardown                                                 │
    // ╰──────────────────────────────────────────────────────────╯

    /// Close the pty and reap the child. With `restore_full_screen` the shell area gets
    /// the full screen back; pass `false` when another session already owns the display.
    /// The manager has already forgotten this session by the time this runs.
    pub fn destroy(mut self, restore_full_screen: bool) {
        tracing::debug!(
            message = "Session::destroy",
            session = %self.id,
            pid = self.pid,
            restore_full_screen
        );
        self.channel.unbind();
        reap_child(self.child.as_mut(), self.reap_policy);

        if restore_full_screen {
            let mut acc = String::new();
            push_scrolling_region(&mut acc, 1, self.size.rows.max(1));
            self.output.write_str(&acc);
        }
    }
}

fn forward_child_output(output: &OutputDevice, active: bool, bytes: &[u8]) {
    if active {
        output.write_bytes(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CLEAR_SCREEN, ChildCall, EngineDesc, FilterOutcome, K_ALT, K_CTRL, KG_CTRL,
                KT_LETTER, SessionRig, make_keysym};
    use nix::sys::signal::Signal;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use smallvec::smallvec;
    use std::{io::{Read, Write},
              os::unix::net::UnixStream,
              time::Duration};

    fn read_shell(shell: &mut UnixStream) -> Vec<u8> {
        shell
            .set_read_timeout(Some(Duration::from_millis(500)))
            .unwrap();
        let mut buf = [0_u8; 256];
        let n = shell.read(&mut buf).unwrap();
        buf[..n].to_vec()
    }

    fn create(rig: &SessionRig) -> (Session, UnixStream) {
        let session = Session::create(SessionId(1), &rig.env).unwrap();
        let shell = rig.spawner.shell_end(session.pid());
        (session, shell)
    }

    #[test]
    #[serial]
    fn test_create_reserves_status_row() {
        let rig = SessionRig::default();
        let (session, _shell) = create(&rig);

        assert_eq!(rig.spawner.spawned_programs(), vec!["/bin/fake-shell"]);
        assert_eq!(rig.spawner.spawned_sizes(), vec![WindowSize { rows: 24, cols: 80 }]);
        assert_eq!(session.size(), WindowSize::default());
        assert!(!session.is_active());
        assert!(session.raw_fd().is_some());
        assert_eq!(rig.ime.contexts_created(), 1);
    }

    #[test]
    #[serial]
    fn test_create_without_geometry_uses_default() {
        let rig = SessionRig::default();
        rig.console.set_window_size(None);
        let (session, _shell) = create(&rig);
        assert_eq!(session.size(), WindowSize::default());
    }

    #[test]
    #[serial]
    fn test_create_falls_back_when_command_fails() {
        let rig = SessionRig::default();
        rig.spawner.fail_program("/bin/fake-shell");
        let (session, _shell) = create(&rig);

        // The first fallback depends on $SHELL and the passwd entry of whoever runs this.
        let first_fallback = resolve_shell_candidates(None)
            .into_iter()
            .next()
            .map(|it| it.program)
            .unwrap();
        // Failed attempts leave no record.
        assert_eq!(rig.spawner.spawned_programs(), vec![first_fallback]);
        assert!(session.pid() > 0);
    }

    #[test]
    #[serial]
    fn test_output_shown_only_while_active() {
        let rig = SessionRig::default();
        let (mut session, mut shell) = create(&rig);

        shell.write_all(b"hidden").unwrap();
        assert_eq!(session.on_readable(), 6);
        assert_eq!(rig.stdout.take_buffer_as_string(), "");

        session.vt_enter(None);
        rig.stdout.take_buffer_as_string();

        shell.write_all(b"shown").unwrap();
        session.on_readable();
        assert_eq!(rig.stdout.take_buffer_as_string(), "shown");
    }

    #[test]
    #[serial]
    fn test_modes_tracked_while_inactive() {
        let rig = SessionRig::default();
        let (mut session, _shell) = create(&rig);

        session.on_child_output(b"\x1b[?1h\x1b=");
        let modes = session.term_modes();
        assert!(modes.cursor_key_esc_o);
        assert!(modes.applic_keypad);
        assert_eq!(rig.stdout.take_buffer_as_string(), "");
    }

    #[test]
    #[serial]
    fn test_vt_enter_without_peer() {
        let rig = SessionRig::default();
        let (mut session, _shell) = create(&rig);

        session.vt_enter(None);

        assert!(session.is_active());
        let written = rig.stdout.take_buffer_as_string();
        assert!(written.starts_with("\x1b[1;24r"));
        assert!(written.contains(CLEAR_SCREEN));
        assert!(written.contains("\x1b[25;1H"));
        assert_eq!(
            rig.console.redirects(),
            vec![None, session.slave_path().map(Path::to_path_buf)]
        );
        assert_eq!(rig.ime.settings_loads(), 1);
    }

    #[test]
    #[serial]
    fn test_leave_then_enter_restores_shell_modes() {
        let rig = SessionRig::default();
        let (mut session, _shell) = create(&rig);
        session.on_child_output(b"\x1b[?1h\x1b=\x1b[20h");
        let modes = session.term_modes();
        session.vt_enter(None);
        rig.stdout.take_buffer_as_string();

        session.vt_leave(None);
        let left = rig.stdout.take_buffer_as_string();
        assert!(left.contains("\x1b[?1l"));
        assert!(left.contains("\x1b>"));
        assert!(left.contains("\x1b[20l"));
        assert_eq!(session.term_modes(), modes);

        session.vt_enter(None);
        let entered = rig.stdout.take_buffer_as_string();
        assert!(entered.contains(&modes.to_escape_sequences()));
        assert!(entered.contains("\x1b[?1h"));
        assert!(entered.contains("\x1b="));
        assert!(entered.contains("\x1b[20h"));
        assert_eq!(session.term_modes(), modes);
    }

    #[test]
    #[serial]
    fn test_vt_enter_from_peer_keeps_geometry() {
        let rig = SessionRig::default();
        let (mut session, _shell) = create(&rig);
        rig.console.set_window_size(Some(WindowSize { rows: 50, cols: 132 }));

        session.vt_enter(Some(SessionId(7)));

        assert_eq!(session.size(), WindowSize::default());
        let written = rig.stdout.take_buffer_as_string();
        assert!(!written.contains("\x1b[1;24r"));
        assert!(!written.contains("\x1b[1;49r"));
    }

    #[test]
    #[serial]
    fn test_vt_leave() {
        let rig = SessionRig::default();
        let (mut session, _shell) = create(&rig);
        session.vt_enter(None);
        rig.stdout.take_buffer_as_string();
        rig.console.take_calls();

        session.vt_leave(Some(SessionId(2)));
        assert!(!session.is_active());
        assert_eq!(rig.stdout.take_buffer_as_string(), "");
        assert!(rig.console.redirects().is_empty());

        session.vt_enter(Some(SessionId(2)));
        rig.console.take_calls();
        session.vt_leave(None);
        assert!(rig.stdout.take_buffer_as_string().ends_with(DISABLE_CURSOR_BLINK));
        assert_eq!(rig.console.redirects(), vec![None]);
    }

    #[test]
    #[serial]
    fn test_unicode_input_reaches_shell() {
        let rig = SessionRig::default();
        let (mut session, mut shell) = create(&rig);

        let actions = session.on_key_input(b"ls\r");
        assert!(actions.is_empty());
        assert_eq!(read_shell(&mut shell), b"ls\r");
        assert_eq!(rig.ime.filtered(), vec![b"ls\r".to_vec()]);
    }

    #[test]
    #[serial]
    fn test_ime_commit_replaces_consumed_input() {
        let rig = SessionRig::default();
        let (mut session, mut shell) = create(&rig);
        rig.ime.script_filter(FilterOutcome {
            leftover: vec![],
            events: smallvec![ImeEvent::Commit("你好".into())],
        });

        session.on_key_input(b"nihao ");
        assert_eq!(read_shell(&mut shell), "你好".as_bytes());
    }

    #[test]
    #[serial]
    fn test_fully_consumed_input_writes_nothing() {
        let rig = SessionRig::default();
        let (mut session, mut shell) = create(&rig);
        rig.ime.script_filter(FilterOutcome::default());

        let actions = session.on_key_input(b"n");
        assert!(actions.is_empty());

        shell.set_nonblocking(true).unwrap();
        let mut buf = [0_u8; 16];
        let error = shell.read(&mut buf).unwrap_err();
        assert_eq!(error.kind(), std::io::ErrorKind::WouldBlock);
    }

    #[test]
    #[serial]
    fn test_switcher_picks_next_engine() {
        let rig = SessionRig::default();
        let (mut session, _shell) = create(&rig);
        let engines = vec![EngineDesc::default(), EngineDesc::default(), EngineDesc::default()];

        rig.ime.push_pending(ImeEvent::SwitcherSwitch { engines, key: 0 });
        rig.ime.push_pending(ImeEvent::SwitcherSwitch {
            engines: vec![],
            key: 0,
        });
        session.pump_ime_events();

        assert_eq!(rig.ime.switcher_answers(), vec![Some(1), None]);
    }

    #[test]
    #[serial]
    fn test_rendering_suppressed_while_inactive() {
        let rig = SessionRig::default();
        let (mut session, _shell) = create(&rig);

        session.apply_ime_event(ImeEvent::PreeditChanged {
            text: "ni".into(),
            attrs: vec![],
            cursor_pos: 2,
            visible: true,
        });
        assert_eq!(rig.stdout.take_buffer_as_string(), "");
        assert_eq!(session.renderer().preedit_text(), Some("ni"));
    }

    #[test]
    #[serial]
    fn test_medium_raw_shortcut_and_keys() {
        let rig = SessionRig::new(KeyboardMode::MediumRaw);
        const KEY_CTRL: u8 = 29;
        const KEY_ALT: u8 = 56;
        const KEY_A: u8 = 30;
        const KEY_C: u8 = 46;
        rig.console.set_keymap_entry(0, KEY_CTRL, K_CTRL);
        rig.console.set_keymap_entry(1 << KG_CTRL, KEY_ALT, K_ALT);
        rig.console.set_keymap_entry(0, KEY_ALT, K_ALT);
        rig.console.set_keymap_entry(0, KEY_A, make_keysym(KT_LETTER, b'a'));
        rig.console.set_keymap_entry(0, KEY_C, make_keysym(KT_LETTER, b'c'));
        let (mut session, mut shell) = create(&rig);

        assert!(session.on_key_input(&[KEY_A, KEY_A | 0x80]).is_empty());
        assert_eq!(read_shell(&mut shell), b"a");

        let actions = session.on_key_input(&[KEY_CTRL, KEY_ALT, KEY_C]);
        assert_eq!(actions.as_slice(), &[ShellAction::Create]);
    }

    #[test]
    #[serial]
    fn test_destroy_reaps_and_restores_full_screen() {
        let rig = SessionRig::default();
        let (session, _shell) = create(&rig);
        let pid = session.pid();

        session.destroy(true);

        let calls = rig.spawner.child_calls(pid);
        assert_eq!(calls.first(), Some(&ChildCall::Signal(Signal::SIGTERM)));
        assert_eq!(rig.stdout.take_buffer_as_string(), "\x1b[1;25r");
    }

    #[test]
    #[serial]
    fn test_destroy_behind_another_session_leaves_screen_alone() {
        let rig = SessionRig::default();
        let (session, _shell) = create(&rig);
        let pid = session.pid();

        session.destroy(false);

        assert_eq!(
            rig.spawner.child_calls(pid).first(),
            Some(&ChildCall::Signal(Signal::SIGTERM))
        );
        assert_eq!(rig.stdout.take_buffer_as_string(), "");
    }
}
