// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words SIGCHLD

use std::os::fd::RawFd;

use super::{MAX_SESSIONS, SlotTarget, scan_ring};
use crate::{Session, SessionEnv, SessionId, ShellAction, SpawnError};

/// Owns up to [`MAX_SESSIONS`] sessions in a ring and decides which one has the
/// display.
///
/// Two positions matter and they are not the same thing:
/// - **current** is the ring slot the user navigated to. It may be empty.
/// - **active** is the session that is drawn and receives keyboard input. It is the
///   session in the current slot while this process owns the VT, and nothing otherwise.
///
/// Every change of the active session goes through [`set_active()`], which tells the
/// old one to leave and the new one to enter, each naming the other as its peer.
///
/// Sessions do not know their manager. Exit handling that the session would have
/// triggered on itself ([`session_exited()`]) is driven from here, and hands the
/// session back so the caller can destroy it after the ring is consistent again.
///
/// [`set_active()`]: Self::set_active
/// [`session_exited()`]: Self::session_exited
#[allow(missing_debug_implementations)]
pub struct SessionManager {
    slots: [Option<Session>; MAX_SESSIONS],
    current: usize,
    active: Option<SessionId>,
    owns_vt: bool,
    live_count: usize,
    next_id: u64,
    /// Holds a session between leaving the ring and being handed back, so it still
    /// gets its `vt_leave` during the navigation its exit causes.
    exiting: Option<Session>,
    shutdown_requested: bool,
    env: SessionEnv,
}

impl SessionManager {
    #[must_use]
    pub fn new(env: SessionEnv) -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            current: 0,
            active: None,
            owns_vt: false,
            live_count: 0,
            next_id: 1,
            exiting: None,
            shutdown_requested: false,
            env,
        }
    }

    // ╭──────────────────────────────────────────────────────────╮
    // │ Accessors                                                │
    // ╰──────────────────────────────────────────────────────────╯

    /// Live sessions. Only [`session_exited()`](Self::session_exited) decrements it.
    #[must_use]
    pub fn session_count(&self) -> usize { self.live_count }

    #[must_use]
    pub fn current_index(&self) -> usize { self.current }

    #[must_use]
    pub fn active_session_id(&self) -> Option<SessionId> { self.active }

    #[must_use]
    pub fn owns_vt(&self) -> bool { self.owns_vt }

    /// Whether the last session went away since the previous call.
    pub fn take_shutdown_request(&mut self) -> bool {
        std::mem::take(&mut self.shutdown_requested)
    }

    #[must_use]
    pub fn session_at(&self, index: usize) -> Option<&Session> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.slots
            .iter()
            .flatten()
            .chain(self.exiting.iter())
            .find(|it| it.id() == id)
    }

    fn session_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.slots
            .iter_mut()
            .flatten()
            .chain(self.exiting.iter_mut())
            .find(|it| it.id() == id)
    }

    pub fn active_session_mut(&mut self) -> Option<&mut Session> {
        let id = self.active?;
        self.session_mut(id)
    }

    fn occupancy(&self) -> [Option<SessionId>; MAX_SESSIONS] {
        std::array::from_fn(|index| self.slots[index].as_ref().map(Session::id))
    }

    /// See [`scan_ring()`].
    #[must_use]
    pub fn index_of(&self, target: SlotTarget, forward: bool, step_first: bool) -> usize {
        scan_ring(&self.occupancy(), self.current, target, forward, step_first)
    }

    // ╭──────────────────────────────────────────────────────────╮
    // │ Ring operations                                          │
    // ╰──────────────────────────────────────────────────────────╯

    /// Start a session in the first free slot at or after the current one, and switch
    /// to it. Returns [`None`] when the ring is full.
    ///
    /// # Errors
    ///
    /// [`SpawnError`] if the shell could not be started; the ring is unchanged.
    pub fn create_session(&mut self) -> Result<Option<SessionId>, SpawnError> {
        if self.live_count >= MAX_SESSIONS {
            tracing::debug!(message = "SessionManager::create_session -> ring full");
            return Ok(None);
        }

        let index = self.index_of(SlotTarget::Empty, true, false);
        if self.slots[index].is_some() {
            return Ok(None);
        }

        let id = SessionId(self.next_id);
        let session = Session::create(id, &self.env)?;
        self.next_id += 1;
        self.slots[index] = Some(session);
        self.live_count += 1;

        tracing::debug!(
            message = "SessionManager::create_session",
            session = %id,
            slot = index,
            live = self.live_count
        );
        self.switch_to_index(index);
        Ok(Some(id))
    }

    /// Destroy the session in the current slot, if any.
    ///
    /// Goes through [`session_exited()`](Self::session_exited) like any other exit, so
    /// the count is decremented there; a `SIGCHLD` for the same child later finds
    /// nothing.
    pub fn delete_session(&mut self) {
        let Some(id) = self.slots[self.current].as_ref().map(Session::id) else {
            return;
        };
        self.exit_and_destroy(id);
    }

    pub fn next_session(&mut self) {
        let index = self.index_of(SlotTarget::Any, true, true);
        self.switch_to_index(index);
    }

    pub fn prev_session(&mut self) {
        let index = self.index_of(SlotTarget::Any, false, true);
        self.switch_to_index(index);
    }

    /// Make slot `index` current, and active too if this process has the VT. Out of
    /// range is ignored.
    pub fn switch_to_index(&mut self, index: usize) {
        if index >= MAX_SESSIONS {
            return;
        }
        self.current = index;
        if self.owns_vt {
            let target = self.slots[index].as_ref().map(Session::id);
            self.set_active(target);
        }
    }

    /// This process gained or lost the VT.
    pub fn switch_vt(&mut self, owning: bool) {
        self.owns_vt = owning;
        let target = if owning {
            self.slots[self.current].as_ref().map(Session::id)
        } else {
            None
        };
        self.set_active(target);
    }

    /// Hand the display from the active session to `target`. Returns `false` if
    /// `target` is already active.
    pub fn set_active(&mut self, target: Option<SessionId>) -> bool {
        if self.active == target {
            return false;
        }

        if let Some(old) = self.active
            && let Some(session) = self.session_mut(old)
        {
            session.vt_leave(target);
        }

        let old = std::mem::replace(&mut self.active, target);

        if let Some(new) = target
            && let Some(session) = self.session_mut(new)
        {
            session.vt_enter(old);
        }

        tracing::debug!(message = "SessionManager::set_active", from = ?old, to = ?target);
        true
    }

    /// Take session `id` out of the ring after its exit: navigate away if it was
    /// current, drop the display if it still has it, and count it out. The last
    /// session going away requests shutdown.
    ///
    /// Returns the session so the caller can [`Session::destroy()`] it.
    pub fn session_exited(&mut self, id: SessionId) -> Option<Session> {
        let index = self.index_of(SlotTarget::Session(id), true, false);
        if self.slots[index].as_ref().map(Session::id) != Some(id) {
            return None;
        }
        self.exiting = self.slots[index].take();

        if index == self.current {
            self.prev_session();
        }

        if self.active == Some(id) {
            self.set_active(None);
        }

        self.live_count = self.live_count.saturating_sub(1);
        if self.live_count == 0 {
            tracing::debug!(message = "SessionManager -> last session exited");
            self.shutdown_requested = true;
        }

        self.exiting.take()
    }

    /// A session that took the display during exit navigation keeps its status row.
    fn exit_and_destroy(&mut self, id: SessionId) {
        if let Some(session) = self.session_exited(id) {
            session.destroy(self.active.is_none());
        }
    }

    /// A child was reaped. The first session (in slot order) that owns `pid` is
    /// destroyed. Returns whether one did.
    pub fn child_process_exited(&mut self, pid: i32) -> bool {
        let Some(id) = self
            .slots
            .iter()
            .flatten()
            .find(|it| it.child_exited(pid))
            .map(Session::id)
        else {
            return false;
        };

        tracing::debug!(message = "SessionManager::child_process_exited", pid, session = %id);
        self.exit_and_destroy(id);
        true
    }

    /// Run a keyboard shortcut.
    pub fn apply_action(&mut self, action: ShellAction) {
        tracing::debug!(message = "SessionManager::apply_action", action = ?action);
        match action {
            ShellAction::SwitchTo(index) => self.switch_to_index(index),
            ShellAction::Next => self.next_session(),
            ShellAction::Prev => self.prev_session(),
            ShellAction::Create => {
                if let Err(error) = self.create_session() {
                    tracing::warn!(message = "Failed to create a session", error = %error);
                }
            }
            ShellAction::Delete => self.delete_session(),
            ShellAction::ActivateVt(number) => {
                if let Err(error) = self.env.console.activate_vt(number) {
                    tracing::debug!(
                        message = "SessionManager -> VT_ACTIVATE failed",
                        vt = number,
                        error = %error
                    );
                }
            }
        }
    }

    // ╭──────────────────────────────────────────────────────────╮
    // │ Readiness                                                │
    // ╰──────────────────────────────────────────────────────────╯

    /// Drain the pty of the session that owns `fd`. Returns whether one does.
    pub fn on_session_readable(&mut self, fd: RawFd) -> bool {
        match self
            .slots
            .iter_mut()
            .flatten()
            .find(|it| it.raw_fd() == Some(fd))
        {
            Some(session) => {
                session.on_readable();
                true
            }
            None => false,
        }
    }

    /// The pty of the session that owns `fd` hung up: the session is finished. Returns
    /// whether one owned it.
    pub fn on_session_hangup(&mut self, fd: RawFd) -> bool {
        let Some(id) = self
            .slots
            .iter()
            .flatten()
            .find(|it| it.raw_fd() == Some(fd))
            .map(Session::id)
        else {
            return false;
        };

        tracing::debug!(message = "SessionManager::on_session_hangup", fd, session = %id);
        self.exit_and_destroy(id);
        true
    }

    /// Apply IME events that arrived outside of key handling, for every session.
    pub fn pump_ime_events(&mut self) {
        for session in self.slots.iter_mut().flatten() {
            session.pump_ime_events();
        }
    }

    /// Destroy every remaining session, without navigation or the exit count. Used at
    /// teardown.
    pub fn shutdown(&mut self) {
        self.active = None;
        self.live_count = 0;
        for slot in &mut self.slots {
            if let Some(session) = slot.take() {
                session.destroy(true);
            }
        }
    }
}
