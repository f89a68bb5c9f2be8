// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::SessionId;

/// Number of session slots in the ring.
pub const MAX_SESSIONS: usize = 10;

/// What a ring scan looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotTarget {
    /// Any occupied slot.
    Any,
    /// Any free slot.
    Empty,
    Session(SessionId),
}

impl SlotTarget {
    fn matches(self, slot: Option<SessionId>) -> bool {
        match self {
            SlotTarget::Any => slot.is_some(),
            SlotTarget::Empty => slot.is_none(),
            SlotTarget::Session(id) => slot == Some(id),
        }
    }
}

/// Walk the ring from `current`, in `forward` or backward direction, optionally
/// stepping once before looking. Visits every slot once and returns the first that
/// matches `target`; with no match, returns `current`.
///
/// ```text
/// current = 3, forward, step_first   →  4 5 6 7 8 9 0 1 2 3
/// current = 3, backward, !step_first →  3 2 1 0 9 8 7 6 5 4
/// ```
#[must_use]
pub fn scan_ring(
    occupancy: &[Option<SessionId>; MAX_SESSIONS],
    current: usize,
    target: SlotTarget,
    forward: bool,
    step_first: bool,
) -> usize {
    let step = |index: usize| {
        if forward {
            (index + 1) % MAX_SESSIONS
        } else {
            (index + MAX_SESSIONS - 1) % MAX_SESSIONS
        }
    };

    let mut index = current % MAX_SESSIONS;
    if step_first {
        index = step(index);
    }

    for _ in 0..MAX_SESSIONS {
        if target.matches(occupancy[index]) {
            return index;
        }
        index = step(index);
    }

    current
}
