// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words applic DECCKM DECARM DECKPAM DECKPNM LNM

use smallvec::SmallVec;

use super::CLEAR_SCREEN;

/// Terminal mode flags that change what keys send. A session re-applies its flags to
/// the console whenever it gets the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermModes {
    /// `DECCKM`: cursor keys send `ESC O x` instead of `ESC [ x`.
    pub cursor_key_esc_o: bool,
    /// `DECARM`.
    pub auto_repeat: bool,
    /// `DECKPAM` / `DECKPNM`.
    pub applic_keypad: bool,
    /// `LNM`: Enter sends CR LF.
    pub cr_with_lf: bool,
}

impl Default for TermModes {
    fn default() -> Self {
        Self {
            cursor_key_esc_o: false,
            auto_repeat: true,
            applic_keypad: false,
            cr_with_lf: false,
        }
    }
}

impl TermModes {
    /// Sequences that put the console in these modes.
    #[must_use]
    pub fn to_escape_sequences(&self) -> String {
        let mut acc = String::new();
        acc.push_str(if self.cursor_key_esc_o { "\x1b[?1h" } else { "\x1b[?1l" });
        acc.push_str(if self.auto_repeat { "\x1b[?8h" } else { "\x1b[?8l" });
        acc.push_str(if self.applic_keypad { "\x1b=" } else { "\x1b>" });
        acc.push_str(if self.cr_with_lf { "\x1b[20h" } else { "\x1b[20l" });
        acc
    }

    /// All flags, then a screen clear. Written on VT enter.
    #[must_use]
    pub fn to_enter_sequences(&self) -> String {
        let mut acc = self.to_escape_sequences();
        acc.push_str(CLEAR_SCREEN);
        acc
    }
}

/// Where [`TermModeTracker`] is inside an escape sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum TrackerState {
    #[default]
    Ground,
    Escape,
    Csi {
        private: bool,
        params: SmallVec<[u16; 4]>,
        current: Option<u16>,
    },
}

/// Follows a shell's output for the sequences that change [`TermModes`], so keys are
/// encoded the way the program running in the shell expects. Everything else passes
/// by untouched; this is not a terminal emulator.
///
/// Sequences may be split across reads.
#[derive(Debug, Clone, Default)]
pub struct TermModeTracker {
    state: TrackerState,
}

impl TermModeTracker {
    pub fn track(&mut self, modes: &mut TermModes, bytes: &[u8]) {
        for &byte in bytes {
            self.state = match std::mem::take(&mut self.state) {
                TrackerState::Ground => match byte {
                    0x1b => TrackerState::Escape,
                    _ => TrackerState::Ground,
                },
                TrackerState::Escape => match byte {
                    b'=' => {
                        modes.applic_keypad = true;
                        TrackerState::Ground
                    }
                    b'>' => {
                        modes.applic_keypad = false;
                        TrackerState::Ground
                    }
                    b'[' => TrackerState::Csi {
                        private: false,
                        params: SmallVec::new(),
                        current: None,
                    },
                    0x1b => TrackerState::Escape,
                    _ => TrackerState::Ground,
                },
                TrackerState::Csi {
                    private,
                    mut params,
                    current,
                } => match byte {
                    b'?' if params.is_empty() && current.is_none() => TrackerState::Csi {
                        private: true,
                        params,
                        current,
                    },
                    b'0'..=b'9' => TrackerState::Csi {
                        private,
                        params,
                        current: Some(
                            current
                                .unwrap_or(0)
                                .saturating_mul(10)
                                .saturating_add(u16::from(byte - b'0')),
                        ),
                    },
                    b';' => {
                        params.push(current.unwrap_or(0));
                        TrackerState::Csi {
                            private,
                            params,
                            current: None,
                        }
                    }
                    b'h' | b'l' => {
                        params.extend(current);
                        apply_mode(modes, private, &params, byte == b'h');
                        TrackerState::Ground
                    }
                    0x1b => TrackerState::Escape,
                    0x40..=0x7e => TrackerState::Ground,
                    _ => TrackerState::Csi {
                        private,
                        params,
                        current,
                    },
                },
            };
        }
    }
}

fn apply_mode(modes: &mut TermModes, private: bool, params: &[u16], set: bool) {
    for param in params {
        match (private, param) {
            (true, 1) => modes.cursor_key_esc_o = set,
            (true, 8) => modes.auto_repeat = set,
            (false, 20) => modes.cr_with_lf = set,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_modes() {
        assert_eq!(
            TermModes::default().to_escape_sequences(),
            "\x1b[?1l\x1b[?8h\x1b>\x1b[20l"
        );
    }

    #[test]
    fn test_tracker_follows_mode_sequences() {
        let mut modes = TermModes::default();
        let mut tracker = TermModeTracker::default();

        tracker.track(&mut modes, b"vim\x1b[?1h\x1b=text\x1b[20h");
        assert_eq!(modes, TermModes {
            cursor_key_esc_o: true,
            auto_repeat: true,
            applic_keypad: true,
            cr_with_lf: true,
        });

        tracker.track(&mut modes, b"\x1b[?1;8l\x1b>\x1b[20l");
        assert_eq!(modes, TermModes {
            auto_repeat: false,
            ..TermModes::default()
        });
    }

    #[test]
    fn test_tracker_handles_split_sequences_and_ignores_others() {
        let mut modes = TermModes::default();
        let mut tracker = TermModeTracker::default();

        tracker.track(&mut modes, b"\x1b[?");
        tracker.track(&mut modes, b"1");
        tracker.track(&mut modes, b"h");
        assert!(modes.cursor_key_esc_o);

        // Cursor movement and private modes we don't track.
        tracker.track(&mut modes, b"\x1b[2J\x1b[?25l\x1b[1h");
        assert_eq!(modes, TermModes {
            cursor_key_esc_o: true,
            ..TermModes::default()
        });
    }

    #[test]
    fn test_all_set_with_clear() {
        let modes = TermModes {
            cursor_key_esc_o: true,
            auto_repeat: false,
            applic_keypad: true,
            cr_with_lf: true,
        };
        assert_eq!(
            modes.to_enter_sequences(),
            "\x1b[?1h\x1b[?8l\x1b=\x1b[20h\x1b[H\x1b[J"
        );
    }
}
