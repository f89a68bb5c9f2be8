// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words preedit keyval keycode

use smallvec::SmallVec;

/// Modifier bit set on key release in [`ImeEvent::ForwardKeyEvent`] state.
pub const RELEASE_MASK: u32 = 1 << 30;

/// Keyval of the Return key.
pub const KEYVAL_RETURN: u32 = 0xff0d;

/// Keyvals at or above this, with this prefix, carry a Unicode scalar in the low bits.
const KEYVAL_UNICODE_PREFIX: u32 = 0x0100_0000;

/// What kind of styling a preedit attribute asks for. Only the first three affect
/// rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreeditAttrKind {
    Underline,
    Foreground,
    Background,
    Other,
}

/// Styled character range of the preedit text. `start` and `end` count characters,
/// not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreeditAttr {
    pub kind: PreeditAttrKind,
    pub start: usize,
    pub end: usize,
}

impl PreeditAttr {
    #[must_use]
    pub fn is_styling(&self) -> bool { self.kind != PreeditAttrKind::Other }
}

/// One page worth of candidates is shown; `cursor_pos` is global, not in-page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LookupTable {
    pub candidates: Vec<String>,
    /// Per in-page index. Missing labels default to the in-page index.
    pub labels: Vec<String>,
    pub page_size: usize,
    pub cursor_pos: usize,
    pub cursor_visible: bool,
}

impl LookupTable {
    #[must_use]
    /// Clamped to the candidate count, so a cursor past the end yields an empty page.
    pub fn page_start(&self) -> usize {
        let page_size = self.page_size.max(1);
        (self.cursor_pos / page_size * page_size).min(self.candidates.len())
    }

    #[must_use]
    pub fn page_end(&self) -> usize {
        (self.page_start() + self.page_size.max(1)).min(self.candidates.len())
    }

    #[must_use]
    pub fn cursor_in_page(&self) -> usize { self.cursor_pos.saturating_sub(self.page_start()) }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EngineDesc {
    pub name: String,
    pub longname: String,
    pub symbol: String,
}

impl EngineDesc {
    /// Short text for the status row.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.symbol.is_empty() {
            &self.longname
        } else {
            &self.symbol
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImeProperty {
    pub key: String,
    pub label: String,
    pub visible: bool,
}

/// Everything the IME can ask a session to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImeEvent {
    /// Text to send to the shell.
    Commit(String),
    PreeditChanged {
        text: String,
        attrs: Vec<PreeditAttr>,
        cursor_pos: usize,
        visible: bool,
    },
    UpdateLookupTable {
        table: LookupTable,
        visible: bool,
    },
    /// Reply to the cursor position request sent after a lookup table update
    /// (1 based, like the terminal reports it).
    CursorPosition {
        row: u16,
        col: u16,
    },
    /// The engine switcher was triggered; the session answers with
    /// [`ImeContext::switcher_selected()`].
    ///
    /// [`ImeContext::switcher_selected()`]: crate::ImeContext::switcher_selected
    SwitcherSwitch {
        engines: Vec<EngineDesc>,
        key: u32,
    },
    EngineChanged(EngineDesc),
    RegisterProperties(Vec<ImeProperty>),
    UpdateProperty(ImeProperty),
    /// A key the IME gives back to the application.
    ForwardKeyEvent {
        keyval: u32,
        keycode: u32,
        state: u32,
    },
    UserWarning(String),
}

/// Events are usually zero or one per call.
pub type ImeEvents = SmallVec<[ImeEvent; 2]>;

/// Result of [`ImeContext::filter_keypress()`].
///
/// [`ImeContext::filter_keypress()`]: crate::ImeContext::filter_keypress
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterOutcome {
    /// Input the IME did not consume, in order.
    pub leftover: Vec<u8>,
    pub events: ImeEvents,
}

impl FilterOutcome {
    /// The IME consumed nothing and has nothing to say.
    #[must_use]
    pub fn passthrough(bytes: &[u8]) -> Self {
        Self {
            leftover: bytes.to_vec(),
            events: ImeEvents::new(),
        }
    }
}

/// Bytes a forwarded key should put in the shell, if any.
#[must_use]
pub fn forwarded_key_bytes(keyval: u32, state: u32) -> Option<String> {
    if state & RELEASE_MASK != 0 {
        return None;
    }
    if keyval == KEYVAL_RETURN {
        return Some("\r".to_string());
    }
    let code_point = match keyval {
        0x20..=0x7e | 0xa0..=0xff => keyval,
        _ if keyval & 0xff00_0000 == KEYVAL_UNICODE_PREFIX => keyval & 0x00ff_ffff,
        _ => return None,
    };
    char::from_u32(code_point)
        .filter(|ch| !ch.is_control())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(0x61, 0, Some("a") ; "latin")]
    #[test_case(KEYVAL_RETURN, 0, Some("\r") ; "return")]
    #[test_case(0x0100_4e2d, 0, Some("中") ; "unicode keyval")]
    #[test_case(0x61, RELEASE_MASK, None ; "release")]
    #[test_case(0xff08, 0, None ; "backspace is not printable")]
    fn test_forwarded_key_bytes(keyval: u32, state: u32, expected: Option<&str>) {
        assert_eq!(forwarded_key_bytes(keyval, state).as_deref(), expected);
    }

    #[test]
    fn test_lookup_table_paging() {
        let table = LookupTable {
            candidates: (0..12).map(|it| it.to_string()).collect(),
            labels: vec![],
            page_size: 5,
            cursor_pos: 7,
            cursor_visible: true,
        };
        assert_eq!(table.page_start(), 5);
        assert_eq!(table.page_end(), 10);
        assert_eq!(table.cursor_in_page(), 2);

        let last_page = LookupTable {
            cursor_pos: 11,
            ..table
        };
        assert_eq!(last_page.page_end(), 12);
    }

    #[test_case(3, 5 ; "cursor on the candidate count")]
    #[test_case(3, 40 ; "cursor far past the end")]
    #[test_case(0, 2 ; "no candidates")]
    fn test_cursor_past_candidates_gives_empty_page(count: usize, cursor_pos: usize) {
        let table = LookupTable {
            candidates: (0..count).map(|it| it.to_string()).collect(),
            labels: vec![],
            page_size: 5,
            cursor_pos,
            cursor_visible: true,
        };
        assert_eq!(table.page_start(), count);
        assert_eq!(table.page_end(), count);
        assert!(table.page_start() <= table.page_end());
    }
}
