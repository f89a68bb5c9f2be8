// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words preedit

use unicode_width::UnicodeWidthChar;

use super::{BLUE_BACKGROUND, ERASE_TO_END_OF_LINE, INVERSE, REQUEST_CURSOR_POSITION,
            RESET_ATTRIBUTES, RESTORE_CURSOR, SAVE_CURSOR, push_move_cursor};
use crate::{EngineDesc, ImeProperty, LookupTable, PreeditAttr, WindowSize};

/// Lookup table text split around the highlighted candidate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct LookupFragments {
    head: String,
    middle: String,
    end: String,
}

/// Draws IME composition state over the shell's output: preedit text at the cursor,
/// the candidate list on the line below it, and the status row at the bottom.
///
/// Every method returns the bytes to write, so the owner decides whether the session is
/// visible enough to write them. State is updated either way.
///
/// The lookup table is drawn in two steps, because its position depends on where the
/// shell left the cursor: [`update_lookup_table()`] stores the fragments and asks the
/// console for the cursor position, and [`cursor_position()`] draws them once the
/// answer arrives.
///
/// [`update_lookup_table()`]: Self::update_lookup_table
/// [`cursor_position()`]: Self::cursor_position
#[derive(Debug, Clone, Default)]
pub struct CompositionRenderer {
    preedit_text: Option<String>,
    lookup: Option<LookupFragments>,
    /// Where the lookup table was last drawn (row, col).
    lookup_position: Option<(u16, u16)>,
    engine: Option<EngineDesc>,
    properties: Vec<ImeProperty>,
}

/// Columns `text` takes on the console; every character takes at least one.
fn display_width(text: &str) -> usize {
    text.chars()
        .map(|ch| if ch.width() == Some(2) { 2 } else { 1 })
        .sum()
}

/// Byte offset of character `char_index`, clamped to the end.
fn byte_offset(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map_or(text.len(), |(offset, _)| offset)
}

impl CompositionRenderer {
    #[must_use]
    pub fn preedit_text(&self) -> Option<&str> { self.preedit_text.as_deref() }

    #[must_use]
    pub fn has_lookup_table(&self) -> bool { self.lookup.is_some() }

    /// Blank out the previous preedit text.
    fn clear_preedit(&mut self, acc: &mut String) {
        let Some(previous) = self.preedit_text.take() else {
            return;
        };
        let width = display_width(&previous);
        if width == 0 {
            return;
        }
        acc.push_str(SAVE_CURSOR);
        acc.extend(std::iter::repeat_n(' ', width));
        acc.push_str(RESTORE_CURSOR);
    }

    /// Replace the preedit text.
    ///
    /// An attribute spanning the whole text draws it inverse. An attribute over part
    /// of it draws that part on a blue background (the last such attribute wins).
    #[must_use]
    pub fn preedit_changed(&mut self, text: &str, attrs: &[PreeditAttr], visible: bool) -> String {
        let mut acc = String::new();
        self.clear_preedit(&mut acc);
        if !visible {
            return acc;
        }

        acc.push_str(SAVE_CURSOR);

        let mut whole = false;
        let mut sub_range = None;
        for attr in attrs.iter().filter(|it| it.is_styling()) {
            let start = byte_offset(text, attr.start);
            let end = byte_offset(text, attr.end).max(start);
            if end - start == text.len() {
                whole = true;
            } else {
                sub_range = Some((start, end));
            }
        }

        if whole {
            acc.push_str(INVERSE);
        }
        match sub_range {
            Some((start, end)) => {
                acc.push_str(&text[..start]);
                acc.push_str(BLUE_BACKGROUND);
                acc.push_str(&text[start..end]);
                acc.push_str(RESET_ATTRIBUTES);
                if whole {
                    acc.push_str(INVERSE);
                }
                acc.push_str(&text[end..]);
            }
            None => acc.push_str(text),
        }

        self.preedit_text = Some(text.to_string());
        acc.push_str(RESTORE_CURSOR);
        acc
    }

    /// Erase the drawn lookup table line and forget the fragments.
    fn clear_lookup_table(&mut self, acc: &mut String) {
        if self.lookup.take().is_none() {
            return;
        }
        if let Some((row, col)) = self.lookup_position {
            acc.push_str(SAVE_CURSOR);
            push_move_cursor(acc, row, col);
            acc.push_str(ERASE_TO_END_OF_LINE);
            acc.push_str(RESTORE_CURSOR);
        }
    }

    /// Store the current page of candidates and request the cursor position, or hide the
    /// table.
    #[must_use]
    pub fn update_lookup_table(&mut self, table: &LookupTable, visible: bool) -> String {
        let mut acc = String::new();
        if !visible {
            self.clear_lookup_table(&mut acc);
            return acc;
        }

        let cursor_in_page = table.cursor_in_page();
        let mut fragments = LookupFragments::default();

        for (in_page, candidate) in table.candidates[table.page_start()..table.page_end()]
            .iter()
            .enumerate()
        {
            let label = table
                .labels
                .get(in_page)
                .cloned()
                .unwrap_or_else(|| in_page.to_string());
            let separator = if in_page == 0 { "" } else { " " };
            let cell = format!("{separator}{label}. {candidate}");

            let target = if !table.cursor_visible || in_page < cursor_in_page {
                &mut fragments.head
            } else if in_page == cursor_in_page {
                &mut fragments.middle
            } else {
                &mut fragments.end
            };
            target.push_str(&cell);
        }

        self.clear_lookup_table(&mut acc);
        self.lookup = Some(fragments);
        acc.push_str(REQUEST_CURSOR_POSITION);
        acc
    }

    /// Draw the stored lookup table on the line below the reported cursor row.
    #[must_use]
    pub fn cursor_position(&mut self, row: u16, _col: u16) -> String {
        let mut acc = String::new();
        let Some(fragments) = self.lookup.as_ref() else {
            return acc;
        };

        let position = (row.saturating_add(1), 1);
        acc.push_str(SAVE_CURSOR);
        push_move_cursor(&mut acc, position.0, position.1);
        acc.push_str(&fragments.head);
        acc.push_str(INVERSE);
        acc.push_str(&fragments.middle);
        acc.push_str(RESET_ATTRIBUTES);
        acc.push_str(&fragments.end);
        acc.push_str(RESTORE_CURSOR);
        self.lookup_position = Some(position);
        acc
    }

    pub fn engine_changed(&mut self, engine: EngineDesc) { self.engine = Some(engine); }

    pub fn register_properties(&mut self, properties: Vec<ImeProperty>) {
        self.properties = properties;
    }

    /// Replace the property with the same key, or append it.
    pub fn update_property(&mut self, property: ImeProperty) {
        match self.properties.iter_mut().find(|it| it.key == property.key) {
            Some(existing) => *existing = property,
            None => self.properties.push(property),
        }
    }

    /// Text of the status row, cut to `cols` columns.
    #[must_use]
    pub fn status_text(&self, cols: u16) -> String {
        let mut text = String::new();
        if let Some(engine) = self.engine.as_ref() {
            text.push_str(engine.display_name());
        }
        for property in self.properties.iter().filter(|it| it.visible) {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&property.label);
        }

        let mut used = 0;
        text.chars()
            .take_while(|ch| {
                used += if ch.width() == Some(2) { 2 } else { 1 };
                used <= usize::from(cols)
            })
            .collect()
    }

    /// Redraw the status row (the last row, outside the scrolling region).
    #[must_use]
    pub fn draw_status(&self, size: WindowSize) -> String {
        let mut acc = String::new();
        acc.push_str(SAVE_CURSOR);
        push_move_cursor(&mut acc, size.rows.max(1), 1);
        acc.push_str(ERASE_TO_END_OF_LINE);
        acc.push_str(&self.status_text(size.cols));
        acc.push_str(RESTORE_CURSOR);
        acc
    }
}
