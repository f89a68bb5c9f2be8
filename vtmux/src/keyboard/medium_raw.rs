// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.
// cspell:words keycode keycodes

use smallvec::SmallVec;

/// Release flag on the first byte of every medium-raw record.
pub const RELEASE_BIT: u8 = 0x80;

/// One key press or release, as delivered in medium-raw mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawKeyEvent {
    pub keycode: u16,
    pub down: bool,
}

/// Decoded records, plus how many input bytes they used. Bytes past `consumed` are an
/// incomplete 3-byte record that should be retried with more input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediumRawDecoded {
    pub events: SmallVec<[RawKeyEvent; 8]>,
    pub consumed: usize,
}

/// Decode a medium-raw byte stream.
///
/// - Keycodes below 128 are one byte: `keycode | release`.
/// - Larger keycodes are three bytes: `0x00 | release`, `0x80 | hi7`, `0x80 | lo7`.
///   A three-byte record without the high bits is consumed and ignored.
#[must_use]
pub fn decode_medium_raw(bytes: &[u8]) -> MediumRawDecoded {
    let mut decoded = MediumRawDecoded::default();
    let mut index = 0;

    while let Some(&first) = bytes.get(index) {
        let down = first & RELEASE_BIT == 0;
        let code = first & !RELEASE_BIT;

        if code != 0 {
            decoded.events.push(RawKeyEvent {
                keycode: u16::from(code),
                down,
            });
            index += 1;
            continue;
        }

        let (Some(&high), Some(&low)) = (bytes.get(index + 1), bytes.get(index + 2)) else {
            break;
        };
        // Both continuation bytes carry the high bit; anything else is line noise.
        if high & 0x80 != 0 && low & 0x80 != 0 {
            decoded.events.push(RawKeyEvent {
                keycode: (u16::from(high & 0x7f) << 7) | u16::from(low & 0x7f),
                down,
            });
        }
        index += 3;
    }

    decoded.consumed = index;
    decoded
}

/// Length of the longest prefix of `bytes` made of whole records.
#[must_use]
pub fn complete_prefix_len(bytes: &[u8]) -> usize { decode_medium_raw(bytes).consumed }
