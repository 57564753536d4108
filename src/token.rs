//! Flat symbol-value space: raw bytes, code points, and rule ids.
//!
//! Every symbol in a grammar carries a [`SymbolValue`], a `u32` whose value
//! space partitions into disjoint ranges:
//!
//! - `0x00..=0x7F` — reserved, never produced by encoding.
//! - `0x80..=0xFF` — raw bytes: input bytes `>= 0x80` in byte mode, and bytes
//!   that failed UTF-8 decoding in lossy text mode. The value is the byte
//!   itself, so the raw byte `0xC3` stays distinguishable from U+00C3.
//! - `0x100..=0x1100FF` — code points biased by `0x100`. ASCII bytes are
//!   encoded here in both modes, so printable ASCII renders identically
//!   whether the input was parsed as text or as bytes.
//! - `0x110100..` — rule ids, assigned monotonically per grammar.
//!
//! Decoding back to bytes needs no mode flag: values below `0x100` are the
//! byte itself, everything else below the rule range is a biased code point.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bias added to code points so the raw-byte range below stays disjoint.
const CODE_POINT_BIAS: u32 = 0x100;

/// Largest terminal value: the maximum code point, biased.
pub const MAX_TERMINAL: u32 = CODE_POINT_BIAS + char::MAX as u32;

/// First value in the rule-id range.
pub const FIRST_RULE_ID: u32 = MAX_TERMINAL + 1;

/// A value carried by a symbol node: a terminal (raw byte or code point) or
/// a rule id.
#[repr(transparent)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SymbolValue(u32);

impl SymbolValue {
    /// Creates a `SymbolValue` from its raw `u32` representation.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw `u32` representation.
    #[inline]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Encodes an input byte (byte mode).
    ///
    /// ASCII bytes land in the code-point range; bytes `>= 0x80` stay in the
    /// raw-byte range.
    #[inline]
    pub const fn from_byte(b: u8) -> Self {
        if b < 0x80 {
            Self(b as u32 + CODE_POINT_BIAS)
        } else {
            Self(b as u32)
        }
    }

    /// Encodes a decoded code point (text mode).
    #[inline]
    pub const fn from_char(c: char) -> Self {
        Self(c as u32 + CODE_POINT_BIAS)
    }

    /// Returns `true` if this value is a rule id rather than a terminal.
    #[inline]
    pub const fn is_rule(&self) -> bool {
        self.0 > MAX_TERMINAL
    }

    /// Returns the code point this terminal encodes, if it encodes one.
    ///
    /// Raw bytes and rule ids return `None`.
    pub fn as_char(&self) -> Option<char> {
        if self.0 < CODE_POINT_BIAS || self.is_rule() {
            return None;
        }
        char::from_u32(self.0 - CODE_POINT_BIAS)
    }

    /// Appends the bytes of the original input unit to `out`.
    ///
    /// Raw bytes append themselves; code points append their UTF-8 encoding.
    /// A biased value that is not a Unicode scalar value (possible only in
    /// data that did not come from an encoder) appends U+FFFD.
    pub fn append_bytes(&self, out: &mut Vec<u8>) {
        debug_assert!(!self.is_rule(), "rule ids carry no bytes");
        if self.0 < CODE_POINT_BIAS {
            out.push(self.0 as u8);
        } else {
            let c = char::from_u32(self.0 - CODE_POINT_BIAS)
                .unwrap_or(char::REPLACEMENT_CHARACTER);
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        }
    }

    /// Appends an escaped rendering of this terminal to `out`.
    ///
    /// Raw bytes render as `\xHH`. Printable code points render as
    /// themselves; non-printable ones as `\xHH` below 0x80, `\uHHHH` up to
    /// 0xFFFF, and `\UHHHHHHHH` above. Backslash itself is not escaped here.
    pub fn append_escaped(&self, out: &mut String) {
        use std::fmt::Write as _;
        debug_assert!(!self.is_rule(), "rule ids have no terminal rendering");
        if self.0 < CODE_POINT_BIAS {
            let _ = write!(out, "\\x{:02x}", self.0);
            return;
        }
        let c = char::from_u32(self.0 - CODE_POINT_BIAS)
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        if is_printable(c) {
            out.push(c);
        } else if (c as u32) < 0x80 {
            let _ = write!(out, "\\x{:02x}", c as u32);
        } else if (c as u32) <= 0xFFFF {
            let _ = write!(out, "\\u{:04x}", c as u32);
        } else {
            let _ = write!(out, "\\U{:08x}", c as u32);
        }
    }
}

/// Printability for escaping purposes: the plain space plus anything that is
/// neither a control character nor other whitespace.
fn is_printable(c: char) -> bool {
    c == ' ' || (!c.is_control() && !c.is_whitespace())
}

impl fmt::Display for SymbolValue {
    /// Rule ids display as their decimal value; terminals display escaped.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_rule() {
            write!(f, "{}", self.0)
        } else {
            let mut s = String::with_capacity(4);
            self.append_escaped(&mut s);
            f.write_str(&s)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_is_disjoint() {
        // The raw byte 0xC3 and the code point U+00C3 must stay apart.
        let raw = SymbolValue::from_byte(0xC3);
        let cp = SymbolValue::from_char('\u{C3}');
        assert_ne!(raw, cp);
        assert_eq!(raw.as_u32(), 0xC3);
        assert_eq!(cp.as_u32(), 0xC3 + 0x100);
        assert!(!raw.is_rule());
        assert!(!cp.is_rule());
        assert!(SymbolValue::new(FIRST_RULE_ID).is_rule());
        assert!(!SymbolValue::new(MAX_TERMINAL).is_rule());
    }

    #[test]
    fn ascii_bytes_encode_as_code_points() {
        assert_eq!(SymbolValue::from_byte(b'a'), SymbolValue::from_char('a'));
        assert_eq!(SymbolValue::from_byte(0x7F).as_char(), Some('\u{7F}'));
        assert_eq!(SymbolValue::from_byte(0x80).as_char(), None);
    }

    #[test]
    fn bytes_round_trip_through_decoding() {
        let mut out = Vec::new();
        SymbolValue::from_byte(0xFE).append_bytes(&mut out);
        assert_eq!(out, [0xFE]);

        out.clear();
        SymbolValue::from_char('é').append_bytes(&mut out);
        assert_eq!(out, "é".as_bytes());

        out.clear();
        SymbolValue::from_char('\u{10FFFF}').append_bytes(&mut out);
        assert_eq!(out, "\u{10FFFF}".as_bytes());
    }

    #[test]
    fn escaped_forms() {
        let esc = |v: SymbolValue| {
            let mut s = String::new();
            v.append_escaped(&mut s);
            s
        };
        assert_eq!(esc(SymbolValue::from_byte(0xFE)), "\\xfe");
        assert_eq!(esc(SymbolValue::from_char('a')), "a");
        assert_eq!(esc(SymbolValue::from_char(' ')), " ");
        assert_eq!(esc(SymbolValue::from_char('\n')), "\\x0a");
        assert_eq!(esc(SymbolValue::from_char('\u{A0}')), "\\u00a0");
        assert_eq!(esc(SymbolValue::from_char('狮')), "狮");
        assert_eq!(esc(SymbolValue::from_char('\u{1F600}')), "\u{1F600}");
    }

    #[test]
    fn display_rules_as_decimal() {
        let r = SymbolValue::new(FIRST_RULE_ID + 1);
        assert_eq!(r.to_string(), (FIRST_RULE_ID + 1).to_string());
        assert_eq!(SymbolValue::from_char('x').to_string(), "x");
    }
}
