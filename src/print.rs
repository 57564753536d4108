//! Textual rendering: raw reconstruction and the numbered pretty-printer.
//!
//! [`Grammar::print`] writes the reconstructed input bytes; the result is
//! byte-identical to what was parsed. [`Grammar::pretty_print`] writes one
//! line per rule, `<index> -> <token>…`, with indices assigned on first
//! visit in breadth-first order from the root (the root is 0). The format is
//! stable and suitable for golden tests.

use crate::grammar::Grammar;
use crate::token::SymbolValue;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};

/// Error raised by the printing entry points.
#[derive(Debug)]
pub enum PrintError {
    /// No input has been parsed into the grammar yet.
    NoGrammar,
    /// The destination writer failed.
    Io(io::Error),
}

impl fmt::Display for PrintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrintError::NoGrammar => write!(f, "no parsed grammar"),
            PrintError::Io(e) => write!(f, "write failed: {}", e),
        }
    }
}

impl std::error::Error for PrintError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PrintError::NoGrammar => None,
            PrintError::Io(e) => Some(e),
        }
    }
}

impl From<io::Error> for PrintError {
    fn from(e: io::Error) -> Self {
        PrintError::Io(e)
    }
}

impl Grammar {
    /// Reconstructs the parsed input into `w`.
    pub fn print<W: Write>(&self, w: &mut W) -> Result<(), PrintError> {
        let root = self.root_id().ok_or(PrintError::NoGrammar)?;
        self.write_rule_bytes(root, w)?;
        Ok(())
    }

    /// Reconstructs the parsed input into a fresh byte vector.
    pub fn reconstruct(&self) -> Result<Vec<u8>, PrintError> {
        let mut out = Vec::new();
        self.print(&mut out)?;
        Ok(out)
    }

    /// Depth-first expansion of one rule into raw bytes.
    pub(crate) fn write_rule_bytes<W: Write>(
        &self,
        r: SymbolValue,
        w: &mut W,
    ) -> io::Result<()> {
        let mut scratch = Vec::with_capacity(4);
        let mut p = self.first(r);
        while !self.is_guard(p) {
            let v = self.value(p);
            if v.is_rule() {
                self.write_rule_bytes(v, w)?;
            } else {
                scratch.clear();
                v.append_bytes(&mut scratch);
                w.write_all(&scratch)?;
            }
            p = self.next(p);
        }
        Ok(())
    }

    /// Writes the numbered rule listing.
    ///
    /// An empty grammar (parsed from empty input) produces no output;
    /// an un-parsed grammar is an error.
    pub fn pretty_print<W: Write>(&self, w: &mut W) -> Result<(), PrintError> {
        let root = self.root_id().ok_or(PrintError::NoGrammar)?;
        if self.is_guard(self.first(root)) {
            return Ok(());
        }
        let mut printer = PrettyPrinter::new(root);
        let mut i = 0;
        while i < printer.order.len() {
            let r = printer.order[i];
            write!(w, "{} ->", i)?;
            printer.write_rule(self, r, w)?;
            i += 1;
        }
        Ok(())
    }
}

/// Assigns display indices to rules on first visit, breadth-first.
struct PrettyPrinter {
    order: Vec<SymbolValue>,
    index: HashMap<SymbolValue, usize>,
}

impl PrettyPrinter {
    fn new(root: SymbolValue) -> Self {
        let mut index = HashMap::new();
        index.insert(root, 0);
        Self {
            order: vec![root],
            index,
        }
    }

    fn write_rule<W: Write>(
        &mut self,
        g: &Grammar,
        r: SymbolValue,
        w: &mut W,
    ) -> io::Result<()> {
        let mut p = g.first(r);
        while !g.is_guard(p) {
            let v = g.value(p);
            if v.is_rule() {
                let idx = match self.index.get(&v) {
                    Some(&idx) => idx,
                    None => {
                        let idx = self.order.len();
                        self.index.insert(v, idx);
                        self.order.push(v);
                        idx
                    }
                };
                write!(w, " {}", idx)?;
            } else {
                write!(w, " {}", pretty_terminal(v))?;
            }
            p = g.next(p);
        }
        writeln!(w)
    }
}

/// Escapes one terminal for the rule listing.
///
/// Space becomes `_` so token boundaries stay visible; newline and tab use
/// their mnemonic escapes; backslash, parentheses, underscore, and digits
/// are backslash-prefixed so they cannot be mistaken for rule indices or
/// markup. Everything else uses the shared terminal escaping.
fn pretty_terminal(v: SymbolValue) -> String {
    match v.as_char() {
        Some(' ') => "_".to_string(),
        Some('\n') => "\\n".to_string(),
        Some('\t') => "\\t".to_string(),
        Some(c @ ('\\' | '(' | ')' | '_' | '0'..='9')) => format!("\\{}", c),
        _ => {
            let mut s = String::with_capacity(4);
            v.append_escaped(&mut s);
            s
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{EmptyPolicy, ParseOptions, TokenMode};

    fn pretty(g: &Grammar) -> String {
        let mut out = Vec::new();
        g.pretty_print(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn round_trip_print() {
        let input = "Round and round the ragged rocks, the ragged rascal ran.";
        let g = Grammar::parse(input.as_bytes()).unwrap();
        let mut out = Vec::new();
        g.print(&mut out).unwrap();
        assert_eq!(out, input.as_bytes());
        assert_eq!(g.reconstruct().unwrap(), input.as_bytes());
    }

    #[test]
    fn pretty_print_small_goldens() {
        let g = Grammar::parse(b"abcab").unwrap();
        assert_eq!(pretty(&g), "0 -> 1 c 1\n1 -> a b\n");

        let g = Grammar::parse(b"abaaba").unwrap();
        assert_eq!(pretty(&g), "0 -> 1 1\n1 -> a b a\n");

        let g = Grammar::parse(b"aaaa").unwrap();
        assert_eq!(pretty(&g), "0 -> 1 1\n1 -> a a\n");
    }

    #[test]
    fn pretty_print_binary_golden() {
        let input = [
            0xfe, 0xff, 0xfd, 0xfe, 0xff, 1, 2, 3, 4, 5, b'a', b'b', 1, 2, 3, 4, 5, b'a',
            b'b',
        ];
        let g = Grammar::parse_bytes(&input).unwrap();
        assert!(g.is_well_formed());
        assert_eq!(g.reconstruct().unwrap(), input);
        assert_eq!(
            pretty(&g),
            "0 -> 1 \\xfd 1 2 2\n\
             1 -> \\xfe \\xff\n\
             2 -> \\x01 \\x02 \\x03 \\x04 \\x05 a b\n"
        );
    }

    #[test]
    fn pretty_print_escapes() {
        let g = Grammar::parse(b"a b\t(1)\\_\n").unwrap();
        let out = pretty(&g);
        assert_eq!(
            out,
            "0 -> a _ b \\t \\( \\1 \\) \\\\ \\_ \\n\n"
        );
    }

    #[test]
    fn pretty_print_is_valid_utf8_for_text_input() {
        let g = Grammar::parse("°€狮".as_bytes()).unwrap();
        let mut out = Vec::new();
        g.pretty_print(&mut out).unwrap();
        assert!(String::from_utf8(out).is_ok());
    }

    #[test]
    fn pretty_print_deterministic_and_reparseable() {
        let input = "\npease porridge hot,\npease porridge cold,\npease porridge in the \
                     pot,\nnine days old.\n\nsome like it hot,\nsome like it cold,\nsome \
                     like it in the pot,\nnine days old.\n";
        let g = Grammar::parse(input.as_bytes()).unwrap();
        assert!(g.is_well_formed());
        assert_eq!(pretty(&g), pretty(&g));
        assert!(pretty(&g).starts_with("0 ->"));
        // Spaces render as underscores in the listing.
        assert!(pretty(&g).contains('_'));

        // Re-parsing the reconstruction yields the same bytes and listing.
        let bytes = g.reconstruct().unwrap();
        assert_eq!(bytes, input.as_bytes());
        let g2 = Grammar::parse(&bytes).unwrap();
        assert_eq!(g2.reconstruct().unwrap(), bytes);
        assert_eq!(pretty(&g2), pretty(&g));
    }

    #[test]
    fn empty_grammar_prints_nothing() {
        let g = Grammar::parse(b"").unwrap();
        let mut out = Vec::new();
        g.print(&mut out).unwrap();
        assert!(out.is_empty());
        g.pretty_print(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn unparsed_grammar_errors() {
        let g = Grammar::default();
        let mut out = Vec::new();
        assert!(matches!(g.print(&mut out), Err(PrintError::NoGrammar)));
        assert!(matches!(
            g.pretty_print(&mut out),
            Err(PrintError::NoGrammar)
        ));
    }

    #[test]
    fn strict_mode_prints_like_lossy_for_valid_input() {
        let input = "ascii and € and 狮".as_bytes();
        let strict = Grammar::parse_with(
            input,
            ParseOptions {
                tokens: TokenMode::Utf8Strict,
                empty: EmptyPolicy::Allow,
            },
        )
        .unwrap();
        let lossy = Grammar::parse(input).unwrap();
        assert_eq!(pretty(&strict), pretty(&lossy));
    }
}
