//! Refrain: online grammar inference from repeated digrams.
//!
//! This crate infers a context-free grammar from a single sequence of
//! discrete symbols (bytes or code points) in one pass. Whenever an ordered
//! pair of adjacent symbols reappears, both occurrences are replaced by a
//! non-terminal and a rule is recorded for the pair; rules that end up
//! referenced only once are inlined again. The result is a concise
//! hierarchical representation of the input that reconstructs it exactly and
//! exposes its recurring substructure.
//!
//! # Name Origin: "Refrain"
//!
//! A refrain is the phrase a song keeps returning to. The engine listens to
//! its input the same way: every phrase heard twice becomes a named theme,
//! and themes recur inside larger themes.
//!
//! # Structure
//!
//! - [`grammar`] — the inference engine and parse entry points.
//! - [`compact`] — immutable snapshots, CBOR serialisation, fingerprints.
//! - [`analysis`] — coverage, importance ranking, and similarity.
//! - [`print`] — reconstruction and the numbered rule listing.
//! - [`token`], [`digram`], [`arena`] — the value space, pair index, and
//!   node storage underneath.
//!
//! # Example
//!
//! ```
//! use refrain::Grammar;
//!
//! let g = Grammar::parse(b"abcab").unwrap();
//! assert_eq!(g.reconstruct().unwrap(), b"abcab");
//!
//! let mut listing = Vec::new();
//! g.pretty_print(&mut listing).unwrap();
//! assert_eq!(listing, b"0 -> 1 c 1\n1 -> a b\n");
//! ```
//!
//! # References
//!
//! - Nevill-Manning & Witten, "Identifying Hierarchical Structure in
//!   Sequences: A linear-time algorithm" (1997)
//! - Nevill-Manning & Witten, "Linear-Time, Incremental Hierarchy Inference
//!   for Compression" (1997)

pub mod analysis;
pub mod arena;
pub mod compact;
pub mod digram;
pub mod grammar;
pub mod print;
pub mod token;

pub use crate::analysis::{CompactIndex, IdInfo, Importance};
pub use crate::compact::{Compact, CompactEntry, ContentHash, EMPTY_DISPLAY};
pub use crate::grammar::{
    EmptyPolicy, Grammar, ParseError, ParseOptions, SymbolRef, TokenMode,
};
pub use crate::print::PrintError;
pub use crate::token::SymbolValue;

/// Prelude for convenient usage.
pub mod prelude {
    pub use crate::analysis::{CompactIndex, Importance};
    pub use crate::compact::{Compact, CompactEntry, ContentHash};
    pub use crate::grammar::{
        EmptyPolicy, Grammar, ParseError, ParseOptions, SymbolRef, TokenMode,
    };
    pub use crate::print::PrintError;
    pub use crate::token::SymbolValue;
}
