//! Digram occurrence index.
//!
//! Maps an ordered pair of symbol values to the single sequence position that
//! currently represents it. The index is never a multimap: inserting an
//! already-present pair overwrites the recorded occurrence.
//!
//! # Invariants
//! - At most one occurrence is recorded per pair.
//! - [`DigramIndex::remove`] is identity-guarded: it only clears an entry
//!   when the recorded handle is the one being removed, so a replacement
//!   occurrence recorded by an earlier step of a cascade survives.

use crate::arena::SlotId;
use crate::token::SymbolValue;
use std::collections::HashMap;

/// An ordered pair of adjacent symbol values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digram(pub SymbolValue, pub SymbolValue);

/// Index from digram to its recorded occurrence.
#[derive(Debug, Clone, Default)]
pub struct DigramIndex {
    table: HashMap<Digram, SlotId>,
}

impl DigramIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Returns the recorded occurrence of `d`, if any.
    pub fn lookup(&self, d: Digram) -> Option<SlotId> {
        self.table.get(&d).copied()
    }

    /// Records `at` as the occurrence of `d`, overwriting any existing entry.
    pub fn insert(&mut self, d: Digram, at: SlotId) {
        self.table.insert(d, at);
    }

    /// Clears the entry for `d` only if the recorded occurrence is `at`.
    ///
    /// Returns `true` if an entry was removed.
    pub fn remove(&mut self, d: Digram, at: SlotId) -> bool {
        match self.table.get(&d) {
            Some(&recorded) if recorded == at => {
                self.table.remove(&d);
                true
            }
            _ => false,
        }
    }

    /// Number of recorded pairs.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if no pairs are recorded.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Iterates over all recorded entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (Digram, SlotId)> + '_ {
        self.table.iter().map(|(&d, &at)| (d, at))
    }
}
