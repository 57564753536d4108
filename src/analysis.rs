//! Analyses over compact snapshots: coverage, importance, similarity.
//!
//! [`Compact::index`] builds a [`CompactIndex`], mapping each retained
//! rule's reconstructed bytes to its id and weighting it by *coverage* — the
//! fraction of the root reconstruction the rule's own reconstruction
//! represents. Rankings and cross-grammar similarity are computed from that
//! index.
//!
//! # Determinism
//! - Fragments live in a `BTreeMap` keyed by bytes; when two rules
//!   reconstruct to identical bytes the higher id wins.
//! - `total_coverage` is summed in key order, and [`CompactIndex::similarity`]
//!   accumulates in the same order, so comparing an index against an
//!   equally-built one yields exactly 1.0.

use crate::compact::Compact;
use crate::token::SymbolValue;
use std::collections::BTreeMap;

/// Derived per-rule information.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdInfo {
    /// Fraction of the original input this rule's reconstruction covers.
    pub coverage: f64,
}

/// A ranked rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Importance {
    /// The rule id.
    pub id: SymbolValue,
    /// Its score under the ranking's scorer.
    pub score: f64,
}

/// Byte-keyed index over a compact snapshot.
#[derive(Debug, Clone)]
pub struct CompactIndex<'a> {
    compact: &'a Compact,
    input_len: usize,
    total_coverage: f64,
    string_to_id: BTreeMap<Vec<u8>, SymbolValue>,
    info: BTreeMap<SymbolValue, IdInfo>,
}

impl Compact {
    /// Indexes every rule of the snapshot.
    pub fn index(&self) -> CompactIndex<'_> {
        self.index_with(|_| true)
    }

    /// Indexes the snapshot, retaining only fragments accepted by `keep`
    /// (e.g. dropping fragments that are too short or whitespace-only).
    pub fn index_with<F>(&self, keep: F) -> CompactIndex<'_>
    where
        F: Fn(&[u8]) -> bool,
    {
        let mut string_to_id = BTreeMap::new();
        let mut input_len = 0;
        for (&id, _) in &self.map {
            let bytes = self.reconstruct(id);
            if Some(id) == self.root {
                input_len = bytes.len();
            }
            if keep(&bytes) {
                string_to_id.insert(bytes, id);
            }
        }
        let mut info = BTreeMap::new();
        let mut total_coverage = 0.0;
        for (bytes, &id) in &string_to_id {
            let coverage = if input_len == 0 {
                0.0
            } else {
                bytes.len() as f64 / input_len as f64
            };
            info.insert(id, IdInfo { coverage });
            total_coverage += coverage;
        }
        CompactIndex {
            compact: self,
            input_len,
            total_coverage,
            string_to_id,
            info,
        }
    }
}

impl<'a> CompactIndex<'a> {
    /// The snapshot this index was built from.
    pub fn compact(&self) -> &'a Compact {
        self.compact
    }

    /// Length of the root reconstruction in bytes.
    pub fn input_len(&self) -> usize {
        self.input_len
    }

    /// Sum of coverage over all retained fragments.
    pub fn total_coverage(&self) -> f64 {
        self.total_coverage
    }

    /// Number of retained fragments.
    pub fn len(&self) -> usize {
        self.string_to_id.len()
    }

    /// `true` if no fragments were retained.
    pub fn is_empty(&self) -> bool {
        self.string_to_id.is_empty()
    }

    /// The rule whose reconstruction is exactly `bytes`, if retained.
    pub fn lookup(&self, bytes: &[u8]) -> Option<SymbolValue> {
        self.string_to_id.get(bytes).copied()
    }

    /// Coverage of a retained rule.
    pub fn coverage(&self, id: SymbolValue) -> Option<f64> {
        self.info.get(&id).map(|i| i.coverage)
    }

    /// Retained fragments in byte order.
    pub fn fragments(&self) -> impl Iterator<Item = (&[u8], SymbolValue)> + '_ {
        self.string_to_id.iter().map(|(b, &id)| (b.as_slice(), id))
    }

    /// Ranks retained rules by coverage, descending; ties break by
    /// descending id for stable order.
    pub fn importance(&self) -> Vec<Importance> {
        self.importance_by(|id| self.coverage(id).unwrap_or(0.0))
    }

    /// Ranks retained rules under a caller-supplied scorer.
    pub fn importance_by<F>(&self, score: F) -> Vec<Importance>
    where
        F: Fn(SymbolValue) -> f64,
    {
        let mut ranked: Vec<Importance> = self
            .info
            .keys()
            .map(|&id| Importance {
                id,
                score: score(id),
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| b.id.cmp(&a.id)));
        ranked
    }

    /// Similarity against another index: the coverage mass of shared
    /// fragments over the combined coverage mass.
    ///
    /// Symmetric. Two empty grammars compare as 1.0; empty against
    /// non-empty as 0.0. Comparing an index with an equally-built index of
    /// the same snapshot yields exactly 1.0.
    pub fn similarity(&self, other: &CompactIndex<'_>) -> f64 {
        let (small, big) = if other.string_to_id.len() < self.string_to_id.len() {
            (other, self)
        } else {
            (self, other)
        };
        let mut shared = 0.0;
        for (bytes, &id) in &small.string_to_id {
            if let Some(&other_id) = big.string_to_id.get(bytes) {
                let a = small.info.get(&id).map_or(0.0, |i| i.coverage);
                let b = big.info.get(&other_id).map_or(0.0, |i| i.coverage);
                shared += a + b;
            }
        }
        let divisor = self.total_coverage + other.total_coverage;
        if divisor == 0.0 {
            return 1.0;
        }
        shared / divisor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;

    const PEASE: &str = "\npease porridge hot,\npease porridge cold,\npease porridge in \
                         the pot,\nnine days old.\n\nsome like it hot,\nsome like it \
                         cold,\nsome like it in the pot,\nnine days old.\n";

    #[test]
    fn coverage_is_relative_to_input_length() {
        let input = b"abcabdabcab";
        let c = Grammar::parse(input).unwrap().compact();
        let index = c.index();
        let root = c.root.unwrap();
        let root_cov = index.coverage(root).unwrap();
        assert!((root_cov - 1.0).abs() < f64::EPSILON);
        // Every other fragment is shorter than the input.
        for (bytes, id) in index.fragments() {
            if id != root {
                assert!(bytes.len() < input.len());
                assert!(index.coverage(id).unwrap() < 1.0);
            }
        }
    }

    #[test]
    fn importance_ranks_by_coverage_with_stable_ties() {
        let c = Grammar::parse(PEASE.as_bytes()).unwrap().compact();
        let index = c.index();
        let ranked = index.importance();
        assert!(!ranked.is_empty());
        // Root covers everything and must rank first.
        assert_eq!(ranked[0].id, c.root.unwrap());
        for pair in ranked.windows(2) {
            assert!(
                pair[0].score > pair[1].score
                    || (pair[0].score == pair[1].score && pair[0].id > pair[1].id)
            );
        }
    }

    #[test]
    fn importance_honours_custom_scorer() {
        let c = Grammar::parse(PEASE.as_bytes()).unwrap().compact();
        let index = c.index();
        // Weight length by reuse, so heavily-shared fragments outrank the
        // root.
        let ranked = index.importance_by(|id| {
            let used = c.map.get(&id).map_or(0, |e| e.used) as f64;
            index.coverage(id).unwrap_or(0.0) * used * used
        });
        assert!(!ranked.is_empty());
        assert_ne!(ranked[0].id, c.root.unwrap());
    }

    #[test]
    fn index_filter_drops_fragments() {
        let c = Grammar::parse(PEASE.as_bytes()).unwrap().compact();
        let all = c.index();
        let long_only = c.index_with(|bytes| bytes.len() >= 5);
        assert!(long_only.len() < all.len());
        for (bytes, _) in long_only.fragments() {
            assert!(bytes.len() >= 5);
        }
    }

    #[test]
    fn similarity_is_reflexive_and_symmetric() {
        let c1 = Grammar::parse(PEASE.as_bytes()).unwrap().compact();
        let c2 = Grammar::parse(PEASE.as_bytes()).unwrap().compact();
        let c3 = Grammar::parse(b"an entirely different text").unwrap().compact();
        let (i1, i2, i3) = (c1.index(), c2.index(), c3.index());

        assert_eq!(i1.similarity(&i1), 1.0);
        assert_eq!(i1.similarity(&i2), 1.0);
        let ab = i1.similarity(&i3);
        assert_eq!(ab, i3.similarity(&i1));
        assert!(ab < 1.0);
    }

    #[test]
    fn similarity_weighs_shared_fragments() {
        use crate::compact::CompactEntry;
        use crate::token::FIRST_RULE_ID;

        // Two snapshots sharing exactly one fragment, "ab" (coverage 2/5
        // on either side): roots reconstruct "abcab" and "abdab".
        let build = |mid: char| {
            let root = SymbolValue::new(FIRST_RULE_ID);
            let pair = SymbolValue::new(FIRST_RULE_ID + 1);
            let mut map = BTreeMap::new();
            map.insert(
                root,
                CompactEntry {
                    used: 0,
                    ids: vec![pair, SymbolValue::from_char(mid), pair],
                },
            );
            map.insert(
                pair,
                CompactEntry {
                    used: 2,
                    ids: vec![SymbolValue::from_char('a'), SymbolValue::from_char('b')],
                },
            );
            Compact {
                root: Some(root),
                map,
            }
        };
        let (a, b) = (build('c'), build('d'));
        let (ia, ib) = (a.index(), b.index());

        // Shared mass 2 * 2/5 over combined mass 2 * (2/5 + 1).
        let cov = 2.0_f64 / 5.0;
        let total = cov + 1.0; // summed in byte order: "ab" before the root
        let expected = (cov + cov) / (total + total);
        assert_eq!(ia.similarity(&ib), expected);
        assert_eq!(ib.similarity(&ia), expected);
    }

    #[test]
    fn similarity_empty_edges() {
        let empty1 = Grammar::parse(b"").unwrap().compact();
        let empty2 = Grammar::parse(b"").unwrap().compact();
        let full = Grammar::parse(PEASE.as_bytes()).unwrap().compact();
        let (e1, e2, f) = (empty1.index(), empty2.index(), full.index());

        assert_eq!(e1.similarity(&e2), 1.0);
        assert_eq!(e1.similarity(&e1), 1.0);
        assert_eq!(e1.similarity(&f), 0.0);
        assert_eq!(f.similarity(&e1), 0.0);
    }

    #[test]
    fn single_symbol_grammar_indexes_its_root() {
        let c = Grammar::parse(b" ").unwrap().compact();
        let index = c.index();
        assert_eq!(index.input_len(), 1);
        assert_eq!(index.lookup(b" "), c.root);
        assert_eq!(index.similarity(&index), 1.0);
    }
}
