//! Immutable snapshot of a grammar: root id plus a rule-id → body map.
//!
//! [`Compact`] is produced by [`Grammar::compact`] and is independent of the
//! engine's internal lists; it is the serialisable form of a grammar and the
//! input to the analyses. The empty grammar snapshots to `root: None`,
//! displayed as `\empty`.
//!
//! A `Compact` deserialised from untrusted bytes is not validated; feeding
//! one whose map references itself cyclically to [`Compact::reconstruct`]
//! is a caller error.

use crate::grammar::Grammar;
use crate::token::SymbolValue;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::{self, Write};

/// Rendering of the empty-grammar sentinel.
pub const EMPTY_DISPLAY: &str = "\\empty";

/// Body entry for one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactEntry {
    /// Number of references to this rule (0 for the root).
    pub used: u32,
    /// The rule's body, in order.
    pub ids: Vec<SymbolValue>,
}

/// Read-only snapshot of a grammar.
///
/// Only rule ids have entries in `map`; terminal values are decoded through
/// the token encoding directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compact {
    /// The root rule id, or `None` for the empty grammar.
    pub root: Option<SymbolValue>,
    /// Bodies of every rule reachable from the root, keyed by rule id.
    pub map: BTreeMap<SymbolValue, CompactEntry>,
}

/// Domain-separated SHA-256 over the canonical bytes of a snapshot.
#[repr(transparent)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ContentHash(pub [u8; 32]);

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ContentHash({:02x}{:02x}{:02x}{:02x}…)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

impl Grammar {
    /// Snapshots this grammar.
    ///
    /// An un-parsed grammar and a grammar parsed from empty input both
    /// snapshot to the empty `Compact`.
    pub fn compact(&self) -> Compact {
        let Some(root) = self.root_id() else {
            return Compact::default();
        };
        if self.is_guard(self.first(root)) {
            return Compact::default();
        }
        let mut map = BTreeMap::new();
        self.collect_compact(root, &mut map);
        Compact {
            root: Some(root),
            map,
        }
    }

    fn collect_compact(&self, id: SymbolValue, map: &mut BTreeMap<SymbolValue, CompactEntry>) {
        if map.contains_key(&id) {
            return;
        }
        let ids = self.rule_body(id);
        map.insert(
            id,
            CompactEntry {
                used: self.rule_use_count(id),
                ids: ids.clone(),
            },
        );
        for v in ids {
            if v.is_rule() {
                self.collect_compact(v, map);
            }
        }
    }
}

impl Compact {
    /// `true` for the empty snapshot.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Displays the root id: its decimal value, or `\empty`.
    pub fn root_display(&self) -> String {
        match self.root {
            None => EMPTY_DISPLAY.to_string(),
            Some(r) => r.to_string(),
        }
    }

    /// Bytes of `id` and everything it contains.
    ///
    /// A terminal decodes through the token encoding; a rule concatenates
    /// its children. Ids absent from the map yield no bytes.
    pub fn reconstruct(&self, id: SymbolValue) -> Vec<u8> {
        let mut out = Vec::new();
        self.append_id(id, &mut out);
        out
    }

    /// Bytes of the whole snapshot: the original input, or empty.
    pub fn reconstruct_root(&self) -> Vec<u8> {
        match self.root {
            Some(r) => self.reconstruct(r),
            None => Vec::new(),
        }
    }

    fn append_id(&self, id: SymbolValue, out: &mut Vec<u8>) {
        if id.is_rule() {
            if let Some(entry) = self.map.get(&id) {
                for &child in &entry.ids {
                    self.append_id(child, out);
                }
            }
        } else {
            id.append_bytes(out);
        }
    }

    /// Writes the rules reachable from the root, one per line in ascending
    /// id order, as `<id> -> {<used> [<token>…]}`. The empty snapshot
    /// writes nothing.
    pub fn pretty_print<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let Some(root) = self.root else {
            return Ok(());
        };
        let mut reachable = BTreeSet::new();
        self.mark_reachable(root, &mut reachable);
        for id in reachable {
            let Some(entry) = self.map.get(&id) else {
                continue;
            };
            write!(w, "{} -> {{{} [", id, entry.used)?;
            for (k, child) in entry.ids.iter().enumerate() {
                if k > 0 {
                    w.write_all(b" ")?;
                }
                write!(w, "{}", child)?;
            }
            writeln!(w, "]}}")?;
        }
        Ok(())
    }

    fn mark_reachable(&self, id: SymbolValue, seen: &mut BTreeSet<SymbolValue>) {
        if !id.is_rule() || !seen.insert(id) {
            return;
        }
        if let Some(entry) = self.map.get(&id) {
            for &child in &entry.ids {
                self.mark_reachable(child, seen);
            }
        }
    }

    /// Serialises the snapshot to CBOR.
    pub fn to_cbor(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let bytes = serde_cbor::to_vec(self)?;
        Ok(bytes)
    }

    /// Deserialises a snapshot from CBOR.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, Box<dyn std::error::Error>> {
        let compact: Self = serde_cbor::from_slice(bytes)?;
        Ok(compact)
    }

    /// Deterministic content hash of the snapshot.
    ///
    /// Computed as a domain-separated, length-prefixed SHA-256 over the
    /// canonical bytes, so equal snapshots hash equally across builds and
    /// platforms. Useful as a cheap equality witness before byte-level
    /// comparison.
    pub fn fingerprint(&self) -> ContentHash {
        let data = self.to_canonical_bytes();
        let mut hasher = Sha256::new();
        hasher.update(b"RFN:compact:v1");
        hasher.update((data.len() as u64).to_le_bytes());
        hasher.update(&data);
        ContentHash(hasher.finalize().into())
    }

    /// Canonical bytes: root marker, then every entry in key order with
    /// length-prefixed bodies. All integers little-endian.
    fn to_canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + self.map.len() * 16);
        match self.root {
            None => out.push(0),
            Some(r) => {
                out.push(1);
                out.extend_from_slice(&r.as_u32().to_le_bytes());
            }
        }
        out.extend_from_slice(&(self.map.len() as u64).to_le_bytes());
        for (id, entry) in &self.map {
            out.extend_from_slice(&id.as_u32().to_le_bytes());
            out.extend_from_slice(&entry.used.to_le_bytes());
            out.extend_from_slice(&(entry.ids.len() as u64).to_le_bytes());
            for child in &entry.ids {
                out.extend_from_slice(&child.as_u32().to_le_bytes());
            }
        }
        out
    }
}

impl fmt::Display for Compact {
    /// The pretty listing, or `\empty` for the empty snapshot.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.root.is_none() {
            return f.write_str(EMPTY_DISPLAY);
        }
        let mut buf = Vec::new();
        self.pretty_print(&mut buf).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}
