//! Online grammar inference over a digram-unique symbol sequence.
//!
//! A [`Grammar`] consumes one token at a time and maintains a set of rules,
//! each a circular doubly-linked list of symbol nodes closed by a guard
//! sentinel. Two constraints are enforced after every append:
//!
//! - **Digram uniqueness** — no ordered pair of adjacent symbols occurs more
//!   than once, unless that pair is itself the body of a rule.
//! - **Rule utility** — every rule except the root is referenced at least
//!   twice; a rule that drops to a single reference is inlined and retired.
//!
//! Enforcement is a cascade: rediscovering a digram substitutes both of its
//! occurrences with a non-terminal, the substitution can surface new digrams
//! at the splice boundaries, and those are checked recursively. Index
//! mutations always read the links as they currently stand, never a
//! snapshot. Recursion depth is bounded by the nesting depth of the rule
//! hierarchy.
//!
//! # References
//! - Nevill-Manning & Witten, "Identifying Hierarchical Structure in
//!   Sequences: A linear-time algorithm" (1997)

use crate::arena::{Arena, SlotId};
use crate::digram::{Digram, DigramIndex};
use crate::token::{SymbolValue, FIRST_RULE_ID};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// How input bytes are tokenised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenMode {
    /// UTF-8 decode; bytes that fail to decode are kept as raw-byte
    /// terminals.
    #[default]
    Utf8,
    /// UTF-8 decode; bytes that fail to decode abort the parse with
    /// [`ParseError::MalformedInput`].
    Utf8Strict,
    /// Every input byte is its own terminal.
    Bytes,
}

/// Whether empty input is accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmptyPolicy {
    /// Empty input yields an empty grammar.
    #[default]
    Allow,
    /// Empty input is rejected with [`ParseError::EmptyInput`].
    Reject,
}

/// Construction-time parse configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParseOptions {
    /// Tokenisation mode.
    pub tokens: TokenMode,
    /// Empty-input policy.
    pub empty: EmptyPolicy,
}

/// Error raised while parsing input into a grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParseError {
    /// The input was empty and the grammar was configured to reject that.
    EmptyInput,
    /// A byte sequence could not be UTF-8 decoded in strict mode.
    MalformedInput {
        /// Offset of the first undecodable byte.
        offset: usize,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::EmptyInput => write!(f, "empty input"),
            ParseError::MalformedInput { offset } => {
                write!(f, "malformed UTF-8 at byte offset {}", offset)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// A position in some rule's circular list.
#[derive(Debug, Clone)]
struct SymbolNode {
    value: SymbolValue,
    prev: SlotId,
    next: SlotId,
}

/// Registry entry for a live rule.
#[derive(Debug, Clone)]
struct Rule {
    /// Sentinel node closing the rule's circular list. Its `value` is the
    /// rule id; it is never matched, indexed, or counted.
    guard: SlotId,
    /// Number of non-guard occurrences of this rule as a symbol elsewhere.
    use_count: u32,
}

/// An inferred context-free grammar.
///
/// The zero value ([`Grammar::default`]) is the un-parsed state; use one of
/// the `parse*` constructors to build a grammar from input. Each grammar
/// owns its digram index and rule registry; instances share no state.
#[derive(Debug, Clone)]
pub struct Grammar {
    symbols: Arena<SymbolNode>,
    digrams: DigramIndex,
    rules: BTreeMap<SymbolValue, Rule>,
    root: Option<SymbolValue>,
    next_rule: u32,
}

impl Default for Grammar {
    fn default() -> Self {
        Self {
            symbols: Arena::new(),
            digrams: DigramIndex::new(),
            rules: BTreeMap::new(),
            root: None,
            next_rule: FIRST_RULE_ID,
        }
    }
}

impl Grammar {
    /// Parses UTF-8 text, keeping undecodable bytes as raw-byte terminals.
    ///
    /// Empty input is accepted and yields an empty grammar. This is the
    /// default mode; use [`Grammar::parse_with`] for strict UTF-8 or
    /// empty-input rejection.
    pub fn parse(input: &[u8]) -> Result<Self, ParseError> {
        Self::parse_with(input, ParseOptions::default())
    }

    /// Parses raw bytes, one terminal per byte.
    pub fn parse_bytes(input: &[u8]) -> Result<Self, ParseError> {
        Self::parse_with(
            input,
            ParseOptions {
                tokens: TokenMode::Bytes,
                empty: EmptyPolicy::Allow,
            },
        )
    }

    /// Parses input under explicit options.
    pub fn parse_with(input: &[u8], options: ParseOptions) -> Result<Self, ParseError> {
        if input.is_empty() && options.empty == EmptyPolicy::Reject {
            return Err(ParseError::EmptyInput);
        }
        let mut g = Grammar::default();
        let root = g.new_rule();
        g.root = Some(root);
        match options.tokens {
            TokenMode::Bytes => {
                for &b in input {
                    g.append_token(root, SymbolValue::from_byte(b));
                }
            }
            TokenMode::Utf8 | TokenMode::Utf8Strict => {
                let strict = options.tokens == TokenMode::Utf8Strict;
                let mut off = 0;
                while off < input.len() {
                    match std::str::from_utf8(&input[off..]) {
                        Ok(s) => {
                            for c in s.chars() {
                                g.append_token(root, SymbolValue::from_char(c));
                            }
                            off = input.len();
                        }
                        Err(e) => {
                            let valid = e.valid_up_to();
                            let prefix = std::str::from_utf8(&input[off..off + valid])
                                .expect("validated prefix");
                            for c in prefix.chars() {
                                g.append_token(root, SymbolValue::from_char(c));
                            }
                            off += valid;
                            if strict {
                                return Err(ParseError::MalformedInput { offset: off });
                            }
                            g.append_token(root, SymbolValue::from_byte(input[off]));
                            off += 1;
                        }
                    }
                }
            }
        }
        Ok(g)
    }

    /// Returns `true` once input has been parsed into this grammar.
    pub fn is_parsed(&self) -> bool {
        self.root.is_some()
    }

    /// Number of live rules, including the root.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Top-level symbol of the grammar, or the empty view if nothing was
    /// parsed or the input was empty.
    pub fn root_symbol(&self) -> SymbolRef<'_> {
        let value = self
            .root
            .filter(|&r| !self.is_guard(self.first(r)));
        SymbolRef {
            grammar: self,
            value,
        }
    }

    // ------------------------------------------------------------------
    // Append loop
    // ------------------------------------------------------------------

    /// Appends one terminal to the root and re-establishes the invariants.
    fn append_token(&mut self, root: SymbolValue, v: SymbolValue) {
        let n = self.new_terminal(v);
        let last = self.last(root);
        self.insert_after(last, n);
        let prev = self.prev(n);
        if !self.is_guard(prev) {
            self.check(prev);
        }
    }

    /// Checks the digram starting at `s`, indexing it on first sight and
    /// dispatching to [`Grammar::match_digram`] on a repeat.
    ///
    /// Returns `false` when there was no digram to consider (guard at either
    /// end) or the pair was new.
    fn check(&mut self, s: SlotId) -> bool {
        if self.is_guard(s) || self.is_guard(self.next(s)) {
            return false;
        }
        let d = self.digram_at(s);
        match self.digrams.lookup(d) {
            None => {
                self.digrams.insert(d, s);
                false
            }
            Some(m) => {
                // A self-overlapping repeat (e.g. the middle of `aaa`) is
                // left alone; the triple handling in `join` keeps the index
                // pointing at a non-overlapping occurrence.
                if self.next(m) != s {
                    self.match_digram(s, m);
                }
                true
            }
        }
    }

    /// Handles a rediscovered digram: `s` starts the fresh occurrence, `m`
    /// the recorded one.
    fn match_digram(&mut self, s: SlotId, m: SlotId) {
        let r;
        if self.is_guard(self.prev(m)) && self.is_guard(self.next(self.next(m))) {
            // The recorded occurrence is the entire body of an existing
            // rule; reuse it.
            r = self.value(self.prev(m));
            self.substitute(s, r);
        } else {
            r = self.new_rule();
            let c1 = self.copy_symbol(s);
            self.insert_after(self.last(r), c1);
            let c2 = self.copy_symbol(self.next(s));
            self.insert_after(self.last(r), c2);
            self.substitute(m, r);
            self.substitute(s, r);
            let f = self.first(r);
            let d = self.digram_at(f);
            self.digrams.insert(d, f);
        }

        // Rule utility: if the new body starts with a rule that is now
        // referenced only here, inline it.
        let f = self.first(r);
        let fv = self.value(f);
        if fv.is_rule() && self.rule(fv).use_count == 1 {
            self.expand(f);
        }
    }

    /// Replaces the digram starting at `s` with a non-terminal for `r`,
    /// then checks both splice boundaries for fresh digrams.
    fn substitute(&mut self, s: SlotId, r: SymbolValue) {
        let q = self.prev(s);
        let first = self.next(q);
        self.delete_symbol(first);
        let second = self.next(q);
        self.delete_symbol(second);
        let n = self.new_nonterminal(r);
        self.insert_after(q, n);
        if !self.check(q) {
            let right = self.next(q);
            self.check(right);
        }
    }

    /// Inlines the body of the rule referenced by `s` in place of `s`.
    ///
    /// `s` must be the lone occurrence (`use_count == 1`). The rule is
    /// retired: its guard and the occurrence are freed and the registry
    /// entry dropped.
    fn expand(&mut self, s: SlotId) {
        let u = self.value(s);
        debug_assert!(u.is_rule() && self.rule(u).use_count == 1);
        let left = self.prev(s);
        let right = self.next(s);
        let guard = self.rule(u).guard;
        let f = self.next(guard);
        let l = self.prev(guard);

        let d = self.digram_at(s);
        self.digrams.remove(d, s);

        self.join(left, f);
        self.join(l, right);

        let dl = self.digram_at(l);
        self.digrams.insert(dl, l);

        self.symbols.free(s);
        self.symbols.free(guard);
        self.rules.remove(&u);
    }

    // ------------------------------------------------------------------
    // Sequence primitives
    // ------------------------------------------------------------------

    /// Splices `a.next = b, b.prev = a`.
    ///
    /// If `a` already had a successor, the pair starting at `a` is
    /// un-indexed first, and then the triple rule applies: a node that sits
    /// in the middle of a run of equal values (`xxx`) gets its pair indexed
    /// so overlapping repeats count as non-overlapping ones. Both triple
    /// tests read the links as they stand before the splice.
    fn join(&mut self, a: SlotId, b: SlotId) {
        if !self.next(a).is_none() {
            self.unindex_pair(a);

            if self.is_triple(b) {
                let d = self.digram_at(b);
                self.digrams.insert(d, b);
            }
            if self.is_triple(a) {
                let p = self.prev(a);
                let d = self.digram_at(p);
                self.digrams.insert(d, p);
            }
        }
        self.node_mut(a).next = b;
        self.node_mut(b).prev = a;
    }

    /// Inserts the fresh node `y` directly after `a`.
    fn insert_after(&mut self, a: SlotId, y: SlotId) {
        let an = self.next(a);
        self.join(y, an);
        self.join(a, y);
    }

    /// Unlinks `n`, clears its index entry, adjusts the use-count of the
    /// rule it references, and frees its slot. Guards are not deletable.
    fn delete_symbol(&mut self, n: SlotId) {
        debug_assert!(!self.is_guard(n), "guards are not deletable");
        let p = self.prev(n);
        let x = self.next(n);
        self.join(p, x);
        // `n`'s own links are still intact, so this clears exactly the pair
        // the node was indexed under, if it is still the recorded holder.
        self.unindex_pair(n);
        let v = self.value(n);
        if v.is_rule() {
            if let Some(rule) = self.rules.get_mut(&v) {
                rule.use_count -= 1;
            }
        }
        self.symbols.free(n);
    }

    /// Clears the index entry for the pair starting at `n`, unless either
    /// end is a guard or the entry records a different occurrence.
    fn unindex_pair(&mut self, n: SlotId) {
        if self.is_guard(n) || self.is_guard(self.next(n)) {
            return;
        }
        let d = self.digram_at(n);
        self.digrams.remove(d, n);
    }

    /// `true` if `n` sits in the middle of a run of three equal values.
    fn is_triple(&self, n: SlotId) -> bool {
        let node = self.node(n);
        if node.prev.is_none() || node.next.is_none() {
            return false;
        }
        self.value(node.prev) == node.value && self.value(node.next) == node.value
    }

    // ------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------

    fn new_rule(&mut self) -> SymbolValue {
        let id = SymbolValue::new(self.next_rule);
        self.next_rule += 1;
        let guard = self.symbols.allocate(SymbolNode {
            value: id,
            prev: SlotId::NONE,
            next: SlotId::NONE,
        });
        // The guard is self-linked until the first insertion.
        {
            let node = self.node_mut(guard);
            node.prev = guard;
            node.next = guard;
        }
        self.rules.insert(
            id,
            Rule {
                guard,
                use_count: 0,
            },
        );
        id
    }

    fn new_terminal(&mut self, v: SymbolValue) -> SlotId {
        self.symbols.allocate(SymbolNode {
            value: v,
            prev: SlotId::NONE,
            next: SlotId::NONE,
        })
    }

    fn new_nonterminal(&mut self, r: SymbolValue) -> SlotId {
        if let Some(rule) = self.rules.get_mut(&r) {
            rule.use_count += 1;
        }
        self.symbols.allocate(SymbolNode {
            value: r,
            prev: SlotId::NONE,
            next: SlotId::NONE,
        })
    }

    /// Copies the symbol at `s`: terminals by value, non-terminals as a new
    /// reference to the same rule (bumping its use-count).
    fn copy_symbol(&mut self, s: SlotId) -> SlotId {
        let v = self.value(s);
        if v.is_rule() {
            self.new_nonterminal(v)
        } else {
            self.new_terminal(v)
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    fn node(&self, h: SlotId) -> &SymbolNode {
        self.symbols.get(h).expect("live symbol node")
    }

    fn node_mut(&mut self, h: SlotId) -> &mut SymbolNode {
        self.symbols.get_mut(h).expect("live symbol node")
    }

    fn rule(&self, id: SymbolValue) -> &Rule {
        self.rules.get(&id).expect("live rule")
    }

    pub(crate) fn root_id(&self) -> Option<SymbolValue> {
        self.root
    }

    pub(crate) fn value(&self, h: SlotId) -> SymbolValue {
        self.node(h).value
    }

    pub(crate) fn next(&self, h: SlotId) -> SlotId {
        self.node(h).next
    }

    pub(crate) fn prev(&self, h: SlotId) -> SlotId {
        self.node(h).prev
    }

    pub(crate) fn first(&self, r: SymbolValue) -> SlotId {
        self.next(self.rule(r).guard)
    }

    pub(crate) fn last(&self, r: SymbolValue) -> SlotId {
        self.prev(self.rule(r).guard)
    }

    /// `true` if `h` is the guard sentinel of its rule.
    pub(crate) fn is_guard(&self, h: SlotId) -> bool {
        let v = self.value(h);
        v.is_rule() && self.rules.get(&v).map_or(false, |r| r.guard == h)
    }

    pub(crate) fn rule_use_count(&self, r: SymbolValue) -> u32 {
        self.rule(r).use_count
    }

    /// Body of `r` as a vector of symbol values, in order.
    pub(crate) fn rule_body(&self, r: SymbolValue) -> Vec<SymbolValue> {
        let mut body = Vec::new();
        let mut p = self.first(r);
        while !self.is_guard(p) {
            body.push(self.value(p));
            p = self.next(p);
        }
        body
    }

    fn digram_at(&self, h: SlotId) -> Digram {
        Digram(self.value(h), self.value(self.next(h)))
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Checks the structural invariants of the grammar.
    ///
    /// Verifies circular-list integrity, use-count accounting, rule utility
    /// (every non-root rule referenced at least twice), digram uniqueness
    /// (overlapping pairs within a run counted as non-overlapping), and
    /// digram-index consistency (no stale entries, no guard-adjacent
    /// entries). An un-parsed grammar is well-formed when fully empty.
    pub fn is_well_formed(&self) -> bool {
        let Some(root) = self.root else {
            return self.rules.is_empty()
                && self.symbols.live_count() == 0
                && self.digrams.is_empty();
        };
        if !self.rules.contains_key(&root) {
            return false;
        }

        let live = self.symbols.live_count();
        let mut seen_nodes = 0usize;
        let mut use_counts: BTreeMap<SymbolValue, u32> = BTreeMap::new();
        let mut pair_counts: HashMap<Digram, u32> = HashMap::new();
        let mut pair_rules: BTreeSet<Digram> = BTreeSet::new();

        for rule in self.rules.values() {
            if self.symbols.get(rule.guard).is_none() {
                return false;
            }
            seen_nodes += 1;
            let mut body = Vec::new();
            let mut p = self.next(rule.guard);
            while p != rule.guard {
                let Some(node) = self.symbols.get(p) else {
                    return false;
                };
                // Reciprocal links.
                if self.next(node.prev) != p || self.prev(node.next) != p {
                    return false;
                }
                if node.value.is_rule() && !self.rules.contains_key(&node.value) {
                    return false;
                }
                if node.value.is_rule() {
                    *use_counts.entry(node.value).or_insert(0) += 1;
                }
                body.push(node.value);
                seen_nodes += 1;
                if seen_nodes > live {
                    return false; // list is not circular
                }
                p = node.next;
            }
            if body.len() == 2 {
                pair_rules.insert(Digram(body[0], body[1]));
            }
            // Count adjacent pairs, skipping the overlapping pair in the
            // middle of an `xxx` run.
            let mut i = 0;
            while i + 1 < body.len() {
                *pair_counts
                    .entry(Digram(body[i], body[i + 1]))
                    .or_insert(0) += 1;
                if i + 2 < body.len() && body[i] == body[i + 1] && body[i + 1] == body[i + 2] {
                    i += 2;
                } else {
                    i += 1;
                }
            }
        }

        if seen_nodes != live {
            return false; // orphan nodes outside every rule list
        }

        for (&id, rule) in &self.rules {
            let counted = use_counts.get(&id).copied().unwrap_or(0);
            if counted != rule.use_count {
                return false;
            }
            if id == root {
                if counted != 0 {
                    return false;
                }
            } else if counted < 2 {
                return false;
            }
        }

        for (&d, &count) in &pair_counts {
            if count > 1 && !pair_rules.contains(&d) {
                return false;
            }
        }

        for (d, at) in self.digrams.iter() {
            let Some(node) = self.symbols.get(at) else {
                return false;
            };
            if self.is_guard(at) || node.next.is_none() || self.is_guard(node.next) {
                return false;
            }
            if Digram(node.value, self.value(node.next)) != d {
                return false;
            }
        }

        true
    }
}

/// Read-only view of a grammar symbol: the root, or one symbol of a rule
/// body. The empty view (no parsed input, or empty input) reports no id and
/// no bytes.
#[derive(Clone, Copy)]
pub struct SymbolRef<'g> {
    grammar: &'g Grammar,
    value: Option<SymbolValue>,
}

impl<'g> SymbolRef<'g> {
    /// The symbol's value, or `None` for the empty view.
    pub fn id(&self) -> Option<SymbolValue> {
        self.value
    }

    /// `true` for the empty view.
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    /// Bytes of this symbol and all its sub-symbols.
    pub fn bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self.value {
            None => {}
            Some(v) if v.is_rule() => {
                // Writing into a Vec cannot fail.
                let _ = self.grammar.write_rule_bytes(v, &mut out);
            }
            Some(v) => v.append_bytes(&mut out),
        }
        out
    }

    /// Number of references to this symbol: a rule's use-count, 1 for a
    /// terminal, 0 for the empty view.
    pub fn used(&self) -> u32 {
        match self.value {
            None => 0,
            Some(v) if v.is_rule() => self.grammar.rule_use_count(v),
            Some(_) => 1,
        }
    }

    /// Sub-symbols of a rule-valued symbol; empty for terminals and the
    /// empty view.
    pub fn children(&self) -> Vec<SymbolRef<'g>> {
        match self.value {
            Some(v) if v.is_rule() => self
                .grammar
                .rule_body(v)
                .into_iter()
                .map(|value| SymbolRef {
                    grammar: self.grammar,
                    value: Some(value),
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for SymbolRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            None => f.write_str(crate::compact::EMPTY_DISPLAY),
            Some(v) => write!(f, "{}", v),
        }
    }
}

impl fmt::Debug for SymbolRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolRef({})", self)
    }
}
