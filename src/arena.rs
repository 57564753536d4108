//! Arena allocation for symbol nodes.
//!
//! Provides `SlotId` (a dense, total-orderable handle) and `Arena<T>`
//! (contiguous storage with free-list reuse). Linked structures stored in the
//! arena refer to other slots by `SlotId`; `SlotId::NONE` is the null link.
//!
//! # Determinism
//! - `SlotId` ordering is by its inner `u32`.
//! - Iteration order over slots is by index (0..capacity).
//! - Free-list reuse is LIFO: the most recently freed slot is handed out
//!   first, so the same sequence of allocations and frees yields the same
//!   handles across runs.

use std::fmt;

/// Dense handle into an [`Arena`].
///
/// `SlotId(u32)` is `Copy`, `Eq`, `Ord`, `Hash`. The inner value is an index
/// into the arena's slot array. `SlotId::NONE` is reserved as the null link
/// and is never returned by [`Arena::allocate`].
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(u32);

impl SlotId {
    /// The null handle. Used as the "no link" value in stored records.
    pub const NONE: SlotId = SlotId(u32::MAX);

    /// Creates a `SlotId` from a raw `u32` index.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw `u32` index.
    #[inline]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Returns `true` if this is the null handle.
    #[inline]
    pub const fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "SlotId(NONE)")
        } else {
            write!(f, "SlotId({})", self.0)
        }
    }
}

/// Slot in the arena.
#[derive(Debug, Clone)]
struct Slot<T> {
    data: Option<T>,
    next_free: Option<u32>,
}

/// Contiguous storage with free-list reuse.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_list_head: Option<u32>,
    /// Number of live slots (slots with `data.is_some()`).
    live_count: usize,
}

impl<T> Arena<T> {
    /// Creates a new empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list_head: None,
            live_count: 0,
        }
    }

    /// Allocates a slot initialized with `data` and returns its handle.
    ///
    /// Reuses the most recently freed slot if one is available; otherwise
    /// pushes a new slot at the end.
    pub fn allocate(&mut self, data: T) -> SlotId {
        if let Some(idx) = self.free_list_head {
            let slot = &mut self.slots[idx as usize];
            debug_assert!(slot.data.is_none(), "free slot should have no data");
            self.free_list_head = slot.next_free;
            slot.data = Some(data);
            slot.next_free = None;
            self.live_count += 1;
            SlotId(idx)
        } else {
            let idx = self.slots.len() as u32;
            debug_assert!(idx != u32::MAX, "arena exhausted the handle space");
            self.slots.push(Slot {
                data: Some(data),
                next_free: None,
            });
            self.live_count += 1;
            SlotId(idx)
        }
    }

    /// Frees the slot identified by `id`.
    ///
    /// Returns `true` if the slot was live and is now on the free list.
    /// Callers must drop every outstanding reference to `id` first; a later
    /// allocation may hand the same handle out again.
    pub fn free(&mut self, id: SlotId) -> bool {
        let idx = id.as_u32() as usize;
        if id.is_none() || idx >= self.slots.len() {
            return false;
        }
        let slot = &mut self.slots[idx];
        if slot.data.is_none() {
            return false; // already free
        }
        slot.data = None;
        slot.next_free = self.free_list_head;
        self.free_list_head = Some(idx as u32);
        self.live_count -= 1;
        true
    }

    /// Returns a reference to the data stored at `id`, if live.
    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.slots
            .get(id.as_u32() as usize)
            .and_then(|slot| slot.data.as_ref())
    }

    /// Returns a mutable reference to the data stored at `id`, if live.
    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots
            .get_mut(id.as_u32() as usize)
            .and_then(|slot| slot.data.as_mut())
    }

    /// Returns the number of live slots.
    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// Returns the total capacity (live and free slots).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Iterates over all live slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.data.as_ref().map(|data| (SlotId(idx as u32), data)))
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}
