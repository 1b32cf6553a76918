//! Dense parallel-array storage for tree nodes.
//!
//! A slot is one logical node, spread across four containers that share the
//! same `u32` index: key, value, link record and one color bit. Live slots
//! are exactly `0..len`; removal moves the last slot into the hole
//! (swap-with-last) so the id space never fragments.
//!
//! The color bit vector uses **set = black, clear = red**: the dominant
//! color in a balanced tree is black, so freshly reserved capacity can be
//! filled with all-ones words and needs no per-slot initialization.

use std::collections::TryReserveError;

/// Index of a slot in the arena's parallel containers.
///
/// The all-ones value is the *none* sentinel, so the maximum addressable
/// live slot is `u32::MAX - 1`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SlotId(u32);

impl SlotId {
    /// Sentinel meaning "no slot".
    pub const NONE: SlotId = SlotId(u32::MAX);

    /// Wraps a live slot index.
    #[inline]
    pub fn new(index: u32) -> Self {
        debug_assert!(index != u32::MAX, "sentinel used as live slot id");
        SlotId(index)
    }

    /// Returns `true` if this is the *none* sentinel.
    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    /// Returns `true` if this names a slot.
    #[inline]
    pub fn is_some(self) -> bool {
        self.0 != u32::MAX
    }

    /// The slot index as a container subscript.
    #[inline]
    pub fn index(self) -> usize {
        debug_assert!(self.is_some());
        self.0 as usize
    }
}

/// Node color. Stored as one bit per slot in [`ColorVec`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Color {
    /// Red link to the parent.
    Red,
    /// Black link to the parent.
    Black,
}

/// Per-slot structural record: the slot's own id plus its tree neighbors.
///
/// `this` is redundant with the container index; it is kept because the
/// engines pass link records around without carrying the index separately.
#[derive(Clone, Copy, Debug)]
pub struct Links {
    /// The slot's own id.
    pub this: SlotId,
    /// Left child, or [`SlotId::NONE`].
    pub left: SlotId,
    /// Right child, or [`SlotId::NONE`].
    pub right: SlotId,
    /// Parent, or [`SlotId::NONE`] for the root.
    pub parent: SlotId,
}

/// Bit-packed color vector, one bit per slot (set = black).
#[derive(Clone, Debug, Default)]
pub struct ColorVec {
    blocks: Vec<u64>,
}

impl ColorVec {
    /// Creates an empty vector.
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Number of bits the vector can address.
    #[inline]
    pub fn capacity_bits(&self) -> usize {
        self.blocks.len() * 64
    }

    /// Grows the vector to cover at least `bits` bits, filling new words
    /// with all-ones (black). The vector is unchanged on failure.
    pub fn try_reserve_bits(&mut self, bits: usize) -> Result<(), TryReserveError> {
        let words = bits.div_ceil(64);
        if words > self.blocks.len() {
            self.blocks.try_reserve(words - self.blocks.len())?;
            self.blocks.resize(words, !0u64);
        }
        Ok(())
    }

    /// Infallible growth safety net for callers that broke the capacity
    /// contract in a release build.
    #[inline]
    fn grow_to(&mut self, bits: usize) {
        let words = bits.div_ceil(64);
        if words > self.blocks.len() {
            self.blocks.resize(words, !0u64);
        }
    }

    /// Returns `true` if the bit at `idx` is set (black).
    #[inline]
    pub fn is_black(&self, idx: usize) -> bool {
        self.blocks[idx / 64] & (1u64 << (idx % 64)) != 0
    }

    /// Sets the bit at `idx` (black).
    #[inline]
    pub fn set_black(&mut self, idx: usize) {
        self.blocks[idx / 64] |= 1u64 << (idx % 64);
    }

    /// Clears the bit at `idx` (red).
    #[inline]
    pub fn set_red(&mut self, idx: usize) {
        self.blocks[idx / 64] &= !(1u64 << (idx % 64));
    }

    /// Toggles the bit at `idx`.
    #[inline]
    pub fn toggle(&mut self, idx: usize) {
        self.blocks[idx / 64] ^= 1u64 << (idx % 64);
    }

    /// Copies the bit at `from` onto `to`.
    #[inline]
    pub fn copy_bit(&mut self, from: usize, to: usize) {
        if self.is_black(from) {
            self.set_black(to);
        } else {
            self.set_red(to);
        }
    }
}

/// Parallel dense containers for keys, values, links and colors, addressed
/// by [`SlotId`].
///
/// All accessors assume the id is live; an out-of-range id is a programming
/// error and panics (index out of bounds), with extra `debug_assert!`
/// checkpoints in dev builds.
#[derive(Clone, Debug)]
pub struct SlotArena<K, V> {
    keys: Vec<K>,
    values: Vec<V>,
    links: Vec<Links>,
    colors: ColorVec,
}

impl<K, V> SlotArena<K, V> {
    /// Creates an arena with no backing storage.
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
            links: Vec::new(),
            colors: ColorVec::new(),
        }
    }

    /// Number of live slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if no slots are live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of slots the arena can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.keys
            .capacity()
            .min(self.values.capacity())
            .min(self.links.capacity())
            .min(self.colors.capacity_bits())
    }

    /// Grows capacity by at least `additional` slots, initializing new
    /// color capacity to black. This is the only allocating mutation;
    /// on failure the arena is semantically unchanged and still usable.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.keys.try_reserve(additional)?;
        self.values.try_reserve(additional)?;
        self.links.try_reserve(additional)?;
        self.colors.try_reserve_bits(self.len() + additional)?;
        Ok(())
    }

    /// Appends a slot at id `len`, assuming reserved capacity, and returns
    /// its id. The new slot has no children.
    pub fn append(&mut self, key: K, value: V, color: Color, parent: SlotId) -> SlotId {
        let index = self.keys.len();
        debug_assert!(index < u32::MAX as usize, "slot id space exhausted");
        debug_assert!(
            index < self.capacity(),
            "append without reserved capacity"
        );
        let id = SlotId::new(index as u32);
        self.keys.push(key);
        self.values.push(value);
        self.links.push(Links {
            this: id,
            left: SlotId::NONE,
            right: SlotId::NONE,
            parent,
        });
        // The bit is written explicitly, so a slot freed by swap_remove can
        // never leak a stale color into a later append.
        self.colors.grow_to(index + 1);
        match color {
            Color::Red => self.colors.set_red(index),
            Color::Black => self.colors.set_black(index),
        }
        id
    }

    /// Removes slot `id`, which must already be detached from the tree
    /// structure, and compacts by moving the last live slot into its place.
    ///
    /// The moved slot's own record, its children's parent links, its
    /// parent's child link, and `root` (if it named the moved slot) are all
    /// rewritten so the dense invariant holds. Returns the removed pair.
    pub fn swap_remove(&mut self, id: SlotId, root: &mut SlotId) -> (K, V) {
        let last_index = self.len() - 1;
        debug_assert!(id.index() <= last_index);
        let last = SlotId::new(last_index as u32);

        self.colors.copy_bit(last_index, id.index());
        let key = self.keys.swap_remove(id.index());
        let value = self.values.swap_remove(id.index());
        self.links.swap_remove(id.index());

        if id != last {
            let moved = &mut self.links[id.index()];
            debug_assert_eq!(moved.this, last);
            moved.this = id;
            let Links { left, right, parent, .. } = *moved;
            if left.is_some() {
                self.links[left.index()].parent = id;
            }
            if right.is_some() {
                self.links[right.index()].parent = id;
            }
            if parent.is_some() {
                let p = &mut self.links[parent.index()];
                if p.left == last {
                    p.left = id;
                } else {
                    debug_assert_eq!(p.right, last);
                    p.right = id;
                }
            }
            if *root == last {
                *root = id;
            }
        }

        (key, value)
    }

    /// Key of a live slot.
    #[inline]
    pub fn key(&self, id: SlotId) -> &K {
        &self.keys[id.index()]
    }

    /// Value of a live slot.
    #[inline]
    pub fn value(&self, id: SlotId) -> &V {
        &self.values[id.index()]
    }

    /// Mutable value of a live slot.
    #[inline]
    pub fn value_mut(&mut self, id: SlotId) -> &mut V {
        &mut self.values[id.index()]
    }

    /// Link record of a live slot, by copy.
    #[inline]
    pub fn links(&self, id: SlotId) -> Links {
        let links = self.links[id.index()];
        debug_assert_eq!(links.this, id);
        links
    }

    /// Mutable link record of a live slot.
    #[inline]
    pub fn links_mut(&mut self, id: SlotId) -> &mut Links {
        &mut self.links[id.index()]
    }

    /// Color of a live slot.
    #[inline]
    pub fn color(&self, id: SlotId) -> Color {
        if self.colors.is_black(id.index()) {
            Color::Black
        } else {
            Color::Red
        }
    }

    /// Recolors a live slot.
    #[inline]
    pub fn set_color(&mut self, id: SlotId, color: Color) {
        match color {
            Color::Red => self.colors.set_red(id.index()),
            Color::Black => self.colors.set_black(id.index()),
        }
    }

    /// Returns `true` if the live slot is red.
    #[inline]
    pub fn is_red(&self, id: SlotId) -> bool {
        !self.colors.is_black(id.index())
    }

    /// Flips the color of a live slot.
    #[inline]
    pub fn toggle_color(&mut self, id: SlotId) {
        self.colors.toggle(id.index());
    }

    /// Drops all slots, keeping capacity.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.values.clear();
        self.links.clear();
    }

    /// Bytes held by the four backing containers.
    pub fn memory_usage(&self) -> usize {
        self.keys.capacity() * std::mem::size_of::<K>()
            + self.values.capacity() * std::mem::size_of::<V>()
            + self.links.capacity() * std::mem::size_of::<Links>()
            + self.colors.blocks.capacity() * std::mem::size_of::<u64>()
    }
}

impl<K, V> Default for SlotArena<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
