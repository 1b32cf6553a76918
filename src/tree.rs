//! Tree structure, navigation and the insert engine.

use std::cmp::Ordering;

use crate::arena::{Color, Links, SlotArena, SlotId};
use crate::LlrbError;

/// An ordered map over a left-leaning red-black tree with arena-backed,
/// index-addressed nodes.
///
/// Keys are unique under `K: Ord`. Mutating operations assume capacity has
/// been reserved up front (see [`LlrbTree::reserve`]) and never allocate;
/// the tree holds at most `2^32 - 1` entries.
///
/// # Example
///
/// ```rust
/// use llrb_rs::LlrbTree;
///
/// let mut tree: LlrbTree<u32, &str> = LlrbTree::with_capacity(4).unwrap();
/// tree.insert(2, "two").unwrap();
/// tree.insert(1, "one").unwrap();
/// assert_eq!(tree.get(&2), Some(&"two"));
/// assert_eq!(tree.delete(&1), Some((1, "one")));
/// ```
#[derive(Clone)]
pub struct LlrbTree<K, V> {
    pub(crate) arena: SlotArena<K, V>,
    pub(crate) root: SlotId,
}

impl<K, V> LlrbTree<K, V> {
    /// Creates an empty tree with no backing storage.
    pub fn new() -> Self {
        Self {
            arena: SlotArena::new(),
            root: SlotId::NONE,
        }
    }

    /// Creates an empty tree with capacity for at least `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Result<Self, LlrbError> {
        let mut tree = Self::new();
        tree.arena.try_reserve(capacity)?;
        Ok(tree)
    }

    /// Grows capacity by at least `additional` entries.
    ///
    /// This is the only mutating operation that allocates. On failure the
    /// tree is semantically unchanged and still usable.
    pub fn reserve(&mut self, additional: usize) -> Result<(), LlrbError> {
        self.arena.try_reserve(additional)?;
        Ok(())
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Returns `true` if the tree has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Number of entries the tree can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Entry with the smallest key.
    pub fn first(&self) -> Option<(&K, &V)> {
        if self.root.is_none() {
            return None;
        }
        let id = self.edge(self.root, true);
        Some((self.arena.key(id), self.arena.value(id)))
    }

    /// Entry with the largest key.
    pub fn last(&self) -> Option<(&K, &V)> {
        if self.root.is_none() {
            return None;
        }
        let id = self.edge(self.root, false);
        Some((self.arena.key(id), self.arena.value(id)))
    }

    /// Drops all entries, keeping capacity.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = SlotId::NONE;
    }

    /// Bytes held by the backing containers.
    pub fn memory_usage(&self) -> usize {
        self.arena.memory_usage()
    }

    /// Walks to the leftmost (`left = true`) or rightmost descendant.
    fn edge(&self, mut id: SlotId, left: bool) -> SlotId {
        loop {
            let links = self.arena.links(id);
            let next = if left { links.left } else { links.right };
            if next.is_none() {
                return id;
            }
            id = next;
        }
    }

    /// Left child, tolerating the sentinel, so color predicates can be
    /// written without guarding every dereference.
    #[inline]
    pub(crate) fn left_of(&self, id: SlotId) -> SlotId {
        if id.is_none() {
            SlotId::NONE
        } else {
            self.arena.links(id).left
        }
    }

    /// Sentinel-tolerant color predicate: absent slots are black.
    #[inline]
    pub(crate) fn is_red(&self, id: SlotId) -> bool {
        id.is_some() && self.arena.is_red(id)
    }
}

impl<K: Ord, V> LlrbTree<K, V> {
    // =========================================================================
    // Navigation
    // =========================================================================

    /// Standard BST descent. Every comparison in this crate is
    /// `search_key.cmp(node_key)`; inverting the order inverts the tree.
    pub(crate) fn find_slot(&self, key: &K) -> SlotId {
        let mut cur = self.root;
        while cur.is_some() {
            match key.cmp(self.arena.key(cur)) {
                Ordering::Less => cur = self.arena.links(cur).left,
                Ordering::Greater => cur = self.arena.links(cur).right,
                Ordering::Equal => return cur,
            }
        }
        SlotId::NONE
    }

    /// Value for `key`, without mutation.
    pub fn get(&self, key: &K) -> Option<&V> {
        let slot = self.find_slot(key);
        if slot.is_none() {
            None
        } else {
            Some(self.arena.value(slot))
        }
    }

    /// Key-value pair for `key`, without mutation.
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let slot = self.find_slot(key);
        if slot.is_none() {
            None
        } else {
            Some((self.arena.key(slot), self.arena.value(slot)))
        }
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.find_slot(key).is_some()
    }

    /// Replaces the value for `key` in place, returning the old value.
    ///
    /// Tree shape is unaffected. Fails with [`LlrbError::NotFound`] if the
    /// key is absent.
    pub fn update(&mut self, key: &K, value: V) -> Result<V, LlrbError> {
        let slot = self.find_slot(key);
        if slot.is_none() {
            return Err(LlrbError::NotFound);
        }
        Ok(std::mem::replace(self.arena.value_mut(slot), value))
    }

    // =========================================================================
    // Rotation / flip kernel
    // =========================================================================
    //
    // Each rotation swaps the colors of the pivot and the rotated-in slot,
    // so the black height of the subtree rooted at the returned slot is
    // unchanged. Parent and child links are maintained on both sides; a
    // rotation at the root rewrites `self.root`.

    pub(crate) fn rotate_left(&mut self, n: SlotId) -> SlotId {
        let Links { right: r, parent, .. } = self.arena.links(n);
        debug_assert!(r.is_some(), "left rotation requires a right child");

        self.arena.links_mut(r).parent = parent;
        if parent.is_none() {
            self.root = r;
        } else {
            let p = self.arena.links_mut(parent);
            if p.left == n {
                p.left = r;
            } else {
                debug_assert_eq!(p.right, n);
                p.right = r;
            }
        }

        let rl = self.arena.links(r).left;
        self.arena.links_mut(n).right = rl;
        if rl.is_some() {
            self.arena.links_mut(rl).parent = n;
        }
        self.arena.links_mut(r).left = n;
        self.arena.links_mut(n).parent = r;

        self.swap_colors(n, r);
        r
    }

    pub(crate) fn rotate_right(&mut self, n: SlotId) -> SlotId {
        let Links { left: l, parent, .. } = self.arena.links(n);
        debug_assert!(l.is_some(), "right rotation requires a left child");

        self.arena.links_mut(l).parent = parent;
        if parent.is_none() {
            self.root = l;
        } else {
            let p = self.arena.links_mut(parent);
            if p.left == n {
                p.left = l;
            } else {
                debug_assert_eq!(p.right, n);
                p.right = l;
            }
        }

        let lr = self.arena.links(l).right;
        self.arena.links_mut(n).left = lr;
        if lr.is_some() {
            self.arena.links_mut(lr).parent = n;
        }
        self.arena.links_mut(l).right = n;
        self.arena.links_mut(n).parent = l;

        self.swap_colors(n, l);
        l
    }

    fn swap_colors(&mut self, a: SlotId, b: SlotId) {
        let ca = self.arena.color(a);
        let cb = self.arena.color(b);
        self.arena.set_color(a, cb);
        self.arena.set_color(b, ca);
    }

    /// Toggles the colors of `n` and both children.
    pub(crate) fn color_flip(&mut self, n: SlotId) {
        let Links { left, right, .. } = self.arena.links(n);
        debug_assert!(
            left.is_some() && right.is_some(),
            "color flip requires both children"
        );
        self.arena.toggle_color(n);
        self.arena.toggle_color(left);
        self.arena.toggle_color(right);
    }

    // =========================================================================
    // Insert engine
    // =========================================================================

    /// Inserts `key` with `value`. Returns `Ok(true)` on insertion and
    /// `Ok(false)` if the key was already present (the existing value is
    /// kept; use [`LlrbTree::update`] to overwrite).
    ///
    /// Requires reserved capacity for one more entry; fails with
    /// [`LlrbError::TreeFull`] when the slot id space is exhausted, without
    /// mutating the tree.
    pub fn insert(&mut self, key: K, value: V) -> Result<bool, LlrbError> {
        if self.len() == u32::MAX as usize {
            return Err(LlrbError::TreeFull);
        }
        if self.root.is_none() {
            self.root = self.arena.append(key, value, Color::Black, SlotId::NONE);
            return Ok(true);
        }

        let mut cur = self.root;
        let (parent, branch) = loop {
            match key.cmp(self.arena.key(cur)) {
                Ordering::Equal => return Ok(false),
                Ordering::Less => {
                    let left = self.arena.links(cur).left;
                    if left.is_none() {
                        break (cur, Ordering::Less);
                    }
                    cur = left;
                }
                Ordering::Greater => {
                    let right = self.arena.links(cur).right;
                    if right.is_none() {
                        break (cur, Ordering::Greater);
                    }
                    cur = right;
                }
            }
        };

        let leaf = self.arena.append(key, value, Color::Red, parent);
        let p = self.arena.links_mut(parent);
        if branch == Ordering::Less {
            p.left = leaf;
        } else {
            p.right = leaf;
        }

        self.rebalance_after_insert(parent);
        Ok(true)
    }

    /// Walks from the new leaf's parent toward the root, resolving the red
    /// violations insertion can introduce: a 4-node (both children red), a
    /// right-leaning red link, or two consecutive reds on a left spine.
    fn rebalance_after_insert(&mut self, start: SlotId) {
        let mut n = start;
        loop {
            let Links { left, right, .. } = self.arena.links(n);
            if self.is_red(left) && self.is_red(right) {
                self.color_flip(n);
                if n == self.root {
                    break;
                }
                n = self.arena.links(n).parent;
                continue;
            }
            if self.is_red(right) {
                n = self.rotate_left(n);
                continue;
            }
            if self.is_red(left) && self.is_red(self.left_of(left)) {
                n = self.rotate_right(n);
                continue;
            }
            if n == self.root {
                break;
            }
            n = self.arena.links(n).parent;
        }
        self.arena.set_color(self.root, Color::Black);
    }
}

impl<K, V> Default for LlrbTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + std::fmt::Debug, V: std::fmt::Debug> std::fmt::Debug for LlrbTree<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

// =============================================================================
// Invariant checker (test only)
// =============================================================================

#[cfg(test)]
impl<K: Ord, V> LlrbTree<K, V> {
    /// Asserts every structural invariant: dense self-ids, mutual
    /// parent/child consistency, BST order, black root, no right-leaning
    /// red, no red-red left spine, uniform black height, and that every
    /// live slot is reachable from the root.
    pub(crate) fn verify(&self) {
        let n = self.len();
        if self.root.is_none() {
            assert_eq!(n, 0, "empty root with {n} live slots");
            return;
        }
        assert!(self.root.index() < n, "root out of range");
        assert!(
            self.arena.links(self.root).parent.is_none(),
            "root has a parent"
        );
        assert!(!self.is_red(self.root), "root is red");

        for i in 0..n {
            let id = SlotId::new(i as u32);
            let links = self.arena.links(id);
            assert_eq!(links.this, id, "slot {i}: self id mismatch");
            if links.parent.is_some() {
                let p = self.arena.links(links.parent);
                let as_left = p.left == id;
                let as_right = p.right == id;
                assert!(
                    as_left ^ as_right,
                    "slot {i}: parent does not point back exactly once"
                );
            } else {
                assert_eq!(id, self.root, "slot {i}: orphan that is not root");
            }
            if links.left.is_some() {
                assert_eq!(self.arena.links(links.left).parent, id);
            }
            if links.right.is_some() {
                assert_eq!(self.arena.links(links.right).parent, id);
            }
        }

        let mut seen = 0usize;
        let mut prev: Option<SlotId> = None;
        self.verify_subtree(self.root, &mut seen, &mut prev);
        assert_eq!(seen, n, "unreachable slots in arena");
    }

    /// Returns the black height of the subtree; walks inorder to check key
    /// ordering and counts reachable slots.
    fn verify_subtree(
        &self,
        id: SlotId,
        seen: &mut usize,
        prev: &mut Option<SlotId>,
    ) -> usize {
        if id.is_none() {
            return 0;
        }
        let Links { left, right, .. } = self.arena.links(id);

        assert!(!self.is_red(right), "right-leaning red link");
        if self.is_red(id) {
            assert!(!self.is_red(left), "two consecutive reds on left spine");
        }

        let left_height = self.verify_subtree(left, seen, prev);

        if let Some(p) = *prev {
            assert!(
                self.arena.key(p).cmp(self.arena.key(id)) == Ordering::Less,
                "inorder keys not strictly increasing"
            );
        }
        *prev = Some(id);
        *seen += 1;

        let right_height = self.verify_subtree(right, seen, prev);

        assert_eq!(left_height, right_height, "unequal black height");
        left_height + if self.is_red(id) { 0 } else { 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with(capacity: usize) -> LlrbTree<u64, u64> {
        LlrbTree::with_capacity(capacity).unwrap()
    }

    #[test]
    fn test_empty() {
        let tree = tree_with(0);
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.get(&1), None);
        assert_eq!(tree.first(), None);
        assert_eq!(tree.last(), None);
        tree.verify();
    }

    #[test]
    fn test_single_insert() {
        let mut tree = tree_with(1);
        assert!(tree.insert(5, 50).unwrap());
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(&5), Some(&50));
        assert_eq!(tree.first(), Some((&5, &50)));
        assert_eq!(tree.last(), Some((&5, &50)));
        tree.verify();
    }

    #[test]
    fn test_get_key_value() {
        let mut tree = tree_with(3);
        for k in [2u64, 1, 3] {
            tree.insert(k, k * 10).unwrap();
        }
        assert_eq!(tree.get_key_value(&2), Some((&2, &20)));
        assert_eq!(tree.get_key_value(&3), Some((&3, &30)));
        assert_eq!(tree.get_key_value(&4), None);
    }

    #[test]
    fn test_capacity_reflects_reserve() {
        let mut tree = tree_with(10);
        assert!(tree.capacity() >= 10);
        for k in 0..10u64 {
            tree.insert(k, k).unwrap();
        }
        tree.reserve(6).unwrap();
        assert!(tree.capacity() >= 16);

        let empty: LlrbTree<u64, u64> = LlrbTree::new();
        assert_eq!(empty.capacity(), 0);
    }

    #[test]
    fn test_clone_diverges_independently() {
        let mut tree = tree_with(4);
        for k in [2u64, 1, 3] {
            tree.insert(k, k * 10).unwrap();
        }
        let mut copy = tree.clone();
        copy.verify();

        // A clone's containers may hold no spare capacity.
        copy.reserve(1).unwrap();
        copy.insert(4, 40).unwrap();
        assert_eq!(copy.delete(&1), Some((1, 10)));
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.get(&1), Some(&10));
        assert_eq!(tree.get(&4), None);
        assert_eq!(copy.get(&4), Some(&40));
        tree.verify();
        copy.verify();
    }

    #[test]
    fn test_debug_formats_as_map() {
        let mut tree = tree_with(3);
        for k in [2u64, 1, 3] {
            tree.insert(k, k * 10).unwrap();
        }
        assert_eq!(format!("{tree:?}"), "{1: 10, 2: 20, 3: 30}");
        let empty: LlrbTree<u64, u64> = LlrbTree::new();
        assert_eq!(format!("{empty:?}"), "{}");
    }

    #[test]
    fn test_ascending_insertions() {
        let keys = [0u64, 5, 10, 15, 20, 25, 30, 35, 40];
        let mut tree = tree_with(keys.len());
        for &k in &keys {
            assert!(tree.insert(k, k * 10).unwrap());
            assert_eq!(tree.get(&k), Some(&(k * 10)));
            tree.verify();
        }
        assert_eq!(tree.len(), keys.len());
        for &k in &keys {
            assert_eq!(tree.get(&k), Some(&(k * 10)));
        }
    }

    #[test]
    fn test_descending_insertions() {
        let keys = [40u64, 35, 30, 25, 20, 15, 10, 5, 0];
        let mut tree = tree_with(keys.len());
        for &k in &keys {
            assert!(tree.insert(k, k * 10).unwrap());
            assert_eq!(tree.get(&k), Some(&(k * 10)));
            tree.verify();
        }
        for &k in &keys {
            assert_eq!(tree.get(&k), Some(&(k * 10)));
        }
    }

    #[test]
    fn test_duplicate_insert_is_reported_noop() {
        let mut tree = tree_with(2);
        assert!(tree.insert(1, 10).unwrap());
        assert!(!tree.insert(1, 99).unwrap());
        assert_eq!(tree.len(), 1);
        // Original value kept; insert never overwrites.
        assert_eq!(tree.get(&1), Some(&10));
        tree.verify();
    }

    #[test]
    fn test_update() {
        let mut tree = tree_with(2);
        tree.insert(1, 10).unwrap();
        assert_eq!(tree.update(&1, 11).unwrap(), 10);
        assert_eq!(tree.get(&1), Some(&11));
        assert!(matches!(tree.update(&2, 20), Err(LlrbError::NotFound)));
        assert_eq!(tree.len(), 1);
        tree.verify();
    }

    #[test]
    fn test_first_last() {
        let mut tree = tree_with(8);
        for k in [4u64, 1, 7, 2, 6, 3, 5] {
            tree.insert(k, k).unwrap();
        }
        assert_eq!(tree.first(), Some((&1, &1)));
        assert_eq!(tree.last(), Some((&7, &7)));
    }

    #[test]
    fn test_reserve_failure_is_atomic() {
        let mut tree = tree_with(2);
        tree.insert(1, 10).unwrap();
        tree.insert(2, 20).unwrap();
        let err = tree.reserve(usize::MAX);
        assert!(matches!(err, Err(LlrbError::Allocation(_))));
        // Still semantically unchanged and usable.
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.get(&1), Some(&10));
        assert_eq!(tree.get(&2), Some(&20));
        tree.verify();
        tree.reserve(1).unwrap();
        tree.insert(3, 30).unwrap();
        assert_eq!(tree.len(), 3);
        tree.verify();
    }

    #[test]
    fn test_clear() {
        let mut tree = tree_with(4);
        for k in 0..4u64 {
            tree.insert(k, k).unwrap();
        }
        tree.clear();
        assert!(tree.is_empty());
        tree.verify();
        tree.insert(9, 90).unwrap();
        assert_eq!(tree.get(&9), Some(&90));
        tree.verify();
    }

    #[test]
    fn test_randomized_inserts_match_model() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};
        use std::collections::BTreeMap;

        let mut rng = StdRng::seed_from_u64(7);
        let mut tree = tree_with(2048);
        let mut model: BTreeMap<u64, u64> = BTreeMap::new();

        for _ in 0..2048 {
            let k = rng.gen_range(0..512);
            let v = rng.gen();
            let fresh = tree.insert(k, v).unwrap();
            let was_absent = model.insert(k, v).is_none();
            assert_eq!(fresh, was_absent);
            if !fresh {
                // The tree keeps the first value; mirror that in the model.
                model.insert(k, *tree.get(&k).unwrap());
            }
            assert_eq!(tree.len(), model.len());
        }
        tree.verify();
        for (k, v) in &model {
            assert_eq!(tree.get(k), Some(v));
        }
    }

    #[test]
    fn test_memory_usage_nonzero_after_reserve() {
        let tree = tree_with(64);
        assert!(tree.memory_usage() > 0);
    }
}
