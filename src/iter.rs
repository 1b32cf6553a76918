//! Inorder and bounded-range enumeration.
//!
//! Both iterators are pull-based with an explicit stack of pending
//! descents, so a full scan is O(n) with O(log n) transient state. They
//! borrow the tree; mutating during iteration is a compile error.

use std::cmp::Ordering;

use crate::arena::SlotId;
use crate::tree::LlrbTree;

impl<K: Ord, V> LlrbTree<K, V> {
    /// Full inorder iterator over `(&K, &V)`.
    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut iter = Iter {
            tree: self,
            stack: Vec::new(),
        };
        iter.push_left_spine(self.root);
        iter
    }

    /// Pull iterator over the keys in `[min, max]`, inclusive, in order.
    ///
    /// Callers must pass `min <= max`.
    pub fn range_iter<'a>(&'a self, min: &'a K, max: &'a K) -> RangeIter<'a, K, V> {
        debug_assert!(min <= max, "range bounds inverted");
        let mut iter = RangeIter {
            tree: self,
            stack: Vec::new(),
            min,
            max,
        };
        iter.push_in_range(self.root);
        iter
    }

    /// Collects the keys in `[min, max]`, inclusive, into `out` in order,
    /// stopping early when the buffer fills. Returns the number of keys
    /// written.
    ///
    /// Callers must pass `min <= max`. A full buffer clamps the result; it
    /// is not an error.
    pub fn range(&self, min: &K, max: &K, out: &mut [K]) -> usize
    where
        K: Clone,
    {
        debug_assert!(min <= max, "range bounds inverted");
        let mut count = 0;
        self.range_collect(self.root, min, max, out, &mut count);
        count
    }

    /// Bounded inorder traversal; returns `false` once the buffer is full.
    fn range_collect(
        &self,
        id: SlotId,
        min: &K,
        max: &K,
        out: &mut [K],
        count: &mut usize,
    ) -> bool
    where
        K: Clone,
    {
        if id.is_none() {
            return true;
        }
        let links = self.arena.links(id);
        let key = self.arena.key(id);

        // Descend left only when the lower bound lies before this key.
        if min.cmp(key) == Ordering::Less && !self.range_collect(links.left, min, max, out, count)
        {
            return false;
        }
        if min <= key && key <= max {
            if *count == out.len() {
                return false;
            }
            out[*count] = key.clone();
            *count += 1;
        }
        if max.cmp(key) == Ordering::Greater {
            return self.range_collect(links.right, min, max, out, count);
        }
        true
    }
}

/// Inorder iterator over all entries. Created by [`LlrbTree::iter`].
pub struct Iter<'a, K, V> {
    tree: &'a LlrbTree<K, V>,
    stack: Vec<SlotId>,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn push_left_spine(&mut self, mut id: SlotId) {
        while id.is_some() {
            self.stack.push(id);
            id = self.tree.arena.links(id).left;
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.push_left_spine(self.tree.arena.links(id).right);
        Some((self.tree.arena.key(id), self.tree.arena.value(id)))
    }
}

/// Bounded inorder iterator over keys in `[min, max]`. Created by
/// [`LlrbTree::range_iter`].
pub struct RangeIter<'a, K, V> {
    tree: &'a LlrbTree<K, V>,
    stack: Vec<SlotId>,
    min: &'a K,
    max: &'a K,
}

impl<'a, K: Ord, V> RangeIter<'a, K, V> {
    /// Pushes the left spine of the subtree at `id`, pruning nodes below
    /// the lower bound: descend left only while `min < key`, and skip into
    /// the right subtree of any node whose key falls before `min`.
    fn push_in_range(&mut self, mut id: SlotId) {
        while id.is_some() {
            let links = self.tree.arena.links(id);
            match self.min.cmp(self.tree.arena.key(id)) {
                Ordering::Less => {
                    self.stack.push(id);
                    id = links.left;
                }
                Ordering::Equal => {
                    self.stack.push(id);
                    return;
                }
                Ordering::Greater => id = links.right,
            }
        }
    }
}

impl<'a, K: Ord, V> Iterator for RangeIter<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let key = self.tree.arena.key(id);
        match key.cmp(self.max) {
            Ordering::Greater => {
                // Inorder: everything still stacked is larger.
                self.stack.clear();
                None
            }
            Ordering::Equal => {
                self.stack.clear();
                Some(key)
            }
            Ordering::Less => {
                self.push_in_range(self.tree.arena.links(id).right);
                Some(key)
            }
        }
    }
}
