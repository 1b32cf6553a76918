//! Top-down delete engine.
//!
//! Deletion descends while maintaining the invariant that the current node
//! or its relevant child along the search path is red, so the target can be
//! detached without breaking black height. `fix_up` restores the
//! left-leaning shape on the unwind. Removing an internal node lifts its
//! in-order successor into the vacated position by grafting the successor's
//! *link record* — key and value payloads are never copied between slots,
//! which keeps slot identity intact for non-copyable value types.
//!
//! After the structural removal, the arena compacts by swap-with-last.

use std::cmp::Ordering;

use crate::arena::{Color, Links, SlotId};
use crate::tree::LlrbTree;

impl<K: Ord, V> LlrbTree<K, V> {
    /// Removes `key` and returns the removed pair, or `None` (without
    /// mutation) if the key is absent.
    pub fn delete(&mut self, key: &K) -> Option<(K, V)> {
        let target = self.find_slot(key);
        if target.is_none() {
            return None;
        }

        let new_root = self.delete_node(self.root, key);
        self.root = new_root;
        if self.root.is_some() {
            debug_assert!(self.arena.links(self.root).parent.is_none());
            // Unconditional: the unwind can leave a red root behind.
            self.arena.set_color(self.root, Color::Black);
        }

        Some(self.arena.swap_remove(target, &mut self.root))
    }

    /// Removes `key` from the subtree rooted at `n`, returning the new
    /// subtree root (or the sentinel if the subtree emptied). The caller
    /// re-links the returned slot; the removed slot ends up detached.
    fn delete_node(&mut self, n: SlotId, key: &K) -> SlotId {
        let mut n = n;
        if key.cmp(self.arena.key(n)) == Ordering::Less {
            // The key is present, so a left child exists.
            let left = self.arena.links(n).left;
            debug_assert!(left.is_some());
            if !self.is_red(left) && !self.is_red(self.left_of(left)) {
                n = self.move_red_left(n);
            }
            let left = self.arena.links(n).left;
            let new_left = self.delete_node(left, key);
            self.link_left(n, new_left);
            return self.fix_up(n);
        }

        if self.is_red(self.arena.links(n).left) {
            n = self.rotate_right(n);
        }
        if key.cmp(self.arena.key(n)) == Ordering::Equal
            && self.arena.links(n).right.is_none()
        {
            // Bottom of the search path: detach the leaf.
            debug_assert!(self.arena.links(n).left.is_none());
            return SlotId::NONE;
        }

        let right = self.arena.links(n).right;
        debug_assert!(right.is_some());
        if !self.is_red(right) && !self.is_red(self.left_of(right)) {
            n = self.move_red_right(n);
        }

        if key.cmp(self.arena.key(n)) == Ordering::Equal {
            n = self.graft_successor(n);
        } else {
            let right = self.arena.links(n).right;
            let new_right = self.delete_node(right, key);
            self.link_right(n, new_right);
        }
        self.fix_up(n)
    }

    /// Replaces `n` by the minimum of its right subtree. The successor
    /// inherits `n`'s links and color; `n`'s neighbors are re-pointed at the
    /// successor's slot. Returns the successor, fully linked in `n`'s place;
    /// `n` is left detached.
    fn graft_successor(&mut self, n: SlotId) -> SlotId {
        let right = self.arena.links(n).right;
        let (new_right, succ) = self.remove_min(right);

        let Links { left, parent, .. } = self.arena.links(n);
        let color = self.arena.color(n);

        let s = self.arena.links_mut(succ);
        s.left = left;
        s.right = new_right;
        s.parent = parent;
        self.arena.set_color(succ, color);

        if left.is_some() {
            self.arena.links_mut(left).parent = succ;
        }
        if new_right.is_some() {
            self.arena.links_mut(new_right).parent = succ;
        }
        // Point the parent (or the root) at the successor before fix_up so
        // rotations see a consistent parent link.
        if parent.is_some() {
            let p = self.arena.links_mut(parent);
            if p.left == n {
                p.left = succ;
            } else {
                debug_assert_eq!(p.right, n);
                p.right = succ;
            }
        } else {
            self.root = succ;
        }
        succ
    }

    /// Detaches the minimum of the subtree rooted at `n` using top-down
    /// move-red-left, fixing up on the unwind. Returns the new subtree root
    /// and the detached minimum.
    fn remove_min(&mut self, n: SlotId) -> (SlotId, SlotId) {
        let left = self.arena.links(n).left;
        if left.is_none() {
            // No left child implies no right child in a left-leaning tree.
            debug_assert!(self.arena.links(n).right.is_none());
            return (SlotId::NONE, n);
        }

        let mut n = n;
        if !self.is_red(left) && !self.is_red(self.left_of(left)) {
            n = self.move_red_left(n);
        }
        let left = self.arena.links(n).left;
        let (new_left, min) = self.remove_min(left);
        self.link_left(n, new_left);
        (self.fix_up(n), min)
    }

    /// Ensures the left child or its left child is red before descending
    /// left through a 2-node.
    fn move_red_left(&mut self, n: SlotId) -> SlotId {
        self.color_flip(n);
        let right = self.arena.links(n).right;
        if self.is_red(self.left_of(right)) {
            self.rotate_right(right);
            let n = self.rotate_left(n);
            self.color_flip(n);
            return n;
        }
        n
    }

    /// Mirror of [`Self::move_red_left`] for right descents.
    fn move_red_right(&mut self, n: SlotId) -> SlotId {
        self.color_flip(n);
        let left = self.arena.links(n).left;
        if self.is_red(self.left_of(left)) {
            let n = self.rotate_right(n);
            self.color_flip(n);
            return n;
        }
        n
    }

    /// Single-node cleanup on the unwind: split a 4-node, lean a red link
    /// left, or lift a red-red left spine.
    fn fix_up(&mut self, mut n: SlotId) -> SlotId {
        let Links { left, right, .. } = self.arena.links(n);
        if self.is_red(left) && self.is_red(right) {
            self.color_flip(n);
        } else if self.is_red(right) {
            n = self.rotate_left(n);
        } else if self.is_red(left) && self.is_red(self.left_of(left)) {
            n = self.rotate_right(n);
            self.color_flip(n);
        }
        n
    }

    fn link_left(&mut self, n: SlotId, child: SlotId) {
        self.arena.links_mut(n).left = child;
        if child.is_some() {
            self.arena.links_mut(child).parent = n;
        }
    }

    fn link_right(&mut self, n: SlotId, child: SlotId) {
        self.arena.links_mut(n).right = child;
        if child.is_some() {
            self.arena.links_mut(child).parent = n;
        }
    }
}
