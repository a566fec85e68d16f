// model = "claude-opus-4-5"
// created = "2026-08-08"
// modified = "2026-08-08"
// driver = "Isaac Clayton"

//! Mutable 2-4 tree over an ordered sequence of opaque leaf payloads.
//!
//! Children are ordered purely by position, never by key comparison. An
//! application (a text buffer, a rope) owns the payloads and drives the
//! tree through insert/remove/rebalance; summaries over the sequence come
//! from [`Tree::aggregate`] with a caller-supplied monoid.
//!
//! Key design decisions:
//!
//! 1. **Arena storage**: All nodes live in one Vec addressed by `u32`
//!    handles (no raw pointers, no reference counting). Parent links are
//!    plain indices with a sentinel, so the child-to-parent back-reference
//!    carries no ownership. Freed nodes go on a free list for reuse.
//!
//! 2. **Caller-driven rebalancing**: `insert` and `remove` perform exactly
//!    one bounded slot edit and nothing else. The caller follows each edit
//!    with `rebalance`, which restores the invariant that every attached
//!    non-root internal node holds 2 or 3 children (the root 1 to 3, or
//!    the whole tree is a single leaf).
//!
//! 3. **Deferred splitting**: A node tolerates a transient fourth child
//!    until the next `rebalance` splits it. Redistributing into cousins
//!    eagerly at three children thrashes toward size-3 nodes and triggers
//!    far more rebalancing.
//!
//! 4. **Explicit invalidation**: Every mutation walks from the touched
//!    node to the root clearing memoized summaries. `aggregate` recomputes
//!    lazily on the next read. No dependency graph, no background work.

use std::any::TypeId;

use smallvec::SmallVec;

use crate::error::TreeError;
use crate::memo::MemoTable;
use crate::monoid::Monoid;
use crate::profiling;

/// Maximum number of children an internal node can hold.
pub const MAX_CHILDREN: usize = 4;

/// Sentinel value for no parent / empty slot.
const NONE: u32 = u32::MAX;

/// Handle to a node stored in a [`Tree`].
///
/// Handles stay valid until the node is freed, either by [`Tree::discard`]
/// or by a `rebalance` that drains the node it points at. Do not hold on to
/// handles of intermediate internal nodes across a `rebalance` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[inline(always)]
    fn index(self) -> usize {
        return self.0 as usize;
    }
}

/// Leaf or internal contents of a node.
#[derive(Debug)]
enum NodeKind<P> {
    /// One opaque payload, no children.
    Leaf { payload: P },
    /// Up to four ordered child slots. Occupied slots form a contiguous
    /// prefix: an empty slot means every later slot is empty too.
    Internal { slots: [u32; MAX_CHILDREN] },
}

#[derive(Debug)]
struct Node<P> {
    kind: NodeKind<P>,
    /// Index of the owning internal node (NONE when detached).
    parent: u32,
    /// This node's slot in the parent (meaningless when detached).
    slot_in_parent: u8,
    /// Cached summary values, keyed by monoid type.
    memo: MemoTable,
}

/// A 2-4 tree of opaque payloads with memoized monoid summaries.
#[derive(Debug)]
pub struct Tree<P> {
    /// All nodes, leaf and internal, in allocation order.
    nodes: Vec<Node<P>>,
    /// Indices of freed nodes available for reuse.
    free_list: Vec<u32>,
}

impl<P> Tree<P> {
    /// Create an empty arena with no nodes.
    pub fn new() -> Tree<P> {
        return Tree {
            nodes: Vec::new(),
            free_list: Vec::new(),
        };
    }

    /// Number of live nodes (allocated minus freed).
    pub fn node_count(&self) -> usize {
        return self.nodes.len() - self.free_list.len();
    }

    /// Allocate a new node, reusing from the free list if available.
    fn alloc(&mut self, kind: NodeKind<P>) -> NodeId {
        let node = Node {
            kind,
            parent: NONE,
            slot_in_parent: 0,
            memo: MemoTable::new(),
        };
        if let Some(idx) = self.free_list.pop() {
            self.nodes[idx as usize] = node;
            return NodeId(idx);
        }
        let idx = self.nodes.len() as u32;
        assert!(idx < NONE, "node arena is full");
        self.nodes.push(node);
        return NodeId(idx);
    }

    /// Free one node, dropping its payload and returning its index to the
    /// free list. The handle becomes invalid immediately.
    fn free(&mut self, node: NodeId) {
        self.nodes[node.index()] = Node {
            kind: NodeKind::Internal {
                slots: [NONE; MAX_CHILDREN],
            },
            parent: NONE,
            slot_in_parent: 0,
            memo: MemoTable::new(),
        };
        self.free_list.push(node.0);
    }

    /// Create a new leaf holding one payload. The leaf starts detached.
    pub fn leaf(&mut self, payload: P) -> NodeId {
        return self.alloc(NodeKind::Leaf { payload });
    }

    /// Create a new internal node from up to 3 initial children, which
    /// must all be detached. The node itself starts detached.
    pub fn internal(&mut self, children: &[NodeId]) -> Result<NodeId, TreeError> {
        let node = self.alloc(NodeKind::Internal {
            slots: [NONE; MAX_CHILDREN],
        });
        for &child in children {
            self.push(node, child)?;
        }
        return Ok(node);
    }

    /// Free a detached node and its whole subtree, payloads included.
    ///
    /// Panics if the node is still attached to a parent.
    pub fn discard(&mut self, node: NodeId) {
        assert!(
            self.nodes[node.index()].parent == NONE,
            "cannot discard an attached node"
        );
        let mut stack: SmallVec<[u32; 16]> = SmallVec::new();
        stack.push(node.0);
        while let Some(idx) = stack.pop() {
            if let NodeKind::Internal { slots } = &self.nodes[idx as usize].kind {
                for &slot in slots.iter().take_while(|&&s| s != NONE) {
                    stack.push(slot);
                }
            }
            self.free(NodeId(idx));
        }
    }

    /// Check whether a node is a leaf.
    #[inline]
    pub fn is_leaf(&self, node: NodeId) -> bool {
        return matches!(self.nodes[node.index()].kind, NodeKind::Leaf { .. });
    }

    /// The owning internal node, or None if this node is detached (the
    /// root of the tree or of a free-standing fragment).
    #[inline]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes[node.index()].parent;
        if parent == NONE {
            return None;
        }
        return Some(NodeId(parent));
    }

    /// This node's slot in its parent, or None if detached.
    #[inline]
    pub fn slot_in_parent(&self, node: NodeId) -> Option<usize> {
        if self.nodes[node.index()].parent == NONE {
            return None;
        }
        return Some(self.nodes[node.index()].slot_in_parent as usize);
    }

    /// Read a leaf's payload. Panics on an internal node.
    pub fn payload(&self, node: NodeId) -> &P {
        match &self.nodes[node.index()].kind {
            NodeKind::Leaf { payload } => return payload,
            NodeKind::Internal { .. } => panic!("payload of an internal node"),
        }
    }

    /// Swap a leaf's payload, returning the old one. Invalidates cached
    /// summaries from the leaf up to the root.
    pub fn replace_payload(&mut self, node: NodeId, new: P) -> P {
        let old = match &mut self.nodes[node.index()].kind {
            NodeKind::Leaf { payload } => std::mem::replace(payload, new),
            NodeKind::Internal { .. } => panic!("payload of an internal node"),
        };
        self.invalidate_upward(node);
        return old;
    }

    /// Child slots of an internal node. Panics on a leaf.
    fn slots(&self, node: NodeId) -> &[u32; MAX_CHILDREN] {
        match &self.nodes[node.index()].kind {
            NodeKind::Internal { slots } => return slots,
            NodeKind::Leaf { .. } => panic!("child slots of a leaf node"),
        }
    }

    fn slots_mut(&mut self, node: NodeId) -> &mut [u32; MAX_CHILDREN] {
        match &mut self.nodes[node.index()].kind {
            NodeKind::Internal { slots } => return slots,
            NodeKind::Leaf { .. } => panic!("child slots of a leaf node"),
        }
    }

    /// Number of occupied child slots. Panics on a leaf.
    #[inline]
    pub fn size(&self, node: NodeId) -> usize {
        return self.slots(node).iter().take_while(|&&s| s != NONE).count();
    }

    /// First child, or None if the node holds no children. Panics on a leaf.
    #[inline]
    pub fn first(&self, node: NodeId) -> Option<NodeId> {
        let first = self.slots(node)[0];
        if first == NONE {
            return None;
        }
        return Some(NodeId(first));
    }

    /// Last child, or None if the node holds no children. Panics on a leaf.
    #[inline]
    pub fn last(&self, node: NodeId) -> Option<NodeId> {
        let size = self.size(node);
        if size == 0 {
            return None;
        }
        return Some(NodeId(self.slots(node)[size - 1]));
    }

    /// Bounds-checked slot read. `Ok(None)` for a valid but empty slot.
    pub fn child_at(&self, node: NodeId, slot: usize) -> Result<Option<NodeId>, TreeError> {
        if slot >= MAX_CHILDREN {
            return Err(TreeError::InvalidIndex(slot));
        }
        let child = self.slots(node)[slot];
        if child == NONE {
            return Ok(None);
        }
        return Ok(Some(NodeId(child)));
    }

    /// Place a detached child at `pos`, shifting later occupants right.
    ///
    /// Fails with `Overflow` when the node already holds 4 children and
    /// with `InvalidPosition` when `pos` would leave a gap. On success the
    /// child's parent link and slot are set, and cached summaries from this
    /// node to the root are invalidated. The child's own cache survives:
    /// its subtree content did not change.
    pub fn insert(&mut self, node: NodeId, pos: usize, child: NodeId) -> Result<(), TreeError> {
        let size = self.size(node);
        if size == MAX_CHILDREN {
            return Err(TreeError::Overflow);
        }
        if pos > size {
            return Err(TreeError::InvalidPosition { pos, size });
        }
        debug_assert!(
            self.nodes[child.index()].parent == NONE,
            "child is already attached"
        );

        let slots = self.slots_mut(node);
        for i in (pos..size).rev() {
            slots[i + 1] = slots[i];
        }
        slots[pos] = child.0;
        let slots = *slots;

        // Re-point slot indices for the inserted child and everything it shifted.
        for i in pos..=size {
            self.nodes[slots[i] as usize].slot_in_parent = i as u8;
        }
        self.nodes[child.index()].parent = node.0;
        self.invalidate_upward(node);
        return Ok(());
    }

    /// Append a detached child after the last occupied slot.
    pub fn push(&mut self, node: NodeId, child: NodeId) -> Result<(), TreeError> {
        let size = self.size(node);
        return self.insert(node, size, child);
    }

    /// Detach and return the child at `pos`, shifting later occupants left.
    /// Returns None when the slot is empty. The detached child keeps its
    /// subtree and its cached summaries; it is the caller's to reattach or
    /// [`discard`](Tree::discard).
    pub fn remove(&mut self, node: NodeId, pos: usize) -> Option<NodeId> {
        let size = self.size(node);
        if pos >= size {
            return None;
        }

        let slots = self.slots_mut(node);
        let removed = slots[pos];
        for i in pos..size - 1 {
            slots[i] = slots[i + 1];
        }
        slots[size - 1] = NONE;
        let slots = *slots;

        for i in pos..size - 1 {
            self.nodes[slots[i] as usize].slot_in_parent = i as u8;
        }
        let child = &mut self.nodes[removed as usize];
        child.parent = NONE;
        child.slot_in_parent = 0;
        self.invalidate_upward(node);
        return Some(NodeId(removed));
    }

    /// Detach and return the last child, or None if the node is empty.
    pub fn pop(&mut self, node: NodeId) -> Option<NodeId> {
        let size = self.size(node);
        if size == 0 {
            return None;
        }
        return self.remove(node, size - 1);
    }

    /// Clear memoized summaries on a node and every ancestor. Each
    /// ancestor's fold depends on the changed subtree, so all of them go.
    fn invalidate_upward(&mut self, node: NodeId) {
        let mut current = node.0;
        while current != NONE {
            self.nodes[current as usize].memo.clear();
            current = self.nodes[current as usize].parent;
        }
    }

    /// The occupied slot immediately before this node in its parent.
    pub fn prev_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let slot = self.nodes[node.index()].slot_in_parent as usize;
        if slot == 0 {
            return None;
        }
        // Contiguity: every slot before an occupied one is occupied.
        return Some(NodeId(self.slots(parent)[slot - 1]));
    }

    /// The occupied slot immediately after this node in its parent. A node
    /// in the last slot has no next sibling by definition.
    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let slot = self.nodes[node.index()].slot_in_parent as usize;
        if slot + 1 >= MAX_CHILDREN {
            return None;
        }
        let next = self.slots(parent)[slot + 1];
        if next == NONE {
            return None;
        }
        return Some(NodeId(next));
    }

    /// Nearest node at the same depth to the left, possibly in another
    /// subtree. None if this node is leftmost at its depth or detached.
    pub fn prev_at_same_level(&self, node: NodeId) -> Option<NodeId> {
        return self.at_same_level(node, false);
    }

    /// Nearest node at the same depth to the right, possibly in another
    /// subtree. None if this node is rightmost at its depth or detached.
    pub fn next_at_same_level(&self, node: NodeId) -> Option<NodeId> {
        return self.at_same_level(node, true);
    }

    /// Climb toward the root counting hops until an ancestor (or the node
    /// itself, at zero hops) has a sibling in the wanted direction, then
    /// descend that many levels along the near edge of the sibling's
    /// subtree, landing back at the origin's depth.
    fn at_same_level(&self, node: NodeId, forward: bool) -> Option<NodeId> {
        let mut current = node;
        let mut hops = 0usize;
        loop {
            let sibling = if forward {
                self.next_sibling(current)
            } else {
                self.prev_sibling(current)
            };
            if let Some(sibling) = sibling {
                let mut down = sibling;
                for _ in 0..hops {
                    down = self.edge_child(down, forward)?;
                }
                return Some(down);
            }
            current = self.parent(current)?;
            hops += 1;
        }
    }

    /// First child when moving right, last child when moving left.
    /// None on leaves and empty nodes, which end the descent.
    fn edge_child(&self, node: NodeId, towards_first: bool) -> Option<NodeId> {
        match &self.nodes[node.index()].kind {
            NodeKind::Leaf { .. } => return None,
            NodeKind::Internal { .. } => {
                if towards_first {
                    return self.first(node);
                }
                return self.last(node);
            }
        }
    }

    /// Memoized summary of this node's subtree under the given monoid.
    ///
    /// A leaf summarizes to `extract(payload)`; an internal node to the
    /// left-to-right fold of its children's summaries seeded at the
    /// identity. The result is a pure function of current subtree content:
    /// the cache only changes the cost of the call, never its value.
    pub fn aggregate<M: Monoid<P>>(&mut self, node: NodeId, monoid: &M) -> M::Value {
        let key = TypeId::of::<M>();
        if let Some(value) = self.nodes[node.index()].memo.get::<M::Value>(key) {
            profiling::memo_hit();
            return value.clone();
        }
        profiling::memo_miss();

        let value = if self.is_leaf(node) {
            let NodeKind::Leaf { payload } = &self.nodes[node.index()].kind else {
                unreachable!()
            };
            monoid.extract(payload)
        } else {
            let slots = *self.slots(node);
            let mut acc = monoid.identity();
            for &child in slots.iter().take_while(|&&s| s != NONE) {
                let value = self.aggregate(NodeId(child), monoid);
                acc = monoid.combine(&acc, &value);
            }
            acc
        };

        self.nodes[node.index()].memo.insert(key, value.clone());
        return value;
    }

    /// Restore the steady-state shape invariant after a structural edit.
    ///
    /// Dispatch on the node's current size:
    /// - 2 or 3: already steady, nothing to do.
    /// - 4: split off the last two children into a new sibling. A root
    ///   additionally wraps its remaining pair, growing the tree by exactly
    ///   one level; a non-root hands the new sibling to its parent and
    ///   rebalances it.
    /// - 1: a root absorbs its sole internal child's children (flattening
    ///   one level) and tries again, or stops if the sole child is a leaf.
    ///   A non-root moves its sole child into the smaller of its same-level
    ///   cousins, or collapses into its parent when it is the only subtree
    ///   reaching this depth.
    /// - 0: a root stays (an empty root is a valid transient while the
    ///   tree drains); anything else unlinks itself from its parent, frees
    ///   itself, and rebalances the parent.
    ///
    /// May recurse toward the root and sideways into cousin subtrees, and
    /// may free intermediate internal nodes along the way.
    pub fn rebalance(&mut self, node: NodeId) {
        match self.size(node) {
            2 | 3 => return,
            0 => self.drain_empty(node),
            1 => self.merge_single(node),
            4 => self.split_full(node),
            _ => unreachable!(),
        }
    }

    /// Size-0 case: unlink from the parent and cascade.
    fn drain_empty(&mut self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        let slot = self.nodes[node.index()].slot_in_parent as usize;
        self.remove(parent, slot);
        self.free(node);
        self.rebalance(parent);
    }

    /// Size-1 case: flatten a redundant root level, or reattach the sole
    /// child next to a cousin and dissolve this node.
    fn merge_single(&mut self, node: NodeId) {
        if self.parent(node).is_none() {
            let only = self.first(node).unwrap();
            if self.is_leaf(only) {
                // Terminal shape: a root holding one leaf.
                return;
            }
            profiling::merge();
            self.pop(node);
            while let Some(grandchild) = self.remove(only, 0) {
                self.push(node, grandchild)
                    .expect("at most 4 grandchildren fit an emptied root");
            }
            self.free(only);
            self.rebalance(node);
            return;
        }

        let orphan = self.remove(node, 0).unwrap();
        let left = self.prev_at_same_level(node);
        let right = self.next_at_same_level(node);
        profiling::merge();

        if left.is_none() && right.is_none() {
            // Sole subtree reaching this depth: collapse into the parent.
            // No cousins means no siblings either, so the parent held only
            // this node and the append keeps the child order intact.
            let parent = self.parent(node).unwrap();
            let slot = self.nodes[node.index()].slot_in_parent as usize;
            self.remove(parent, slot);
            self.free(node);
            self.push(parent, orphan)
                .expect("parent freed a slot for the orphan");
            self.rebalance(parent);
            return;
        }

        // Prefer the emptier cousin, the left one on ties.
        let take_right = match (left, right) {
            (None, Some(_)) => true,
            (Some(l), Some(r)) => self.size(r) < self.size(l),
            _ => false,
        };
        if take_right {
            let target = right.unwrap();
            self.insert(target, 0, orphan)
                .expect("cousin has room before its rebalance");
            self.rebalance(node);
            self.rebalance(target);
        } else {
            let target = left.unwrap();
            self.push(target, orphan)
                .expect("cousin has room before its rebalance");
            self.rebalance(node);
            self.rebalance(target);
        }
    }

    /// Size-4 case: split off the last two children into a new sibling.
    fn split_full(&mut self, node: NodeId) {
        profiling::split();
        let third = self.remove(node, 2).unwrap();
        let fourth = self.remove(node, 2).unwrap();
        let split = self
            .internal(&[third, fourth])
            .expect("two children fit a fresh node");

        match self.parent(node) {
            None => {
                // Root split: wrap the remaining pair so the root keeps its
                // handle, gains exactly one level, and ends at size 2.
                let second = self.pop(node).unwrap();
                let first = self.pop(node).unwrap();
                let wrapped = self
                    .internal(&[first, second])
                    .expect("two children fit a fresh node");
                self.push(node, wrapped).expect("root was emptied");
                self.push(node, split).expect("root holds one of two");
            }
            Some(parent) => {
                let slot = self.nodes[node.index()].slot_in_parent as usize;
                self.insert(parent, slot + 1, split)
                    .expect("parent has room before its rebalance");
                self.rebalance(parent);
            }
        }
    }
}

impl<P> Default for Tree<P> {
    fn default() -> Self {
        return Self::new();
    }
}
