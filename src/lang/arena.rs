//! Block arena for syntax tree nodes.
//!
//! Nodes are bump-allocated into a chain of blocks. A full block is never
//! reallocated; a new, larger block is appended instead, so a `NodeId` stays
//! valid for as long as the arena holds its nodes. There is no way to free a
//! single node, only the whole arena.

use super::node::Node;

/// Capacity of the first block of a default arena.
pub const FIRST_BLOCK_CAPACITY: usize = 1024;

/// Stable handle to a node: block number plus slot within the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    block: u32,
    slot: u32,
}

#[derive(Debug)]
struct Block {
    nodes: Vec<Node>,
    capacity: usize,
}

impl Block {
    fn new(capacity: usize) -> Self {
        Block {
            nodes: Vec::with_capacity(capacity),
            capacity,
        }
    }

    fn is_full(&self) -> bool {
        self.nodes.len() >= self.capacity
    }
}

#[derive(Debug)]
pub struct NodeArena {
    blocks: Vec<Block>,
    first_capacity: usize,
    len: usize,
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

/// `ceil(capacity * 1.5)`
fn grow(capacity: usize) -> usize {
    (capacity * 3).div_ceil(2)
}

impl NodeArena {
    pub fn new() -> Self {
        Self::with_capacity(FIRST_BLOCK_CAPACITY)
    }

    pub fn with_capacity(first_capacity: usize) -> Self {
        let first_capacity = first_capacity.max(1);
        NodeArena {
            blocks: vec![Block::new(first_capacity)],
            first_capacity,
            len: 0,
        }
    }

    /// Stores `node` and returns its handle.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        let needs_block = self.blocks.last().is_none_or(Block::is_full);
        if needs_block {
            let capacity = self
                .blocks
                .last()
                .map_or(self.first_capacity, |b| grow(b.capacity));
            self.blocks.push(Block::new(capacity));
        }

        let block_index = self.blocks.len() - 1;
        let block = &mut self.blocks[block_index];
        let slot = block.nodes.len();
        block.nodes.push(node);
        self.len += 1;

        NodeId {
            block: block_index as u32,
            slot: slot as u32,
        }
    }

    /// Returns the node behind `id`.
    ///
    /// # Panics
    /// Panics if `id` was not produced by this arena since its last release.
    pub fn get(&self, id: NodeId) -> &Node {
        &self.blocks[id.block as usize].nodes[id.slot as usize]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Capacities of every block, oldest first.
    pub fn block_capacities(&self) -> Vec<usize> {
        self.blocks.iter().map(|b| b.capacity).collect()
    }

    /// Frees every node at once. Previously returned ids become invalid.
    pub fn release(&mut self) {
        self.blocks.clear();
        self.blocks.push(Block::new(self.first_capacity));
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::node::NodeKind;

    fn int(n: i64) -> Node {
        Node {
            line: 1,
            kind: NodeKind::Integer(n),
        }
    }

    #[test]
    fn test_alloc_and_get() {
        let mut arena = NodeArena::new();
        let a = arena.alloc(int(1));
        let b = arena.alloc(int(2));
        assert_eq!(arena.get(a).kind, NodeKind::Integer(1));
        assert_eq!(arena.get(b).kind, NodeKind::Integer(2));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_growth_appends_larger_blocks() {
        let mut arena = NodeArena::with_capacity(2);
        let ids: Vec<NodeId> = (0..10).map(|n| arena.alloc(int(n))).collect();

        // 2, 3, 5 -> 10 slots
        assert_eq!(arena.block_capacities(), vec![2, 3, 5]);
        for (n, id) in ids.iter().enumerate() {
            assert_eq!(arena.get(*id).kind, NodeKind::Integer(n as i64));
        }
    }

    #[test]
    fn test_default_first_block() {
        let arena = NodeArena::new();
        assert_eq!(arena.block_capacities(), vec![FIRST_BLOCK_CAPACITY]);
        assert!(arena.is_empty());
    }

    #[test]
    fn test_grow_rounds_up() {
        assert_eq!(grow(1024), 1536);
        assert_eq!(grow(3), 5);
        assert_eq!(grow(1), 2);
    }

    #[test]
    fn test_release_frees_everything() {
        let mut arena = NodeArena::with_capacity(1);
        for n in 0..5 {
            arena.alloc(int(n));
        }
        assert!(arena.block_count() > 1);

        arena.release();
        assert!(arena.is_empty());
        assert_eq!(arena.block_count(), 1);

        let id = arena.alloc(int(7));
        assert_eq!(arena.get(id).kind, NodeKind::Integer(7));
    }
}
