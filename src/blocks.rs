//! Block graphs: the cells of each piece and how they hold together.
//!
//! Every piece's shape is an undirected graph of unit cells living in a shared
//! [`BlockArena`]. Graphs may contain cycles (the O piece is a ring), so
//! traversal marks visited cells with a stamp from [`BLOCK_INDEX`] instead of
//! keeping a visited set: a cell is new to the current walk iff its stamp is
//! not above the allocator value read when the walk began.

use crate::physics::Vec2;
use crate::stamp::BLOCK_INDEX;
use std::collections::HashSet;

/// Handle to a block in a [`BlockArena`]. Stale handles resolve to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId {
    slot: u32,
    generation: u32,
}

#[derive(Debug, Clone)]
pub struct Block {
    /// Piece-local centre on the half-integer lattice.
    pub center: Vec2,
    neighbors: Vec<BlockId>,
    visit_index: u64,
}

impl Block {
    pub fn neighbors(&self) -> &[BlockId] {
        &self.neighbors
    }

    #[cfg(test)]
    pub fn visit_index(&self) -> u64 {
        self.visit_index
    }
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    block: Option<Block>,
}

/// Generational storage for every block of every live piece.
#[derive(Debug, Clone, Default)]
pub struct BlockArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl BlockArena {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.block.is_some()).count()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn insert(&mut self, center: Vec2) -> BlockId {
        let block = Block {
            center,
            neighbors: Vec::new(),
            visit_index: 0,
        };
        if let Some(slot) = self.free.pop() {
            let entry = &mut self.slots[slot as usize];
            entry.block = Some(block);
            return BlockId {
                slot,
                generation: entry.generation,
            };
        }
        let slot = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            block: Some(block),
        });
        BlockId {
            slot,
            generation: 0,
        }
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.slots
            .get(id.slot as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.block.as_ref())
    }

    fn get_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.slots
            .get_mut(id.slot as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.block.as_mut())
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.get(id).is_some()
    }

    pub fn center(&self, id: BlockId) -> Option<Vec2> {
        self.get(id).map(|b| b.center)
    }

    /// Connect two blocks in both directions. Linking twice is a no-op.
    pub fn link(&mut self, a: BlockId, b: BlockId) {
        if a == b || !self.contains(a) || !self.contains(b) {
            return;
        }
        for (from, to) in [(a, b), (b, a)] {
            if let Some(block) = self.get_mut(from) {
                if !block.neighbors.contains(&to) {
                    block.neighbors.push(to);
                }
            }
        }
    }

    fn remove(&mut self, id: BlockId) -> Option<Block> {
        let entry = self.slots.get_mut(id.slot as usize)?;
        if entry.generation != id.generation {
            return None;
        }
        let block = entry.block.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(id.slot);
        Some(block)
    }

    fn stamp(&mut self, id: BlockId) {
        if let Some(block) = self.get_mut(id) {
            block.visit_index = BLOCK_INDEX.next();
        }
    }

    fn unvisited_since(&self, id: BlockId, base: u64) -> bool {
        self.get(id).is_some_and(|b| b.visit_index <= base)
    }

    /// Every block reachable from `root`, in depth-first pre-order.
    ///
    /// Terminates on cyclic graphs: a neighbour is only entered if its stamp is
    /// not above the allocator value read before the walk.
    pub fn collect(&mut self, root: BlockId) -> Vec<BlockId> {
        let base = BLOCK_INDEX.current();
        let mut order = Vec::new();
        if !self.contains(root) {
            return order;
        }
        self.stamp(root);
        order.push(root);
        // (block, index of the next neighbour to look at)
        let mut stack = vec![(root, 0usize)];
        while let Some((id, cursor)) = stack.last_mut() {
            let next = self
                .get(*id)
                .and_then(|b| b.neighbors.get(*cursor).copied());
            let Some(neighbor) = next else {
                stack.pop();
                continue;
            };
            *cursor += 1;
            if self.unvisited_since(neighbor, base) {
                self.stamp(neighbor);
                order.push(neighbor);
                stack.push((neighbor, 0));
            }
        }
        order
    }

    /// Remove `to_delete` from the graph rooted at `root` and return one root
    /// per connected fragment left behind.
    ///
    /// Deleted blocks are freed from the arena; survivors lose their edges to
    /// them. Blocks in `to_delete` that are not part of this graph are ignored,
    /// so `collect(root).len()` before the call always equals the number of
    /// deleted members plus the sizes of the returned fragments.
    pub fn split(&mut self, root: BlockId, to_delete: &[BlockId]) -> Vec<BlockId> {
        let all = self.collect(root);
        let doomed: HashSet<BlockId> = to_delete
            .iter()
            .copied()
            .filter(|id| all.contains(id))
            .collect();
        let remaining: Vec<BlockId> = all.into_iter().filter(|id| !doomed.contains(id)).collect();

        for &id in &remaining {
            if let Some(block) = self.get_mut(id) {
                block.neighbors.retain(|n| !doomed.contains(n));
            }
        }
        for &id in &doomed {
            self.remove(id);
        }

        let base = BLOCK_INDEX.current();
        let mut roots = Vec::new();
        for &id in &remaining {
            if self.unvisited_since(id, base) {
                self.collect(id);
                roots.push(id);
            }
        }
        roots
    }

    /// Free every block reachable from `root`.
    pub fn release(&mut self, root: BlockId) -> usize {
        let all = self.collect(root);
        for &id in &all {
            self.remove(id);
        }
        all.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// a - b - c - d - a
    fn ring(arena: &mut BlockArena) -> [BlockId; 4] {
        let a = arena.insert(Vec2::new(-0.5, -0.5));
        let b = arena.insert(Vec2::new(0.5, -0.5));
        let c = arena.insert(Vec2::new(0.5, 0.5));
        let d = arena.insert(Vec2::new(-0.5, 0.5));
        arena.link(a, b);
        arena.link(b, c);
        arena.link(c, d);
        arena.link(d, a);
        [a, b, c, d]
    }

    fn chain(arena: &mut BlockArena, n: usize) -> Vec<BlockId> {
        let ids: Vec<BlockId> = (0..n)
            .map(|i| arena.insert(Vec2::new(i as f32, 0.0)))
            .collect();
        for pair in ids.windows(2) {
            arena.link(pair[0], pair[1]);
        }
        ids
    }

    fn sorted(mut v: Vec<BlockId>) -> Vec<BlockId> {
        v.sort();
        v
    }

    #[test]
    fn test_collect_ring_terminates_from_every_root() {
        let mut arena = BlockArena::new();
        let cells = ring(&mut arena);
        for root in cells {
            let got = arena.collect(root);
            assert_eq!(got.len(), 4);
            assert_eq!(got[0], root);
            assert_eq!(sorted(got), sorted(cells.to_vec()));
        }
    }

    #[test]
    fn test_collect_is_depth_first_preorder() {
        let mut arena = BlockArena::new();
        let ids = chain(&mut arena, 4);
        assert_eq!(arena.collect(ids[1]), vec![ids[1], ids[0], ids[2], ids[3]]);
    }

    #[test]
    fn test_collect_repeatable() {
        let mut arena = BlockArena::new();
        let cells = ring(&mut arena);
        let first = arena.collect(cells[0]);
        let second = arena.collect(cells[0]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_collect_stamps_above_baseline() {
        let mut arena = BlockArena::new();
        let cells = ring(&mut arena);
        let base = BLOCK_INDEX.current();
        arena.collect(cells[2]);
        for id in cells {
            assert!(arena.get(id).unwrap().visit_index() > base);
        }
    }

    #[test]
    fn test_link_is_mutual_and_idempotent() {
        let mut arena = BlockArena::new();
        let a = arena.insert(Vec2::ZERO);
        let b = arena.insert(Vec2::new(1.0, 0.0));
        arena.link(a, b);
        arena.link(b, a);
        assert_eq!(arena.get(a).unwrap().neighbors(), &[b]);
        assert_eq!(arena.get(b).unwrap().neighbors(), &[a]);
    }

    #[test]
    fn test_split_ring_one_cell_stays_connected() {
        let mut arena = BlockArena::new();
        let [a, b, c, d] = ring(&mut arena);
        let roots = arena.split(a, &[b]);
        assert_eq!(roots.len(), 1);
        let fragment = arena.collect(roots[0]);
        assert_eq!(sorted(fragment), sorted(vec![a, c, d]));
        assert!(!arena.contains(b));
    }

    #[test]
    fn test_split_ring_opposite_cells_gives_two_singletons() {
        let mut arena = BlockArena::new();
        let [a, b, c, d] = ring(&mut arena);
        let roots = arena.split(c, &[a, c]);
        assert_eq!(sorted(roots.clone()), sorted(vec![b, d]));
        for root in roots {
            assert_eq!(arena.collect(root).len(), 1);
        }
    }

    #[test]
    fn test_split_everything_leaves_no_roots() {
        let mut arena = BlockArena::new();
        let cells = ring(&mut arena);
        let roots = arena.split(cells[0], &cells);
        assert!(roots.is_empty());
        assert!(arena.is_empty());
    }

    #[test]
    fn test_split_chain_middle() {
        let mut arena = BlockArena::new();
        let ids = chain(&mut arena, 4);
        let roots = arena.split(ids[0], &[ids[1]]);
        assert_eq!(roots, vec![ids[0], ids[2]]);
        assert_eq!(arena.collect(ids[2]), vec![ids[2], ids[3]]);
        assert!(arena.get(ids[0]).unwrap().neighbors().is_empty());
    }

    #[test]
    fn test_split_ignores_foreign_blocks() {
        let mut arena = BlockArena::new();
        let ids = chain(&mut arena, 3);
        let stranger = arena.insert(Vec2::new(9.0, 9.0));
        let roots = arena.split(ids[0], &[stranger]);
        assert_eq!(roots, vec![ids[0]]);
        assert_eq!(arena.collect(ids[0]).len(), 3);
        assert!(arena.contains(stranger));
    }

    #[test]
    fn test_split_conserves_blocks_over_every_subset() {
        for mask in 0u32..16 {
            let mut arena = BlockArena::new();
            let cells = ring(&mut arena);
            let doomed: Vec<BlockId> = (0..4)
                .filter(|i| mask & (1 << i) != 0)
                .map(|i| cells[i])
                .collect();
            let roots = arena.split(cells[0], &doomed);
            let survivors: usize = roots.iter().map(|&r| arena.collect(r).len()).sum();
            assert_eq!(survivors + doomed.len(), 4, "mask {mask:04b}");
        }
    }

    #[test]
    fn test_release_frees_whole_graph() {
        let mut arena = BlockArena::new();
        let cells = ring(&mut arena);
        let keep = arena.insert(Vec2::ZERO);
        assert_eq!(arena.release(cells[3]), 4);
        assert_eq!(arena.len(), 1);
        assert!(arena.contains(keep));
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let mut arena = BlockArena::new();
        let a = arena.insert(Vec2::ZERO);
        arena.release(a);
        let b = arena.insert(Vec2::new(1.0, 0.0));
        assert!(!arena.contains(a));
        assert!(arena.contains(b));
        assert!(arena.collect(a).is_empty());
    }
}
