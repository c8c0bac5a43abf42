//! The seven canonical pieces: cell layout, adjacency and spawn placement.

use crate::blocks::{BlockArena, BlockId};
use crate::physics::Vec2;

/// Piece kinds, in the order the bag numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    I,
    J,
    L,
    O,
    S,
    T,
    Z,
}

/// How a shape's cells are wired together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wiring {
    /// 0 - 1 - 2 - 3
    Chain,
    /// 0 - 1, 0 - 2, 0 - 3
    Star,
    /// 0 - 1 - 2 - 3 - 0
    Ring,
}

impl PieceKind {
    pub const ALL: [Self; 7] = [Self::I, Self::J, Self::L, Self::O, Self::S, Self::T, Self::Z];

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Piece-local cell centres, centred on the body origin.
    pub fn centers(self) -> [Vec2; 4] {
        let v = Vec2::new;
        match self {
            Self::I => [v(-1.5, 0.0), v(-0.5, 0.0), v(0.5, 0.0), v(1.5, 0.0)],
            Self::J => [v(-0.75, 0.75), v(-0.75, -0.25), v(0.25, -0.25), v(1.25, -0.25)],
            Self::L => [v(-1.25, -0.25), v(-0.25, -0.25), v(0.75, -0.25), v(0.75, 0.75)],
            Self::O => [v(-0.5, -0.5), v(0.5, -0.5), v(0.5, 0.5), v(-0.5, 0.5)],
            Self::S => [v(-1.0, -0.5), v(0.0, -0.5), v(0.0, 0.5), v(1.0, 0.5)],
            Self::T => [v(0.0, -0.25), v(-1.0, -0.25), v(0.0, 0.75), v(1.0, -0.25)],
            Self::Z => [v(-1.0, 0.5), v(0.0, 0.5), v(0.0, -0.5), v(1.0, -0.5)],
        }
    }

    fn wiring(self) -> Wiring {
        match self {
            Self::O => Wiring::Ring,
            Self::T => Wiring::Star,
            _ => Wiring::Chain,
        }
    }

    fn edges(self) -> &'static [(usize, usize)] {
        match self.wiring() {
            Wiring::Chain => &[(0, 1), (1, 2), (2, 3)],
            Wiring::Star => &[(0, 1), (0, 2), (0, 3)],
            Wiring::Ring => &[(0, 1), (1, 2), (2, 3), (3, 0)],
        }
    }

    /// Where a fresh piece appears for a well of the given height.
    pub fn spawn_position(self, well_height: i32) -> Vec2 {
        let x = match self {
            Self::J => 4.75,
            Self::L => 5.25,
            _ => 5.0,
        };
        let lift = match self {
            Self::I => 0.5,
            Self::J | Self::L | Self::T => 0.75,
            _ => 1.0,
        };
        Vec2::new(x, well_height as f32 + 1.0 + lift)
    }

    /// Build this shape's graph in `arena` and return its root (cell 0).
    ///
    /// Panics if the wiring is not mutual or links cells that are not
    /// side by side; both are bugs in the tables above.
    pub fn build(self, arena: &mut BlockArena) -> BlockId {
        let centers = self.centers();
        let ids = centers.map(|c| arena.insert(c));
        for &(a, b) in self.edges() {
            let gap = (centers[a] - centers[b]).length();
            assert!(
                (gap - 1.0).abs() < 1e-4,
                "{self:?}: cells {a} and {b} are {gap} apart"
            );
            arena.link(ids[a], ids[b]);
        }
        for &(a, b) in self.edges() {
            let forward = arena.get(ids[a]).is_some_and(|blk| blk.neighbors().contains(&ids[b]));
            let back = arena.get(ids[b]).is_some_and(|blk| blk.neighbors().contains(&ids[a]));
            assert!(forward && back, "{self:?}: edge {a}-{b} is one-sided");
        }
        ids[0]
    }
}
