//! Display list filled by `Entity::render`, in world units (y up).

use crate::physics::{Pose, Vec2};
use crate::shapes::PieceKind;

/// Drawn cells are a little smaller than the lattice so neighbours stay distinct.
pub const CELL_INSET: f32 = 4.0 / 32.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shade {
    Piece(PieceKind),
    /// Deletion flash; 1.0 is full white, 0.0 fully faded.
    Fading(f32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mark {
    /// One block, as its four world-space corners.
    Cell { corners: [Vec2; 4], shade: Shade },
    /// Axis-aligned floor slab.
    Ground { min: Vec2, max: Vec2 },
    /// Top edge of a playable row.
    WellLine { y: f32 },
    /// Highlighted row during a well height transition.
    Band { row: i32 },
}

#[derive(Debug, Clone, Default)]
pub struct Sketch {
    pub marks: Vec<Mark>,
}

impl Sketch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mark: Mark) {
        self.marks.push(mark);
    }

    /// Add a block centred at `center` in the frame of `pose`.
    pub fn cell(&mut self, pose: &Pose, center: Vec2, shade: Shade) {
        let h = (1.0 - CELL_INSET) / 2.0;
        let corners = [
            Vec2::new(-h, -h),
            Vec2::new(h, -h),
            Vec2::new(h, h),
            Vec2::new(-h, h),
        ]
        .map(|corner| pose.apply(center + corner));
        self.push(Mark::Cell { corners, shade });
    }

    #[cfg(test)]
    pub fn cells(&self) -> impl Iterator<Item = (&[Vec2; 4], Shade)> {
        self.marks.iter().filter_map(|m| match m {
            Mark::Cell { corners, shade } => Some((corners, *shade)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_corners_follow_pose() {
        let mut sketch = Sketch::new();
        let pose = Pose::new(Vec2::new(5.0, 2.0), 0.0);
        sketch.cell(&pose, Vec2::new(0.5, 0.5), Shade::Piece(PieceKind::O));
        let (corners, _) = sketch.cells().next().unwrap();
        let h = (1.0 - CELL_INSET) / 2.0;
        assert!((corners[0].x - (5.5 - h)).abs() < 1e-6);
        assert!((corners[2].y - (2.5 + h)).abs() < 1e-6);
    }
}
