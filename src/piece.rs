//! A rigid piece: one physics body carrying a connected block graph.

use crate::blocks::BlockId;
use crate::entity::{Cue, Entity, EntityId, Fate, MessageKind, Outbox, Stage};
use crate::physics::{BodyDef, BodyHandle, BodyKind, Material, Pose, Vec2};
use crate::player::Player;
use crate::scenery::DeletionEffect;
use crate::shapes::PieceKind;
use crate::sketch::{Shade, Sketch};
use log::{debug, warn};

/// Fixtures are a hair smaller than a cell so stacked pieces do not snag.
pub const FIXTURE_HALF_EXTENT: f32 = 0.49;
const MATERIAL: Material = Material {
    density: 1.0,
    friction: 0.5,
    restitution: 0.2,
};
const LINEAR_DAMPING: f32 = 2.0;
const ANGULAR_DAMPING: f32 = 10.0;
const PUSH_FORCE: f32 = 100.0;
const TURN_TORQUE: f32 = 200.0;
/// Bodies whose origin drops below this have fallen out of the world.
pub const FALL_OUT_Y: f32 = -2.0;

#[derive(Debug)]
pub struct Piece {
    id: EntityId,
    kind: PieceKind,
    root: BlockId,
    /// Collect order at assembly; fixtures were attached in this order.
    blocks: Vec<BlockId>,
    body: BodyHandle,
    current: bool,
}

impl Piece {
    /// Build a body for the graph rooted at `root`, placed at `pose`.
    pub fn assemble(id: EntityId, kind: PieceKind, root: BlockId, pose: Pose, stage: &mut Stage) -> Self {
        let blocks = stage.blocks.collect(root);
        let body = stage.physics.create_body(&BodyDef {
            kind: BodyKind::Dynamic,
            pose,
            linear_damping: LINEAR_DAMPING,
            angular_damping: ANGULAR_DAMPING,
            owner: Some(id),
        });
        let half = Vec2::new(FIXTURE_HALF_EXTENT, FIXTURE_HALF_EXTENT);
        for &block in &blocks {
            if let Some(center) = stage.blocks.center(block) {
                stage.physics.attach_box(body, center, half, &MATERIAL);
            }
        }
        Self {
            id,
            kind,
            root,
            blocks,
            body,
            current: false,
        }
    }

    /// A fresh four-cell piece above the well, under player control.
    pub fn spawn(kind: PieceKind, stage: &mut Stage) -> (EntityId, Self) {
        let id = stage.allocate_id();
        let root = kind.build(&mut stage.blocks);
        let pose = Pose::new(kind.spawn_position(stage.well_height()), 0.0);
        let mut piece = Self::assemble(id, kind, root, pose, stage);
        piece.current = true;
        (id, piece)
    }

    #[cfg(test)]
    pub fn kind(&self) -> PieceKind {
        self.kind
    }

    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    /// Tell the player to bring the next piece if this one was current.
    fn hand_back(&mut self, stage: &Stage, out: &mut Outbox) {
        if self.current {
            self.current = false;
            out.send(stage.player, MessageKind::ChangePiece);
        }
    }

    fn fall_out(&mut self, stage: &mut Stage, out: &mut Outbox) -> Fate {
        self.hand_back(stage, out);
        stage.physics.destroy_body(self.body);
        let lost = stage.blocks.release(self.root);
        debug!("{:?} {:?} fell out with {lost} blocks", self.id, self.kind);
        out.send(stage.supervisor, MessageKind::AddToLostBlockCount(lost));
        Fate::Remove
    }

    /// The body vanished under us; give the blocks back without scoring them.
    fn orphaned(&mut self, stage: &mut Stage, out: &mut Outbox) -> Fate {
        self.hand_back(stage, out);
        let freed = stage.blocks.release(self.root);
        warn!("{:?} lost its body, released {freed} blocks", self.id);
        Fate::Remove
    }

    fn landed(&mut self, stage: &Stage, out: &mut Outbox) {
        if !self.current {
            return;
        }
        self.current = false;
        let height = stage.well_height();
        let y = stage
            .physics
            .pose(self.body)
            .map_or(f32::INFINITY, |p| p.position.y);
        if y < height as f32 + 1.0 {
            out.send(stage.player, MessageKind::ChangePiece);
        } else {
            debug!("{:?} landed above the well at y {y:.2}", self.id);
            out.send(stage.supervisor, MessageKind::GameOver);
        }
    }

    fn lose_blocks(&mut self, doomed: &[BlockId], stage: &mut Stage, out: &mut Outbox) -> Fate {
        self.hand_back(stage, out);
        let pose = stage.physics.pose(self.body).unwrap_or_default();
        let centers: Vec<Vec2> = doomed
            .iter()
            .filter(|id| self.blocks.contains(id))
            .filter_map(|&id| stage.blocks.center(id))
            .collect();
        let roots = stage.blocks.split(self.root, doomed);
        stage.physics.destroy_body(self.body);
        debug!(
            "{:?} lost {} blocks, {} fragments remain",
            self.id,
            centers.len(),
            roots.len()
        );
        for root in roots {
            let id = stage.allocate_id();
            let fragment = Self::assemble(id, self.kind, root, pose, stage);
            out.create(id, fragment);
        }
        for center in centers {
            let id = stage.allocate_id();
            out.create(id, DeletionEffect::new(center, pose));
        }
        stage.raise(Cue::LineClear);
        Fate::Remove
    }
}

impl Entity for Piece {
    fn as_piece(&self) -> Option<&Piece> {
        Some(self)
    }

    fn is_current(&self) -> bool {
        self.current
    }

    fn control(&mut self, stage: &mut Stage, out: &mut Outbox) -> Fate {
        let Some(pose) = stage.physics.pose(self.body) else {
            return self.orphaned(stage, out);
        };
        if pose.position.y < FALL_OUT_Y {
            return self.fall_out(stage, out);
        }
        if self.current {
            let intent = stage.player().map(Player::intent).unwrap_or_default();
            stage
                .physics
                .apply_force(self.body, intent.direction * PUSH_FORCE, pose.position);
            stage.physics.apply_torque(self.body, intent.rotation * TURN_TORQUE);
        }
        Fate::Live
    }

    fn react(&mut self, message: MessageKind, stage: &mut Stage, out: &mut Outbox) -> Fate {
        match message {
            MessageKind::Contact => {
                self.landed(stage, out);
                Fate::Live
            }
            MessageKind::Deletion(blocks) => self.lose_blocks(&blocks, stage, out),
            _ => Fate::Live,
        }
    }

    fn render(&self, stage: &Stage, sketch: &mut Sketch) {
        let Some(pose) = stage.physics.pose(self.body) else {
            return;
        };
        for &block in &self.blocks {
            if let Some(center) = stage.blocks.center(block) {
                sketch.cell(&pose, center, Shade::Piece(self.kind));
            }
        }
    }
}
