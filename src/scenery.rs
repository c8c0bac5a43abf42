//! Entities that are not pieces: the floor and the flash left by cleared blocks.

use crate::entity::{Entity, Fate, Outbox, Stage};
use crate::physics::{BodyDef, BodyHandle, BodyKind, Material, Pose, Vec2};
use crate::sketch::{Mark, Shade, Sketch};

/// Frames a deletion flash stays on screen.
pub const DELETION_EFFECT_DURATION: u32 = 15;

const GROUND_CENTER: Vec2 = Vec2::new(5.0, 0.5);
const GROUND_HALF: Vec2 = Vec2::new(5.0, 0.5);

/// Static slab under the well.
#[derive(Debug)]
pub struct Ground {
    body: BodyHandle,
}

impl Ground {
    pub fn new(stage: &mut Stage) -> Self {
        let body = stage.physics.create_body(&BodyDef {
            kind: BodyKind::Static,
            pose: Pose::new(GROUND_CENTER, 0.0),
            linear_damping: 0.0,
            angular_damping: 0.0,
            owner: None,
        });
        stage.physics.attach_box(
            body,
            Vec2::ZERO,
            GROUND_HALF,
            &Material {
                density: 1.0,
                friction: 0.5,
                restitution: 0.2,
            },
        );
        Self { body }
    }

    #[cfg(test)]
    pub fn body(&self) -> BodyHandle {
        self.body
    }
}

impl Entity for Ground {
    fn render(&self, _stage: &Stage, sketch: &mut Sketch) {
        sketch.push(Mark::Ground {
            min: GROUND_CENTER - GROUND_HALF,
            max: GROUND_CENTER + GROUND_HALF,
        });
    }
}

/// A white cell fading out where a block was cleared.
#[derive(Debug, Clone)]
pub struct DeletionEffect {
    center: Vec2,
    pose: Pose,
    time: u32,
}

impl DeletionEffect {
    pub fn new(center: Vec2, pose: Pose) -> Self {
        Self {
            center,
            pose,
            time: 0,
        }
    }

    /// 1.0 on the first frame down to 1/15 on the last.
    pub fn brightness(&self) -> f32 {
        (DELETION_EFFECT_DURATION + 1).saturating_sub(self.time) as f32
            / DELETION_EFFECT_DURATION as f32
    }
}

impl Entity for DeletionEffect {
    fn control(&mut self, _stage: &mut Stage, _out: &mut Outbox) -> Fate {
        self.time += 1;
        if self.time <= DELETION_EFFECT_DURATION {
            Fate::Live
        } else {
            Fate::Remove
        }
    }

    fn render(&self, _stage: &Stage, sketch: &mut Sketch) {
        sketch.cell(&self.pose, self.center, Shade::Fading(self.brightness().min(1.0)));
    }
}
