//! Rigid-body interface the simulation drives.
//!
//! World units are block widths, y points up. The well spans x 0..10 and the
//! ground's top edge sits at y = 1.

use crate::entity::EntityId;
use glam::Affine2;
pub use glam::Vec2;

/// Gravity applied by the world, in blocks per second squared.
pub const GRAVITY: Vec2 = Vec2::new(0.0, -2.5);

/// Position and rotation of a body.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub position: Vec2,
    pub angle: f32,
}

impl Pose {
    pub const fn new(position: Vec2, angle: f32) -> Self {
        Self { position, angle }
    }

    pub fn transform(&self) -> Affine2 {
        Affine2::from_angle_translation(self.angle, self.position)
    }

    /// Body-local point to world space.
    pub fn apply(&self, local: Vec2) -> Vec2 {
        self.transform().transform_point2(local)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Dynamic,
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDef {
    pub kind: BodyKind,
    pub pose: Pose,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Entity the body belongs to, reported back through contacts.
    pub owner: Option<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
}

/// Opaque body handle issued by a [`Physics`] implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSettings {
    pub dt: f32,
    pub velocity_iterations: usize,
    pub position_iterations: usize,
}

impl StepSettings {
    pub const fn at_rate(frame_rate: f32) -> Self {
        Self {
            dt: 1.0 / frame_rate,
            velocity_iterations: 8,
            position_iterations: 3,
        }
    }
}

impl Default for StepSettings {
    fn default() -> Self {
        Self::at_rate(30.0)
    }
}

/// Everything the game needs from a rigid-body engine.
pub trait Physics {
    fn create_body(&mut self, def: &BodyDef) -> BodyHandle;

    /// Attach an axis-aligned (in body space) box fixture centred at `center`.
    fn attach_box(&mut self, body: BodyHandle, center: Vec2, half_extents: Vec2, material: &Material);

    /// Apply a world-space force at a world-space point for the next step.
    fn apply_force(&mut self, body: BodyHandle, force: Vec2, point: Vec2);

    fn apply_torque(&mut self, body: BodyHandle, torque: f32);

    fn step(&mut self, settings: &StepSettings);

    fn pose(&self, body: BodyHandle) -> Option<Pose>;

    fn destroy_body(&mut self, body: BodyHandle);

    /// Owners of both sides of every pair currently touching.
    fn touching(&self) -> Vec<(Option<EntityId>, Option<EntityId>)>;
}
