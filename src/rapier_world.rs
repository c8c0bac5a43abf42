//! [`Physics`] backed by rapier2d.

use crate::entity::EntityId;
use crate::physics::{BodyDef, BodyHandle, BodyKind, GRAVITY, Material, Physics, Pose, StepSettings, Vec2};
use log::trace;
use rapier2d::prelude::*;
use std::collections::HashMap;
use std::num::NonZeroUsize;

/// Owner ids ride along in rapier's `user_data`; 0 means no owner.
fn encode_owner(owner: Option<EntityId>) -> u128 {
    owner.map_or(0, |id| u128::from(id.raw()))
}

fn decode_owner(data: u128) -> Option<EntityId> {
    u64::try_from(data).ok().and_then(EntityId::from_raw)
}

fn to_vector(v: Vec2) -> Vector<Real> {
    vector![v.x, v.y]
}

fn to_isometry(pose: Pose) -> Isometry<Real> {
    Isometry::new(to_vector(pose.position), pose.angle)
}

fn from_isometry(iso: &Isometry<Real>) -> Pose {
    Pose::new(Vec2::new(iso.translation.x, iso.translation.y), iso.rotation.angle())
}

pub struct RapierWorld {
    gravity: Vector<Real>,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    handles: HashMap<BodyHandle, RigidBodyHandle>,
    next_handle: u64,
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierWorld {
    pub fn new() -> Self {
        Self {
            gravity: to_vector(GRAVITY),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            handles: HashMap::new(),
            next_handle: 0,
        }
    }

    fn body_mut(&mut self, body: BodyHandle) -> Option<&mut RigidBody> {
        let handle = *self.handles.get(&body)?;
        self.bodies.get_mut(handle)
    }

    fn owner_of(&self, collider: ColliderHandle) -> Option<EntityId> {
        let parent = self.colliders.get(collider)?.parent()?;
        decode_owner(self.bodies.get(parent)?.user_data)
    }
}

impl Physics for RapierWorld {
    fn create_body(&mut self, def: &BodyDef) -> BodyHandle {
        let builder = match def.kind {
            BodyKind::Dynamic => RigidBodyBuilder::dynamic(),
            BodyKind::Static => RigidBodyBuilder::fixed(),
        };
        let body = builder
            .position(to_isometry(def.pose))
            .linear_damping(def.linear_damping)
            .angular_damping(def.angular_damping)
            .user_data(encode_owner(def.owner))
            .build();
        let handle = self.bodies.insert(body);
        self.next_handle += 1;
        let ours = BodyHandle(self.next_handle);
        self.handles.insert(ours, handle);
        ours
    }

    fn attach_box(&mut self, body: BodyHandle, center: Vec2, half_extents: Vec2, material: &Material) {
        let Some(&parent) = self.handles.get(&body) else {
            return;
        };
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y)
            .translation(to_vector(center))
            .density(material.density)
            .friction(material.friction)
            .restitution(material.restitution)
            .build();
        self.colliders
            .insert_with_parent(collider, parent, &mut self.bodies);
    }

    fn apply_force(&mut self, body: BodyHandle, force: Vec2, point: Vec2) {
        if let Some(rb) = self.body_mut(body) {
            rb.add_force_at_point(to_vector(force), to_vector(point).into(), true);
        }
    }

    fn apply_torque(&mut self, body: BodyHandle, torque: f32) {
        if let Some(rb) = self.body_mut(body) {
            rb.add_torque(torque, true);
        }
    }

    fn step(&mut self, settings: &StepSettings) {
        let params = IntegrationParameters {
            dt: settings.dt,
            num_solver_iterations: NonZeroUsize::new(settings.velocity_iterations)
                .unwrap_or(NonZeroUsize::MIN),
            num_internal_pgs_iterations: settings.position_iterations.max(1),
            ..IntegrationParameters::default()
        };
        self.pipeline.step(
            &self.gravity,
            &params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            None,
            &(),
            &(),
        );
        // forces are per step
        for (_, rb) in self.bodies.iter_mut() {
            rb.reset_forces(false);
            rb.reset_torques(false);
        }
    }

    fn pose(&self, body: BodyHandle) -> Option<Pose> {
        let rb = self.bodies.get(*self.handles.get(&body)?)?;
        Some(from_isometry(rb.position()))
    }

    fn destroy_body(&mut self, body: BodyHandle) {
        let Some(handle) = self.handles.remove(&body) else {
            return;
        };
        trace!("destroying body {}", body.0);
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    fn touching(&self) -> Vec<(Option<EntityId>, Option<EntityId>)> {
        self.narrow_phase
            .contact_pairs()
            .filter(|pair| pair.has_any_active_contact)
            .map(|pair| (self.owner_of(pair.collider1), self.owner_of(pair.collider2)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: Material = Material {
        density: 1.0,
        friction: 0.5,
        restitution: 0.2,
    };

    fn body(world: &mut RapierWorld, kind: BodyKind, at: Vec2, owner: u64) -> BodyHandle {
        world.create_body(&BodyDef {
            kind,
            pose: Pose::new(at, 0.0),
            linear_damping: 2.0,
            angular_damping: 10.0,
            owner: EntityId::from_raw(owner),
        })
    }

    #[test]
    fn test_owner_encoding() {
        assert_eq!(encode_owner(None), 0);
        assert_eq!(decode_owner(0), None);
        let id = EntityId::from_raw(42);
        assert_eq!(decode_owner(encode_owner(id)), id);
    }

    #[test]
    fn test_pose_survives_isometry() {
        let pose = Pose::new(Vec2::new(2.5, 7.0), 0.75);
        let back = from_isometry(&to_isometry(pose));
        assert!(back.position.abs_diff_eq(pose.position, 1e-6));
        assert!((back.angle - pose.angle).abs() < 1e-6);
    }

    #[test]
    fn test_dynamic_body_falls() {
        let mut world = RapierWorld::new();
        let b = body(&mut world, BodyKind::Dynamic, Vec2::new(5.0, 10.0), 1);
        world.attach_box(b, Vec2::ZERO, Vec2::new(0.49, 0.49), &BLOCK);
        let settings = StepSettings::default();
        for _ in 0..30 {
            world.step(&settings);
        }
        let pose = world.pose(b).unwrap();
        assert!(pose.position.y < 10.0);
        assert!((pose.position.x - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_resting_block_touches_ground() {
        let mut world = RapierWorld::new();
        let ground = body(&mut world, BodyKind::Static, Vec2::new(5.0, 0.5), 0);
        world.attach_box(ground, Vec2::ZERO, Vec2::new(5.0, 0.5), &BLOCK);
        let b = body(&mut world, BodyKind::Dynamic, Vec2::new(5.0, 1.6), 7);
        world.attach_box(b, Vec2::ZERO, Vec2::new(0.49, 0.49), &BLOCK);
        let settings = StepSettings::default();
        let mut seen = Vec::new();
        for _ in 0..60 {
            world.step(&settings);
            seen.extend(world.touching());
        }
        let owner = EntityId::from_raw(7);
        assert!(
            seen.iter()
                .any(|&(a, b)| (a, b) == (owner, None) || (a, b) == (None, owner))
        );
    }

    #[test]
    fn test_destroyed_body_is_gone() {
        let mut world = RapierWorld::new();
        let b = body(&mut world, BodyKind::Dynamic, Vec2::new(1.0, 1.0), 3);
        world.attach_box(b, Vec2::ZERO, Vec2::new(0.49, 0.49), &BLOCK);
        world.destroy_body(b);
        assert_eq!(world.pose(b), None);
        world.step(&StepSettings::default());
        assert!(world.touching().is_empty());
    }
}
