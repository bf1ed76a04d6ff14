//! Physics collaborator: rigid bodies through rapier, pressurised soft bodies through
//! the in-crate integrator, both advanced by one fixed-step driver.
//!
//! The rest of the crate only talks to [`PhysicsWorld`], which keeps the sync and
//! spawn logic testable against a scripted world.

pub mod rapier_world;
#[cfg(test)]
pub(crate) mod scripted;
pub mod shape;
pub mod soft_body;
pub mod stepper;

use nalgebra::{Isometry3, UnitQuaternion, Vector3};
use rapier3d::prelude::RigidBodyHandle;

pub use rapier_world::RapierWorld;
pub use shape::{ShapeDef, collider_from_shape};
pub use soft_body::{ActivationState, SoftBody, SoftBodyConfig, SoftMaterial, SoftNode};
pub use stepper::{FixedStepper, SubSteps};

/// Index of a soft body inside its world. Soft bodies are never removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoftBodyHandle(pub usize);

/// Everything needed to insert one rigid body.
#[derive(Clone, Debug)]
pub struct RigidBodyDesc {
    pub shape: ShapeDef,
    /// Zero makes the body fixed.
    pub mass: f32,
    pub translation: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub margin: f32,
    pub friction: f32,
}

impl RigidBodyDesc {
    pub fn new(shape: ShapeDef, mass: f32, translation: Vector3<f32>) -> Self {
        Self {
            shape,
            mass,
            translation,
            rotation: UnitQuaternion::identity(),
            margin: crate::constants::COLLISION_MARGIN,
            friction: 0.5,
        }
    }

    pub fn with_rotation(mut self, rotation: UnitQuaternion<f32>) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    pub fn is_fixed(&self) -> bool {
        self.mass <= 0.0
    }
}

/// The operations the simulation context needs from a physics engine.
pub trait PhysicsWorld {
    /// Advance by `dt` seconds of frame time; returns the sub-steps performed.
    fn step_simulation(&mut self, dt: f32, max_sub_steps: u32) -> u32;

    fn add_soft_body(&mut self, body: SoftBody, group: u32, mask: u32) -> SoftBodyHandle;

    /// Current node states, in unique-vertex order.
    fn soft_nodes(&self, handle: SoftBodyHandle) -> Option<&[SoftNode]>;

    fn soft_body(&self, handle: SoftBodyHandle) -> Option<&SoftBody>;

    fn add_rigid_body(&mut self, desc: &RigidBodyDesc) -> RigidBodyHandle;

    /// Remove a body and its colliders. Returns false if it was already gone.
    fn remove_rigid_body(&mut self, handle: RigidBodyHandle) -> bool;

    fn contains_rigid_body(&self, handle: RigidBodyHandle) -> bool;

    fn rigid_transform(&self, handle: RigidBodyHandle) -> Option<Isometry3<f32>>;

    fn set_linear_velocity(&mut self, handle: RigidBodyHandle, velocity: Vector3<f32>) -> bool;

    /// Friction of every collider attached to the body.
    fn set_friction(&mut self, handle: RigidBodyHandle, friction: f32) -> bool;

    fn rigid_body_count(&self) -> usize;
}
