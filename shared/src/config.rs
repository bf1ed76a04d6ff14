/*!
Simulation configuration.

Every struct here carries the reference scene's values in its `Default` impl. Callers
that want a different pillow, a heavier projectile or a coarser time step override
the fields they care about with struct-update syntax.

Notes
- Distances are in meters, time in seconds, mass in kilograms.
- Soft-body coefficients use the conventional names: kDF (friction), kDP (damping),
  kPR (pressure), kLST/kAST (linear/angular stiffness).
*/

use std::time::Duration;

use nalgebra::Vector3;

use crate::bitmask_flags::{CollisionFlag, CollisionFlags};
use crate::constants::{
    COLLISION_MARGIN, FIXED_TIME_STEP, GRAVITY_Y_MPS2, MAX_SUB_STEPS, PROJECTILE_LIFETIME,
    SPAWN_DEPTH_JITTER, SPAWN_LATERAL_RANGE,
};

/// Global physics world parameters.
#[derive(Clone, Debug)]
pub struct WorldConfig {
    pub gravity: Vector3<f32>,
    /// Length of one internal sub-step.
    pub fixed_time_step: f32,
    /// Sub-steps allowed per frame; extra accumulated time is dropped.
    pub max_sub_steps: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vector3::new(0.0, GRAVITY_Y_MPS2, 0.0),
            fixed_time_step: FIXED_TIME_STEP,
            max_sub_steps: MAX_SUB_STEPS,
        }
    }
}

/// Parameters for a pressurised soft volume.
#[derive(Clone, Debug)]
pub struct SoftVolumeConfig {
    /// Total mass spread evenly across the simulation nodes.
    pub mass: f32,
    /// Target internal pressure (kPR).
    pub pressure: f32,
    /// Velocity relaxation passes per sub-step.
    pub velocity_iterations: u32,
    /// Position (link projection) passes per sub-step.
    pub position_iterations: u32,
    pub collisions: CollisionFlags,
    /// Dynamic friction against rigid colliders (kDF).
    pub friction: f32,
    /// Velocity damping per sub-step (kDP).
    pub damping: f32,
    /// Stiffness of edge links (kLST).
    pub linear_stiffness: f32,
    /// Stiffness of bending links across shared edges (kAST).
    pub angular_stiffness: f32,
    pub margin: f32,
    pub collision_group: u32,
    pub collision_mask: u32,
    /// When true the body never sleeps, however little it moves.
    pub disable_deactivation: bool,
}

impl Default for SoftVolumeConfig {
    fn default() -> Self {
        Self {
            mass: 1.0,
            pressure: 11.0,
            velocity_iterations: 40,
            position_iterations: 40,
            collisions: CollisionFlags::from_flags(&[
                CollisionFlag::SoftRigid,
                CollisionFlag::SoftSoft,
            ]),
            friction: 0.1,
            damping: 0.01,
            linear_stiffness: 0.9,
            angular_stiffness: 0.9,
            margin: COLLISION_MARGIN,
            collision_group: 1,
            collision_mask: u32::MAX,
            disable_deactivation: true,
        }
    }
}

/// Parameters for click-spawned projectiles.
#[derive(Clone, Debug)]
pub struct ProjectileConfig {
    pub mass: f32,
    pub radius: f32,
    pub friction: f32,
    /// Spawn height above the ground plane.
    pub spawn_height: f32,
    pub launch_velocity: Vector3<f32>,
    pub lateral_range: f32,
    pub depth_jitter: f32,
    pub lifetime: Duration,
    /// The reference scene hides its projectiles; only their impact is visible.
    pub visible: bool,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            mass: 3.0,
            radius: 0.4,
            friction: 0.5,
            spawn_height: 3.0,
            launch_velocity: Vector3::new(0.0, -14.0, 0.0),
            lateral_range: SPAWN_LATERAL_RANGE,
            depth_jitter: SPAWN_DEPTH_JITTER,
            lifetime: PROJECTILE_LIFETIME,
            visible: false,
        }
    }
}

/// Everything needed to build the reference scene.
#[derive(Clone, Debug)]
pub struct SceneConfig {
    pub world: WorldConfig,
    pub volume: SoftVolumeConfig,
    pub projectile: ProjectileConfig,
    /// Full extents of the static ground box.
    pub ground_size: Vector3<f32>,
    pub ground_center: Vector3<f32>,
    /// Full extents of the pillow before subdivision.
    pub pillow_size: Vector3<f32>,
    pub pillow_segments: [u32; 3],
    pub pillow_center: Vector3<f32>,
    pub rng_seed: u64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            volume: SoftVolumeConfig::default(),
            projectile: ProjectileConfig::default(),
            ground_size: Vector3::new(40.0, 1.0, 40.0),
            ground_center: Vector3::new(0.0, -0.5, 0.0),
            pillow_size: Vector3::new(5.0, 1.0, 3.0),
            pillow_segments: [20, 4, 12],
            pillow_center: Vector3::new(0.0, 2.0, 0.0),
            rng_seed: 0x5eed,
        }
    }
}
