use std::time::Duration;

/// Per-axis tolerance (meters) under which two vertex positions are the same point.
///
/// Used by both the deduplicator and the association builder. The comparison is strict:
/// a difference of exactly `VERTEX_EPSILON` on any axis keeps the vertices distinct.
pub const VERTEX_EPSILON: f32 = 1.0e-6;

/// Gravity along Y in meters per second squared.
pub const GRAVITY_Y_MPS2: f32 = -9.8;

/// Fixed internal sub-step of the physics world (seconds).
pub const FIXED_TIME_STEP: f32 = 1.0 / 60.0;

/// Upper bound on internal sub-steps per `step` call.
///
/// A stalled frame with a huge delta drops the excess time instead of catching up.
pub const MAX_SUB_STEPS: u32 = 10;

/// Collision margin applied to every shape, soft or rigid (meters).
pub const COLLISION_MARGIN: f32 = 0.05;

/// How long a projectile lives before it is removed from world and scene.
pub const PROJECTILE_LIFETIME: Duration = Duration::from_millis(500);

/// Lateral sweep range for projectile spawns. Spawns cycle from `-range` upward.
pub const SPAWN_LATERAL_RANGE: f32 = 1.5;

/// Depth jitter half-width for projectile spawns.
pub const SPAWN_DEPTH_JITTER: f32 = 1.5;

/// Soft bodies whose fastest node stays under this speed (m/s) may fall asleep.
pub const SLEEP_SPEED_THRESHOLD: f32 = 0.01;

/// Time a soft body must stay under `SLEEP_SPEED_THRESHOLD` before sleeping (seconds).
pub const TIME_TO_SLEEP: f32 = 2.0;
