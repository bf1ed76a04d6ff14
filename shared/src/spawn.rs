//! Click-to-spawn state machine.
//!
//! Input only raises a flag; the frame loop consumes it. Any number of inputs between
//! two frames collapse into a single spawn.

use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ProjectileConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SpawnState {
    #[default]
    Idle,
    PendingSpawn,
}

/// Where and how fast the next projectile starts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnRequest {
    pub translation: Vector3<f32>,
    pub velocity: Vector3<f32>,
}

#[derive(Debug)]
pub struct ProjectileSpawner {
    state: SpawnState,
    next_lateral: f32,
    lateral_range: f32,
    depth_jitter: f32,
    spawn_height: f32,
    launch_velocity: Vector3<f32>,
    rng: StdRng,
}

impl ProjectileSpawner {
    pub fn new(config: &ProjectileConfig, seed: u64) -> Self {
        Self {
            state: SpawnState::Idle,
            next_lateral: -config.lateral_range,
            lateral_range: config.lateral_range,
            depth_jitter: config.depth_jitter.abs(),
            spawn_height: config.spawn_height,
            launch_velocity: config.launch_velocity,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn state(&self) -> SpawnState {
        self.state
    }

    /// Idle -> PendingSpawn. Already pending stays pending.
    pub fn request(&mut self) {
        self.state = SpawnState::PendingSpawn;
    }

    /// Consume the pending flag, producing the spawn it stands for.
    pub fn take_pending(&mut self) -> Option<SpawnRequest> {
        if self.state != SpawnState::PendingSpawn {
            return None;
        }
        self.state = SpawnState::Idle;

        let x = self.next_lateral;
        self.next_lateral += 1.0;
        if self.next_lateral >= self.lateral_range {
            self.next_lateral = -self.lateral_range;
        }

        let z = if self.depth_jitter > 0.0 {
            self.rng.gen_range(-self.depth_jitter..=self.depth_jitter)
        } else {
            0.0
        };

        Some(SpawnRequest {
            translation: Vector3::new(x, self.spawn_height, z),
            velocity: self.launch_velocity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawner() -> ProjectileSpawner {
        ProjectileSpawner::new(&ProjectileConfig::default(), 7)
    }

    #[test]
    fn many_requests_collapse_into_one_spawn() {
        let mut s = spawner();
        for _ in 0..25 {
            s.request();
        }
        assert_eq!(s.state(), SpawnState::PendingSpawn);
        assert!(s.take_pending().is_some());
        assert_eq!(s.state(), SpawnState::Idle);
        assert!(s.take_pending().is_none());
    }

    #[test]
    fn lateral_offset_cycles_and_wraps() {
        let mut s = spawner();
        let xs: Vec<f32> = (0..5)
            .map(|_| {
                s.request();
                s.take_pending().unwrap().translation.x
            })
            .collect();
        assert_eq!(xs, vec![-1.5, -0.5, 0.5, -1.5, -0.5]);
    }

    #[test]
    fn depth_stays_within_jitter_and_launch_is_downward() {
        let mut s = spawner();
        for _ in 0..200 {
            s.request();
            let r = s.take_pending().unwrap();
            assert!(r.translation.z.abs() <= 1.5);
            assert_eq!(r.translation.y, 3.0);
            assert!(r.velocity.y < 0.0);
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let (mut a, mut b) = (spawner(), spawner());
        for _ in 0..10 {
            a.request();
            b.request();
            assert_eq!(a.take_pending(), b.take_pending());
        }
    }
}
