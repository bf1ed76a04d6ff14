//! Simulation context: the physics world plus everything tracked against it.
//!
//! One context per scene. The frame loop calls [`SimulationContext::on_frame`] once per
//! rendered frame and [`SimulationContext::on_input_down`] on clicks; presentation
//! reads the tracked volumes and objects afterwards.
//!
//! Frame order:
//! 1. advance the frame clock and step the world (bounded sub-steps)
//! 2. remove projectiles whose lifetime ran out
//! 3. soft-body sync, then rigid-body sync
//! 4. honour at most one pending spawn

use std::time::Duration;

use log::{debug, info, warn};
use nalgebra::Vector3;
use rapier3d::prelude::RigidBodyHandle;

use crate::config::{ProjectileConfig, SceneConfig, SoftVolumeConfig, WorldConfig};
use crate::error::SimError;
use crate::geometry::{Deduplicated, TriangleSoupMesh, VertexAssociation, dedup_with_classes};
use crate::physics::{
    ActivationState, PhysicsWorld, RapierWorld, RigidBodyDesc, ShapeDef, SoftBody,
};
use crate::spawn::{ProjectileSpawner, SpawnState};
use crate::sync::{sync_rigid_bodies, sync_soft_bodies};
use crate::tracked::{
    Pose, RenderObjectId, TrackedRigidObject, TrackedSoftVolume, VolumeBuffers,
};

/// What happened during one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub sub_steps: u32,
    /// Render objects whose bodies were removed this frame.
    pub expired: Vec<RenderObjectId>,
    /// Projectile spawned this frame, if any.
    pub spawned: Option<RenderObjectId>,
}

/// Identifiers of a freshly created rigid body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RigidObjectIds {
    pub render_id: RenderObjectId,
    pub body: RigidBodyHandle,
}

/// Render ids of the reference scene's objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferenceScene {
    pub ground: RenderObjectId,
    pub pillow: RenderObjectId,
}

pub struct SimulationContext<W: PhysicsWorld = RapierWorld> {
    world: W,
    world_config: WorldConfig,
    projectile: ProjectileConfig,
    soft_volumes: Vec<TrackedSoftVolume>,
    rigid_objects: Vec<TrackedRigidObject>,
    spawner: ProjectileSpawner,
    clock: Duration,
    next_render_id: u64,
}

impl SimulationContext<RapierWorld> {
    /// Rapier-backed context with the reference scene already built.
    pub fn reference(config: &SceneConfig) -> Result<(Self, ReferenceScene), SimError> {
        let mut ctx = Self::new(
            RapierWorld::new(&config.world),
            config.world.clone(),
            config.projectile.clone(),
            config.rng_seed,
        );
        let scene = ctx.build_reference_scene(config)?;
        Ok((ctx, scene))
    }
}

impl<W: PhysicsWorld> SimulationContext<W> {
    pub fn new(
        world: W,
        world_config: WorldConfig,
        projectile: ProjectileConfig,
        rng_seed: u64,
    ) -> Self {
        Self {
            world,
            world_config,
            spawner: ProjectileSpawner::new(&projectile, rng_seed),
            projectile,
            soft_volumes: Vec::new(),
            rigid_objects: Vec::new(),
            clock: Duration::ZERO,
            next_render_id: 0,
        }
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn soft_volumes(&self) -> &[TrackedSoftVolume] {
        &self.soft_volumes
    }

    /// Mutable access for presentation, which clears `needs_upload` after copying.
    pub fn soft_volumes_mut(&mut self) -> &mut [TrackedSoftVolume] {
        &mut self.soft_volumes
    }

    pub fn rigid_objects(&self) -> &[TrackedRigidObject] {
        &self.rigid_objects
    }

    pub fn projectile_config(&self) -> &ProjectileConfig {
        &self.projectile
    }

    pub fn spawn_state(&self) -> SpawnState {
        self.spawner.state()
    }

    /// Total frame time seen so far.
    pub fn clock(&self) -> Duration {
        self.clock
    }

    fn allocate_render_id(&mut self) -> RenderObjectId {
        let id = RenderObjectId(self.next_render_id);
        self.next_render_id += 1;
        id
    }

    /// Ground box and pressurised pillow.
    pub fn build_reference_scene(&mut self, config: &SceneConfig) -> Result<ReferenceScene, SimError> {
        let ground = self.create_box(config.ground_size, 0.0, config.ground_center);

        let soup = TriangleSoupMesh::subdivided_box(config.pillow_size, config.pillow_segments)
            .translated(config.pillow_center);
        let pillow = self.create_soft_volume(&soup, &config.volume)?;

        info!(
            "reference scene: {} soup vertices, {} rigid bodies",
            soup.len(),
            self.world.rigid_body_count()
        );
        Ok(ReferenceScene {
            ground: ground.render_id,
            pillow,
        })
    }

    /// Dedup `soup`, associate it, build the soft body and start tracking it.
    pub fn create_soft_volume(
        &mut self,
        soup: &TriangleSoupMesh,
        config: &SoftVolumeConfig,
    ) -> Result<RenderObjectId, SimError> {
        let Deduplicated { mesh, classes } = dedup_with_classes(soup)?;
        let mut association = VertexAssociation::from_classes(&classes, mesh.vertex_count());

        if let Err(err) = association.check_coverage() {
            if cfg!(debug_assertions) {
                return Err(err.into());
            }
            warn!("{err}; keeping first assignments only");
            association.retain_first_assignment();
        }

        let mut body = SoftBody::from_tri_mesh(&mesh);
        {
            let c = body.config_mut();
            c.velocity_iterations = config.velocity_iterations;
            c.position_iterations = config.position_iterations;
            c.collisions = config.collisions;
            c.friction = config.friction;
            c.damping = config.damping;
            c.pressure = config.pressure;
        }
        {
            let m = body.material_mut();
            m.linear_stiffness = config.linear_stiffness;
            m.angular_stiffness = config.angular_stiffness;
        }
        body.set_total_mass(config.mass);
        body.set_margin(config.margin);
        if config.disable_deactivation {
            body.set_activation_state(ActivationState::DisableDeactivation);
        }

        let handle = self
            .world
            .add_soft_body(body, config.collision_group, config.collision_mask);
        let render_id = self.allocate_render_id();
        debug!(
            "soft volume {render_id:?}: {} soup -> {} unique vertices",
            soup.len(),
            mesh.vertex_count()
        );

        self.soft_volumes.push(TrackedSoftVolume {
            render_id,
            body: handle,
            association,
            buffers: VolumeBuffers::new(soup.positions(), soup.flat_normals()),
        });
        Ok(render_id)
    }

    /// Insert a rigid body. Dynamic bodies are tracked for pose sync and, given a
    /// lifetime, removed once it elapses.
    pub fn create_rigid_body(
        &mut self,
        desc: &RigidBodyDesc,
        lifetime: Option<Duration>,
    ) -> RigidObjectIds {
        let body = self.world.add_rigid_body(desc);
        let render_id = self.allocate_render_id();

        if !desc.is_fixed() {
            self.rigid_objects.push(TrackedRigidObject {
                render_id,
                body,
                pose: Pose::new(desc.translation, desc.rotation),
                expires_at: lifetime.map(|l| self.clock.saturating_add(l)),
            });
        }
        RigidObjectIds { render_id, body }
    }

    /// Axis-aligned box from its full extents. Mass 0 makes it static.
    pub fn create_box(
        &mut self,
        size: Vector3<f32>,
        mass: f32,
        translation: Vector3<f32>,
    ) -> RigidObjectIds {
        self.create_rigid_body(
            &RigidBodyDesc::new(ShapeDef::cuboid(size), mass, translation),
            None,
        )
    }

    /// Remove a tracked rigid object from the world and from tracking.
    pub fn remove_rigid_object(&mut self, render_id: RenderObjectId) -> bool {
        let Some(pos) = self
            .rigid_objects
            .iter()
            .position(|o| o.render_id == render_id)
        else {
            return false;
        };
        let object = self.rigid_objects.swap_remove(pos);
        self.world.remove_rigid_body(object.body)
    }

    pub fn on_input_down(&mut self) {
        self.spawner.request();
    }

    pub fn on_frame(&mut self, dt: f32) -> FrameReport {
        if dt.is_finite() && dt > 0.0 {
            let elapsed = Duration::try_from_secs_f32(dt).unwrap_or(Duration::MAX);
            self.clock = self.clock.saturating_add(elapsed);
        }
        let sub_steps = self
            .world
            .step_simulation(dt, self.world_config.max_sub_steps);

        let expired = self.sweep_expired();

        sync_soft_bodies(&self.world, &mut self.soft_volumes);
        sync_rigid_bodies(&self.world, &mut self.rigid_objects);

        let spawned = self.process_spawn();

        FrameReport {
            sub_steps,
            expired,
            spawned,
        }
    }

    fn sweep_expired(&mut self) -> Vec<RenderObjectId> {
        let now = self.clock;
        let mut expired = Vec::new();
        let world = &mut self.world;
        self.rigid_objects.retain(|object| {
            if !object.is_expired(now) {
                return true;
            }
            world.remove_rigid_body(object.body);
            expired.push(object.render_id);
            false
        });
        expired
    }

    fn process_spawn(&mut self) -> Option<RenderObjectId> {
        let request = self.spawner.take_pending()?;
        let desc = RigidBodyDesc::new(
            ShapeDef::sphere(self.projectile.radius),
            self.projectile.mass,
            request.translation,
        )
        .with_friction(self.projectile.friction);

        let ids = self.create_rigid_body(&desc, Some(self.projectile.lifetime));
        self.world.set_linear_velocity(ids.body, request.velocity);
        debug!("projectile {:?} at {:?}", ids.render_id, request.translation);
        Some(ids.render_id)
    }
}
