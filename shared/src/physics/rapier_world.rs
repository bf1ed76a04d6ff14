//! Rapier-backed [`PhysicsWorld`].
//!
//! Owns the full rapier pipeline plus the soft bodies. A sub-step runs rapier first,
//! then every soft body against the updated collider poses, then hands the soft
//! bodies' contact reactions back to the dynamic rigid bodies.

use log::{debug, trace};
use nalgebra::{Isometry3, Vector3};
use rapier3d::na::Translation3;
use rapier3d::parry::bounding_volume::BoundingVolume;
use rapier3d::prelude::*;

use super::soft_body::ContactImpulse;
use super::{
    FixedStepper, PhysicsWorld, RigidBodyDesc, SoftBody, SoftBodyHandle, SoftNode,
    collider_from_shape,
};
use crate::config::WorldConfig;

struct SoftEntry {
    body: SoftBody,
    group: u32,
    mask: u32,
}

impl SoftEntry {
    fn interacts_with(&self, other: &SoftEntry) -> bool {
        self.group & other.mask != 0 && other.group & self.mask != 0
    }
}

pub struct RapierWorld {
    gravity: Vector<f32>,
    params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    soft: Vec<SoftEntry>,
    stepper: FixedStepper,
}

impl RapierWorld {
    pub fn new(config: &WorldConfig) -> Self {
        Self {
            gravity: config.gravity,
            params: IntegrationParameters {
                dt: config.fixed_time_step,
                ..IntegrationParameters::default()
            },
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            soft: Vec::new(),
            stepper: FixedStepper::new(config.fixed_time_step),
        }
    }

    pub fn bodies(&self) -> &RigidBodySet {
        &self.bodies
    }

    pub fn colliders(&self) -> &ColliderSet {
        &self.colliders
    }

    fn sub_step(&mut self, h: f32) {
        self.params.dt = h;
        self.pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &(),
        );

        self.wake_touched_soft_bodies();

        for entry in &mut self.soft {
            entry.body.predict(h, &self.gravity);
        }

        let mut impulses: Vec<ContactImpulse> = Vec::new();
        for entry in &mut self.soft {
            impulses.extend(entry.body.collide_rigid(&self.colliders, &self.bodies, h));
        }

        for i in 0..self.soft.len() {
            let (head, tail) = self.soft.split_at_mut(i + 1);
            let a = &mut head[i];
            for b in tail.iter_mut() {
                if a.interacts_with(b) {
                    SoftBody::collide_soft(&mut a.body, &mut b.body);
                }
            }
        }

        for entry in &mut self.soft {
            entry.body.finish(h);
        }

        for contact in impulses {
            if let Some(body) = self.bodies.get_mut(contact.body) {
                body.apply_impulse_at_point(contact.impulse, contact.point, true);
            }
        }
    }

    /// A sleeping soft body wakes when any dynamic collider enters its bounds.
    fn wake_touched_soft_bodies(&mut self) {
        for entry in self.soft.iter_mut().filter(|e| e.body.is_sleeping()) {
            let bounds = *entry.body.aabb();
            let touched = self.colliders.iter().any(|(_, c)| {
                c.parent()
                    .and_then(|h| self.bodies.get(h))
                    .is_some_and(|b| b.is_dynamic())
                    && c.compute_aabb().intersects(&bounds)
            });
            if touched {
                trace!("soft body woken by rigid contact");
                entry.body.wake_up();
            }
        }
    }
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new(&WorldConfig::default())
    }
}

impl PhysicsWorld for RapierWorld {
    fn step_simulation(&mut self, dt: f32, max_sub_steps: u32) -> u32 {
        let steps = self.stepper.advance(dt, max_sub_steps);
        for _ in 0..steps.count {
            self.sub_step(steps.dt);
        }
        steps.count
    }

    fn add_soft_body(&mut self, body: SoftBody, group: u32, mask: u32) -> SoftBodyHandle {
        let handle = SoftBodyHandle(self.soft.len());
        debug!(
            "soft body {}: {} nodes, group {group:#x}, mask {mask:#x}",
            handle.0,
            body.node_count()
        );
        self.soft.push(SoftEntry { body, group, mask });
        handle
    }

    fn soft_nodes(&self, handle: SoftBodyHandle) -> Option<&[SoftNode]> {
        self.soft.get(handle.0).map(|e| e.body.nodes())
    }

    fn soft_body(&self, handle: SoftBodyHandle) -> Option<&SoftBody> {
        self.soft.get(handle.0).map(|e| &e.body)
    }

    fn add_rigid_body(&mut self, desc: &RigidBodyDesc) -> RigidBodyHandle {
        let iso = Isometry::from_parts(Translation3::from(desc.translation), desc.rotation);

        let builder = if desc.is_fixed() {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic().can_sleep(false)
        };
        let handle = self.bodies.insert(builder.pose(iso).build());

        let mut collider = collider_from_shape(&desc.shape, desc.margin).friction(desc.friction);
        if !desc.is_fixed() {
            collider = collider.mass(desc.mass);
        }
        self.colliders
            .insert_with_parent(collider.build(), handle, &mut self.bodies);
        handle
    }

    fn remove_rigid_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    fn contains_rigid_body(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.contains(handle)
    }

    fn rigid_transform(&self, handle: RigidBodyHandle) -> Option<Isometry3<f32>> {
        self.bodies.get(handle).map(|b| {
            Isometry3::from_parts(Translation3::from(*b.translation()), *b.rotation())
        })
    }

    fn set_linear_velocity(&mut self, handle: RigidBodyHandle, velocity: Vector3<f32>) -> bool {
        match self.bodies.get_mut(handle) {
            Some(body) => {
                body.set_linvel(velocity, true);
                true
            }
            None => false,
        }
    }

    fn set_friction(&mut self, handle: RigidBodyHandle, friction: f32) -> bool {
        let Some(body) = self.bodies.get(handle) else {
            return false;
        };
        let attached: Vec<ColliderHandle> = body.colliders().to_vec();
        for h in attached {
            if let Some(c) = self.colliders.get_mut(h) {
                c.set_friction(friction);
            }
        }
        true
    }

    fn rigid_body_count(&self) -> usize {
        self.bodies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{TriangleSoupMesh, dedup};
    use crate::physics::ShapeDef;

    fn world() -> RapierWorld {
        RapierWorld::default()
    }

    fn ground(world: &mut RapierWorld) -> RigidBodyHandle {
        world.add_rigid_body(&RigidBodyDesc::new(
            ShapeDef::cuboid(vector![40.0, 1.0, 40.0]),
            0.0,
            vector![0.0, -0.5, 0.0],
        ))
    }

    #[test]
    fn sub_steps_are_bounded() {
        let mut w = world();
        assert_eq!(w.step_simulation(1000.0, 10), 10);
        assert_eq!(w.step_simulation(0.0, 10), 0);
        assert_eq!(w.step_simulation(0.05, 0), 1);
    }

    #[test]
    fn dynamic_ball_falls_and_lands() {
        let mut w = world();
        ground(&mut w);
        let ball = w.add_rigid_body(&RigidBodyDesc::new(
            ShapeDef::sphere(0.4),
            3.0,
            vector![0.0, 3.0, 0.0],
        ));
        for _ in 0..180 {
            w.step_simulation(1.0 / 60.0, 10);
        }
        let y = w.rigid_transform(ball).unwrap().translation.vector.y;
        assert!(y > 0.2 && y < 0.6, "ball resting at {y}");
    }

    #[test]
    fn fixed_body_stays_put() {
        let mut w = world();
        let g = ground(&mut w);
        for _ in 0..30 {
            w.step_simulation(1.0 / 60.0, 10);
        }
        let t = w.rigid_transform(g).unwrap().translation.vector;
        assert_eq!(t, vector![0.0, -0.5, 0.0]);
    }

    #[test]
    fn removed_body_is_gone() {
        let mut w = world();
        let ball = w.add_rigid_body(&RigidBodyDesc::new(
            ShapeDef::sphere(0.4),
            3.0,
            vector![0.0, 3.0, 0.0],
        ));
        assert!(w.contains_rigid_body(ball));
        assert!(w.remove_rigid_body(ball));
        assert!(!w.contains_rigid_body(ball));
        assert!(!w.remove_rigid_body(ball));
        assert!(w.rigid_transform(ball).is_none());
        assert!(!w.set_linear_velocity(ball, vector![0.0, 1.0, 0.0]));
        assert_eq!(w.colliders().len(), 0);
    }

    #[test]
    fn velocity_and_friction_apply_to_live_bodies() {
        let mut w = world();
        let ball = w.add_rigid_body(&RigidBodyDesc::new(
            ShapeDef::sphere(0.4),
            3.0,
            vector![0.0, 3.0, 0.0],
        ));
        assert!(w.set_linear_velocity(ball, vector![0.0, -14.0, 0.0]));
        assert!(w.set_friction(ball, 0.9));
        let body = w.bodies().get(ball).unwrap();
        assert_eq!(body.linvel().y, -14.0);
        let collider = w.colliders().get(body.colliders()[0]).unwrap();
        assert_eq!(collider.friction(), 0.9);
    }

    #[test]
    fn soft_body_lands_on_ground() {
        let mut w = world();
        ground(&mut w);
        let soup = TriangleSoupMesh::subdivided_box(vector![1.0, 1.0, 1.0], [2, 2, 2])
            .translated(vector![0.0, 2.0, 0.0]);
        let mut body = SoftBody::from_tri_mesh(&dedup(&soup).unwrap());
        body.config_mut().position_iterations = 10;
        let h = w.add_soft_body(body, 1, u32::MAX);

        for _ in 0..120 {
            w.step_simulation(1.0 / 60.0, 10);
        }
        let lowest = w
            .soft_nodes(h)
            .unwrap()
            .iter()
            .map(|n| n.position.y)
            .fold(f32::INFINITY, f32::min);
        assert!(lowest > -0.01 && lowest < 1.0, "lowest node at {lowest}");
    }

    #[test]
    fn unknown_soft_handle_is_none() {
        let w = world();
        assert!(w.soft_nodes(SoftBodyHandle(3)).is_none());
    }
}
