//! In-memory [`PhysicsWorld`] whose state tests set directly.

use nalgebra::{Isometry3, Translation3, Vector3};
use rapier3d::prelude::RigidBodyHandle;
use rustc_hash::FxHashMap;

use super::{PhysicsWorld, RigidBodyDesc, SoftBody, SoftBodyHandle, SoftNode};

#[derive(Default)]
pub(crate) struct ScriptedWorld {
    pub soft_bodies: Vec<SoftBody>,
    pub soft_groups: Vec<(u32, u32)>,
    /// What `soft_nodes` reports; seeded from the body, overwritable by tests.
    pub soft_nodes: Vec<Vec<SoftNode>>,
    pub rigid: FxHashMap<RigidBodyHandle, Isometry3<f32>>,
    pub velocities: FxHashMap<RigidBodyHandle, Vector3<f32>>,
    pub added: Vec<RigidBodyDesc>,
    pub step_calls: Vec<(f32, u32)>,
    next_index: u32,
}

impl PhysicsWorld for ScriptedWorld {
    fn step_simulation(&mut self, dt: f32, max_sub_steps: u32) -> u32 {
        self.step_calls.push((dt, max_sub_steps));
        max_sub_steps.min(1)
    }

    fn add_soft_body(&mut self, body: SoftBody, group: u32, mask: u32) -> SoftBodyHandle {
        self.soft_nodes.push(body.nodes().to_vec());
        self.soft_bodies.push(body);
        self.soft_groups.push((group, mask));
        SoftBodyHandle(self.soft_bodies.len() - 1)
    }

    fn soft_nodes(&self, handle: SoftBodyHandle) -> Option<&[SoftNode]> {
        self.soft_nodes.get(handle.0).map(Vec::as_slice)
    }

    fn soft_body(&self, handle: SoftBodyHandle) -> Option<&SoftBody> {
        self.soft_bodies.get(handle.0)
    }

    fn add_rigid_body(&mut self, desc: &RigidBodyDesc) -> RigidBodyHandle {
        let handle = RigidBodyHandle::from_raw_parts(self.next_index, 0);
        self.next_index += 1;
        self.rigid.insert(
            handle,
            Isometry3::from_parts(Translation3::from(desc.translation), desc.rotation),
        );
        self.added.push(desc.clone());
        handle
    }

    fn remove_rigid_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.velocities.remove(&handle);
        self.rigid.remove(&handle).is_some()
    }

    fn contains_rigid_body(&self, handle: RigidBodyHandle) -> bool {
        self.rigid.contains_key(&handle)
    }

    fn rigid_transform(&self, handle: RigidBodyHandle) -> Option<Isometry3<f32>> {
        self.rigid.get(&handle).copied()
    }

    fn set_linear_velocity(&mut self, handle: RigidBodyHandle, velocity: Vector3<f32>) -> bool {
        if !self.rigid.contains_key(&handle) {
            return false;
        }
        self.velocities.insert(handle, velocity);
        true
    }

    fn set_friction(&mut self, handle: RigidBodyHandle, _friction: f32) -> bool {
        self.rigid.contains_key(&handle)
    }

    fn rigid_body_count(&self) -> usize {
        self.rigid.len()
    }
}
