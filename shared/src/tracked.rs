//! Physics/render pairings walked by the per-frame sync.

use std::time::Duration;

use nalgebra::{Isometry3, UnitQuaternion, Vector3};
use rapier3d::prelude::RigidBodyHandle;

use crate::geometry::VertexAssociation;
use crate::physics::SoftBodyHandle;

/// Identifies the render object a tracked body drives.
///
/// Allocated by the simulation context; the presentation layer maps it to whatever its
/// scene graph uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderObjectId(pub u64);

/// Render-facing pose of a rigid object.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub translation: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl Pose {
    pub fn new(translation: Vector3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        Self {
            translation,
            rotation,
        }
    }
}

impl From<&Isometry3<f32>> for Pose {
    fn from(iso: &Isometry3<f32>) -> Self {
        Self {
            translation: iso.translation.vector,
            rotation: iso.rotation,
        }
    }
}

/// CPU-side position and normal buffers of a soup render mesh.
///
/// `needs_upload` is raised by sync and cleared by whoever copies the buffers to the GPU.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VolumeBuffers {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub needs_upload: bool,
}

impl VolumeBuffers {
    pub fn new(positions: Vec<[f32; 3]>, normals: Vec<[f32; 3]>) -> Self {
        debug_assert_eq!(positions.len(), normals.len());
        Self {
            positions,
            normals,
            needs_upload: true,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Hand the dirty flag to the caller, clearing it.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.needs_upload)
    }
}

/// A soft body paired with the render mesh it drives.
#[derive(Clone, Debug)]
pub struct TrackedSoftVolume {
    pub render_id: RenderObjectId,
    pub body: SoftBodyHandle,
    pub association: VertexAssociation,
    pub buffers: VolumeBuffers,
}

/// A dynamic rigid body paired with the render object whose pose it drives.
#[derive(Clone, Debug)]
pub struct TrackedRigidObject {
    pub render_id: RenderObjectId,
    pub body: RigidBodyHandle,
    pub pose: Pose,
    /// Frame-clock time at which the object is removed; `None` lives forever.
    pub expires_at: Option<Duration>,
}

impl TrackedRigidObject {
    pub fn is_expired(&self, now: Duration) -> bool {
        self.expires_at.is_some_and(|t| now >= t)
    }
}
