//! nalgebra (simulation) -> glam (bevy) conversions.

use bevy::prelude::*;
use nalgebra::{UnitQuaternion, Vector3};
use shared::Pose;

pub fn vec3(v: &Vector3<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub fn quat(q: &UnitQuaternion<f32>) -> Quat {
    Quat::from_xyzw(q.i, q.j, q.k, q.w)
}

pub fn transform(pose: &Pose) -> Transform {
    Transform::from_translation(vec3(&pose.translation)).with_rotation(quat(&pose.rotation))
}
