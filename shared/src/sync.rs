//! Physics state -> render state pull, run once per frame after stepping.

use log::{trace, warn};

use crate::physics::PhysicsWorld;
use crate::tracked::{Pose, TrackedRigidObject, TrackedSoftVolume};

/// Fan every node's position and normal out to all soup vertices in its bucket, then
/// mark the buffers for upload.
///
/// Cost is proportional to the total bucket entries, not to the node count. Volumes
/// whose body has vanished are left untouched.
pub fn sync_soft_bodies<W: PhysicsWorld + ?Sized>(world: &W, tracked: &mut [TrackedSoftVolume]) {
    for volume in tracked.iter_mut() {
        let Some(nodes) = world.soft_nodes(volume.body) else {
            warn!("soft body {} missing from world, skipping sync", volume.body.0);
            continue;
        };

        let buffers = &mut volume.buffers;
        if volume.association.original_len() != buffers.len() {
            warn!(
                "association built for {} vertices but mesh has {}, skipping sync",
                volume.association.original_len(),
                buffers.len()
            );
            continue;
        }

        for (node, bucket) in nodes.iter().zip(volume.association.buckets()) {
            let p = [node.position.x, node.position.y, node.position.z];
            let n = [node.normal.x, node.normal.y, node.normal.z];
            for &v in bucket {
                buffers.positions[v as usize] = p;
                buffers.normals[v as usize] = n;
            }
        }
        buffers.needs_upload = true;
    }
}

/// Copy each body's world transform into its tracked pose.
///
/// Bodies no longer in the world are skipped. Returns how many poses were written.
pub fn sync_rigid_bodies<W: PhysicsWorld + ?Sized>(
    world: &W,
    tracked: &mut [TrackedRigidObject],
) -> usize {
    let mut synced = 0;
    for object in tracked.iter_mut() {
        match world.rigid_transform(object.body) {
            Some(iso) => {
                object.pose = Pose::from(&iso);
                synced += 1;
            }
            None => trace!("rigid body {:?} gone, pose left stale", object.body),
        }
    }
    synced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{TriangleSoupMesh, VertexAssociation, dedup_with_classes};
    use crate::physics::scripted::ScriptedWorld;
    use crate::physics::{RigidBodyDesc, ShapeDef, SoftBody, SoftBodyHandle, SoftNode};
    use crate::tracked::{RenderObjectId, VolumeBuffers};
    use nalgebra::{Point3, UnitQuaternion, Vector3};
    use rapier3d::prelude::RigidBodyHandle;
    use std::time::Duration;

    fn tracked_cube(world: &mut ScriptedWorld) -> (TriangleSoupMesh, TrackedSoftVolume) {
        let soup = TriangleSoupMesh::subdivided_box(Vector3::new(1.0, 1.0, 1.0), [2, 2, 2]);
        let d = dedup_with_classes(&soup).unwrap();
        let body = world.add_soft_body(SoftBody::from_tri_mesh(&d.mesh), 1, u32::MAX);
        let volume = TrackedSoftVolume {
            render_id: RenderObjectId(0),
            body,
            association: VertexAssociation::from_classes(&d.classes, d.mesh.vertex_count()),
            buffers: VolumeBuffers::new(soup.positions(), soup.flat_normals()),
        };
        (soup, volume)
    }

    #[test]
    fn every_associated_vertex_receives_its_node_state() {
        let mut world = ScriptedWorld::default();
        let (_, mut volume) = tracked_cube(&mut world);

        // Synthetic node states, distinct per node.
        for (i, node) in world.soft_nodes[0].iter_mut().enumerate() {
            let f = i as f32;
            *node = SoftNode {
                position: Point3::new(f, 2.0 * f, -f),
                normal: Vector3::new(0.0, 0.0, 1.0 + f),
            };
        }
        volume.buffers.needs_upload = false;

        sync_soft_bodies(&world, std::slice::from_mut(&mut volume));

        assert!(volume.buffers.needs_upload);
        for (i, bucket) in volume.association.buckets().iter().enumerate() {
            let f = i as f32;
            for &v in bucket {
                assert_eq!(volume.buffers.positions[v as usize], [f, 2.0 * f, -f]);
                assert_eq!(volume.buffers.normals[v as usize], [0.0, 0.0, 1.0 + f]);
            }
        }
    }

    #[test]
    fn unassigned_soup_vertex_keeps_its_old_state() {
        let mut world = ScriptedWorld::default();
        let (soup, mut volume) = tracked_cube(&mut world);

        // Vertex 5 belongs to no bucket, as after a release-mode coverage repair.
        let d = dedup_with_classes(&soup).unwrap();
        let mut classes = d.classes.clone();
        classes[5] = u32::MAX;
        volume.association = VertexAssociation::from_classes(&classes, d.mesh.vertex_count());
        assert!(volume.association.check_coverage().is_err());

        for (i, node) in world.soft_nodes[0].iter_mut().enumerate() {
            let f = i as f32;
            *node = SoftNode {
                position: Point3::new(f, 20.0 + f, -f),
                normal: Vector3::new(0.0, 0.0, 7.0),
            };
        }
        let old_position = volume.buffers.positions[5];
        let old_normal = volume.buffers.normals[5];

        sync_soft_bodies(&world, std::slice::from_mut(&mut volume));

        assert!(volume.buffers.needs_upload);
        assert_eq!(volume.buffers.positions[5], old_position);
        assert_eq!(volume.buffers.normals[5], old_normal);
        let mut written = 0;
        for (i, bucket) in volume.association.buckets().iter().enumerate() {
            let f = i as f32;
            for &v in bucket {
                assert_eq!(volume.buffers.positions[v as usize], [f, 20.0 + f, -f]);
                assert_eq!(volume.buffers.normals[v as usize], [0.0, 0.0, 7.0]);
                written += 1;
            }
        }
        assert_eq!(written, soup.len() - 1);
    }

    #[test]
    fn missing_soft_body_is_skipped() {
        let mut world = ScriptedWorld::default();
        let (soup, mut volume) = tracked_cube(&mut world);
        volume.body = SoftBodyHandle(7);
        volume.buffers.needs_upload = false;

        sync_soft_bodies(&world, std::slice::from_mut(&mut volume));

        assert!(!volume.buffers.needs_upload);
        assert_eq!(volume.buffers.positions, soup.positions());
    }

    #[test]
    fn rigid_poses_follow_the_world_and_tolerate_removal() {
        let mut world = ScriptedWorld::default();
        let a = world.add_rigid_body(&RigidBodyDesc::new(
            ShapeDef::sphere(0.4),
            3.0,
            Vector3::new(1.0, 2.0, 3.0),
        ));
        let b = world.add_rigid_body(&RigidBodyDesc::new(
            ShapeDef::sphere(0.4),
            3.0,
            Vector3::new(-1.0, 2.0, 0.0),
        ));

        let stale = Pose::new(Vector3::zeros(), UnitQuaternion::identity());
        let object = |body: RigidBodyHandle, id: u64| TrackedRigidObject {
            render_id: RenderObjectId(id),
            body,
            pose: stale,
            expires_at: Some(Duration::from_millis(500)),
        };
        let mut tracked = vec![object(a, 1), object(b, 2)];

        let rotation = UnitQuaternion::from_euler_angles(0.3, 0.0, 0.0);
        world.rigid.get_mut(&a).unwrap().rotation = rotation;
        world.remove_rigid_body(b);

        assert_eq!(sync_rigid_bodies(&world, &mut tracked), 1);
        assert_eq!(tracked[0].pose.translation, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(tracked[0].pose.rotation, rotation);
        assert_eq!(tracked[1].pose, stale);
    }
}
