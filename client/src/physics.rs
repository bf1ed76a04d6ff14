//! Frame driver and presentation of simulated state.
//!
//! The simulation context lives in a resource. Once per frame it is stepped; then the
//! synced soft-volume buffers are copied into their meshes and rigid poses into
//! transforms. Spawned and expired projectiles become entity spawns and despawns.

use bevy::{platform::collections::HashMap, prelude::*};
use shared::{RenderObjectId, SimulationContext};

use crate::convert;

pub(super) fn plugin(app: &mut App) {
    app.insert_resource(RenderObjectEntityMapping::default());
    app.add_systems(
        Update,
        (step, upload_soft_volumes, apply_rigid_poses)
            .chain()
            .in_set(SimulationSet),
    );
}

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimulationSet;

#[derive(Resource)]
pub struct Simulation(pub SimulationContext);

/// Ties simulation render ids to the entities drawing them.
#[derive(Resource, Default)]
pub struct RenderObjectEntityMapping(pub HashMap<RenderObjectId, Entity>);

/// Mesh driven by a soft volume's synced buffers.
#[derive(Component)]
pub struct SoftVolumeMesh {
    pub id: RenderObjectId,
    pub mesh: Handle<Mesh>,
}

/// Entity whose transform follows a tracked rigid body.
#[derive(Component)]
pub struct RigidObject(pub RenderObjectId);

#[derive(Resource)]
pub struct ProjectileAssets {
    pub mesh: Handle<Mesh>,
    pub material: Handle<StandardMaterial>,
}

fn step(
    mut commands: Commands,
    time: Res<Time>,
    mut sim: ResMut<Simulation>,
    mut mapping: ResMut<RenderObjectEntityMapping>,
    assets: Res<ProjectileAssets>,
) {
    let report = sim.0.on_frame(time.delta_secs());

    for id in &report.expired {
        if let Some(entity) = mapping.0.remove(id) {
            commands.entity(entity).despawn();
        }
    }

    let Some(id) = report.spawned else {
        return;
    };
    let Some(object) = sim.0.rigid_objects().iter().find(|o| o.render_id == id) else {
        warn!("spawned projectile {id:?} is not tracked");
        return;
    };
    let visibility = if sim.0.projectile_config().visible {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };
    let entity = commands
        .spawn((
            Name::new("Projectile"),
            RigidObject(id),
            Mesh3d(assets.mesh.clone()),
            MeshMaterial3d(assets.material.clone()),
            convert::transform(&object.pose),
            visibility,
        ))
        .id();
    mapping.0.insert(id, entity);
    debug!("projectile {id:?} -> {entity:?}");
}

fn upload_soft_volumes(
    mut sim: ResMut<Simulation>,
    mut meshes: ResMut<Assets<Mesh>>,
    targets: Query<&SoftVolumeMesh>,
) {
    for target in &targets {
        let Some(volume) = sim
            .0
            .soft_volumes_mut()
            .iter_mut()
            .find(|v| v.render_id == target.id)
        else {
            continue;
        };
        if !volume.buffers.take_dirty() {
            continue;
        }
        let Some(mesh) = meshes.get_mut(&target.mesh) else {
            continue;
        };
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, volume.buffers.positions.clone());
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, volume.buffers.normals.clone());
    }
}

fn apply_rigid_poses(
    sim: Res<Simulation>,
    mapping: Res<RenderObjectEntityMapping>,
    mut transforms: Query<&mut Transform, With<RigidObject>>,
) {
    for object in sim.0.rigid_objects() {
        let Some(&entity) = mapping.0.get(&object.render_id) else {
            continue;
        };
        if let Ok(mut tf) = transforms.get_mut(entity) {
            *tf = convert::transform(&object.pose);
        }
    }
}
