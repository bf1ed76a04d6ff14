use bevy::{
    asset::RenderAssetUsages, camera::visibility::NoFrustumCulling, mesh::PrimitiveTopology,
    prelude::*,
};
use shared::{SceneConfig, SimulationContext, VolumeBuffers};

use crate::convert;
use crate::physics::{ProjectileAssets, RenderObjectEntityMapping, Simulation, SoftVolumeMesh};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(Startup, setup);
}

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut mapping: ResMut<RenderObjectEntityMapping>,
) -> Result {
    let config = SceneConfig::default();
    let (sim, scene) = SimulationContext::reference(&config)?;
    info!("World setup");

    let ground = commands
        .spawn((
            Name::new("Ground"),
            Transform::from_translation(convert::vec3(&config.ground_center)),
            Mesh3d(meshes.add(Cuboid::new(
                config.ground_size.x,
                config.ground_size.y,
                config.ground_size.z,
            ))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: Color::linear_rgb(0.2, 0.3, 0.25),
                perceptual_roughness: 1.0,
                metallic: 0.0,
                ..default()
            })),
        ))
        .id();
    mapping.0.insert(scene.ground, ground);

    for volume in sim.soft_volumes() {
        let mesh = meshes.add(volume_mesh(&volume.buffers));
        let entity = commands
            .spawn((
                Name::new("Pillow"),
                SoftVolumeMesh {
                    id: volume.render_id,
                    mesh: mesh.clone(),
                },
                Mesh3d(mesh),
                MeshMaterial3d(materials.add(Color::srgb_u8(124, 144, 255))),
                // Vertices move every frame; the mesh's initial bounds go stale.
                NoFrustumCulling,
                Transform::default(),
            ))
            .id();
        mapping.0.insert(volume.render_id, entity);
    }

    commands.insert_resource(ProjectileAssets {
        mesh: meshes.add(Sphere::new(config.projectile.radius).mesh().uv(18, 16)),
        material: materials.add(Color::srgb_u8(255, 140, 90)),
    });
    commands.insert_resource(Simulation(sim));

    commands.spawn((
        DirectionalLight {
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(-10.0, 10.0, 5.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        PointLight {
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(4.0, 8.0, 4.0),
    ));
    Ok(())
}

/// Non-indexed triangle list straight from the soup buffers.
fn volume_mesh(buffers: &VolumeBuffers) -> Mesh {
    Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
    )
    .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, buffers.positions.clone())
    .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, buffers.normals.clone())
}
