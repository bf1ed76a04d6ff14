pub mod bitmask_flags;
pub mod config;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod physics;
pub mod simulation;
pub mod spawn;
pub mod sync;
pub mod tracked;

// Downstream crates reach rapier/nalgebra types through here.
pub use rapier3d;

pub use bitmask_flags::{CollisionFlag, CollisionFlags};
pub use config::{ProjectileConfig, SceneConfig, SoftVolumeConfig, WorldConfig};
pub use error::{AssociationCoverageError, MalformedMeshError, SimError};
pub use geometry::{IndexedMesh, TriangleSoupMesh, VertexAssociation};
pub use physics::{PhysicsWorld, RapierWorld, RigidBodyDesc, ShapeDef};
pub use simulation::{FrameReport, ReferenceScene, RigidObjectIds, SimulationContext};
pub use tracked::{Pose, RenderObjectId, TrackedRigidObject, TrackedSoftVolume, VolumeBuffers};
