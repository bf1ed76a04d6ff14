use rapier3d::prelude::*;

/// Collision shapes rigid bodies can be built from.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeDef {
    /// Oriented box with given half-extents (meters).
    Cuboid { half_extents: Vector<f32> },

    /// Sphere/ball (meters).
    Sphere { radius: f32 },
}

impl ShapeDef {
    /// Box from its full extents.
    pub fn cuboid(size: Vector<f32>) -> Self {
        ShapeDef::Cuboid {
            half_extents: size * 0.5,
        }
    }

    pub fn sphere(radius: f32) -> Self {
        ShapeDef::Sphere { radius }
    }
}

/// Start a collider for `shape` with a collision margin.
///
/// The collider is meant to be attached to a body, so its local transform is identity.
/// The margin becomes rapier's contact skin: contacts are generated that far outside
/// the geometric surface.
pub fn collider_from_shape(shape: &ShapeDef, margin: f32) -> ColliderBuilder {
    let builder = match shape {
        ShapeDef::Cuboid { half_extents } => {
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
        }
        ShapeDef::Sphere { radius } => ColliderBuilder::ball(*radius),
    };
    builder.contact_skin(margin.max(0.0))
}
