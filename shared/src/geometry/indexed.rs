use nalgebra::Point3;

/// A mesh of unique vertex positions plus triangle index triples.
///
/// Invariant: no two vertices are within [`crate::constants::VERTEX_EPSILON`] of each other on
/// every axis. Only the deduplicator constructs these.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexedMesh {
    vertices: Vec<Point3<f32>>,
    triangles: Vec<[u32; 3]>,
}

impl IndexedMesh {
    pub(crate) fn from_parts(vertices: Vec<Point3<f32>>, triangles: Vec<[u32; 3]>) -> Self {
        debug_assert!(
            triangles
                .iter()
                .flatten()
                .all(|&i| (i as usize) < vertices.len())
        );
        Self {
            vertices,
            triangles,
        }
    }

    pub fn vertices(&self) -> &[Point3<f32>] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Corner positions of triangle `t`, in the original winding order.
    pub fn triangle_positions(&self, t: usize) -> Option<[Point3<f32>; 3]> {
        let [a, b, c] = *self.triangles.get(t)?;
        Some([
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ])
    }
}
