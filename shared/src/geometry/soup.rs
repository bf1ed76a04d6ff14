use nalgebra::{Point3, Vector3};

use crate::error::MalformedMeshError;

/// A mesh where every three consecutive vertices form one triangle.
///
/// There is no index buffer: a geometric corner shared by several triangles appears
/// once per triangle. This is the layout the renderer draws, with one position/normal
/// slot per corner.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriangleSoupMesh {
    vertices: Vec<Point3<f32>>,
}

impl TriangleSoupMesh {
    /// Wrap a vertex list. Validation is deferred to [`TriangleSoupMesh::validate`] so
    /// callers can inspect malformed input before rejecting it.
    pub fn new(vertices: Vec<Point3<f32>>) -> Self {
        Self { vertices }
    }

    pub fn from_positions(positions: &[[f32; 3]]) -> Self {
        Self::new(positions.iter().map(|p| Point3::from(*p)).collect())
    }

    pub fn vertices(&self) -> &[Point3<f32>] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Triangles as corner triples, in buffer order.
    pub fn triangles(&self) -> impl Iterator<Item = [Point3<f32>; 3]> + '_ {
        self.vertices.chunks_exact(3).map(|c| [c[0], c[1], c[2]])
    }

    /// Reject meshes the deduplicator cannot process.
    pub fn validate(&self) -> Result<(), MalformedMeshError> {
        if self.vertices.is_empty() {
            return Err(MalformedMeshError::Empty);
        }
        if self.vertices.len() % 3 != 0 {
            return Err(MalformedMeshError::VertexCountNotMultipleOfThree {
                count: self.vertices.len(),
            });
        }
        if let Some(index) = self
            .vertices
            .iter()
            .position(|v| !(v.x.is_finite() && v.y.is_finite() && v.z.is_finite()))
        {
            return Err(MalformedMeshError::NonFiniteVertex { index });
        }
        Ok(())
    }

    /// Same mesh moved by `offset`.
    pub fn translated(mut self, offset: Vector3<f32>) -> Self {
        for v in &mut self.vertices {
            *v += offset;
        }
        self
    }

    /// Positions in the flat `[x, y, z]` layout GPU buffers use.
    pub fn positions(&self) -> Vec<[f32; 3]> {
        self.vertices.iter().map(|v| [v.x, v.y, v.z]).collect()
    }

    /// One normal per vertex, equal to its triangle's face normal.
    ///
    /// Degenerate triangles get a zero normal.
    pub fn flat_normals(&self) -> Vec<[f32; 3]> {
        let mut out = Vec::with_capacity(self.vertices.len());
        for [a, b, c] in self.triangles() {
            let n = (b - a).cross(&(c - a));
            let n = n.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros);
            out.extend([[n.x, n.y, n.z]; 3]);
        }
        out
    }

    /// An axis-aligned box centred on the origin, each face split into a grid of quads.
    ///
    /// `segments` gives the number of divisions along X, Y and Z. Triangles wind
    /// counter-clockwise seen from outside. Corners on face seams are duplicated, which
    /// is exactly what makes the soup-to-indexed bridge necessary.
    pub fn subdivided_box(size: Vector3<f32>, segments: [u32; 3]) -> Self {
        // (normal axis, sign, u axis, v axis) with u x v pointing along the outward normal.
        const FACES: [(usize, f32, usize, usize); 6] = [
            (0, 1.0, 1, 2),
            (0, -1.0, 2, 1),
            (1, 1.0, 2, 0),
            (1, -1.0, 0, 2),
            (2, 1.0, 0, 1),
            (2, -1.0, 1, 0),
        ];

        let segs = segments.map(|s| s.max(1));
        let mut vertices = Vec::new();

        for (axis, sign, u_axis, v_axis) in FACES {
            let (nu, nv) = (segs[u_axis], segs[v_axis]);
            let corner = |i: u32, j: u32| {
                let mut p = Point3::origin();
                p[axis] = sign * size[axis] * 0.5;
                p[u_axis] = (i as f32 / nu as f32 - 0.5) * size[u_axis];
                p[v_axis] = (j as f32 / nv as f32 - 0.5) * size[v_axis];
                p
            };

            for i in 0..nu {
                for j in 0..nv {
                    let a = corner(i, j);
                    let b = corner(i + 1, j);
                    let c = corner(i + 1, j + 1);
                    let d = corner(i, j + 1);
                    vertices.extend([a, b, c, a, c, d]);
                }
            }
        }

        Self { vertices }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_empty_and_ragged_meshes() {
        assert_eq!(
            TriangleSoupMesh::default().validate(),
            Err(MalformedMeshError::Empty)
        );

        let ragged = TriangleSoupMesh::from_positions(&[[0.0; 3], [1.0, 0.0, 0.0]]);
        assert_eq!(
            ragged.validate(),
            Err(MalformedMeshError::VertexCountNotMultipleOfThree { count: 2 })
        );
    }

    #[test]
    fn validate_rejects_nan() {
        let soup = TriangleSoupMesh::from_positions(&[
            [0.0, 0.0, 0.0],
            [1.0, f32::NAN, 0.0],
            [0.0, 1.0, 0.0],
        ]);
        assert_eq!(
            soup.validate(),
            Err(MalformedMeshError::NonFiniteVertex { index: 1 })
        );
    }

    #[test]
    fn subdivided_box_has_two_triangles_per_quad() {
        let soup = TriangleSoupMesh::subdivided_box(Vector3::new(5.0, 1.0, 3.0), [20, 4, 12]);
        // Quads per face pair: XY = 20*4, YZ = 4*12, ZX = 12*20.
        let quads = 2 * (20 * 4 + 4 * 12 + 12 * 20);
        assert_eq!(soup.triangle_count(), quads * 2);
        assert!(soup.validate().is_ok());
    }

    #[test]
    fn subdivided_box_faces_point_outward() {
        let soup = TriangleSoupMesh::subdivided_box(Vector3::new(2.0, 2.0, 2.0), [2, 2, 2]);
        let normals = soup.flat_normals();
        for (v, n) in soup.vertices().iter().zip(normals.iter()) {
            let n = Vector3::from(*n);
            // Every corner lies on the surface of the centred box, so the outward face
            // normal never points back toward the centre.
            assert!(v.coords.dot(&n) > 0.0, "inward normal at {v:?}");
        }
    }

    #[test]
    fn translated_moves_every_vertex() {
        let soup = TriangleSoupMesh::from_positions(&[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])
            .translated(Vector3::new(0.0, 2.0, 0.0));
        assert_eq!(soup.positions()[1], [1.0, 2.0, 0.0]);
    }
}
