use log::debug;
use nalgebra::Point3;

use super::{IndexedMesh, PointGrid, TriangleSoupMesh};
use crate::constants::VERTEX_EPSILON;
use crate::error::MalformedMeshError;

/// Positional equality used by every stage of the soup-to-indexed bridge.
///
/// Strictly less than [`VERTEX_EPSILON`] on all three axes. Dedup and association must
/// share this predicate or the association silently stops matching the mesh.
#[inline]
pub fn is_equal(a: &Point3<f32>, b: &Point3<f32>) -> bool {
    (a.x - b.x).abs() < VERTEX_EPSILON
        && (a.y - b.y).abs() < VERTEX_EPSILON
        && (a.z - b.z).abs() < VERTEX_EPSILON
}

/// Result of deduplication plus the equivalence class of every soup vertex.
#[derive(Clone, Debug)]
pub struct Deduplicated {
    pub mesh: IndexedMesh,
    /// `classes[v]` is the unique vertex that soup vertex `v` was merged into.
    pub classes: Vec<u32>,
}

/// Merge spatially coincident vertices of a triangle soup into an indexed mesh.
///
/// Unique vertices are emitted in first-seen order and every triangle keeps its corner
/// order, so winding is preserved.
pub fn dedup(soup: &TriangleSoupMesh) -> Result<IndexedMesh, MalformedMeshError> {
    dedup_with_classes(soup).map(|d| d.mesh)
}

/// [`dedup`], also returning the soup-to-unique class map.
///
/// A soup vertex joins the lowest-indexed existing unique vertex it [`is_equal`] to,
/// which is what a linear first-seen scan would pick. The grid only narrows the search.
pub fn dedup_with_classes(soup: &TriangleSoupMesh) -> Result<Deduplicated, MalformedMeshError> {
    soup.validate()?;

    let mut unique: Vec<Point3<f32>> = Vec::new();
    let mut classes = Vec::with_capacity(soup.len());
    let mut grid = PointGrid::new(VERTEX_EPSILON);

    for v in soup.vertices() {
        let found = grid.first_match(v, |i| is_equal(&unique[i as usize], v));
        let class = match found {
            Some(existing) => existing,
            None => {
                let index = unique.len() as u32;
                grid.insert(v, index);
                unique.push(*v);
                index
            }
        };
        classes.push(class);
    }

    let triangles = classes
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect::<Vec<_>>();

    debug!(
        "dedup: {} soup vertices -> {} unique, {} triangles",
        soup.len(),
        unique.len(),
        triangles.len()
    );

    Ok(Deduplicated {
        mesh: IndexedMesh::from_parts(unique, triangles),
        classes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    /// Reference first-seen linear scan.
    fn dedup_linear(soup: &TriangleSoupMesh) -> (Vec<Point3<f32>>, Vec<u32>) {
        let mut unique: Vec<Point3<f32>> = Vec::new();
        let mut classes = Vec::new();
        for v in soup.vertices() {
            match unique.iter().position(|u| is_equal(u, v)) {
                Some(i) => classes.push(i as u32),
                None => {
                    classes.push(unique.len() as u32);
                    unique.push(*v);
                }
            }
        }
        (unique, classes)
    }

    fn quad() -> TriangleSoupMesh {
        TriangleSoupMesh::from_positions(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ])
    }

    #[test]
    fn shared_corners_merge_in_first_seen_order() {
        let mesh = dedup(&quad()).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangles(), &[[0, 1, 2], [0, 2, 3]]);
        assert_eq!(mesh.vertices()[3], Point3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn reconstructed_triangles_match_the_soup() {
        let soup = TriangleSoupMesh::subdivided_box(Vector3::new(5.0, 1.0, 3.0), [20, 4, 12])
            .translated(Vector3::new(0.0, 2.0, 0.0));
        let mesh = dedup(&soup).unwrap();

        for (t, original) in soup.triangles().enumerate() {
            assert_eq!(mesh.triangle_positions(t), Some(original));
        }
    }

    #[test]
    fn unique_vertices_are_pairwise_distinct() {
        let soup = TriangleSoupMesh::subdivided_box(Vector3::new(1.0, 1.0, 1.0), [3, 3, 3]);
        let mesh = dedup(&soup).unwrap();
        let vs = mesh.vertices();
        for i in 0..vs.len() {
            for j in (i + 1)..vs.len() {
                assert!(!is_equal(&vs[i], &vs[j]), "{i} and {j} should have merged");
            }
        }
        // Closed grid box: 6 faces of 3x3 quads share seams; unique count is the surface
        // lattice size (n+1)^3 - (n-1)^3 for n = 3.
        assert_eq!(mesh.vertex_count(), 64 - 8);
    }

    #[test]
    fn every_soup_vertex_maps_to_an_equal_unique_vertex() {
        let soup = TriangleSoupMesh::subdivided_box(Vector3::new(2.0, 1.0, 3.0), [4, 2, 3]);
        let d = dedup_with_classes(&soup).unwrap();
        for (v, &class) in soup.vertices().iter().zip(d.classes.iter()) {
            assert!(is_equal(v, &d.mesh.vertices()[class as usize]));
        }
    }

    #[test]
    fn grid_dedup_matches_linear_scan() {
        // Near-coincident points within tolerance of more than one representative are
        // where a careless spatial hash would diverge from the scan.
        let soup = TriangleSoupMesh::from_positions(&[
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0000015],
            [0.0, 0.0, 0.0000007],
            [0.3, 0.3, 0.3],
            [0.3, 0.3, 0.3000005],
            [1.0, 0.0, 0.0],
        ]);
        let d = dedup_with_classes(&soup).unwrap();
        let (unique, classes) = dedup_linear(&soup);
        assert_eq!(d.mesh.vertices(), unique.as_slice());
        assert_eq!(d.classes, classes);
    }

    #[test]
    fn tolerance_boundary() {
        let merged = TriangleSoupMesh::from_positions(&[
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0000005],
            [1.0, 0.0, 0.0],
        ]);
        assert_eq!(dedup(&merged).unwrap().vertex_count(), 2);

        let distinct = TriangleSoupMesh::from_positions(&[
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 0.000002],
            [1.0, 0.0, 0.0],
        ]);
        assert_eq!(dedup(&distinct).unwrap().vertex_count(), 3);

        // Exactly one epsilon apart stays distinct.
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(0.0, 0.0, VERTEX_EPSILON);
        assert!(!is_equal(&a, &b));
    }

    #[test]
    fn malformed_input_is_rejected() {
        let two = TriangleSoupMesh::from_positions(&[[0.0; 3], [1.0, 0.0, 0.0]]);
        assert_eq!(
            dedup(&two),
            Err(MalformedMeshError::VertexCountNotMultipleOfThree { count: 2 })
        );
        assert_eq!(
            dedup(&TriangleSoupMesh::default()),
            Err(MalformedMeshError::Empty)
        );
    }
}
