//! Many-to-one map from unique (simulation) vertices back to soup (render) vertices.
//!
//! A soft body simulates one node per unique vertex, but the renderer draws the soup,
//! where a node's position lives in several slots. The association is built once and
//! replayed every frame to fan node state out to all of them.

use log::warn;

use super::dedup::is_equal;
use super::{IndexedMesh, PointGrid, TriangleSoupMesh};
use crate::constants::VERTEX_EPSILON;
use crate::error::AssociationCoverageError;

/// For each unique vertex, the soup vertex indices that coincide with it.
///
/// Buckets list soup indices in ascending order. When coverage holds, every soup index
/// appears in exactly one bucket.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexAssociation {
    buckets: Vec<Vec<u32>>,
    original_len: usize,
}

impl VertexAssociation {
    /// Derive buckets straight from dedup's equivalence classes.
    ///
    /// Consistent with the mesh by construction: no second equality pass is involved.
    /// A class outside `0..unique_count` leaves its soup vertex unassigned, which
    /// [`VertexAssociation::check_coverage`] then reports.
    pub fn from_classes(classes: &[u32], unique_count: usize) -> Self {
        let mut buckets = vec![Vec::new(); unique_count];
        for (v, &class) in classes.iter().enumerate() {
            match buckets.get_mut(class as usize) {
                Some(bucket) => bucket.push(v as u32),
                None => warn!("association: soup vertex {v} has unknown class {class}"),
            }
        }
        Self {
            buckets,
            original_len: classes.len(),
        }
    }

    /// Soup vertices driven by unique vertex `node`.
    pub fn bucket(&self, node: usize) -> &[u32] {
        self.buckets.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn buckets(&self) -> &[Vec<u32>] {
        &self.buckets
    }

    /// Number of unique vertices (buckets).
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Number of soup vertices the association was built against.
    pub fn original_len(&self) -> usize {
        self.original_len
    }

    /// Total bucket entries, i.e. the per-frame write count of a sync.
    pub fn entry_count(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    /// Check that every soup vertex sits in exactly one bucket.
    ///
    /// Reports the lowest offending soup vertex.
    pub fn check_coverage(&self) -> Result<(), AssociationCoverageError> {
        let counts = self.assignment_counts();
        match counts.iter().enumerate().find(|(_, c)| **c != 1) {
            None => Ok(()),
            Some((vertex, &0)) => Err(AssociationCoverageError::Unassigned { vertex }),
            Some((vertex, &buckets)) => {
                Err(AssociationCoverageError::MultiplyAssigned { vertex, buckets })
            }
        }
    }

    /// Keep each soup vertex only in the lowest-indexed bucket that claims it.
    ///
    /// Unassigned vertices stay unassigned; they simply never get synced. Returns the
    /// number of entries removed.
    pub fn retain_first_assignment(&mut self) -> usize {
        let mut seen = vec![false; self.original_len];
        let mut removed = 0;
        for bucket in &mut self.buckets {
            bucket.retain(|&v| {
                let slot = &mut seen[v as usize];
                if *slot {
                    removed += 1;
                    false
                } else {
                    *slot = true;
                    true
                }
            });
        }
        if removed > 0 {
            warn!("association: dropped {removed} duplicate vertex assignments");
        }
        removed
    }

    fn assignment_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.original_len];
        for &v in self.buckets.iter().flatten() {
            counts[v as usize] += 1;
        }
        counts
    }
}

/// Associate each unique vertex with every soup vertex equal to it.
///
/// Straight O(unique x soup) scan. Fine for meshes of a few thousand vertices; see
/// [`build_association_hashed`] for larger ones.
pub fn build_association(soup: &TriangleSoupMesh, indexed: &IndexedMesh) -> VertexAssociation {
    let buckets = indexed
        .vertices()
        .iter()
        .map(|u| {
            soup.vertices()
                .iter()
                .enumerate()
                .filter(|(_, v)| is_equal(u, v))
                .map(|(j, _)| j as u32)
                .collect()
        })
        .collect();

    VertexAssociation {
        buckets,
        original_len: soup.len(),
    }
}

/// Same buckets as [`build_association`], using a quantized grid over the unique
/// vertices so each soup vertex only tests its neighbourhood.
pub fn build_association_hashed(
    soup: &TriangleSoupMesh,
    indexed: &IndexedMesh,
) -> VertexAssociation {
    let unique = indexed.vertices();
    let mut grid = PointGrid::new(VERTEX_EPSILON);
    for (i, u) in unique.iter().enumerate() {
        grid.insert(u, i as u32);
    }

    let mut buckets = vec![Vec::new(); unique.len()];
    // Soup vertices are visited in ascending order, so buckets come out sorted just
    // like the scan's.
    for (j, v) in soup.vertices().iter().enumerate() {
        for i in grid.all_matches(v, |i| is_equal(&unique[i as usize], v)) {
            buckets[i as usize].push(j as u32);
        }
    }

    VertexAssociation {
        buckets,
        original_len: soup.len(),
    }
}
