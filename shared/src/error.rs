use thiserror::Error;

/// A triangle soup that cannot be turned into an indexed mesh.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedMeshError {
    #[error("mesh has no vertices")]
    Empty,

    #[error("vertex count {count} is not a multiple of three")]
    VertexCountNotMultipleOfThree { count: usize },

    #[error("vertex {index} has a non-finite coordinate")]
    NonFiniteVertex { index: usize },
}

/// The association buckets do not partition the original vertex set.
///
/// Either the epsilon predicates of dedup and association disagree, or the mesh has
/// near-coincident vertices that sit within tolerance of two distinct unique vertices.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssociationCoverageError {
    #[error("original vertex {vertex} is not assigned to any unique vertex")]
    Unassigned { vertex: usize },

    #[error("original vertex {vertex} is assigned to {buckets} unique vertices")]
    MultiplyAssigned { vertex: usize, buckets: usize },
}

/// Errors surfaced while building the scene.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    MalformedMesh(#[from] MalformedMeshError),

    #[error(transparent)]
    AssociationCoverage(#[from] AssociationCoverageError),
}
