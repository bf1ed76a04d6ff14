/*!
Soup-to-indexed mesh bridge.

- soup:        triangle-soup render mesh (duplicated corners, no index buffer)
- indexed:     deduplicated mesh fed to the soft-body simulator
- quantize:    spatial hash used to keep both passes near-linear
- dedup:       soup -> indexed, plus the shared equality predicate
- association: unique vertex -> soup vertices, replayed by the per-frame sync
*/

pub mod association;
pub mod dedup;
pub mod indexed;
pub mod quantize;
pub mod soup;

pub use association::{VertexAssociation, build_association, build_association_hashed};
pub use dedup::{Deduplicated, dedup, dedup_with_classes, is_equal};
pub use indexed::IndexedMesh;
pub use quantize::PointGrid;
pub use soup::TriangleSoupMesh;
