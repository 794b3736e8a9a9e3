//! Bounding volume hierarchy over a triangle mesh.
//!
//! The tree is built once per mesh and is read-only afterwards, so a single
//! [`Bvh`] can be shared (`&Bvh` or `Arc<Bvh>`) by any number of concurrent
//! queries without locking.
//!
//! ## Architecture
//! ```text
//! TriangleMesh -> build_bvh (SAH, flat arena) -> Bvh { nodes, triangles }
//!                                               |-> intersect_first (iterative stack)
//!                                               `-> GpuBvhData (bytemuck buffers)
//! ```

pub mod build;
pub mod gpu;
pub mod node;
pub mod query;

pub use build::{build_bvh, BvhOptions, SplitStrategy};
pub use gpu::GpuBvhData;
pub use node::{Aabb, BvhNode, PackedTriangle};
pub use query::{Hit, Ray};

use crate::mesh::TriangleMesh;

/// Upper bound on tree depth; also the traversal stack capacity.
pub const MAX_DEPTH: u32 = 64;

/// Built BVH: flat node array (index 0 = root) and the triangles it covers,
/// stored in leaf order.
#[derive(Debug, Clone)]
pub struct Bvh {
    pub(crate) nodes: Vec<BvhNode>,
    pub(crate) triangles: Vec<PackedTriangle>,
    pub(crate) depth: u32,
}

/// Summary of a built BVH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BvhStats {
    pub triangle_count: usize,
    pub node_count: usize,
    pub leaf_count: usize,
    pub max_leaf_size: u32,
    pub depth: u32,
}

impl Bvh {
    /// Build with default options (SAH, one triangle per leaf).
    pub fn build(mesh: &TriangleMesh) -> Self {
        build_bvh(mesh, &BvhOptions::default())
    }

    /// Build with explicit options.
    pub fn build_with(mesh: &TriangleMesh, options: &BvhOptions) -> Self {
        build_bvh(mesh, options)
    }

    /// Flat node array, root first.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Triangles in leaf order.
    pub fn triangles(&self) -> &[PackedTriangle] {
        &self.triangles
    }

    /// Bounds of the whole mesh.
    pub fn bounds(&self) -> Aabb {
        self.nodes[0].aabb()
    }

    /// Deepest leaf level (root = 0).
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn stats(&self) -> BvhStats {
        let leaves = self.nodes.iter().filter(|n| n.is_leaf());
        BvhStats {
            triangle_count: self.triangles.len(),
            node_count: self.nodes.len(),
            leaf_count: leaves.clone().count(),
            max_leaf_size: leaves.map(|n| n.count).max().unwrap_or(0),
            depth: self.depth,
        }
    }
}

impl std::fmt::Display for BvhStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} triangles, {} nodes ({} leaves, max {} tris/leaf), depth {}",
            self.triangle_count, self.node_count, self.leaf_count, self.max_leaf_size, self.depth
        )
    }
}
