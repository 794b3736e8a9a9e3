//! SAH-based BVH builder.
//!
//! Constructs a flat BVH array from a triangle mesh. Uses the Surface Area
//! Heuristic for split decisions and produces a compact node array plus a
//! triangle arena in leaf order, ready for traversal or GPU upload.

use bytemuck::Zeroable;
use serde::{Deserialize, Serialize};

use super::node::{triangle_aabb, Aabb, BvhNode, PackedTriangle};
use super::{Bvh, MAX_DEPTH};
use crate::mesh::TriangleMesh;
use crate::util::Vec3;

/// Number of SAH bins for split evaluation.
const NUM_BINS: usize = 12;

/// Cost ratio: traversal vs intersection.
const TRAVERSAL_COST: f32 = 1.0;
const INTERSECT_COST: f32 = 1.0;

/// Below this depth splits follow the chosen strategy; deeper nodes use a
/// balanced median split so the tree never exceeds [`MAX_DEPTH`].
const STRATEGY_DEPTH_LIMIT: u32 = MAX_DEPTH - 33;

/// How candidate split planes are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitStrategy {
    /// Binned surface area heuristic over all three axes.
    #[default]
    Sah,
    /// Midpoint of the longest centroid axis.
    #[serde(alias = "centre")]
    Center,
}

impl std::str::FromStr for SplitStrategy {
    type Err = crate::util::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sah" => Ok(Self::Sah),
            "center" | "centre" => Ok(Self::Center),
            other => Err(crate::util::Error::InvalidConfig(format!(
                "unknown BVH strategy `{other}` (expected sah or center)"
            ))),
        }
    }
}

/// BVH construction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BvhOptions {
    pub strategy: SplitStrategy,
    /// Maximum triangles per leaf. One triangle per leaf keeps queries on
    /// faceted geometry exact; values below 1 are treated as 1.
    #[serde(alias = "maxLeafTris")]
    pub max_leaf_tris: usize,
}

impl Default for BvhOptions {
    fn default() -> Self {
        Self {
            strategy: SplitStrategy::Sah,
            max_leaf_tris: 1,
        }
    }
}

/// SAH bin for evaluating split candidates.
#[derive(Clone, Copy)]
struct Bin {
    bounds: Aabb,
    count: usize,
}

impl Bin {
    const EMPTY: Self = Self {
        bounds: Aabb::EMPTY,
        count: 0,
    };
}

/// Pending node: builds `node_idx` from `indices[start..end]`.
struct Task {
    node_idx: usize,
    start: usize,
    end: usize,
    depth: u32,
}

/// Build a BVH over every triangle of `mesh`.
#[tracing::instrument(skip_all, fields(tri_count = mesh.triangle_count()))]
pub fn build_bvh(mesh: &TriangleMesh, options: &BvhOptions) -> Bvh {
    let n = mesh.triangle_count();
    let max_leaf = options.max_leaf_tris.max(1);

    if n == 0 {
        return Bvh {
            nodes: vec![BvhNode::leaf(&Aabb::from_point(Vec3::ZERO), 0, 0)],
            triangles: Vec::new(),
            depth: 0,
        };
    }

    // Pre-compute AABBs and centroids
    let aabbs: Vec<Aabb> = (0..n).map(|i| triangle_aabb(&mesh.triangle_positions(i))).collect();
    let centroids: Vec<Vec3> = aabbs.iter().map(Aabb::centroid).collect();

    // Working index array (reordered by partitioning)
    let mut indices: Vec<usize> = (0..n).collect();

    // Full binary tree bound: 2n - 1 nodes
    let mut nodes: Vec<BvhNode> = Vec::with_capacity(2 * n - 1);
    nodes.push(BvhNode::zeroed());

    let mut max_depth = 0;
    let mut stack = vec![Task {
        node_idx: 0,
        start: 0,
        end: n,
        depth: 0,
    }];

    while let Some(task) = stack.pop() {
        let Task {
            node_idx,
            start,
            end,
            depth,
        } = task;
        let count = end - start;
        max_depth = max_depth.max(depth);

        let mut node_aabb = Aabb::EMPTY;
        for &idx in &indices[start..end] {
            node_aabb.grow(&aabbs[idx]);
        }

        if count <= max_leaf {
            nodes[node_idx] = BvhNode::leaf(&node_aabb, start as u32, count as u32);
            continue;
        }

        let mut centroid_bounds = Aabb::EMPTY;
        for &idx in &indices[start..end] {
            centroid_bounds.grow_point(centroids[idx]);
        }

        let split = if depth >= STRATEGY_DEPTH_LIMIT {
            None
        } else {
            match options.strategy {
                SplitStrategy::Sah => {
                    find_best_split(&indices[start..end], &aabbs, &centroids, &centroid_bounds)
                }
                SplitStrategy::Center => center_split(&centroid_bounds),
            }
        };

        let mid = match split {
            Some((axis, pos)) => {
                partition(&mut indices[start..end], |&idx| centroids[idx][axis] < pos) + start
            }
            None => start,
        };

        // Degenerate partition: median split along the longest centroid axis
        let mid = if mid == start || mid == end {
            let axis = centroid_bounds.longest_axis();
            let half = count / 2;
            indices[start..end].select_nth_unstable_by(half, |&a, &b| {
                centroids[a][axis]
                    .total_cmp(&centroids[b][axis])
                    .then(a.cmp(&b))
            });
            start + half
        } else {
            mid
        };

        let left_idx = nodes.len();
        nodes.push(BvhNode::zeroed());
        nodes.push(BvhNode::zeroed());
        nodes[node_idx] = BvhNode::internal(&node_aabb, left_idx as u32);

        // Push right first so left is processed first (depth-first)
        stack.push(Task {
            node_idx: left_idx + 1,
            start: mid,
            end,
            depth: depth + 1,
        });
        stack.push(Task {
            node_idx: left_idx,
            start,
            end: mid,
            depth: depth + 1,
        });
    }

    let triangles = indices
        .iter()
        .map(|&i| PackedTriangle::new(i as u32, mesh.triangle_positions(i), mesh.triangle_normals(i)))
        .collect();

    tracing::debug!(nodes = nodes.len(), depth = max_depth, "BVH built");

    Bvh {
        nodes,
        triangles,
        depth: max_depth,
    }
}

/// SAH binned split search across all 3 axes.
/// Returns (axis, split_position), or None if every axis is degenerate.
fn find_best_split(
    indices: &[usize],
    aabbs: &[Aabb],
    centroids: &[Vec3],
    centroid_bounds: &Aabb,
) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    let mut best_cost = f32::INFINITY;

    for axis in 0..3 {
        let extent = centroid_bounds.max[axis] - centroid_bounds.min[axis];
        if !(extent > 1e-8) {
            continue; // degenerate axis
        }

        let mut bins = [Bin::EMPTY; NUM_BINS];
        let inv_extent = NUM_BINS as f32 / extent;

        for &idx in indices {
            let bin_id = ((centroids[idx][axis] - centroid_bounds.min[axis]) * inv_extent) as usize;
            let bin_id = bin_id.min(NUM_BINS - 1);
            bins[bin_id].bounds.grow(&aabbs[idx]);
            bins[bin_id].count += 1;
        }

        // Sweep from left: prefix areas and counts
        let mut left_area = [0.0f32; NUM_BINS - 1];
        let mut left_count = [0usize; NUM_BINS - 1];
        let mut sweep = Aabb::EMPTY;
        let mut sweep_count = 0;
        for i in 0..NUM_BINS - 1 {
            sweep.grow(&bins[i].bounds);
            sweep_count += bins[i].count;
            left_area[i] = sweep.area();
            left_count[i] = sweep_count;
        }

        // Sweep from right and evaluate SAH cost
        sweep = Aabb::EMPTY;
        sweep_count = 0;
        for i in (1..NUM_BINS).rev() {
            sweep.grow(&bins[i].bounds);
            sweep_count += bins[i].count;
            if left_count[i - 1] == 0 || sweep_count == 0 {
                continue;
            }
            let cost = TRAVERSAL_COST
                + INTERSECT_COST
                    * (left_count[i - 1] as f32 * left_area[i - 1]
                        + sweep_count as f32 * sweep.area());

            if cost < best_cost {
                best_cost = cost;
                best = Some((
                    axis,
                    centroid_bounds.min[axis] + (i as f32 / NUM_BINS as f32) * extent,
                ));
            }
        }
    }

    best
}

/// Midpoint split on the longest centroid axis.
fn center_split(centroid_bounds: &Aabb) -> Option<(usize, f32)> {
    let axis = centroid_bounds.longest_axis();
    let extent = centroid_bounds.max[axis] - centroid_bounds.min[axis];
    (extent > 1e-8).then(|| (axis, centroid_bounds.centroid()[axis]))
}

/// Partition slice in-place. Returns count of elements where predicate is true.
fn partition<T, F>(slice: &mut [T], pred: F) -> usize
where
    F: Fn(&T) -> bool,
{
    let mut left = 0;
    let mut right = slice.len();
    while left < right {
        if pred(&slice[left]) {
            left += 1;
        } else {
            right -= 1;
            slice.swap(left, right);
        }
    }
    left
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::shapes;

    fn strip(count: usize) -> TriangleMesh {
        let mut positions = Vec::new();
        for i in 0..count {
            let cx = i as f32 * 2.0;
            positions.push(Vec3::new(cx - 0.5, -0.5, 0.0));
            positions.push(Vec3::new(cx + 0.5, -0.5, 0.0));
            positions.push(Vec3::new(cx, 0.5, 0.0));
        }
        let indices = (0..positions.len() as u32).collect();
        TriangleMesh::with_vertex_normals(positions, indices).unwrap()
    }

    /// Every leaf covers its triangles and every parent covers its children.
    fn assert_tight(bvh: &Bvh) {
        for node in &bvh.nodes {
            let aabb = node.aabb();
            if node.is_leaf() {
                let first = node.left_or_first as usize;
                let mut expected = Aabb::EMPTY;
                for tri in &bvh.triangles[first..first + node.count as usize] {
                    expected.grow(&triangle_aabb(&tri.positions()));
                }
                assert_eq!(aabb, expected, "leaf box is not minimal");
            } else {
                let left = &bvh.nodes[node.left_or_first as usize];
                let right = &bvh.nodes[node.left_or_first as usize + 1];
                let mut expected = left.aabb();
                expected.grow(&right.aabb());
                assert_eq!(aabb, expected, "internal box is not minimal");
            }
        }
    }

    #[test]
    fn test_empty_bvh() {
        let mesh = TriangleMesh::new(vec![], vec![], vec![]).unwrap();
        let bvh = build_bvh(&mesh, &BvhOptions::default());
        assert_eq!(bvh.nodes.len(), 1);
        assert!(bvh.triangles.is_empty());
    }

    #[test]
    fn test_single_triangle() {
        let bvh = build_bvh(&strip(1), &BvhOptions::default());
        assert_eq!(bvh.nodes.len(), 1); // just a leaf
        assert_eq!(bvh.nodes[0].count, 1);
        assert_eq!(bvh.triangles.len(), 1);
    }

    #[test]
    fn test_leaves_partition_triangles() {
        for strategy in [SplitStrategy::Sah, SplitStrategy::Center] {
            let options = BvhOptions {
                strategy,
                max_leaf_tris: 1,
            };
            let bvh = build_bvh(&strip(100), &options);

            // A full binary tree with one triangle per leaf
            assert_eq!(bvh.nodes.len(), 2 * 100 - 1);

            let mut seen: Vec<u32> = bvh
                .nodes
                .iter()
                .filter(|n| n.is_leaf())
                .flat_map(|n| {
                    assert_eq!(n.count, 1);
                    let first = n.left_or_first as usize;
                    bvh.triangles[first..first + n.count as usize]
                        .iter()
                        .map(|t| t.face_index)
                })
                .collect();
            seen.sort_unstable();
            assert_eq!(seen, (0..100).collect::<Vec<_>>());

            assert_tight(&bvh);
            let root = bvh.nodes[0].aabb();
            assert_eq!(root.min.x, -0.5);
            assert_eq!(root.max.x, 198.5);
        }
    }

    #[test]
    fn test_max_leaf_tris() {
        let options = BvhOptions {
            strategy: SplitStrategy::Sah,
            max_leaf_tris: 4,
        };
        let bvh = build_bvh(&strip(3), &options);
        assert_eq!(bvh.nodes.len(), 1);
        assert_eq!(bvh.nodes[0].count, 3);
    }

    #[test]
    fn test_coincident_triangles_split() {
        // Identical centroids: SAH finds no plane, median fallback still splits.
        let mut positions = Vec::new();
        for _ in 0..8 {
            positions.extend([Vec3::ZERO, Vec3::X, Vec3::Y]);
        }
        let indices = (0..positions.len() as u32).collect();
        let mesh = TriangleMesh::with_vertex_normals(positions, indices).unwrap();
        let bvh = build_bvh(&mesh, &BvhOptions::default());
        assert_eq!(bvh.nodes.iter().filter(|n| n.is_leaf()).count(), 8);
        assert_eq!(bvh.depth, 3);
    }

    #[test]
    fn test_degenerate_triangles_are_kept() {
        let nan = Vec3::splat(f32::NAN);
        let positions = vec![
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
            // zero area
            Vec3::ONE,
            Vec3::ONE,
            Vec3::ONE,
            // NaN vertices
            nan,
            nan,
            nan,
        ];
        let normals = vec![Vec3::Z; positions.len()];
        let mesh = TriangleMesh::new(positions, normals, (0..9).collect()).unwrap();
        let bvh = build_bvh(&mesh, &BvhOptions::default());
        let mut faces: Vec<u32> = bvh.triangles.iter().map(|t| t.face_index).collect();
        faces.sort_unstable();
        assert_eq!(faces, vec![0, 1, 2]);
        assert!(bvh.nodes.iter().all(|n| n.aabb().min.is_finite()));
        assert_tight(&bvh);
    }

    #[test]
    fn test_deterministic() {
        let mesh = shapes::round_brilliant(24);
        let a = build_bvh(&mesh, &BvhOptions::default());
        let b = build_bvh(&mesh, &BvhOptions::default());
        assert_eq!(a.nodes, b.nodes);
        assert_eq!(a.triangles, b.triangles);
    }

    #[test]
    fn test_depth_bounded() {
        let bvh = build_bvh(&shapes::round_brilliant(64), &BvhOptions::default());
        assert!(bvh.depth < MAX_DEPTH);
    }
}
