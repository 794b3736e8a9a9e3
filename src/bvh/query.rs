//! Nearest-hit ray queries against a [`Bvh`].
//!
//! Traversal is iterative with a fixed-size stack of `(node, entry distance)`
//! pairs; the builder guarantees the tree depth fits. Subtrees whose box is
//! entered beyond the current best hit are skipped, so the returned hit is
//! the globally nearest one.

use super::node::PackedTriangle;
use super::{Bvh, MAX_DEPTH};
use crate::util::{face_forward, Vec3};

/// Determinant threshold below which a ray is treated as parallel to a triangle.
const DET_EPSILON: f32 = 1e-12;

/// Barycentric slack so rays through shared edges cannot slip between
/// neighbouring triangles.
const EDGE_EPSILON: f32 = 1e-6;

/// Hits closer than this are ignored (the ray's own surface).
const T_MIN: f32 = 1e-6;

/// Ray with normalized direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a ray; `direction` is normalized (zero stays zero).
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Point at distance `t`.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// True if the ray can be traced (finite origin, non-zero direction).
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.origin.is_finite() && self.direction.is_finite() && self.direction != Vec3::ZERO
    }
}

/// Nearest intersection result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Triangle index in the source mesh.
    pub face_index: u32,
    /// Distance along the ray.
    pub distance: f32,
    /// Barycentric weights of (v0, v1, v2).
    pub barycentric: Vec3,
    /// Geometric normal, oriented against the ray.
    pub face_normal: Vec3,
    /// Interpolated vertex normal, oriented against the ray.
    pub normal: Vec3,
    /// +1 when the ray hit the front (outward) face, -1 for the back face.
    pub side: f32,
    /// Hit position.
    pub point: Vec3,
}

impl Hit {
    /// True when the ray was travelling from outside into the mesh.
    #[inline]
    pub fn is_entering(&self) -> bool {
        self.side > 0.0
    }
}

impl Bvh {
    /// Nearest hit within `max_distance`, or `None`.
    pub fn intersect_first(&self, ray: &Ray, max_distance: Option<f32>) -> Option<Hit> {
        let mut best_t = max_distance.unwrap_or(f32::INFINITY);
        let mut best: Option<(usize, f32, f32)> = None;

        self.traverse(ray, &mut best_t, |slot, tri, best_t| {
            if let Some((t, u, v)) = intersect_triangle(ray, tri, *best_t) {
                *best_t = t;
                best = Some((slot, u, v));
            }
            false
        });

        best.map(|(slot, u, v)| self.make_hit(ray, slot, best_t, u, v))
    }

    /// True if anything is hit within `max_distance`.
    pub fn intersects_any(&self, ray: &Ray, max_distance: Option<f32>) -> bool {
        let mut best_t = max_distance.unwrap_or(f32::INFINITY);
        let mut found = false;
        self.traverse(ray, &mut best_t, |_, tri, best_t| {
            found = intersect_triangle(ray, tri, *best_t).is_some();
            found
        });
        found
    }

    /// Walk every leaf whose box is entered before `best_t`. `visit` is
    /// called per triangle and may shrink `best_t`; returning true stops the
    /// walk.
    fn traverse<F>(&self, ray: &Ray, best_t: &mut f32, mut visit: F)
    where
        F: FnMut(usize, &PackedTriangle, &mut f32) -> bool,
    {
        if self.triangles.is_empty() || !ray.is_valid() {
            return;
        }

        let inv_dir = ray.direction.recip();
        let Some(_) = self.nodes[0].aabb().ray_entry(ray.origin, inv_dir, *best_t) else {
            return;
        };

        let mut stack = [(0u32, 0.0f32); MAX_DEPTH as usize];
        let mut sp = 0usize;
        let mut node_idx = 0usize;

        loop {
            let node = &self.nodes[node_idx];
            let mut next = None;

            if node.is_leaf() {
                let first = node.left_or_first as usize;
                for slot in first..first + node.count as usize {
                    if visit(slot, &self.triangles[slot], best_t) {
                        return;
                    }
                }
            } else {
                let left = node.left_or_first as usize;
                let right = left + 1;
                let t_left = self.nodes[left].aabb().ray_entry(ray.origin, inv_dir, *best_t);
                let t_right = self.nodes[right].aabb().ray_entry(ray.origin, inv_dir, *best_t);
                next = match (t_left, t_right) {
                    (Some(tl), Some(tr)) => {
                        let (near, far, t_far) = if tl <= tr {
                            (left, right, tr)
                        } else {
                            (right, left, tl)
                        };
                        debug_assert!(sp < stack.len(), "BVH deeper than MAX_DEPTH");
                        stack[sp] = (far as u32, t_far);
                        sp += 1;
                        Some(near)
                    }
                    (Some(_), None) => Some(left),
                    (None, Some(_)) => Some(right),
                    (None, None) => None,
                };
            }

            // Descend, or pop the nearest pending subtree still worth visiting
            match next {
                Some(idx) => node_idx = idx,
                None => loop {
                    if sp == 0 {
                        return;
                    }
                    sp -= 1;
                    let (idx, t_entry) = stack[sp];
                    if t_entry <= *best_t {
                        node_idx = idx as usize;
                        break;
                    }
                },
            }
        }
    }

    fn make_hit(&self, ray: &Ray, slot: usize, t: f32, u: f32, v: f32) -> Hit {
        let tri = &self.triangles[slot];
        let [p0, p1, p2] = tri.positions();
        let [n0, n1, n2] = tri.normals();

        let geometric = (p1 - p0).cross(p2 - p0).normalize_or_zero();
        let side = if geometric.dot(ray.direction) <= 0.0 { 1.0 } else { -1.0 };
        let face_normal = geometric * side;

        let w = 1.0 - u - v;
        let interpolated = (n0 * w + n1 * u + n2 * v).normalize_or_zero();
        let normal = if interpolated == Vec3::ZERO {
            face_normal
        } else {
            face_forward(interpolated, ray.direction)
        };

        Hit {
            face_index: tri.face_index,
            distance: t,
            barycentric: Vec3::new(w, u, v),
            face_normal,
            normal,
            side,
            point: ray.at(t),
        }
    }
}

/// Two-sided Möller–Trumbore test. Returns `(t, u, v)` with
/// `p = v0 + u (v1 - v0) + v (v2 - v0)` for `T_MIN < t < t_max`.
#[inline]
fn intersect_triangle(ray: &Ray, tri: &PackedTriangle, t_max: f32) -> Option<(f32, f32, f32)> {
    let [v0, v1, v2] = tri.positions();
    let e1 = v1 - v0;
    let e2 = v2 - v0;
    let pvec = ray.direction.cross(e2);
    let det = e1.dot(pvec);
    if !(det.abs() > DET_EPSILON) {
        return None;
    }
    let inv_det = 1.0 / det;
    let tvec = ray.origin - v0;
    let u = tvec.dot(pvec) * inv_det;
    if !(-EDGE_EPSILON..=1.0 + EDGE_EPSILON).contains(&u) {
        return None;
    }
    let qvec = tvec.cross(e1);
    let v = ray.direction.dot(qvec) * inv_det;
    if v < -EDGE_EPSILON || u + v > 1.0 + EDGE_EPSILON {
        return None;
    }
    let t = e2.dot(qvec) * inv_det;
    (t > T_MIN && t < t_max).then_some((t, u, v))
}
