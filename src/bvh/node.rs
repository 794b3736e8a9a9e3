//! BVH node and primitive types.
//!
//! Flat array layout shared by the CPU traversal and GPU upload:
//! - 32-byte nodes (cache-line friendly)
//! - Triangles packed with vertex data for coherent access

use bytemuck::{Pod, Zeroable};

use crate::util::Vec3;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Zero-volume box at a point.
    #[inline]
    pub fn from_point(p: Vec3) -> Self {
        Self { min: p, max: p }
    }

    /// True if no point has been added yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow to include a point.
    #[inline]
    pub fn grow_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Grow to include another AABB.
    #[inline]
    pub fn grow(&mut self, other: &Aabb) {
        if !other.is_empty() {
            self.min = self.min.min(other.min);
            self.max = self.max.max(other.max);
        }
    }

    /// Surface area (for SAH cost). Empty boxes have zero area.
    #[inline]
    pub fn area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.max - self.min;
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Longest axis (0=x, 1=y, 2=z).
    #[inline]
    pub fn longest_axis(&self) -> usize {
        let d = self.max - self.min;
        if d.x >= d.y && d.x >= d.z {
            0
        } else if d.y >= d.z {
            1
        } else {
            2
        }
    }

    /// Centroid of the AABB.
    #[inline]
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Slab test. Returns the entry distance (clamped to 0) if the ray hits
    /// the box before `t_max`.
    #[inline]
    pub fn ray_entry(&self, origin: Vec3, inv_dir: Vec3, t_max: f32) -> Option<f32> {
        let t1 = (self.min - origin) * inv_dir;
        let t2 = (self.max - origin) * inv_dir;
        let mut t_near = 0.0f32;
        let mut t_far = t_max;
        // f32::min/max drop the NaN produced by 0 * inf on flat boxes.
        for axis in 0..3 {
            t_near = t_near.max(t1[axis].min(t2[axis]));
            t_far = t_far.min(t1[axis].max(t2[axis]));
        }
        (t_near <= t_far).then_some(t_near)
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Flat BVH node (32 bytes, matches the GPU struct).
///
/// Internal node: left_or_first = left child index (right = left + 1), count = 0
/// Leaf node: left_or_first = first triangle slot, count > 0
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BvhNode {
    pub aabb_min: [f32; 3],
    pub left_or_first: u32,
    pub aabb_max: [f32; 3],
    pub count: u32,
}

impl BvhNode {
    pub(crate) fn leaf(aabb: &Aabb, first: u32, count: u32) -> Self {
        Self {
            aabb_min: aabb.min.to_array(),
            left_or_first: first,
            aabb_max: aabb.max.to_array(),
            count,
        }
    }

    pub(crate) fn internal(aabb: &Aabb, left: u32) -> Self {
        Self {
            aabb_min: aabb.min.to_array(),
            left_or_first: left,
            aabb_max: aabb.max.to_array(),
            count: 0,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.count > 0
    }

    #[inline]
    pub fn aabb(&self) -> Aabb {
        Aabb {
            min: Vec3::from_array(self.aabb_min),
            max: Vec3::from_array(self.aabb_max),
        }
    }
}

/// Triangle packed in BVH leaf order (96 bytes).
/// 3 vertices x (pos + normal), each padded to 16 bytes; the first pad
/// carries the triangle's index in the source mesh.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PackedTriangle {
    pub v0: [f32; 3],
    pub face_index: u32,
    pub v1: [f32; 3],
    pub _pad0: u32,
    pub v2: [f32; 3],
    pub _pad1: u32,
    pub n0: [f32; 3],
    pub _pad2: u32,
    pub n1: [f32; 3],
    pub _pad3: u32,
    pub n2: [f32; 3],
    pub _pad4: u32,
}

impl PackedTriangle {
    pub fn new(face_index: u32, positions: [Vec3; 3], normals: [Vec3; 3]) -> Self {
        Self {
            v0: positions[0].to_array(),
            face_index,
            v1: positions[1].to_array(),
            _pad0: 0,
            v2: positions[2].to_array(),
            _pad1: 0,
            n0: normals[0].to_array(),
            _pad2: 0,
            n1: normals[1].to_array(),
            _pad3: 0,
            n2: normals[2].to_array(),
            _pad4: 0,
        }
    }

    #[inline]
    pub fn positions(&self) -> [Vec3; 3] {
        [
            Vec3::from_array(self.v0),
            Vec3::from_array(self.v1),
            Vec3::from_array(self.v2),
        ]
    }

    #[inline]
    pub fn normals(&self) -> [Vec3; 3] {
        [
            Vec3::from_array(self.n0),
            Vec3::from_array(self.n1),
            Vec3::from_array(self.n2),
        ]
    }
}

/// Bounding box of a triangle.
///
/// Non-finite vertices are skipped; a triangle with no finite vertex gets a
/// zero-volume box at the origin so it still lands in exactly one leaf.
pub fn triangle_aabb(positions: &[Vec3; 3]) -> Aabb {
    let mut b = Aabb::EMPTY;
    for p in positions.iter().filter(|p| p.is_finite()) {
        b.grow_point(*p);
    }
    if b.is_empty() {
        Aabb::from_point(Vec3::ZERO)
    } else {
        b
    }
}
