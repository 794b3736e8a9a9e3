//! Normal generation: flat facets, area-weighted vertex normals, and
//! angle-thresholded smoothing.

use std::collections::HashMap;

use super::TriangleMesh;
use crate::util::Vec3;

/// Unnormalized face normal (length = 2 * area).
#[inline]
pub fn face_normal_raw(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a)
}

/// Area-weighted vertex normals for an indexed mesh.
pub fn vertex_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let n = face_normal_raw(positions[a], positions[b], positions[c]);
        if !n.is_finite() {
            continue;
        }
        normals[a] += n;
        normals[b] += n;
        normals[c] += n;
    }
    normals.iter().map(|n| n.normalize_or_zero()).collect()
}

/// Expand an indexed mesh into unshared vertices carrying face normals.
pub fn unshare_flat(positions: &[Vec3], indices: &[u32]) -> (Vec<Vec3>, Vec<Vec3>, Vec<u32>) {
    let mut out_pos = Vec::with_capacity(indices.len());
    let mut out_nrm = Vec::with_capacity(indices.len());
    for tri in indices.chunks_exact(3) {
        let p = [
            positions[tri[0] as usize],
            positions[tri[1] as usize],
            positions[tri[2] as usize],
        ];
        let n = face_normal_raw(p[0], p[1], p[2]).normalize_or_zero();
        out_pos.extend_from_slice(&p);
        out_nrm.extend_from_slice(&[n, n, n]);
    }
    let out_idx = (0..out_pos.len() as u32).collect();
    (out_pos, out_nrm, out_idx)
}

/// Data needed to recalculate smooth normals dynamically
#[derive(Clone)]
pub struct SmoothNormalData {
    /// Position hash -> list of (vertex_index, face_normal)
    position_groups: HashMap<(i32, i32, i32), Vec<(usize, Vec3)>>,
    vertex_count: usize,
}

impl SmoothNormalData {
    /// Group coincident vertices of a mesh, pairing each with its face normal.
    pub fn from_mesh(mesh: &TriangleMesh) -> Self {
        let mut face_normals = vec![Vec3::ZERO; mesh.vertex_count()];
        for t in 0..mesh.triangle_count() {
            let [a, b, c] = mesh.triangle_positions(t);
            let n = face_normal_raw(a, b, c).normalize_or_zero();
            for i in mesh.triangle(t) {
                face_normals[i as usize] = n;
            }
        }

        let mut position_groups: HashMap<(i32, i32, i32), Vec<(usize, Vec3)>> = HashMap::new();
        for (idx, (pos, n)) in mesh.positions().iter().zip(face_normals.iter()).enumerate() {
            position_groups.entry(pos_key(*pos)).or_default().push((idx, *n));
        }

        Self {
            position_groups,
            vertex_count: mesh.vertex_count(),
        }
    }

    /// Recalculate smooth normals with given angle threshold (degrees)
    pub fn calculate(&self, angle_deg: f32) -> Vec<Vec3> {
        let cos_threshold = angle_deg.to_radians().cos();
        let mut normals = vec![Vec3::ZERO; self.vertex_count];

        for group in self.position_groups.values() {
            // A facet split into several triangles contributes its normal once.
            let mut unique: Vec<Vec3> = Vec::with_capacity(group.len());
            for &(_, n) in group {
                if !unique.iter().any(|u| u.dot(n) > 0.9999) {
                    unique.push(n);
                }
            }

            for &(idx, face_n) in group {
                let sum: Vec3 = unique
                    .iter()
                    .filter(|other| face_n.dot(**other) >= cos_threshold)
                    .copied()
                    .sum();
                normals[idx] = sum.try_normalize().unwrap_or(face_n);
            }
        }

        normals
    }
}

/// Quantize a position so coincident vertices share a key.
fn pos_key(p: Vec3) -> (i32, i32, i32) {
    let scale = 10000.0;
    (
        (p.x * scale).round() as i32,
        (p.y * scale).round() as i32,
        (p.z * scale).round() as i32,
    )
}
