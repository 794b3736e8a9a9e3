//! Procedural watertight gem meshes.
//!
//! All shapes are convex, centred near the origin and faceted (unshared
//! vertices with face normals). Triangles are wound counter-clockwise when
//! seen from outside.

use std::f32::consts::TAU;

use super::TriangleMesh;
use crate::util::{Error, Result, Vec3};

/// Default segment count for [`round_brilliant`].
pub const DEFAULT_BRILLIANT_SEGMENTS: u32 = 16;

/// Girdle corner range accepted by [`round_brilliant`].
pub const MIN_BRILLIANT_SEGMENTS: u32 = 3;
pub const MAX_BRILLIANT_SEGMENTS: u32 = 4096;

/// True if [`by_name`] accepts `name` (aliases included).
pub fn is_known(name: &str) -> bool {
    matches!(name, "brilliant" | "diamond" | "cube" | "icosahedron" | "ico")
}

/// Build a named shape with default parameters.
pub fn by_name(name: &str) -> Result<TriangleMesh> {
    match name {
        "brilliant" | "diamond" => Ok(round_brilliant(DEFAULT_BRILLIANT_SEGMENTS)),
        "cube" => Ok(unit_cube()),
        "icosahedron" | "ico" => Ok(icosahedron(1.0)),
        other => Err(Error::UnknownShape(other.to_string())),
    }
}

/// Axis-aligned cube spanning [-0.5, 0.5] on every axis (12 triangles).
pub fn unit_cube() -> TriangleMesh {
    let mut positions = Vec::with_capacity(8);
    for i in 0..8u32 {
        positions.push(Vec3::new(
            if i & 1 == 0 { -0.5 } else { 0.5 },
            if i & 2 == 0 { -0.5 } else { 0.5 },
            if i & 4 == 0 { -0.5 } else { 0.5 },
        ));
    }
    // Two triangles per face, as corner bitmasks.
    let faces: [[u32; 4]; 6] = [
        [0, 2, 6, 4], // -X
        [1, 3, 7, 5], // +X
        [0, 1, 5, 4], // -Y
        [2, 3, 7, 6], // +Y
        [0, 1, 3, 2], // -Z
        [4, 5, 7, 6], // +Z
    ];
    let mut tris = Vec::with_capacity(12);
    for [a, b, c, d] in faces {
        tris.push([a, b, c]);
        tris.push([a, c, d]);
    }
    build_outward(positions, &tris, Vec3::ZERO)
}

/// Regular icosahedron with circumradius `radius` (20 triangles).
pub fn icosahedron(radius: f32) -> TriangleMesh {
    let phi = (1.0 + 5.0f32.sqrt()) * 0.5;
    let mut raw = Vec::with_capacity(12);
    for s1 in [-1.0f32, 1.0] {
        for s2 in [-1.0f32, 1.0] {
            raw.push(Vec3::new(0.0, s1, s2 * phi));
            raw.push(Vec3::new(s1, s2 * phi, 0.0));
            raw.push(Vec3::new(s2 * phi, 0.0, s1));
        }
    }

    // Faces are exactly the vertex triples whose edges all have length 2.
    let is_edge = |a: Vec3, b: Vec3| ((a - b).length() - 2.0).abs() < 1e-3;
    let mut tris = Vec::with_capacity(20);
    for i in 0..raw.len() {
        for j in i + 1..raw.len() {
            if !is_edge(raw[i], raw[j]) {
                continue;
            }
            for k in j + 1..raw.len() {
                if is_edge(raw[i], raw[k]) && is_edge(raw[j], raw[k]) {
                    tris.push([i as u32, j as u32, k as u32]);
                }
            }
        }
    }

    let positions = raw.iter().map(|p| p.normalize() * radius).collect();
    build_outward(positions, &tris, Vec3::ZERO)
}

/// Simplified round brilliant cut: table, crown, girdle, pavilion and culet.
///
/// `segments` is the number of girdle corners, clamped to
/// [`MIN_BRILLIANT_SEGMENTS`]..=[`MAX_BRILLIANT_SEGMENTS`]. The
/// table ring is rotated half a step against the girdle so crown facets
/// alternate like the kite/star facets of a real stone. Girdle diameter is 2.
pub fn round_brilliant(segments: u32) -> TriangleMesh {
    const TABLE_Y: f32 = 0.32;
    const TABLE_RADIUS: f32 = 0.56;
    const GIRDLE_TOP_Y: f32 = 0.02;
    const GIRDLE_BOTTOM_Y: f32 = -0.02;
    const CULET_Y: f32 = -0.86;

    let n = segments.clamp(MIN_BRILLIANT_SEGMENTS, MAX_BRILLIANT_SEGMENTS);
    let step = TAU / n as f32;
    let ring = |radius: f32, y: f32, offset: f32| -> Vec<Vec3> {
        (0..n)
            .map(|i| {
                let a = (i as f32 + offset) * step;
                Vec3::new(radius * a.cos(), y, radius * a.sin())
            })
            .collect()
    };

    let mut positions = Vec::with_capacity(3 * n as usize + 2);
    let table_center = 0u32;
    positions.push(Vec3::new(0.0, TABLE_Y, 0.0));
    let table = 1u32;
    positions.extend(ring(TABLE_RADIUS, TABLE_Y, 0.5));
    let girdle_top = table + n;
    positions.extend(ring(1.0, GIRDLE_TOP_Y, 0.0));
    let girdle_bottom = girdle_top + n;
    positions.extend(ring(1.0, GIRDLE_BOTTOM_Y, 0.0));
    let culet = girdle_bottom + n;
    positions.push(Vec3::new(0.0, CULET_Y, 0.0));

    let mut tris = Vec::with_capacity(6 * n as usize);
    for i in 0..n {
        let j = (i + 1) % n;
        // Table fan.
        tris.push([table_center, table + i, table + j]);
        // Crown: table corner i sits between girdle corners i and i+1.
        tris.push([table + i, girdle_top + i, girdle_top + j]);
        tris.push([table + i, girdle_top + j, table + j]);
        // Girdle band.
        tris.push([girdle_top + i, girdle_bottom + i, girdle_bottom + j]);
        tris.push([girdle_top + i, girdle_bottom + j, girdle_top + j]);
        // Pavilion fan to the culet.
        tris.push([girdle_bottom + i, culet, girdle_bottom + j]);
    }

    build_outward(positions, &tris, Vec3::new(0.0, -0.2, 0.0))
}

/// Orient every triangle away from `center` and build a faceted mesh.
fn build_outward(positions: Vec<Vec3>, tris: &[[u32; 3]], center: Vec3) -> TriangleMesh {
    let mut indices = Vec::with_capacity(tris.len() * 3);
    for &[a, b, c] in tris {
        let (pa, pb, pc) = (
            positions[a as usize],
            positions[b as usize],
            positions[c as usize],
        );
        let n = (pb - pa).cross(pc - pa);
        let centroid = (pa + pb + pc) / 3.0;
        if n.dot(centroid - center) >= 0.0 {
            indices.extend_from_slice(&[a, b, c]);
        } else {
            indices.extend_from_slice(&[a, c, b]);
        }
    }
    let (positions, normals, indices) = super::normals::unshare_flat(&positions, &indices);
    TriangleMesh {
        positions,
        normals,
        indices,
    }
}
