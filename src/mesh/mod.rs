//! Triangle mesh input for BVH construction.
//!
//! A [`TriangleMesh`] is an indexed list of triangles with per-vertex
//! normals. It is immutable once built; BVHs reference triangles by their
//! index in this mesh.

pub mod normals;
pub mod shapes;

use crate::util::{Error, Result, Vec3};

/// Indexed triangle mesh with per-vertex normals.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    indices: Vec<u32>,
}

impl TriangleMesh {
    /// Create a mesh, validating index ranges and attribute lengths.
    ///
    /// Degenerate triangles (zero area, NaN positions) are accepted; the BVH
    /// builder handles them.
    pub fn new(positions: Vec<Vec3>, normals: Vec<Vec3>, indices: Vec<u32>) -> Result<Self> {
        if positions.len() != normals.len() {
            return Err(Error::mesh(format!(
                "{} positions but {} normals",
                positions.len(),
                normals.len()
            )));
        }
        if indices.len() % 3 != 0 {
            return Err(Error::mesh(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        for (triangle, tri) in indices.chunks_exact(3).enumerate() {
            if let Some(&index) = tri.iter().find(|&&i| i as usize >= positions.len()) {
                return Err(Error::IndexOutOfBounds {
                    triangle,
                    index,
                    count: positions.len(),
                });
            }
        }
        Ok(Self {
            positions,
            normals,
            indices,
        })
    }

    /// Create a mesh whose normals are the area-weighted average of the
    /// adjacent face normals.
    pub fn with_vertex_normals(positions: Vec<Vec3>, indices: Vec<u32>) -> Result<Self> {
        let normals = vec![Vec3::Z; positions.len()];
        let mut mesh = Self::new(positions, normals, indices)?;
        mesh.normals = normals::vertex_normals(&mesh.positions, &mesh.indices);
        Ok(mesh)
    }

    /// Create a faceted mesh: every triangle gets its own three vertices
    /// carrying the geometric face normal.
    pub fn faceted(positions: &[Vec3], indices: &[u32]) -> Result<Self> {
        // Validate against the shared vertex list before unsharing.
        let shared = Self::new(positions.to_vec(), vec![Vec3::Z; positions.len()], indices.to_vec())?;
        let (positions, normals, indices) = normals::unshare_flat(&shared.positions, &shared.indices);
        Ok(Self {
            positions,
            normals,
            indices,
        })
    }

    /// Vertex positions.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Vertex normals (same length as positions).
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    /// Flat index buffer, three entries per triangle.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Vertex indices of triangle `i`.
    #[inline]
    pub fn triangle(&self, i: usize) -> [u32; 3] {
        let base = i * 3;
        [self.indices[base], self.indices[base + 1], self.indices[base + 2]]
    }

    /// Positions of triangle `i`.
    #[inline]
    pub fn triangle_positions(&self, i: usize) -> [Vec3; 3] {
        let [a, b, c] = self.triangle(i);
        [
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        ]
    }

    /// Normals of triangle `i`.
    #[inline]
    pub fn triangle_normals(&self, i: usize) -> [Vec3; 3] {
        let [a, b, c] = self.triangle(i);
        [
            self.normals[a as usize],
            self.normals[b as usize],
            self.normals[c as usize],
        ]
    }

    /// Replace normals with angle-thresholded smooth normals.
    pub fn smoothed(mut self, angle_deg: f32) -> Self {
        self.normals = normals::SmoothNormalData::from_mesh(&self).calculate(angle_deg);
        self
    }

    /// Apply an affine transform to positions and normals.
    pub fn transformed(mut self, transform: &glam::Mat4) -> Self {
        let normal_mat = transform.inverse().transpose();
        for p in &mut self.positions {
            *p = transform.transform_point3(*p);
        }
        for n in &mut self.normals {
            *n = normal_mat.transform_vector3(*n).normalize_or_zero();
        }
        self
    }
}
