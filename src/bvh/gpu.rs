//! Serialize a BVH into GPU storage buffers.
//!
//! The node and triangle arenas are already `Pod`, so upload is a byte cast;
//! this wrapper adds the header a shader needs to bound its loops.

use bytemuck::{Pod, Zeroable};

use super::node::{BvhNode, PackedTriangle};
use super::Bvh;

/// Uniform header describing the uploaded arenas (16 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuBvhHeader {
    pub node_count: u32,
    pub triangle_count: u32,
    /// Traversal stack size the shader must reserve.
    pub max_depth: u32,
    pub _pad: u32,
}

/// BVH data ready for GPU upload.
pub struct GpuBvhData<'a> {
    pub header: GpuBvhHeader,
    /// Flat BVH node array (bytemuck-castable).
    pub nodes: &'a [BvhNode],
    /// Packed triangle data in BVH leaf order.
    pub triangles: &'a [PackedTriangle],
}

impl Bvh {
    /// Borrow this BVH as GPU buffers; nothing is copied.
    pub fn gpu_data(&self) -> GpuBvhData<'_> {
        GpuBvhData {
            header: GpuBvhHeader {
                node_count: self.nodes.len() as u32,
                triangle_count: self.triangles.len() as u32,
                max_depth: self.depth + 1,
                _pad: 0,
            },
            nodes: &self.nodes,
            triangles: &self.triangles,
        }
    }
}

impl GpuBvhData<'_> {
    /// Header as bytes.
    pub fn header_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(&self.header)
    }

    /// BVH nodes as bytes.
    pub fn nodes_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.nodes)
    }

    /// Triangle data as bytes.
    pub fn triangles_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.triangles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::shapes;

    #[test]
    fn test_byte_sizes() {
        let bvh = Bvh::build(&shapes::unit_cube());
        let gpu = bvh.gpu_data();
        assert_eq!(gpu.header.triangle_count, 12);
        assert_eq!(gpu.header.node_count, 23);
        assert_eq!(gpu.header_bytes().len(), 16);
        assert_eq!(gpu.nodes_bytes().len(), 23 * 32);
        assert_eq!(gpu.triangles_bytes().len(), 12 * 96);
    }

    #[test]
    fn test_nodes_round_trip_through_bytes() {
        let bvh = Bvh::build(&shapes::icosahedron(1.0));
        let gpu = bvh.gpu_data();
        let back: &[BvhNode] = bytemuck::cast_slice(gpu.nodes_bytes());
        assert_eq!(back, bvh.nodes());
    }
}
