//! Vertex format shared by all graphics pipelines.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Interleaved mesh vertex: position, normal, then UV.
///
/// `#[repr(C)]` fixes the layout at 32 bytes (position at offset 0,
/// normal at 12, tex_coord at 24), matching shader input locations 0
/// through 2 in the same order. Vertex buffers hold a flat run of these.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct MeshVertex {
    /// Object-space position.
    pub position: Vec3,
    /// Surface normal, expected normalized.
    pub normal: Vec3,
    /// Texture coordinates.
    pub tex_coord: Vec2,
}

impl MeshVertex {
    #[inline]
    pub const fn new(position: Vec3, normal: Vec3, tex_coord: Vec2) -> Self {
        Self {
            position,
            normal,
            tex_coord,
        }
    }

    /// Size of one vertex in bytes.
    #[inline]
    pub const fn size() -> usize {
        std::mem::size_of::<Self>()
    }

    /// Binding description for binding 0, advancing per vertex.
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: std::mem::size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    /// Attribute descriptions for the three shader input locations.
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 3] {
        [
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: 0,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 1,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: 12,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 2,
                format: vk::Format::R32G32_SFLOAT,
                offset: 24,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_vertex_size() {
        // MeshVertex: Vec3 (12) + Vec3 (12) + Vec2 (8) = 32 bytes
        assert_eq!(std::mem::size_of::<MeshVertex>(), 32);
        assert_eq!(MeshVertex::size(), 32);
    }

    #[test]
    fn test_mesh_vertex_binding_description() {
        let binding = MeshVertex::binding_description();
        assert_eq!(binding.binding, 0);
        assert_eq!(binding.stride, 32);
        assert_eq!(binding.input_rate, vk::VertexInputRate::VERTEX);
    }

    #[test]
    fn test_mesh_vertex_attribute_descriptions() {
        let attrs = MeshVertex::attribute_descriptions();
        assert_eq!(attrs.len(), 3);

        // Position attribute (location 0)
        assert_eq!(attrs[0].binding, 0);
        assert_eq!(attrs[0].location, 0);
        assert_eq!(attrs[0].format, vk::Format::R32G32B32_SFLOAT);
        assert_eq!(attrs[0].offset, 0);

        // Normal attribute (location 1)
        assert_eq!(attrs[1].binding, 0);
        assert_eq!(attrs[1].location, 1);
        assert_eq!(attrs[1].format, vk::Format::R32G32B32_SFLOAT);
        assert_eq!(attrs[1].offset, 12);

        // TexCoord attribute (location 2)
        assert_eq!(attrs[2].binding, 0);
        assert_eq!(attrs[2].location, 2);
        assert_eq!(attrs[2].format, vk::Format::R32G32_SFLOAT);
        assert_eq!(attrs[2].offset, 24);
    }

    #[test]
    fn test_mesh_vertex_new() {
        let position = Vec3::new(1.0, 2.0, 3.0);
        let normal = Vec3::new(0.0, 1.0, 0.0);
        let tex_coord = Vec2::new(0.5, 0.5);

        let vertex = MeshVertex::new(position, normal, tex_coord);

        assert_eq!(vertex.position, position);
        assert_eq!(vertex.normal, normal);
        assert_eq!(vertex.tex_coord, tex_coord);
    }

    #[test]
    fn test_mesh_vertex_pod_zeroable() {
        // Verify Pod and Zeroable traits work correctly
        let vertex = MeshVertex::new(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec2::new(0.5, 0.5),
        );

        // Test bytemuck cast to bytes and back
        let bytes: &[u8] = bytemuck::bytes_of(&vertex);
        assert_eq!(bytes.len(), 32);

        let vertex_back: &MeshVertex = bytemuck::from_bytes(bytes);
        assert_eq!(vertex_back.position, vertex.position);
        assert_eq!(vertex_back.normal, vertex.normal);
        assert_eq!(vertex_back.tex_coord, vertex.tex_coord);
    }

    #[test]
    fn test_mesh_vertex_offsets() {
        // Verify field offsets match what we specify in attribute descriptions
        use std::mem::offset_of;

        assert_eq!(offset_of!(MeshVertex, position), 0);
        assert_eq!(offset_of!(MeshVertex, normal), 12);
        assert_eq!(offset_of!(MeshVertex, tex_coord), 24);
    }
}
