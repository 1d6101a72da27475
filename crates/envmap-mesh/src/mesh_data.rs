//! CPU-side indexed triangle mesh.

use envmap_render::{IndexData, MeshBuffer, VertexPositionNormalUv};

/// Interleaved vertices and triangle indices ready for GPU upload.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub vertices: Vec<VertexPositionNormalUv>,
    /// Triangle list, 3 indices per triangle, counter-clockwise front faces.
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Push a vertex and return its index.
    pub(crate) fn push_vertex(&mut self, position: glam::Vec3, normal: glam::Vec3, uv: [f32; 2]) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(VertexPositionNormalUv {
            position: position.to_array(),
            normal: normal.to_array(),
            uv,
        });
        index
    }

    /// Emit the two triangles of a grid cell `a-b-c-d` as `(a, b, d)` and `(b, c, d)`.
    pub(crate) fn push_quad(&mut self, a: u32, b: u32, c: u32, d: u32) {
        self.indices.extend_from_slice(&[a, b, d, b, c, d]);
    }

    /// Upload into a vertex + index buffer pair.
    pub fn upload(&self, device: &wgpu::Device, label: &str) -> MeshBuffer {
        MeshBuffer::upload(device, label, &self.vertices, IndexData::U32(&self.indices))
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::MeshData;

    /// Every index in range, every normal unit length, every UV inside [0, 1].
    pub fn assert_well_formed(mesh: &MeshData) {
        assert!(!mesh.vertices.is_empty(), "mesh has no vertices");
        assert_eq!(mesh.indices.len() % 3, 0, "index count not a multiple of 3");
        let count = mesh.vertices.len() as u32;
        for &i in &mesh.indices {
            assert!(i < count, "index {i} out of range ({count} vertices)");
        }
        for (i, v) in mesh.vertices.iter().enumerate() {
            let len = glam::Vec3::from_array(v.normal).length();
            assert!((len - 1.0).abs() < 1e-4, "vertex {i} normal length {len}");
            assert!(
                (0.0..=1.0).contains(&v.uv[0]) && (0.0..=1.0).contains(&v.uv[1]),
                "vertex {i} uv {:?} outside unit square",
                v.uv
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_quad_winding() {
        let mut mesh = MeshData::default();
        mesh.push_quad(0, 1, 2, 3);
        assert_eq!(mesh.indices, vec![0, 1, 3, 1, 2, 3]);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn test_push_vertex_returns_sequential_indices() {
        let mut mesh = MeshData::default();
        let a = mesh.push_vertex(glam::Vec3::ZERO, glam::Vec3::Z, [0.0, 0.0]);
        let b = mesh.push_vertex(glam::Vec3::X, glam::Vec3::Z, [1.0, 0.0]);
        assert_eq!((a, b), (0, 1));
        assert_eq!(mesh.vertices[1].position, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_upload_index_count() {
        let Ok(ctx) = envmap_render::HeadlessContext::new_blocking() else {
            return;
        };
        let mesh = crate::uv_sphere(&crate::SphereParams::default());
        let buffer = mesh.upload(&ctx.device, "test-sphere");
        assert_eq!(buffer.index_count as usize, mesh.indices.len());
        assert_eq!(buffer.index_format, wgpu::IndexFormat::Uint32);
    }
}
