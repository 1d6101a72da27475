//! Mesh and uniform buffers, plus the two vertex formats drawn by the demo:
//! the clip-space quad and lit meshes.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// Vertex + index buffer pair ready for an indexed draw.
pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub index_format: wgpu::IndexFormat,
}

impl MeshBuffer {
    /// Upload `vertices` and `indices` as `{label}-vertices` / `{label}-indices`.
    pub fn upload<V: Pod>(
        device: &wgpu::Device,
        label: &str,
        vertices: &[V],
        indices: IndexData<'_>,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: indices.as_bytes(),
            usage: wgpu::BufferUsages::INDEX,
        });
        log::debug!(
            "Uploaded mesh '{label}': {} vertices, {} indices",
            vertices.len(),
            indices.count()
        );

        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.count(),
            index_format: indices.format(),
        }
    }

    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), self.index_format);
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }

    /// Free both buffers now rather than at drop.
    pub fn destroy(&self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
    }
}

/// Borrowed index data in either width.
#[derive(Clone, Copy, Debug)]
pub enum IndexData<'a> {
    U16(&'a [u16]),
    U32(&'a [u32]),
}

impl IndexData<'_> {
    pub fn format(&self) -> wgpu::IndexFormat {
        match self {
            IndexData::U16(_) => wgpu::IndexFormat::Uint16,
            IndexData::U32(_) => wgpu::IndexFormat::Uint32,
        }
    }

    pub fn count(&self) -> u32 {
        match self {
            IndexData::U16(data) => data.len() as u32,
            IndexData::U32(data) => data.len() as u32,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IndexData::U16(data) => bytemuck::cast_slice(data),
            IndexData::U32(data) => bytemuck::cast_slice(data),
        }
    }
}

/// A `UNIFORM | COPY_DST` buffer holding `value`, rewritten each frame with
/// `queue.write_buffer`.
pub fn uniform_buffer<T: Pod>(device: &wgpu::Device, label: &str, value: &T) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::bytes_of(value),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

/// Clip-space position and texture coordinates, for fullscreen quads.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct VertexPositionUv {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl VertexPositionUv {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Object-space position, unit normal and texture coordinates.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct VertexPositionNormalUv {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl VertexPositionNormalUv {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessContext;

    #[test]
    fn test_quad_upload_uses_u16_indices() {
        let Ok(ctx) = HeadlessContext::new_blocking() else {
            return;
        };
        let vertices = [
            VertexPositionUv {
                position: [-1.0, -1.0, 0.0],
                uv: [0.0, 0.0],
            },
            VertexPositionUv {
                position: [3.0, -1.0, 0.0],
                uv: [2.0, 0.0],
            },
            VertexPositionUv {
                position: [-1.0, 3.0, 0.0],
                uv: [0.0, 2.0],
            },
        ];
        let mesh = MeshBuffer::upload(&ctx.device, "test-tri", &vertices, IndexData::U16(&[0, 1, 2]));
        assert_eq!(mesh.index_count, 3);
        assert_eq!(mesh.index_format, wgpu::IndexFormat::Uint16);
        assert_eq!(mesh.vertex_buffer.size(), 60);
    }

    #[test]
    fn test_uniform_buffer_usage_and_size() {
        let Ok(ctx) = HeadlessContext::new_blocking() else {
            return;
        };
        let buffer = uniform_buffer(&ctx.device, "test-uniform", &[0.0f32; 4]);
        assert_eq!(buffer.size(), 16);
        assert!(buffer.usage().contains(wgpu::BufferUsages::UNIFORM));
        assert!(buffer.usage().contains(wgpu::BufferUsages::COPY_DST));
    }

    #[test]
    fn test_index_widths() {
        let short = IndexData::U16(&[0, 1, 2]);
        let wide = IndexData::U32(&[0, 1, 2]);
        assert_eq!(short.format(), wgpu::IndexFormat::Uint16);
        assert_eq!(wide.format(), wgpu::IndexFormat::Uint32);
        assert_eq!(short.as_bytes().len(), 6);
        assert_eq!(wide.as_bytes().len(), 12);
        assert_eq!(wide.count(), 3);
    }

    #[test]
    fn test_vertex_strides_match_attributes() {
        let quad = VertexPositionUv::layout();
        assert_eq!(quad.array_stride, 20);
        assert_eq!(quad.attributes[1].offset, 12);

        let lit = VertexPositionNormalUv::layout();
        assert_eq!(lit.array_stride, 32);
        assert_eq!(lit.attributes[2].offset, 24);
        assert_eq!(lit.attributes[2].shader_location, 2);
    }
}
