//! Reverse-Z depth buffer for the on-screen scene pass.
//!
//! Near plane maps to 1.0 and far plane to 0.0, matching
//! [`Camera::projection_matrix`](crate::camera::Camera::projection_matrix).

/// Depth attachment sized to the window surface.
pub struct DepthBuffer {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl DepthBuffer {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Reverse-Z clear value: 0.0 represents the far plane.
    pub const CLEAR_VALUE: f32 = 0.0;

    /// Closer fragments have higher depth values.
    pub const COMPARE_FUNCTION: wgpu::CompareFunction = wgpu::CompareFunction::GreaterEqual;

    /// Create a depth buffer; zero dimensions are clamped to 1.
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-buffer"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            width,
            height,
        }
    }

    /// Depth-stencil state for pipelines drawing against this buffer.
    pub fn stencil_state(depth_write_enabled: bool) -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format: Self::FORMAT,
            depth_write_enabled,
            depth_compare: Self::COMPARE_FUNCTION,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }

    /// Recreate the buffer at a new size. No-op when unchanged.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if self.width == width.max(1) && self.height == height.max(1) {
            return;
        }
        *self = Self::new(device, width, height);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessContext;

    #[test]
    fn test_reverse_z_constants() {
        assert_eq!(DepthBuffer::CLEAR_VALUE, 0.0);
        assert_eq!(
            DepthBuffer::COMPARE_FUNCTION,
            wgpu::CompareFunction::GreaterEqual
        );
    }

    #[test]
    fn test_stencil_state_uses_buffer_format() {
        let state = DepthBuffer::stencil_state(false);
        assert_eq!(state.format, DepthBuffer::FORMAT);
        assert!(!state.depth_write_enabled);
    }

    #[test]
    fn test_resize_updates_dimensions() {
        let Ok(ctx) = HeadlessContext::new_blocking() else {
            return;
        };
        let mut depth = DepthBuffer::new(&ctx.device, 800, 600);
        depth.resize(&ctx.device, 1920, 1080);
        assert_eq!((depth.width(), depth.height()), (1920, 1080));
        assert_eq!(depth.texture.width(), 1920);
    }

    #[test]
    fn test_zero_size_is_clamped() {
        let Ok(ctx) = HeadlessContext::new_blocking() else {
            return;
        };
        let depth = DepthBuffer::new(&ctx.device, 0, 0);
        assert_eq!((depth.width(), depth.height()), (1, 1));
    }
}
