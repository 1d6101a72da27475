//! Offscreen color target painted by one projection pass.

use crate::uniforms::ProjectionKind;

/// Color texture plus its sampled view, tagged with the projection that paints it.
pub struct RenderTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
    kind: ProjectionKind,
}

impl RenderTarget {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    pub const USAGE: wgpu::TextureUsages = wgpu::TextureUsages::RENDER_ATTACHMENT
        .union(wgpu::TextureUsages::TEXTURE_BINDING)
        .union(wgpu::TextureUsages::COPY_SRC);

    /// Callers validate that both dimensions are non-zero.
    pub fn new(device: &wgpu::Device, kind: ProjectionKind, width: u32, height: u32) -> Self {
        let label = format!("{}-target", kind.name());
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: Self::USAGE,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        log::debug!("Allocated {label} ({width}x{height})");

        Self {
            texture,
            view,
            width,
            height,
            kind,
        }
    }

    /// Reallocate at a new size. Returns `false` when the size is unchanged.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> bool {
        if self.width == width && self.height == height {
            return false;
        }
        self.texture.destroy();
        *self = Self::new(device, self.kind, width, height);
        true
    }

    /// Release the GPU texture now rather than on drop.
    pub fn destroy(&self) {
        self.texture.destroy();
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn kind(&self) -> ProjectionKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envmap_render::HeadlessContext;

    #[test]
    fn test_usage_allows_sampling_and_readback() {
        assert!(RenderTarget::USAGE.contains(wgpu::TextureUsages::TEXTURE_BINDING));
        assert!(RenderTarget::USAGE.contains(wgpu::TextureUsages::COPY_SRC));
        assert!(RenderTarget::USAGE.contains(wgpu::TextureUsages::RENDER_ATTACHMENT));
    }

    #[test]
    fn test_resize_reallocates() {
        let Ok(ctx) = HeadlessContext::new_blocking() else {
            return;
        };
        let mut target = RenderTarget::new(&ctx.device, ProjectionKind::Cartesian, 64, 32);
        assert!(!target.resize(&ctx.device, 64, 32), "same size should be a no-op");
        assert!(target.resize(&ctx.device, 128, 64));
        assert_eq!(target.size(), (128, 64));
        assert_eq!(target.texture().width(), 128);
        assert_eq!(target.kind(), ProjectionKind::Cartesian);
    }
}
