//! Render pass setup and the per-frame encoder for presented frames.
//!
//! [`RenderPassBuilder`] records one color pass, optionally with depth, into
//! any view: an offscreen environment target or the window surface.
//! [`FrameEncoder`] ties one command encoder to one acquired surface texture.

/// Clear color for the offscreen environment targets.
pub const CLEAR_BLACK: wgpu::Color = wgpu::Color::BLACK;

/// Fluent description of a single color (+ depth) pass.
#[derive(Debug)]
pub struct RenderPassBuilder<'a> {
    color_load: wgpu::LoadOp<wgpu::Color>,
    depth: Option<(&'a wgpu::TextureView, f32)>,
    label: Option<&'static str>,
}

impl Default for RenderPassBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> RenderPassBuilder<'a> {
    /// A pass that clears to [`CLEAR_BLACK`] and has no depth attachment.
    pub fn new() -> Self {
        Self {
            color_load: wgpu::LoadOp::Clear(CLEAR_BLACK),
            depth: None,
            label: None,
        }
    }

    pub fn clear_color(mut self, color: wgpu::Color) -> Self {
        self.color_load = wgpu::LoadOp::Clear(color);
        self
    }

    /// Attach `view` as depth, cleared to `clear_value` at pass start.
    pub fn depth(mut self, view: &'a wgpu::TextureView, clear_value: f32) -> Self {
        self.depth = Some((view, clear_value));
        self
    }

    pub fn label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    /// Start the pass on `encoder`, writing color into `color_view`.
    pub fn begin<'encoder>(
        &self,
        encoder: &'encoder mut wgpu::CommandEncoder,
        color_view: &'encoder wgpu::TextureView,
    ) -> wgpu::RenderPass<'encoder>
    where
        'a: 'encoder,
    {
        let depth_stencil_attachment =
            self.depth
                .map(|(view, clear_value)| wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_value),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                });

        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: self.label,
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: self.color_load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
    }
}

/// One presented frame: the encoder every pass records into and the surface
/// texture it is presented to.
///
/// Submitting consumes the frame. A frame dropped without `submit` is still
/// submitted and presented, with a warning.
pub struct FrameEncoder {
    queue: wgpu::Queue,
    pending: Option<(wgpu::CommandEncoder, wgpu::SurfaceTexture)>,
    surface_view: wgpu::TextureView,
}

impl FrameEncoder {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_texture: wgpu::SurfaceTexture,
    ) -> Self {
        let encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame-encoder"),
        });
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            queue: queue.clone(),
            pending: Some((encoder, surface_texture)),
            surface_view,
        }
    }

    /// The encoder and the surface view, borrowed together so offscreen
    /// passes and the final on-screen pass go into one submission.
    pub fn parts(&mut self) -> Option<(&mut wgpu::CommandEncoder, &wgpu::TextureView)> {
        let (encoder, _) = self.pending.as_mut()?;
        Some((encoder, &self.surface_view))
    }

    /// Submit the recorded commands and present.
    pub fn submit(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if let Some((encoder, surface_texture)) = self.pending.take() {
            self.queue.submit([encoder.finish()]);
            surface_texture.present();
        }
    }
}

impl Drop for FrameEncoder {
    fn drop(&mut self) {
        if self.pending.is_some() {
            log::warn!("Frame dropped without submit(), submitting now");
            self.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_clears_to_black() {
        let builder = RenderPassBuilder::new();
        assert_eq!(builder.color_load, wgpu::LoadOp::Clear(CLEAR_BLACK));
        assert!(builder.depth.is_none());
    }

    #[test]
    fn test_clear_color_override() {
        let builder = RenderPassBuilder::new().clear_color(wgpu::Color::RED);
        assert_eq!(builder.color_load, wgpu::LoadOp::Clear(wgpu::Color::RED));
    }

    #[test]
    fn test_label_is_stored() {
        let builder = RenderPassBuilder::new().label("nebula-equirect-pass");
        assert_eq!(builder.label, Some("nebula-equirect-pass"));
    }

    #[test]
    fn test_depth_pass_records() {
        let Ok(ctx) = crate::gpu::HeadlessContext::new_blocking() else {
            return;
        };
        let color = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("test-color"),
            size: wgpu::Extent3d {
                width: 8,
                height: 8,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
        let depth = crate::depth::DepthBuffer::new(&ctx.device, 8, 8);

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        {
            let _pass = RenderPassBuilder::new()
                .depth(&depth.view, crate::depth::DepthBuffer::CLEAR_VALUE)
                .label("test-depth-pass")
                .begin(&mut encoder, &color_view);
        }
        ctx.queue.submit([encoder.finish()]);
    }
}
