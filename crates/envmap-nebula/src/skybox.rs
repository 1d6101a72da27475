//! Draws the live nebula behind everything else in the scene pass.
//!
//! One oversized triangle covers the screen. Each corner is unprojected
//! through the camera's rotation-only inverse, so the interpolated view ray
//! picks the environment texel seen in that direction.

use bytemuck::{Pod, Zeroable};
use envmap_render::uniform_buffer;
use glam::Mat4;

use crate::environment::{EnvironmentBinding, with_environment};
use crate::equirect::EquirectangularRenderer;
use crate::error::EquirectError;
use crate::uniforms::ProjectionKind;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct SkyboxUniform {
    /// From [`envmap_render::Camera::inverse_rotation_view_projection`].
    pub inv_view_proj: [[f32; 4]; 4],
}

impl SkyboxUniform {
    fn new(inv_view_proj: Mat4) -> Self {
        Self {
            inv_view_proj: inv_view_proj.to_cols_array_2d(),
        }
    }
}

/// Skybox pass, without the group 1 declarations from
/// [`crate::environment::ENVIRONMENT_WGSL`].
pub const SKYBOX_SHADER_SOURCE: &str = r#"
@group(0) @binding(0)
var<uniform> inv_view_proj: mat4x4<f32>;

struct SkyOut {
    @builtin(position) position: vec4<f32>,
    @location(0) ray: vec3<f32>,
};

@vertex
fn vs_skybox(@builtin(vertex_index) index: u32) -> SkyOut {
    // (-1,-1) (3,-1) (-1,3)
    let corner = vec2<f32>(f32(index & 1u) * 4.0 - 1.0, f32(index >> 1u) * 4.0 - 1.0);
    let world = inv_view_proj * vec4<f32>(corner, 1.0, 1.0);

    var out: SkyOut;
    // depth 0 is the far plane with reversed depth
    out.position = vec4<f32>(corner, 0.0, 1.0);
    out.ray = world.xyz / world.w;
    return out;
}

@fragment
fn fs_skybox(in: SkyOut) -> @location(0) vec4<f32> {
    return vec4<f32>(sample_environment(in.ray), 1.0);
}
"#;

pub struct SkyboxRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform: wgpu::Buffer,
    uniform_group: wgpu::BindGroup,
    environment: EnvironmentBinding,
}

impl SkyboxRenderer {
    /// `depth_format` must match the pass the skybox is drawn in. Depth is
    /// neither tested nor written, so later geometry always wins.
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("skybox-shader"),
            source: wgpu::ShaderSource::Wgsl(with_environment(SKYBOX_SHADER_SOURCE).into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("skybox-uniform-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<SkyboxUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });
        let environment = EnvironmentBinding::new(device, "skybox-environment");

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("skybox-layout"),
            bind_group_layouts: &[&uniform_layout, environment.layout()],
            immediate_size: 0,
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("skybox-pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_skybox"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
                format,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_skybox"),
                targets: &[Some(color_format.into())],
                compilation_options: Default::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        let uniform = uniform_buffer(
            device,
            "skybox-uniform",
            &SkyboxUniform::new(Mat4::IDENTITY),
        );
        let uniform_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("skybox-uniform-group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            }],
        });
        log::debug!("Skybox pipeline built for {color_format:?}, depth {depth_format:?}");

        Self {
            pipeline,
            uniform,
            uniform_group,
            environment,
        }
    }

    /// Rebind to the renderer's `projection` target if it changed.
    pub fn bind_environment(
        &mut self,
        device: &wgpu::Device,
        renderer: &EquirectangularRenderer,
        projection: ProjectionKind,
    ) -> Result<bool, EquirectError> {
        self.environment.sync(device, renderer, projection)
    }

    /// Translation in `inv_view_proj` would make the sky drift with the
    /// camera, so pass the rotation-only inverse.
    pub fn update(&self, queue: &wgpu::Queue, inv_view_proj: Mat4) {
        queue.write_buffer(
            &self.uniform,
            0,
            bytemuck::bytes_of(&SkyboxUniform::new(inv_view_proj)),
        );
    }

    /// Draw first in the pass. Does nothing until an environment is bound.
    pub fn render(&self, pass: &mut wgpu::RenderPass<'_>) {
        let Some(environment) = self.environment.bind_group() else {
            return;
        };
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.uniform_group, &[]);
        pass.set_bind_group(1, environment, &[]);
        pass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluenoise::BlueNoise;
    use crate::render_target::RenderTarget;
    use envmap_render::{Camera, HeadlessContext, RenderPassBuilder, read_texture_rgba8};

    #[test]
    fn test_uniform_is_one_matrix() {
        assert_eq!(std::mem::size_of::<SkyboxUniform>(), 64);
    }

    #[test]
    fn test_skybox_overwrites_clear_color() {
        let Ok(ctx) = HeadlessContext::new_blocking() else {
            return;
        };
        let mut renderer =
            EquirectangularRenderer::new(&ctx.device, &ctx.queue, 64, 32, &BlueNoise::generate(0, 8))
                .unwrap();
        let target = RenderTarget::new(&ctx.device, ProjectionKind::Cartesian, 16, 16);
        let mut skybox = SkyboxRenderer::new(&ctx.device, RenderTarget::FORMAT, None);
        skybox
            .bind_environment(&ctx.device, &renderer, ProjectionKind::Equirectangular)
            .unwrap();
        let camera = Camera::default();
        skybox.update(&ctx.queue, camera.inverse_rotation_view_projection());

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        renderer.render(&ctx.queue, &mut encoder, &camera, 0.0).unwrap();
        {
            let mut pass = RenderPassBuilder::new()
                .clear_color(wgpu::Color::RED)
                .begin(&mut encoder, target.view());
            skybox.render(&mut pass);
        }
        ctx.queue.submit([encoder.finish()]);

        let image = read_texture_rgba8(&ctx.device, &ctx.queue, target.texture()).unwrap();
        assert!(
            image.pixels.chunks(4).any(|px| px != [255, 0, 0, 255]),
            "skybox should cover the red clear color"
        );
    }
}
