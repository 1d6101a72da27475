//! Environment-mapped surface material.
//!
//! Each fragment bends the view ray about the surface normal (mirror
//! reflection or refraction), looks the result up in the bound
//! equirectangular target and adds it to a flat base color, weighted by how
//! directly the surface faces the camera.

use bytemuck::{Pod, Zeroable};
use envmap_render::{Camera, DepthBuffer, MeshBuffer, VertexPositionNormalUv, uniform_buffer};
use glam::{Mat4, Vec3};

use crate::environment::{EnvironmentBinding, with_environment};
use crate::equirect::EquirectangularRenderer;
use crate::error::EquirectError;
use crate::uniforms::ProjectionKind;

/// WGSL source for the environment-map material, without the group 1
/// declarations from [`crate::environment::ENVIRONMENT_WGSL`].
pub const ENVMAP_SHADER_SOURCE: &str = r#"
struct MaterialUniform {
    view_proj: mat4x4<f32>,
    model: mat4x4<f32>,
    camera_pos: vec4<f32>,
    base_color: vec4<f32>,
    // x = 1 for refraction, y = eta (incident / transmitted IOR)
    params: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> material: MaterialUniform;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

@vertex
fn vs_envmap(
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
) -> VertexOutput {
    let world = material.model * vec4<f32>(position, 1.0);
    var out: VertexOutput;
    out.clip_position = material.view_proj * world;
    out.world_position = world.xyz;
    out.normal = (material.model * vec4<f32>(normal, 0.0)).xyz;
    return out;
}

@fragment
fn fs_envmap(in: VertexOutput) -> @location(0) vec4<f32> {
    let n = normalize(in.normal);
    let to_camera = normalize(material.camera_pos.xyz - in.world_position);
    let incident = -to_camera;

    var dir = reflect(incident, n);
    if material.params.x > 0.5 {
        let bent = refract(incident, n, material.params.y);
        // Total internal reflection yields a zero vector.
        if dot(bent, bent) > 1e-8 {
            dir = bent;
        }
    }

    let env = sample_environment(dir);
    let facing = max(dot(n, to_camera), 0.0);
    return vec4<f32>(material.base_color.rgb + env * facing, 1.0);
}
"#;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MaterialUniform {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub base_color: [f32; 4],
    pub params: [f32; 4],
}

/// How the view ray is bent at the surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvMapMode {
    Reflect,
    Refract,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialSettings {
    pub base_color: Vec3,
    pub mode: EnvMapMode,
    /// Index of refraction of the material, relative to the surrounding medium.
    pub refraction_index: f32,
}

impl Default for MaterialSettings {
    fn default() -> Self {
        Self {
            base_color: Vec3::new(0.5, 0.2, 0.5),
            mode: EnvMapMode::Reflect,
            refraction_index: 1.33,
        }
    }
}

impl MaterialSettings {
    pub fn to_uniform(&self, camera: &Camera, model: Mat4) -> MaterialUniform {
        let refract = match self.mode {
            EnvMapMode::Reflect => 0.0,
            EnvMapMode::Refract => 1.0,
        };
        MaterialUniform {
            view_proj: camera.view_projection_matrix().to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            camera_pos: camera.position.extend(1.0).to_array(),
            base_color: self.base_color.extend(1.0).to_array(),
            params: [refract, 1.0 / self.refraction_index.max(1e-3), 0.0, 0.0],
        }
    }
}

/// Mirror `incident` about `normal`.
pub fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - 2.0 * normal.dot(incident) * normal
}

/// Snell refraction with `eta = n1 / n2`; zero on total internal reflection.
pub fn refract(incident: Vec3, normal: Vec3, eta: f32) -> Vec3 {
    let cos_i = normal.dot(incident);
    let k = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
    if k < 0.0 {
        return Vec3::ZERO;
    }
    eta * incident - (eta * cos_i + k.sqrt()) * normal
}

/// The lookup direction the fragment shader uses.
pub fn environment_direction(incident: Vec3, normal: Vec3, settings: &MaterialSettings) -> Vec3 {
    let reflected = reflect(incident, normal);
    match settings.mode {
        EnvMapMode::Reflect => reflected,
        EnvMapMode::Refract => {
            let bent = refract(incident, normal, 1.0 / settings.refraction_index);
            if bent.length_squared() > 1e-8 { bent } else { reflected }
        }
    }
}

/// Environment-mapped mesh material.
pub struct EnvMapMaterial {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    environment: EnvironmentBinding,
    settings: MaterialSettings,
}

impl EnvMapMaterial {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat, settings: MaterialSettings) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("envmap-shader"),
            source: wgpu::ShaderSource::Wgsl(with_environment(ENVMAP_SHADER_SOURCE).into()),
        });

        let uniform_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("envmap-uniform-bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(
                        std::mem::size_of::<MaterialUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });
        let environment = EnvironmentBinding::new(device, "envmap-environment");

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("envmap-pipeline-layout"),
            bind_group_layouts: &[&uniform_bgl, environment.layout()],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("envmap-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_envmap"),
                buffers: &[VertexPositionNormalUv::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(DepthBuffer::stencil_state(true)),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_envmap"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        let uniform_buffer = uniform_buffer(
            device,
            "envmap-uniform",
            &settings.to_uniform(&Camera::default(), Mat4::IDENTITY),
        );
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("envmap-uniform-bg"),
            layout: &uniform_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        log::info!("Envmap material initialized ({:?})", settings.mode);

        Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            environment,
            settings,
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

    /// Upload camera, model transform and settings.
    pub fn update(&self, queue: &wgpu::Queue, camera: &Camera, model: Mat4) {
        let uniform = self.settings.to_uniform(camera, model);
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    pub fn settings(&self) -> &MaterialSettings {
        &self.settings
    }

    pub fn set_mode(&mut self, mode: EnvMapMode) {
        self.settings.mode = mode;
    }

    pub fn set_refraction_index(&mut self, refraction_index: f32) {
        self.settings.refraction_index = refraction_index;
    }

    /// Draw `mesh`. Skipped until an environment has been bound.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, mesh: &MeshBuffer) {
        let Some(environment) = self.environment.bind_group() else {
            return;
        };
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        pass.set_bind_group(1, environment, &[]);
        mesh.bind(pass);
        mesh.draw(pass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluenoise::BlueNoise;
    use envmap_render::{HeadlessContext, RenderPassBuilder, read_texture_rgba8};

    #[test]
    fn test_uniform_size() {
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 176);
    }

    #[test]
    fn test_reflect_head_on_returns_to_viewer() {
        let dir = reflect(Vec3::NEG_Z, Vec3::Z);
        assert!((dir - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_refract_unit_eta_passes_straight_through() {
        let incident = Vec3::new(1.0, -1.0, 0.0).normalize();
        let dir = refract(incident, Vec3::Y, 1.0);
        assert!((dir - incident).length() < 1e-5);
    }

    #[test]
    fn test_refract_bends_toward_normal_entering_denser_medium() {
        let incident = Vec3::new(1.0, -1.0, 0.0).normalize();
        let dir = refract(incident, Vec3::Y, 1.0 / 1.33);
        assert!(dir.x < incident.x, "ray should bend toward -Y");
        assert!((dir.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_total_internal_reflection_falls_back_to_mirror() {
        let settings = MaterialSettings {
            mode: EnvMapMode::Refract,
            refraction_index: 0.5,
            ..MaterialSettings::default()
        };
        let incident = Vec3::new(1.0, -0.2, 0.0).normalize();
        assert_eq!(refract(incident, Vec3::Y, 2.0), Vec3::ZERO);
        assert_eq!(
            environment_direction(incident, Vec3::Y, &settings),
            reflect(incident, Vec3::Y)
        );
    }

    #[test]
    fn test_uniform_encodes_mode_and_eta() {
        let settings = MaterialSettings {
            mode: EnvMapMode::Refract,
            refraction_index: 2.0,
            ..MaterialSettings::default()
        };
        let uniform = settings.to_uniform(&Camera::default(), Mat4::IDENTITY);
        assert_eq!(uniform.params[0], 1.0);
        assert_eq!(uniform.params[1], 0.5);
        assert_eq!(uniform.base_color, [0.5, 0.2, 0.5, 1.0]);
    }

    #[test]
    fn test_uniform_buffer_is_writable_each_frame() {
        let Ok(ctx) = HeadlessContext::new_blocking() else {
            return;
        };
        let material = EnvMapMaterial::new(
            &ctx.device,
            wgpu::TextureFormat::Rgba8Unorm,
            MaterialSettings::default(),
        );
        let buffer = &material.uniform_buffer;
        assert_eq!(buffer.size(), std::mem::size_of::<MaterialUniform>() as u64);
        assert!(
            buffer
                .usage()
                .contains(wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST)
        );
    }

    #[test]
    fn test_draws_sphere_with_environment() {
        let Ok(ctx) = HeadlessContext::new_blocking() else {
            return;
        };
        let mut renderer =
            EquirectangularRenderer::new(&ctx.device, &ctx.queue, 64, 32, &BlueNoise::generate(0, 8))
                .unwrap();
        let format = wgpu::TextureFormat::Rgba8Unorm;
        let mut material = EnvMapMaterial::new(&ctx.device, format, MaterialSettings::default());
        assert!(material
            .bind_environment(&ctx.device, &renderer, ProjectionKind::Equirectangular)
            .unwrap());

        let sphere = envmap_mesh::uv_sphere(&envmap_mesh::SphereParams::default()).upload(&ctx.device, "sphere");
        let color = crate::render_target::RenderTarget::new(&ctx.device, ProjectionKind::Cartesian, 32, 32);
        let depth = DepthBuffer::new(&ctx.device, 32, 32);
        let mut camera = Camera::default();
        camera.set_aspect_ratio(1.0, 1.0);
        camera.look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        material.update(&ctx.queue, &camera, Mat4::IDENTITY);

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        renderer.render(&ctx.queue, &mut encoder, &camera, 0.0).unwrap();
        {
            let mut pass = RenderPassBuilder::new()
                .depth(&depth.view, DepthBuffer::CLEAR_VALUE)
                .begin(&mut encoder, color.view());
            material.draw(&mut pass, &sphere);
        }
        ctx.queue.submit([encoder.finish()]);

        let image = read_texture_rgba8(&ctx.device, &ctx.queue, color.texture()).unwrap();
        let center = image.pixel(16, 16);
        let corner = image.pixel(0, 0);
        assert_eq!(corner, [0, 0, 0, 255], "background should stay clear");
        assert!(center[0] >= 127, "sphere should carry the base color, got {center:?}");
    }
}
