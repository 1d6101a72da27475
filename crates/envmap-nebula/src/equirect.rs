//! Equirectangular renderer: paints the nebula program into two offscreen
//! targets per frame, one per [`ProjectionKind`], for use as live
//! environment maps.
//!
//! Both passes share one pipeline and one fullscreen quad. Each pass reads its
//! own uniform buffer, and a third buffer backs the optional on-screen display
//! of the quad, so recording the second pass never disturbs the first.

use envmap_render::{
    CLEAR_BLACK, Camera, GpuTexture, IndexData, MeshBuffer, RenderPassBuilder, VertexPositionUv,
    repeat_sampler, uniform_buffer,
};

use crate::bluenoise::NoiseTexture;
use crate::error::EquirectError;
use crate::render_target::RenderTarget;
use crate::uniforms::{EquirectUniform, ProjectionKind, UniformState, UniformUpdate};

/// WGSL source for the nebula program.
pub const NEBULA_SHADER_SOURCE: &str = r#"
struct EquirectUniform {
    resolution: vec2<f32>,
    time: f32,
    equirected: u32,
};

@group(0) @binding(0)
var<uniform> params: EquirectUniform;

@group(1) @binding(0)
var noise_texture: texture_2d<f32>;
@group(1) @binding(1)
var noise_sampler: sampler;

const PI: f32 = 3.141592653589793;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_quad(@location(0) position: vec3<f32>, @location(1) uv: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>(position, 1.0);
    out.uv = uv;
    return out;
}

fn to_spherical(uv: vec2<f32>) -> vec3<f32> {
    let theta = uv.x * 2.0 * PI;
    let phi = uv.y * PI;
    return normalize(vec3<f32>(sin(phi) * cos(theta), cos(phi), sin(phi) * sin(theta)));
}

@fragment
fn fs_nebula(in: VertexOutput) -> @location(0) vec4<f32> {
    let coord = (in.uv - 0.5) * vec2<f32>(params.resolution.x / params.resolution.y, 1.0);
    let jitter = textureSample(noise_texture, noise_sampler, coord).r * 0.05;

    var dir = vec3<f32>(coord, 0.5);
    if params.equirected != 0u {
        dir = to_spherical(in.uv);
    }

    let c = cos(params.time * 0.2 + vec4<f32>(0.0, 33.0, 11.0, 0.0));
    let rot = mat2x2<f32>(c.x, c.y, c.z, c.w);

    var color = vec4<f32>(0.0);
    var r = 0.0;
    for (var i = 0; i < 44; i++) {
        var p = r * dir;
        p.z -= 2.0;
        let d = length(p);
        p /= d * 0.2;
        let xz = p.xz * rot;
        p = vec3<f32>(xz.x, p.y, xz.y);

        let s = min(d - 0.3, jitter) + 0.1;
        r += s;
        let g = sin(p.x + cos(p.y) * cos(p.z)) * sin(p.z + sin(p.y) * cos(p.x + params.time));
        color += 0.05 / (0.4 + s)
            * mix(smoothstep(0.5, 0.7, g), 1.0, 0.05 / (d * d))
            * (1.0 - smoothstep(0.0, 5.0, d))
            * (1.0 + cos(r * 3.0 + vec4<f32>(0.0, 1.0, 2.0, 0.0)));
    }
    return vec4<f32>(color.rgb, 1.0);
}
"#;

/// Fullscreen quad in clip space; `uv` origin is bottom-left.
const QUAD_VERTICES: [VertexPositionUv; 4] = [
    VertexPositionUv {
        position: [-1.0, -1.0, 0.0],
        uv: [0.0, 0.0],
    },
    VertexPositionUv {
        position: [1.0, -1.0, 0.0],
        uv: [1.0, 0.0],
    },
    VertexPositionUv {
        position: [1.0, 1.0, 0.0],
        uv: [1.0, 1.0],
    },
    VertexPositionUv {
        position: [-1.0, 1.0, 0.0],
        uv: [0.0, 1.0],
    },
];

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

const UNIFORM_SIZE: u64 = std::mem::size_of::<EquirectUniform>() as u64;

/// Lifecycle of the renderer.
///
/// `Rendering` is only held while `render` records its passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RendererState {
    Constructed,
    Idle,
    Rendering(ProjectionKind),
    Disposed,
}

/// Where draw output currently goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Destination {
    /// The caller's surface (or nothing, headless).
    Default,
    Target(ProjectionKind),
}

struct UniformSlot {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl UniformSlot {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str, value: &EquirectUniform) -> Self {
        let buffer = uniform_buffer(device, label, value);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }

    fn write(&self, queue: &wgpu::Queue, value: &EquirectUniform) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(value));
    }
}

struct DisplayPipeline {
    color_format: wgpu::TextureFormat,
    depth_format: Option<wgpu::TextureFormat>,
    pipeline: wgpu::RenderPipeline,
}

struct Resources {
    shader: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    pipeline: wgpu::RenderPipeline,
    display: Option<DisplayPipeline>,
    noise_layout: wgpu::BindGroupLayout,
    noise_sampler: wgpu::Sampler,
    noise: GpuTexture,
    noise_bind_group: wgpu::BindGroup,
    quad: MeshBuffer,
    equirect_target: RenderTarget,
    cartesian_target: RenderTarget,
    equirect_uniform: UniformSlot,
    cartesian_uniform: UniformSlot,
    display_uniform: UniformSlot,
}

impl Resources {
    fn target(&self, kind: ProjectionKind) -> &RenderTarget {
        match kind {
            ProjectionKind::Equirectangular => &self.equirect_target,
            ProjectionKind::Cartesian => &self.cartesian_target,
        }
    }

    fn slot(&self, kind: ProjectionKind) -> &UniformSlot {
        match kind {
            ProjectionKind::Equirectangular => &self.equirect_uniform,
            ProjectionKind::Cartesian => &self.cartesian_uniform,
        }
    }

    fn write_uniforms(&self, queue: &wgpu::Queue, state: &UniformState) {
        for kind in ProjectionKind::ALL {
            self.slot(kind).write(queue, &state.for_pass(kind));
        }
        self.display_uniform.write(queue, &state.display());
    }

    fn destroy(&self) {
        self.equirect_target.destroy();
        self.cartesian_target.destroy();
        self.equirect_uniform.buffer.destroy();
        self.cartesian_uniform.buffer.destroy();
        self.display_uniform.buffer.destroy();
        self.noise.texture.destroy();
        self.quad.destroy();
    }
}

/// Renders the nebula program into an equirectangular and a cartesian target.
pub struct EquirectangularRenderer {
    resources: Option<Resources>,
    uniforms: UniformState,
    state: RendererState,
    destination: Destination,
    generation: u64,
}

impl EquirectangularRenderer {
    /// Allocate both targets at `width x height`, compile the program and
    /// build the quad. Uniforms start at `time = 0`, `equirected = true`.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        noise: &NoiseTexture,
    ) -> Result<Self, EquirectError> {
        validate_dimensions(width, height)?;
        let uniforms = UniformState::new(width, height);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("nebula-shader"),
            source: wgpu::ShaderSource::Wgsl(NEBULA_SHADER_SOURCE.into()),
        });

        // Uniform bind group layout (group 0)
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("nebula-uniform-bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(UNIFORM_SIZE),
                },
                count: None,
            }],
        });

        // Noise bind group layout (group 1)
        let noise_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("nebula-noise-bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("nebula-pipeline-layout"),
            bind_group_layouts: &[&uniform_layout, &noise_layout],
            immediate_size: 0,
        });

        let pipeline = build_pipeline(
            device,
            &pipeline_layout,
            &shader,
            "nebula-pipeline",
            RenderTarget::FORMAT,
            None,
        );

        let noise_sampler = repeat_sampler(device, "nebula-noise-sampler", wgpu::FilterMode::Nearest);
        let noise_texture = noise.upload(device, queue)?;
        let noise_bind_group = noise_bind_group(device, &noise_layout, &noise_texture, &noise_sampler);

        let quad = MeshBuffer::upload(device, "nebula-quad", &QUAD_VERTICES, IndexData::U16(&QUAD_INDICES));

        let resources = Resources {
            equirect_target: RenderTarget::new(device, ProjectionKind::Equirectangular, width, height),
            cartesian_target: RenderTarget::new(device, ProjectionKind::Cartesian, width, height),
            equirect_uniform: UniformSlot::new(
                device,
                &uniform_layout,
                "nebula-equirect-uniform",
                &uniforms.for_pass(ProjectionKind::Equirectangular),
            ),
            cartesian_uniform: UniformSlot::new(
                device,
                &uniform_layout,
                "nebula-cartesian-uniform",
                &uniforms.for_pass(ProjectionKind::Cartesian),
            ),
            display_uniform: UniformSlot::new(device, &uniform_layout, "nebula-display-uniform", &uniforms.display()),
            shader,
            pipeline_layout,
            pipeline,
            display: None,
            noise_layout,
            noise_sampler,
            noise: noise_texture,
            noise_bind_group,
            quad,
        };

        log::info!(
            "Equirectangular renderer initialized: {width}x{height} targets, {}x{} noise",
            noise.width(),
            noise.height()
        );

        Ok(Self {
            resources: Some(resources),
            uniforms,
            state: RendererState::Constructed,
            destination: Destination::Default,
            generation: 0,
        })
    }

    fn resources(&self) -> Result<&Resources, EquirectError> {
        self.resources.as_ref().ok_or(EquirectError::Disposed)
    }

    /// Apply uniform overwrites in order.
    ///
    /// `Time` and `Equirected` feed the display quad; the next `render`
    /// supersedes `Time`. `BlueNoise` replaces the noise for every pass.
    /// `Resolution` resizes both targets.
    pub fn update_uniforms(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        updates: impl IntoIterator<Item = UniformUpdate>,
    ) -> Result<(), EquirectError> {
        self.resources()?;
        for update in updates {
            match update {
                UniformUpdate::Time(seconds) => self.uniforms.time = seconds,
                UniformUpdate::Equirected(flag) => self.uniforms.equirected = flag,
                UniformUpdate::BlueNoise(noise) => self.replace_noise(device, queue, &noise)?,
                UniformUpdate::Resolution(width, height) => self.resize(device, queue, width, height)?,
            }
        }
        self.resources()?.write_uniforms(queue, &self.uniforms);
        Ok(())
    }

    fn replace_noise(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        noise: &NoiseTexture,
    ) -> Result<(), EquirectError> {
        let resources = self.resources.as_mut().ok_or(EquirectError::Disposed)?;
        let texture = noise.upload(device, queue)?;
        resources.noise_bind_group =
            noise_bind_group(device, &resources.noise_layout, &texture, &resources.noise_sampler);
        let old = std::mem::replace(&mut resources.noise, texture);
        old.texture.destroy();
        log::debug!("Swapped noise texture ({}x{})", noise.width(), noise.height());
        Ok(())
    }

    /// Record both projection passes into `encoder`.
    ///
    /// `time_ms` is milliseconds and becomes the `time` uniform in seconds.
    /// The camera is accepted for parity with other scene renderers; the
    /// fullscreen program does not read it.
    pub fn render(
        &mut self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        _camera: &Camera,
        time_ms: f64,
    ) -> Result<(), EquirectError> {
        let resources = self.resources.as_ref().ok_or(EquirectError::Disposed)?;
        self.uniforms.time = (time_ms / 1000.0) as f32;
        resources.write_uniforms(queue, &self.uniforms);

        for kind in ProjectionKind::ALL {
            self.state = RendererState::Rendering(kind);
            self.destination = Destination::Target(kind);

            let mut pass = RenderPassBuilder::new()
                .clear_color(CLEAR_BLACK)
                .label(match kind {
                    ProjectionKind::Equirectangular => "nebula-equirect-pass",
                    ProjectionKind::Cartesian => "nebula-cartesian-pass",
                })
                .begin(encoder, resources.target(kind).view());
            pass.set_pipeline(&resources.pipeline);
            pass.set_bind_group(0, &resources.slot(kind).bind_group, &[]);
            pass.set_bind_group(1, &resources.noise_bind_group, &[]);
            resources.quad.bind(&mut pass);
            resources.quad.draw(&mut pass);
        }

        self.destination = Destination::Default;
        self.state = RendererState::Idle;
        Ok(())
    }

    /// The target painted with `kind`.
    pub fn texture(&self, kind: ProjectionKind) -> Result<&RenderTarget, EquirectError> {
        Ok(self.resources()?.target(kind))
    }

    /// String form of [`texture`](Self::texture): `"equirectangular"` or `"cartesian"`.
    pub fn texture_by_name(&self, name: &str) -> Result<&RenderTarget, EquirectError> {
        let kind: ProjectionKind = name.parse()?;
        self.texture(kind)
    }

    /// The fullscreen quad.
    pub fn mesh(&self) -> Result<&MeshBuffer, EquirectError> {
        Ok(&self.resources()?.quad)
    }

    /// Build (or rebuild) the pipeline used by [`draw_display`](Self::draw_display)
    /// for an on-screen pass with the given attachments.
    pub fn prepare_display(
        &mut self,
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Result<(), EquirectError> {
        let resources = self.resources.as_mut().ok_or(EquirectError::Disposed)?;
        let current = resources
            .display
            .as_ref()
            .map(|display| (display.color_format, display.depth_format));
        if current == Some((color_format, depth_format)) {
            return Ok(());
        }
        let pipeline = build_pipeline(
            device,
            &resources.pipeline_layout,
            &resources.shader,
            "nebula-display-pipeline",
            color_format,
            depth_format,
        );
        resources.display = Some(DisplayPipeline {
            color_format,
            depth_format,
            pipeline,
        });
        Ok(())
    }

    /// Draw the quad into `pass` with the display uniforms.
    pub fn draw_display(&self, pass: &mut wgpu::RenderPass<'_>) -> Result<(), EquirectError> {
        let resources = self.resources()?;
        let display = resources
            .display
            .as_ref()
            .ok_or(EquirectError::DisplayNotPrepared)?;
        pass.set_pipeline(&display.pipeline);
        pass.set_bind_group(0, &resources.display_uniform.bind_group, &[]);
        pass.set_bind_group(1, &resources.noise_bind_group, &[]);
        resources.quad.bind(pass);
        resources.quad.draw(pass);
        Ok(())
    }

    /// Reallocate both targets and update `resolution`.
    ///
    /// Bumps [`generation`](Self::generation) when the size changes, since
    /// previously borrowed views no longer refer to the live targets.
    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
    ) -> Result<(), EquirectError> {
        let resources = self.resources.as_mut().ok_or(EquirectError::Disposed)?;
        validate_dimensions(width, height)?;

        let a = resources.equirect_target.resize(device, width, height);
        let b = resources.cartesian_target.resize(device, width, height);
        self.uniforms.width = width;
        self.uniforms.height = height;
        resources.write_uniforms(queue, &self.uniforms);

        if a || b {
            self.generation += 1;
            log::debug!(
                "Equirectangular targets resized to {width}x{height} (generation {})",
                self.generation
            );
        }
        Ok(())
    }

    /// Release every GPU resource. Later calls fail with [`EquirectError::Disposed`].
    pub fn dispose(&mut self) -> Result<(), EquirectError> {
        let resources = self.resources.take().ok_or(EquirectError::Disposed)?;
        resources.destroy();
        self.state = RendererState::Disposed;
        self.destination = Destination::Default;
        log::info!("Equirectangular renderer disposed");
        Ok(())
    }

    pub fn is_disposed(&self) -> bool {
        self.resources.is_none()
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn destination(&self) -> Destination {
        self.destination
    }

    /// Incremented whenever the targets are reallocated.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Current scalar uniform values.
    pub fn uniforms(&self) -> &UniformState {
        &self.uniforms
    }

    pub fn size(&self) -> (u32, u32) {
        (self.uniforms.width, self.uniforms.height)
    }
}

fn validate_dimensions(width: u32, height: u32) -> Result<(), EquirectError> {
    if width == 0 || height == 0 {
        return Err(EquirectError::ZeroDimensions { width, height });
    }
    Ok(())
}

fn noise_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    noise: &GpuTexture,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("nebula-noise-bg"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&noise.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

fn build_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    label: &str,
    color_format: wgpu::TextureFormat,
    depth_format: Option<wgpu::TextureFormat>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_quad"),
            buffers: &[VertexPositionUv::layout()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        // Drawn over whatever is there; never occluded, never occludes.
        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Always,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_nebula"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview_mask: None,
        cache: None,
    })
}
