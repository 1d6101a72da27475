//! The demo scene: one equirectangular renderer feeding a skybox and an
//! environment-mapped object, with explicit construction and teardown.

use std::f64::consts::PI;

use envmap_config::{Config, ProjectionSetting, RenderConfig, Shape, SurfaceMode};
use envmap_mesh::{
    MeshData, PlaneParams, SphereParams, TorusKnotParams, plane, torus_knot, uv_sphere,
};
use envmap_nebula::{
    BlueNoise, EnvMapMaterial, EnvMapMode, EquirectError, EquirectangularRenderer,
    MaterialSettings, NoiseError, NoiseTexture, ProjectionKind, SkyboxRenderer, UniformUpdate,
};
use envmap_render::{Camera, DepthBuffer, MeshBuffer, RenderPassBuilder};
use glam::{Mat4, Vec3};
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::frame_clock::FrameTick;

/// Camera height as a fraction of the orbit distance.
const CAMERA_ELEVATION: f32 = 0.3;

pub fn projection_kind(setting: ProjectionSetting) -> ProjectionKind {
    match setting {
        ProjectionSetting::Equirectangular => ProjectionKind::Equirectangular,
        ProjectionSetting::Cartesian => ProjectionKind::Cartesian,
    }
}

pub fn envmap_mode(surface: SurfaceMode) -> EnvMapMode {
    match surface {
        SurfaceMode::Reflect => EnvMapMode::Reflect,
        SurfaceMode::Refract => EnvMapMode::Refract,
    }
}

/// Vertical offset of the object at `elapsed_ms`: one full bob every two seconds.
pub fn bob_offset(elapsed_ms: f64) -> f32 {
    (PI * elapsed_ms / 2000.0 * 2.0).sin() as f32
}

/// Camera position on the orbit circle at `angle` radians.
pub fn orbit_position(angle: f32, distance: f32) -> Vec3 {
    Vec3::new(
        angle.sin() * distance,
        distance * CAMERA_ELEVATION,
        angle.cos() * distance,
    )
}

pub fn shape_mesh(shape: Shape) -> MeshData {
    match shape {
        Shape::Sphere => uv_sphere(&SphereParams::default()),
        Shape::TorusKnot => torus_knot(&TorusKnotParams::default()),
        Shape::Plane => plane(&PlaneParams::default()),
    }
}

/// The configured PNG tile if one is set, otherwise a generated blue-noise tile.
pub fn load_noise(render: &RenderConfig) -> Result<NoiseTexture, NoiseError> {
    match &render.noise_path {
        Some(path) => NoiseTexture::from_png(path),
        None => Ok(BlueNoise::generate(render.noise_seed, render.noise_size)),
    }
}

fn clear_color(rgba: [f32; 4]) -> wgpu::Color {
    wgpu::Color {
        r: f64::from(rgba[0]),
        g: f64::from(rgba[1]),
        b: f64::from(rgba[2]),
        a: f64::from(rgba[3]),
    }
}

fn material_settings(config: &Config) -> MaterialSettings {
    MaterialSettings {
        mode: envmap_mode(config.scene.surface),
        refraction_index: config.scene.refraction_index,
        ..MaterialSettings::default()
    }
}

/// Owns everything drawn each frame.
pub struct SceneContext {
    renderer: EquirectangularRenderer,
    depth: DepthBuffer,
    camera: Camera,
    skybox: SkyboxRenderer,
    material: EnvMapMaterial,
    mesh: MeshBuffer,
    shape: Shape,
    projection: ProjectionKind,
    show_quad: bool,
    orbit_speed: f32,
    orbit_angle: f32,
    camera_distance: f32,
    model: Mat4,
    clear_color: wgpu::Color,
    render_config: RenderConfig,
}

impl SceneContext {
    /// Build the scene for a `surface_format` target of `width x height`.
    ///
    /// The environment targets start at the configured target size.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        config: &Config,
    ) -> Result<Self, AppError> {
        let noise = load_noise(&config.render)?;
        let projection = projection_kind(config.scene.projection);

        let mut renderer = EquirectangularRenderer::new(
            device,
            queue,
            config.render.target_width,
            config.render.target_height,
            &noise,
        )?;
        renderer.prepare_display(device, surface_format, Some(DepthBuffer::FORMAT))?;
        renderer.update_uniforms(
            device,
            queue,
            [UniformUpdate::Equirected(projection.is_equirected())],
        )?;

        let mut camera = Camera::default();
        camera.set_aspect_ratio(width as f32, height as f32);
        camera.look_at(orbit_position(0.0, config.scene.camera_distance), Vec3::ZERO);

        let mesh = shape_mesh(config.scene.shape).upload(device, "scene-shape");
        info!(
            "Scene ready: {:?}, {projection} environment, {}x{} targets",
            config.scene.shape, config.render.target_width, config.render.target_height
        );

        Ok(Self {
            renderer,
            depth: DepthBuffer::new(device, width, height),
            camera,
            skybox: SkyboxRenderer::new(device, surface_format, Some(DepthBuffer::FORMAT)),
            material: EnvMapMaterial::new(device, surface_format, material_settings(config)),
            mesh,
            shape: config.scene.shape,
            projection,
            show_quad: config.scene.show_quad,
            orbit_speed: config.scene.orbit_speed,
            orbit_angle: 0.0,
            camera_distance: config.scene.camera_distance,
            model: Mat4::IDENTITY,
            clear_color: clear_color(config.render.clear_color),
            render_config: config.render.clone(),
        })
    }

    /// Advance the camera orbit and the object bob to `tick`.
    pub fn update(&mut self, tick: &FrameTick) {
        self.orbit_angle += self.orbit_speed * tick.dt as f32;
        self.camera.look_at(
            orbit_position(self.orbit_angle, self.camera_distance),
            Vec3::ZERO,
        );
        self.model = Mat4::from_translation(Vec3::Y * bob_offset(tick.elapsed_ms));
    }

    /// Record the environment passes and then the scene pass into `view`.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        elapsed_ms: f64,
    ) -> Result<(), EquirectError> {
        self.renderer.render(queue, encoder, &self.camera, elapsed_ms)?;

        self.material
            .bind_environment(device, &self.renderer, self.projection)?;
        self.skybox
            .bind_environment(device, &self.renderer, self.projection)?;
        self.material.update(queue, &self.camera, self.model);
        self.skybox
            .update(queue, self.camera.inverse_rotation_view_projection());

        let mut pass = RenderPassBuilder::new()
            .clear_color(self.clear_color)
            .depth(&self.depth.view, DepthBuffer::CLEAR_VALUE)
            .label("scene-pass")
            .begin(encoder, view);
        self.skybox.render(&mut pass);
        self.material.draw(&mut pass, &self.mesh);
        if self.show_quad {
            self.renderer.draw_display(&mut pass)?;
        }
        Ok(())
    }

    /// Follow a window resize. The environment targets keep a 2:1 aspect
    /// at the window's width. Zero-sized (minimized) windows are ignored.
    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
    ) -> Result<(), EquirectError> {
        if width < 2 || height == 0 {
            debug!("Ignoring resize to {width}x{height}");
            return Ok(());
        }
        self.depth.resize(device, width, height);
        self.camera.set_aspect_ratio(width as f32, height as f32);
        self.renderer.resize(device, queue, width, width / 2)
    }

    /// Switch which target the skybox and material sample.
    pub fn toggle_projection(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<ProjectionKind, EquirectError> {
        self.set_projection(device, queue, self.projection.toggle())?;
        Ok(self.projection)
    }

    fn set_projection(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        projection: ProjectionKind,
    ) -> Result<(), EquirectError> {
        self.renderer.update_uniforms(
            device,
            queue,
            [UniformUpdate::Equirected(projection.is_equirected())],
        )?;
        if projection != self.projection {
            info!("Environment projection: {projection}");
        }
        self.projection = projection;
        Ok(())
    }

    pub fn toggle_quad(&mut self) -> bool {
        self.show_quad = !self.show_quad;
        info!("Direct quad display: {}", self.show_quad);
        self.show_quad
    }

    pub fn cycle_shape(&mut self, device: &wgpu::Device) -> Shape {
        self.set_shape(device, self.shape.next());
        self.shape
    }

    fn set_shape(&mut self, device: &wgpu::Device, shape: Shape) {
        if shape == self.shape {
            return;
        }
        let mesh = shape_mesh(shape).upload(device, "scene-shape");
        let old = std::mem::replace(&mut self.mesh, mesh);
        old.destroy();
        self.shape = shape;
        info!("Shape: {shape:?}");
    }

    /// Apply a reloaded config without rebuilding the scene.
    ///
    /// A changed noise source is regenerated and pushed through the
    /// renderer's `bluenoise` uniform. Target size stays tied to the window.
    pub fn apply_config(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        config: &Config,
    ) -> Result<(), AppError> {
        self.set_shape(device, config.scene.shape);
        self.set_projection(device, queue, projection_kind(config.scene.projection))?;
        self.material.set_mode(envmap_mode(config.scene.surface));
        self.material
            .set_refraction_index(config.scene.refraction_index);
        self.show_quad = config.scene.show_quad;
        self.orbit_speed = config.scene.orbit_speed;
        self.camera_distance = config.scene.camera_distance;
        self.clear_color = clear_color(config.render.clear_color);

        let noise_changed = config.render.noise_seed != self.render_config.noise_seed
            || config.render.noise_size != self.render_config.noise_size
            || config.render.noise_path != self.render_config.noise_path;
        if noise_changed {
            match load_noise(&config.render) {
                Ok(noise) => {
                    self.renderer
                        .update_uniforms(device, queue, [UniformUpdate::BlueNoise(noise)])?;
                }
                Err(e) => warn!("Keeping previous noise texture: {e}"),
            }
        }
        self.render_config = config.render.clone();
        Ok(())
    }

    /// Release the renderer's GPU resources and the shape mesh.
    pub fn dispose(&mut self) -> Result<(), EquirectError> {
        self.renderer.dispose()?;
        self.mesh.destroy();
        info!("Scene disposed");
        Ok(())
    }

    pub fn renderer(&self) -> &EquirectangularRenderer {
        &self.renderer
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn model(&self) -> Mat4 {
        self.model
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn projection(&self) -> ProjectionKind {
        self.projection
    }

    pub fn show_quad(&self) -> bool {
        self.show_quad
    }

    pub fn material_settings(&self) -> &MaterialSettings {
        self.material.settings()
    }
}

impl Drop for SceneContext {
    fn drop(&mut self) {
        if !self.renderer.is_disposed() {
            let _ = self.dispose();
        }
    }
}
