//! Bind group for sampling one of the renderer's targets, rebuilt only when
//! the renderer reallocates its targets or a different projection is chosen.

use envmap_render::panorama_sampler;

use crate::equirect::EquirectangularRenderer;
use crate::error::EquirectError;
use crate::uniforms::ProjectionKind;

/// WGSL declarations for group 1 as laid out by [`EnvironmentBinding`], plus
/// `sample_environment(dir)`. Prepended to shaders with [`with_environment`].
/// The direction mapping matches [`crate::raymarch::from_spherical`].
pub const ENVIRONMENT_WGSL: &str = r#"
@group(1) @binding(0)
var env_texture: texture_2d<f32>;
@group(1) @binding(1)
var env_sampler: sampler;

const ENV_PI: f32 = 3.141592653589793;

fn sample_environment(dir: vec3<f32>) -> vec3<f32> {
    let d = normalize(dir);
    let uv = vec2<f32>(
        atan2(d.z, d.x) / (2.0 * ENV_PI) + 0.5,
        1.0 - acos(clamp(d.y, -1.0, 1.0)) / ENV_PI,
    );
    return textureSampleLevel(env_texture, env_sampler, fract(uv), 0.0).rgb;
}
"#;

/// `shader` with the environment bindings and sampling function prepended.
pub fn with_environment(shader: &str) -> String {
    [ENVIRONMENT_WGSL, shader].concat()
}

/// Identifies which target view a bind group was built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindingKey {
    pub generation: u64,
    pub projection: ProjectionKind,
}

pub struct EnvironmentBinding {
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    bind_group: Option<wgpu::BindGroup>,
    key: Option<BindingKey>,
    label: &'static str,
}

impl EnvironmentBinding {
    pub fn new(device: &wgpu::Device, label: &'static str) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
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
        let sampler = panorama_sampler(device, label);

        Self {
            layout,
            sampler,
            bind_group: None,
            key: None,
            label,
        }
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn needs_rebind(&self, key: BindingKey) -> bool {
        self.key != Some(key)
    }

    /// Point at `renderer`'s `projection` target, rebuilding the bind group
    /// if it is stale. Returns whether a rebuild happened.
    pub fn sync(
        &mut self,
        device: &wgpu::Device,
        renderer: &EquirectangularRenderer,
        projection: ProjectionKind,
    ) -> Result<bool, EquirectError> {
        let key = BindingKey {
            generation: renderer.generation(),
            projection,
        };
        if !self.needs_rebind(key) {
            return Ok(false);
        }
        let target = renderer.texture(projection)?;
        self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(self.label),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(target.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        }));
        self.key = Some(key);
        log::debug!("{} bound to {projection} (generation {})", self.label, key.generation);
        Ok(true)
    }

    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref()
    }

    pub fn key(&self) -> Option<BindingKey> {
        self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluenoise::BlueNoise;
    use envmap_render::HeadlessContext;

    #[test]
    fn test_rebinds_on_generation_or_projection_change() {
        let Ok(ctx) = HeadlessContext::new_blocking() else {
            return;
        };
        let mut renderer =
            EquirectangularRenderer::new(&ctx.device, &ctx.queue, 32, 16, &BlueNoise::generate(0, 8))
                .unwrap();
        let mut binding = EnvironmentBinding::new(&ctx.device, "test-env");
        assert!(binding.bind_group().is_none());

        assert!(binding.sync(&ctx.device, &renderer, ProjectionKind::Equirectangular).unwrap());
        assert!(!binding.sync(&ctx.device, &renderer, ProjectionKind::Equirectangular).unwrap());
        assert!(binding.sync(&ctx.device, &renderer, ProjectionKind::Cartesian).unwrap());

        renderer.resize(&ctx.device, &ctx.queue, 64, 32).unwrap();
        assert!(binding.sync(&ctx.device, &renderer, ProjectionKind::Cartesian).unwrap());
        assert_eq!(
            binding.key(),
            Some(BindingKey {
                generation: 1,
                projection: ProjectionKind::Cartesian
            })
        );
    }

    #[test]
    fn test_sync_after_dispose_fails() {
        let Ok(ctx) = HeadlessContext::new_blocking() else {
            return;
        };
        let mut renderer =
            EquirectangularRenderer::new(&ctx.device, &ctx.queue, 16, 8, &BlueNoise::generate(0, 4))
                .unwrap();
        let mut binding = EnvironmentBinding::new(&ctx.device, "test-env");
        renderer.dispose().unwrap();
        assert!(matches!(
            binding.sync(&ctx.device, &renderer, ProjectionKind::Equirectangular),
            Err(EquirectError::Disposed)
        ));
    }
}
