//! Procedural nebula environment maps: the equirectangular renderer, its
//! offscreen targets and uniforms, blue noise, a CPU reference of the
//! raymarch, and the material and skybox that consume the result.

pub mod bluenoise;
pub mod environment;
pub mod equirect;
pub mod error;
pub mod material;
pub mod raymarch;
pub mod render_target;
pub mod skybox;
pub mod uniforms;

pub use bluenoise::{BlueNoise, NoiseTexture};
pub use environment::{BindingKey, ENVIRONMENT_WGSL, EnvironmentBinding, with_environment};
pub use equirect::{Destination, EquirectangularRenderer, NEBULA_SHADER_SOURCE, RendererState};
pub use error::{EquirectError, NoiseError};
pub use material::{EnvMapMaterial, EnvMapMode, MaterialSettings, MaterialUniform};
pub use raymarch::{from_spherical, to_spherical};
pub use render_target::RenderTarget;
pub use skybox::{SkyboxRenderer, SkyboxUniform};
pub use uniforms::{EquirectUniform, ProjectionKind, UniformName, UniformState, UniformUpdate};
