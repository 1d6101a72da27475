//! wgpu plumbing shared by the environment-map crates: device and surface
//! setup, buffers, passes, camera, depth, textures and readback.

pub mod buffer;
pub mod camera;
pub mod depth;
pub mod gpu;
pub mod pass;
pub mod readback;
pub mod texture;

pub use buffer::{IndexData, MeshBuffer, VertexPositionNormalUv, VertexPositionUv, uniform_buffer};
pub use camera::Camera;
pub use depth::DepthBuffer;
pub use gpu::{
    HeadlessContext, RenderContext, RenderContextError, SurfaceError,
    init_render_context_blocking,
};
pub use pass::{CLEAR_BLACK, FrameEncoder, RenderPassBuilder};
pub use readback::{ReadbackError, RgbaImage, padded_bytes_per_row, read_texture_rgba8};
pub use texture::{GpuTexture, TextureError, create_texture_2d, panorama_sampler, repeat_sampler};
