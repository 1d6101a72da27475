use std::path::PathBuf;

use envmap_render::TextureError;

/// Errors from the equirectangular renderer and its consumers.
#[derive(Debug, thiserror::Error)]
pub enum EquirectError {
    /// The renderer was disposed; its GPU resources are gone.
    #[error("renderer has been disposed")]
    Disposed,

    #[error("render target dimensions must be non-zero, got {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("unknown uniform '{0}' (expected time, bluenoise, equirected or resolution)")]
    UnknownUniform(String),

    #[error("unknown texture '{0}' (expected equirectangular or cartesian)")]
    UnknownTexture(String),

    /// `draw_display` was called before `prepare_display`.
    #[error("display pipeline not prepared")]
    DisplayNotPrepared,

    #[error(transparent)]
    Texture(#[from] TextureError),
}

/// Errors from loading or building a noise texture.
#[derive(Debug, thiserror::Error)]
pub enum NoiseError {
    #[error("failed to read noise image {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode noise image: {0}")]
    Decode(#[from] png::DecodingError),

    #[error("unsupported noise image format: {0}")]
    UnsupportedFormat(String),

    /// Zero-sized or mismatched pixel data.
    #[error("noise data is empty or does not match {width}x{height}")]
    Empty { width: u32, height: u32 },
}
