use std::path::PathBuf;

use envmap_config::ConfigError;
use envmap_nebula::{EquirectError, NoiseError};
use envmap_render::{ReadbackError, RenderContextError};

/// Anything that stops the demo from starting or finishing a run.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("GPU initialization failed: {0}")]
    Gpu(#[from] RenderContextError),

    #[error("renderer error: {0}")]
    Renderer(#[from] EquirectError),

    #[error("noise texture error: {0}")]
    Noise(#[from] NoiseError),

    #[error("snapshot readback failed: {0}")]
    Readback(#[from] ReadbackError),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("failed to create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
}
