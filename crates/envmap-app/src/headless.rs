//! Offscreen snapshot mode: render a few frames without a window and write
//! both environment targets to disk.

use std::path::{Path, PathBuf};

use envmap_config::Config;
use envmap_nebula::raymarch::{mean_color, preview};
use envmap_nebula::{EquirectangularRenderer, ProjectionKind};
use envmap_render::{Camera, HeadlessContext, RgbaImage, read_texture_rgba8};
use glam::Vec3;
use tracing::info;

use crate::error::AppError;
use crate::frame_clock::{FIXED_DT, FrameClock};
use crate::scene::load_noise;

/// Edge length of the CPU reference preview logged next to each snapshot.
const PREVIEW_WIDTH: u32 = 32;

/// Files written by a headless run.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotReport {
    pub equirectangular: PathBuf,
    pub cartesian: PathBuf,
    pub frames: u32,
    /// Animation time of the last rendered frame.
    pub last_frame_ms: f64,
}

pub fn snapshot_path(output: &Path, kind: ProjectionKind) -> PathBuf {
    output.join(format!("{}.png", kind.name()))
}

/// Average RGB of an 8-bit image, in [0, 1].
pub fn image_mean(image: &RgbaImage) -> Vec3 {
    let count = (image.width * image.height) as usize;
    if count == 0 {
        return Vec3::ZERO;
    }
    let sum = image
        .pixels
        .chunks_exact(4)
        .fold(Vec3::ZERO, |acc, px| {
            acc + Vec3::new(f32::from(px[0]), f32::from(px[1]), f32::from(px[2]))
        });
    sum / (count as f32 * 255.0)
}

/// Create a surfaceless device and write snapshots into `output`.
pub fn run_headless(config: &Config, frames: u32, output: &Path) -> Result<SnapshotReport, AppError> {
    let ctx = HeadlessContext::new_blocking()?;
    render_snapshots(&ctx.device, &ctx.queue, config, frames, output)
}

/// Render `frames` frames at 60 Hz simulated time, the first at 0 ms, then
/// read back both targets as PNG.
pub fn render_snapshots(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    config: &Config,
    frames: u32,
    output: &Path,
) -> Result<SnapshotReport, AppError> {
    std::fs::create_dir_all(output).map_err(|source| AppError::OutputDir {
        path: output.to_path_buf(),
        source,
    })?;

    let noise = load_noise(&config.render)?;
    let (width, height) = (config.render.target_width, config.render.target_height);
    let mut renderer = EquirectangularRenderer::new(device, queue, width, height, &noise)?;
    let camera = Camera::default();
    let mut clock = FrameClock::new();
    let frames = frames.max(1);

    let mut last_frame_ms = 0.0;
    for _ in 0..frames {
        last_frame_ms = clock.elapsed() * 1000.0;
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("headless-frame"),
        });
        renderer.render(queue, &mut encoder, &camera, last_frame_ms)?;
        queue.submit([encoder.finish()]);
        clock.advance(FIXED_DT);
    }
    info!("Rendered {frames} headless frame(s) at {width}x{height}");

    for kind in ProjectionKind::ALL {
        let image = read_texture_rgba8(device, queue, renderer.texture(kind)?.texture())?;
        let path = snapshot_path(output, kind);
        image.write_png(&path)?;

        let preview_height = (PREVIEW_WIDTH * height / width).max(1);
        let reference = mean_color(&preview(
            PREVIEW_WIDTH,
            preview_height,
            kind,
            (last_frame_ms / 1000.0) as f32,
            &noise,
        ));
        let measured = image_mean(&image);
        info!(
            "{kind}: GPU mean ({:.3}, {:.3}, {:.3}), CPU reference mean ({:.3}, {:.3}, {:.3})",
            measured.x, measured.y, measured.z, reference.x, reference.y, reference.z
        );
    }

    renderer.dispose()?;
    Ok(SnapshotReport {
        equirectangular: snapshot_path(output, ProjectionKind::Equirectangular),
        cartesian: snapshot_path(output, ProjectionKind::Cartesian),
        frames,
        last_frame_ms,
    })
}
