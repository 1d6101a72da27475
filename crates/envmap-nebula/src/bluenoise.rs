//! Single-channel noise texture used to jitter the raymarch step.
//!
//! [`BlueNoise::generate`] approximates blue noise procedurally so the demo
//! runs without an asset: seeded white noise is high-pass filtered against a
//! wrapping 3x3 box blur, then rank-normalized to a flat 0..=255 histogram.
//! The result tiles seamlessly and has negative neighbor correlation.

use std::io::BufReader;
use std::path::Path;

use envmap_render::{GpuTexture, TextureError, create_texture_2d};
use glam::Vec2;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::NoiseError;

/// CPU-side R8 noise image.
#[derive(Clone, Debug, PartialEq)]
pub struct NoiseTexture {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl NoiseTexture {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, NoiseError> {
        let texels = (width as usize).checked_mul(height as usize);
        if width == 0 || height == 0 || texels != Some(data.len()) {
            return Err(NoiseError::Empty { width, height });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Load an 8-bit PNG, keeping the red (or gray) channel.
    pub fn from_png(path: &Path) -> Result<Self, NoiseError> {
        let file = std::fs::File::open(path).map_err(|source| NoiseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut decoder = png::Decoder::new(BufReader::new(file));
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder.read_info()?;
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf)?;
        let bytes = &buf[..info.buffer_size()];

        let channels = match info.color_type {
            png::ColorType::Grayscale => 1,
            png::ColorType::GrayscaleAlpha => 2,
            png::ColorType::Rgb => 3,
            png::ColorType::Rgba => 4,
            other => {
                return Err(NoiseError::UnsupportedFormat(format!(
                    "{other:?} at {:?}",
                    info.bit_depth
                )));
            }
        };

        let data: Vec<u8> = bytes.chunks_exact(channels).map(|px| px[0]).collect();
        log::info!(
            "Loaded noise texture {} ({}x{}, {:?})",
            path.display(),
            info.width,
            info.height,
            info.color_type
        );
        Self::new(info.width, info.height, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Nearest-texel lookup with repeat addressing, normalized to `0.0..=1.0`.
    pub fn sample(&self, coord: Vec2) -> f32 {
        let x = (coord.x.rem_euclid(1.0) * self.width as f32) as u32 % self.width;
        let y = (coord.y.rem_euclid(1.0) * self.height as f32) as u32 % self.height;
        self.data[y as usize * self.width as usize + x as usize] as f32 / 255.0
    }

    pub fn mean(&self) -> f32 {
        self.data.iter().map(|&v| v as f32).sum::<f32>() / self.data.len() as f32
    }

    /// Upload as an `R8Unorm` texture.
    pub fn upload(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<GpuTexture, TextureError> {
        create_texture_2d(
            device,
            queue,
            "bluenoise",
            &self.data,
            self.width,
            self.height,
            wgpu::TextureFormat::R8Unorm,
        )
    }
}

/// Procedural blue-noise approximation.
pub struct BlueNoise;

impl BlueNoise {
    /// Largest tile edge [`BlueNoise::generate`] will build. Larger requests,
    /// e.g. a mistyped `noise_size` in `config.ron`, are clamped to it.
    pub const MAX_SIZE: u32 = 1024;

    /// Generate a `size x size` tile. Deterministic for a given seed.
    pub fn generate(seed: u64, size: u32) -> NoiseTexture {
        if size > Self::MAX_SIZE {
            log::warn!("Blue noise size {size} clamped to {}", Self::MAX_SIZE);
        }
        let size = size.clamp(1, Self::MAX_SIZE);
        let n = size as usize * size as usize;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let white: Vec<f32> = (0..n).map(|_| rng.random::<f32>()).collect();

        let s = size as i64;
        let at = |x: i64, y: i64| white[(y.rem_euclid(s) * s + x.rem_euclid(s)) as usize];
        let high: Vec<f32> = (0..n)
            .map(|i| {
                let (x, y) = ((i as i64) % s, (i as i64) / s);
                let mut blur = 0.0;
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        blur += at(x + dx, y + dy);
                    }
                }
                white[i] - blur / 9.0
            })
            .collect();

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| high[a].total_cmp(&high[b]));
        let mut data = vec![0u8; n];
        for (rank, &index) in order.iter().enumerate() {
            data[index] = (rank * 256 / n) as u8;
        }

        log::debug!("Generated {size}x{size} blue noise (seed {seed})");
        NoiseTexture {
            width: size,
            height: size,
            data,
        }
    }
}
