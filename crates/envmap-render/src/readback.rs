//! GPU → CPU texture readback and PNG encoding.

use std::path::Path;

/// Errors from copying a texture back to the CPU or writing it out.
#[derive(Debug, thiserror::Error)]
pub enum ReadbackError {
    /// Only 4-byte RGBA/BGRA 8-bit formats are supported.
    #[error("unsupported readback format {0:?}")]
    UnsupportedFormat(wgpu::TextureFormat),

    /// Mapping the staging buffer failed.
    #[error("failed to map readback buffer: {0}")]
    Map(#[from] wgpu::BufferAsyncError),

    /// The map callback was dropped before reporting.
    #[error("readback buffer map callback never fired")]
    MapCallbackDropped,

    /// Waiting on the device failed.
    #[error("device poll failed: {0}")]
    Poll(#[from] wgpu::PollError),

    #[error("failed to write image: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode PNG: {0}")]
    Encode(#[from] png::EncodingError),
}

/// Tightly packed RGBA8 pixels read from the GPU.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbaImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbaImage {
    /// RGBA value at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// Encode as an 8-bit RGBA PNG at `path`.
    pub fn write_png(&self, path: &Path) -> Result<(), ReadbackError> {
        let file = std::fs::File::create(path)?;
        let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), self.width, self.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&self.pixels)?;
        log::info!("Wrote {}x{} PNG to {}", self.width, self.height, path.display());
        Ok(())
    }
}

/// Row pitch for a copy of `width` 4-byte texels, padded to wgpu's alignment.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Copy mip 0 of `texture` into a mappable buffer, wait for the GPU, and
/// return the pixels as RGBA8 with row padding removed.
///
/// The texture must have `COPY_SRC` usage.
pub fn read_texture_rgba8(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
) -> Result<RgbaImage, ReadbackError> {
    let format = texture.format();
    let is_bgra = match format {
        wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => false,
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => true,
        other => return Err(ReadbackError::UnsupportedFormat(other)),
    };

    let width = texture.width();
    let height = texture.height();
    let padded = padded_bytes_per_row(width);

    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("texture-readback"),
        size: u64::from(padded * height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback-encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit([encoder.finish()]);

    let slice = buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::PollType::Wait {
        submission_index: None,
        timeout: None,
    })?;
    rx.recv().map_err(|_| ReadbackError::MapCallbackDropped)??;

    let mapped = slice.get_mapped_range();
    let pixels = unpad_rows(&mapped, width, height, padded, is_bgra);
    drop(mapped);
    buffer.unmap();

    Ok(RgbaImage {
        width,
        height,
        pixels,
    })
}

/// Strip row padding and swizzle BGRA to RGBA when needed.
fn unpad_rows(data: &[u8], width: u32, height: u32, padded: u32, is_bgra: bool) -> Vec<u8> {
    let row_bytes = (width * 4) as usize;
    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * padded as usize;
        let row_data = &data[start..start + row_bytes];
        if is_bgra {
            for chunk in row_data.chunks_exact(4) {
                pixels.extend_from_slice(&[chunk[2], chunk[1], chunk[0], chunk[3]]);
            }
        } else {
            pixels.extend_from_slice(row_data);
        }
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_row_alignment() {
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(512), 2048);
    }

    #[test]
    fn test_unpad_rows_drops_padding() {
        // 1x2 image, rows padded to 8 bytes
        let data = [1, 2, 3, 4, 0, 0, 0, 0, 5, 6, 7, 8, 0, 0, 0, 0];
        let pixels = unpad_rows(&data, 1, 2, 8, false);
        assert_eq!(pixels, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_unpad_rows_swizzles_bgra() {
        let data = [10, 20, 30, 255];
        assert_eq!(unpad_rows(&data, 1, 1, 4, true), vec![30, 20, 10, 255]);
    }

    #[test]
    fn test_pixel_lookup() {
        let image = RgbaImage {
            width: 2,
            height: 1,
            pixels: vec![0, 0, 0, 255, 9, 8, 7, 255],
        };
        assert_eq!(image.pixel(1, 0), [9, 8, 7, 255]);
    }

    #[test]
    fn test_write_png_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let image = RgbaImage {
            width: 2,
            height: 2,
            pixels: vec![255; 16],
        };
        image.write_png(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }
}
