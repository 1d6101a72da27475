//! Texture upload for the noise texture, plus the two samplers the
//! nebula crates share.

/// An uploaded texture and its full view.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    /// Width and height in texels.
    pub dimensions: (u32, u32),
    pub format: wgpu::TextureFormat,
}

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("texture dimensions must be non-zero, got {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("{format:?} {width}x{height} needs {expected} bytes, got {actual}")]
    DataSizeMismatch {
        actual: usize,
        expected: usize,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    },
}

/// Upload tightly packed texels as a sampled, single-mip 2D texture.
pub fn create_texture_2d(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    data: &[u8],
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
) -> Result<GpuTexture, TextureError> {
    let row_bytes = check_upload(data.len(), width, height, format)?;
    let extent = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        texture.as_image_copy(),
        data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(row_bytes),
            rows_per_image: None,
        },
        extent,
    );
    log::debug!("Texture '{label}' uploaded: {width}x{height} {format:?}");

    Ok(GpuTexture {
        view: texture.create_view(&Default::default()),
        texture,
        dimensions: (width, height),
        format,
    })
}

/// Sampler that tiles in both directions. Used for noise lookups.
pub fn repeat_sampler(device: &wgpu::Device, label: &str, filter: wgpu::FilterMode) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: filter,
        min_filter: filter,
        ..Default::default()
    })
}

/// Linear sampler wrapping horizontally and clamping vertically, the
/// natural addressing for equirectangular panoramas.
pub fn panorama_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

/// Validates an upload and returns its row pitch in bytes. Uploads are
/// tightly packed, which `write_texture` allows for any width.
fn check_upload(
    len: usize,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
) -> Result<u32, TextureError> {
    if width == 0 || height == 0 {
        return Err(TextureError::ZeroDimensions { width, height });
    }
    let texel_bytes = format.block_copy_size(None).unwrap_or(4);
    let row_bytes = width * texel_bytes;
    let expected = row_bytes as usize * height as usize;
    if len != expected {
        return Err(TextureError::DataSizeMismatch {
            actual: len,
            expected,
            width,
            height,
            format,
        });
    }
    Ok(row_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessContext;

    #[test]
    fn test_row_pitch_follows_format() {
        use wgpu::TextureFormat::{R8Unorm, Rgba8Unorm};
        assert_eq!(check_upload(64 * 64, 64, 64, R8Unorm).unwrap(), 64);
        assert_eq!(check_upload(32, 4, 2, Rgba8Unorm).unwrap(), 16);
    }

    #[test]
    fn test_empty_texture_rejected() {
        assert!(matches!(
            check_upload(0, 0, 16, wgpu::TextureFormat::R8Unorm),
            Err(TextureError::ZeroDimensions { width: 0, height: 16 })
        ));
    }

    #[test]
    fn test_short_data_rejected() {
        let err = check_upload(10, 4, 4, wgpu::TextureFormat::R8Unorm).unwrap_err();
        assert!(matches!(
            err,
            TextureError::DataSizeMismatch {
                actual: 10,
                expected: 16,
                ..
            }
        ));
    }

    #[test]
    fn test_upload_r8_texture() {
        let Ok(ctx) = HeadlessContext::new_blocking() else {
            return;
        };
        let data = vec![7u8; 64 * 32];
        let tex = create_texture_2d(
            &ctx.device,
            &ctx.queue,
            "test-noise",
            &data,
            64,
            32,
            wgpu::TextureFormat::R8Unorm,
        )
        .unwrap();
        assert_eq!(tex.dimensions, (64, 32));
        assert_eq!(tex.texture.format(), wgpu::TextureFormat::R8Unorm);
    }
}
