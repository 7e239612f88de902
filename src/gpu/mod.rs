// ============================================================================
// GPU MODULE — offscreen presentation of the decoded raster
// ============================================================================
//
// Architecture:
//   context.rs   — wgpu Device, Queue, adapter init
//   shaders.rs   — WGSL shader source (inline strings)
//   texture.rs   — RasterTexture, the one-time upload of a RasterImage
//   presenter.rs — pipeline, offscreen target, readback
// ============================================================================

pub mod context;
pub mod presenter;
pub mod shaders;
pub mod texture;

pub use context::GpuContext;
pub use presenter::{Presenter, SamplingMode};
pub use texture::RasterTexture;

use crate::raster::RasterImage;

/// WGPU requires `bytes_per_row` of buffer copies to be a multiple of 256.
pub const COPY_BYTES_PER_ROW_ALIGNMENT: u32 = 256;

/// Row pitch of an RGBA8 readback buffer for a `width`-pixel texture.
pub fn aligned_bytes_per_row(width: u32) -> u32 {
    let unaligned = width * 4;
    unaligned.div_ceil(COPY_BYTES_PER_ROW_ALIGNMENT) * COPY_BYTES_PER_ROW_ALIGNMENT
}

/// Copy `height` rows of `row_bytes` out of a buffer with `pitch` bytes per row.
pub fn strip_row_padding(padded: &[u8], row_bytes: u32, pitch: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity((row_bytes * height) as usize);
    for y in 0..height {
        let start = (y * pitch) as usize;
        out.extend_from_slice(&padded[start..start + row_bytes as usize]);
    }
    out
}

/// Reduce native-endian RGBA16 to RGBA8 by keeping each sample's high byte.
pub fn narrow_rgba16(bytes: &[u8]) -> Vec<u8> {
    bytes
        .chunks_exact(2)
        .map(|s| (u16::from_ne_bytes([s[0], s[1]]) >> 8) as u8)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// No hardware or software adapter could be created.
    NoAdapter,
    TextureTooLarge { width: usize, height: usize, max: u32 },
    /// The viewport has a zero dimension.
    EmptyViewport,
    Readback(String),
}

impl GpuError {
    fn too_large(ctx: &GpuContext, image: &RasterImage) -> Self {
        GpuError::TextureTooLarge {
            width: image.width(),
            height: image.height(),
            max: ctx.max_texture_dim,
        }
    }
}

impl std::fmt::Display for GpuError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuError::NoAdapter => write!(f, "no GPU adapter available"),
            GpuError::TextureTooLarge { width, height, max } => write!(
                f,
                "{}x{} exceeds the GPU texture limit of {}",
                width, height, max
            ),
            GpuError::EmptyViewport => write!(f, "viewport has no area"),
            GpuError::Readback(e) => write!(f, "GPU readback failed: {}", e),
        }
    }
}

impl std::error::Error for GpuError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_pitch_is_aligned() {
        assert_eq!(aligned_bytes_per_row(1), 256);
        assert_eq!(aligned_bytes_per_row(64), 256);
        assert_eq!(aligned_bytes_per_row(65), 512);
        assert_eq!(aligned_bytes_per_row(640) % COPY_BYTES_PER_ROW_ALIGNMENT, 0);
    }

    #[test]
    fn padding_is_removed() {
        let mut padded = vec![0u8; 2 * 8];
        padded[..4].copy_from_slice(&[1, 2, 3, 4]);
        padded[8..12].copy_from_slice(&[5, 6, 7, 8]);
        assert_eq!(strip_row_padding(&padded, 4, 8, 2), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn narrowing_keeps_high_byte() {
        let samples: [u16; 4] = [0xFFFF, 0x8001, 0x00FF, 0x1234];
        let bytes = bytemuck::cast_slice::<u16, u8>(&samples);
        assert_eq!(narrow_rgba16(bytes), vec![0xFF, 0x80, 0x00, 0x12]);
    }
}
