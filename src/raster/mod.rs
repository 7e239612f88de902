// ============================================================================
// RASTER — decoded pixel buffers and the engine that produces them
// ============================================================================
//
// Architecture:
//   format.rs  — sample type / colour role lookups (PixelFormatCatalog)
//   decoder.rs — dataset → RasterImage, strided band scatter
//   dataset/   — the dataset boundary and its PNG / TIFF / memory adapters
//   loaded.rs  — the raster variants a viewer session holds
// ============================================================================

pub mod dataset;
pub mod decoder;
pub mod format;
pub mod loaded;

pub use dataset::{Dataset, SourceFamily};
pub use decoder::{BandLayoutPolicy, DecodeError, LayoutTable, RasterDecoder, decode};
pub use format::{ColorRole, PixelFormat, SampleType};
pub use loaded::{DatasetRaster, LoadError, LoadedRaster, RgbaRaster};

use image::{ImageBuffer, Rgba, RgbaImage};

/// A fully decoded, tightly packed, interleaved RGBA image.
///
/// The buffer always holds exactly `width * height * 4 * bytes_per_sample`
/// bytes in R, G, B, A order; 16-bit samples are native-endian.
#[derive(Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: usize,
    height: usize,
    pixel_format: PixelFormat,
    buffer: Vec<u8>,
}

impl RasterImage {
    /// Wrap a buffer the decoder has filled completely.
    pub(crate) fn assemble(
        width: usize,
        height: usize,
        pixel_format: PixelFormat,
        buffer: Vec<u8>,
    ) -> Self {
        debug_assert_eq!(buffer.len(), width * height * pixel_format.bytes_per_pixel());
        Self {
            width,
            height,
            pixel_format,
            buffer,
        }
    }

    /// Checked constructor; `None` when the buffer length does not match the
    /// dimensions or either dimension is zero.
    pub fn from_raw(
        width: usize,
        height: usize,
        pixel_format: PixelFormat,
        buffer: Vec<u8>,
    ) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let expected = width
            .checked_mul(height)?
            .checked_mul(pixel_format.bytes_per_pixel())?;
        if buffer.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            pixel_format,
            buffer,
        })
    }

    pub fn from_rgba8(image: RgbaImage) -> Option<Self> {
        let (w, h) = image.dimensions();
        Self::from_raw(w as usize, h as usize, PixelFormat::Rgba8, image.into_raw())
    }

    pub fn from_rgba16(image: ImageBuffer<Rgba<u16>, Vec<u16>>) -> Option<Self> {
        let (w, h) = image.dimensions();
        let bytes = bytemuck::cast_slice::<u16, u8>(image.as_raw()).to_vec();
        Self::from_raw(w as usize, h as usize, PixelFormat::Rgba16, bytes)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }

    /// Bytes of one row, no padding.
    pub fn row_bytes(&self) -> usize {
        self.width * self.pixel_format.bytes_per_pixel()
    }

    /// The RGBA channels of pixel `(x, y)` widened to u16, or `None` when out
    /// of bounds. 8-bit samples are returned as-is (0..=255).
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u16; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.pixel_format.bytes_per_pixel();
        let start = y * self.row_bytes() + x * bpp;
        let px = &self.buffer[start..start + bpp];
        let mut out = [0u16; 4];
        match self.pixel_format {
            PixelFormat::Rgba8 => {
                for (o, s) in out.iter_mut().zip(px) {
                    *o = *s as u16;
                }
            }
            PixelFormat::Rgba16 => {
                for (o, s) in out.iter_mut().zip(px.chunks_exact(2)) {
                    *o = u16::from_ne_bytes([s[0], s[1]]);
                }
            }
        }
        Some(out)
    }
}

impl std::fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixel_format", &self.pixel_format)
            .field("bytes", &self.buffer.len())
            .finish()
    }
}
