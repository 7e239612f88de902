// ============================================================================
// RASTER DECODER — multi-band dataset → one interleaved RGBA buffer
// ============================================================================
//
// Steps, in order (each failure is terminal, nothing partial escapes):
//   1. dimensions + band 1 reference sample type, every band must match it
//   2. reference type → destination PixelFormat
//   3. band count vs. the per-family layout policy
//   4. exact-size fallible allocation, opaque alpha when no band supplies it
//   5. one strided read per band straight into its channel lane
//
// The decoder never logs and never exits; callers decide what a failure means.
// ============================================================================

use super::RasterImage;
use super::dataset::{BandReadError, BandSlot, Dataset, SourceFamily};
use super::format::{BandDescriptor, ColorRole, PixelFormat, SampleType, destination_format};

// ============================================================================
// PER-FAMILY BAND LAYOUT POLICY
// ============================================================================

/// Which band counts a source family is allowed to decode with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BandLayoutPolicy {
    /// Exactly 3 (RGB) or 4 (RGBA) bands.
    RgbOrRgba,
    /// Any non-zero band count; bands without a channel role are skipped.
    AnyCount,
}

impl BandLayoutPolicy {
    pub fn accepts(self, band_count: usize) -> bool {
        match self {
            BandLayoutPolicy::RgbOrRgba => band_count == 3 || band_count == 4,
            BandLayoutPolicy::AnyCount => band_count >= 1,
        }
    }
}

/// Band layout policy for every source family.
///
/// PNG and GeoTIFF only take 3/4-band layouts while JPEG2000 takes any
/// count. The split is kept as data so a family can be retuned without
/// touching the decode path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutTable {
    png: BandLayoutPolicy,
    jpeg2000: BandLayoutPolicy,
    geotiff: BandLayoutPolicy,
}

impl LayoutTable {
    pub fn policy(&self, family: SourceFamily) -> BandLayoutPolicy {
        match family {
            SourceFamily::Png => self.png,
            SourceFamily::Jpeg2000 => self.jpeg2000,
            SourceFamily::GeoTiff => self.geotiff,
        }
    }

    pub fn with_policy(mut self, family: SourceFamily, policy: BandLayoutPolicy) -> Self {
        match family {
            SourceFamily::Png => self.png = policy,
            SourceFamily::Jpeg2000 => self.jpeg2000 = policy,
            SourceFamily::GeoTiff => self.geotiff = policy,
        }
        self
    }
}

impl Default for LayoutTable {
    fn default() -> Self {
        Self {
            png: BandLayoutPolicy::RgbOrRgba,
            jpeg2000: BandLayoutPolicy::AnyCount,
            geotiff: BandLayoutPolicy::RgbOrRgba,
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Why a dataset could not be turned into a [`RasterImage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Width or height is zero.
    EmptyRaster { width: usize, height: usize },
    /// The reference sample type has no destination pixel format.
    UnsupportedSampleType(SampleType),
    /// A band's sample type differs from band 1's.
    BandTypeMismatch {
        band: usize,
        expected: SampleType,
        found: SampleType,
    },
    /// The band count is not accepted for this source family.
    UnsupportedBandLayout {
        family: SourceFamily,
        band_count: usize,
    },
    /// The dataset failed while reading a band.
    SourceReadFailure { band: usize, source: BandReadError },
    /// The destination buffer could not be allocated. `requested` is `None`
    /// when `width * height * bytes_per_pixel` does not fit in `usize`.
    OutOfMemory { requested: Option<usize> },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::EmptyRaster { width, height } => {
                write!(f, "raster has no pixels ({}x{})", width, height)
            }
            DecodeError::UnsupportedSampleType(ty) => {
                write!(f, "unsupported sample type: {}", ty)
            }
            DecodeError::BandTypeMismatch {
                band,
                expected,
                found,
            } => write!(
                f,
                "band {} has sample type {}, expected {} like band 1",
                band, found, expected
            ),
            DecodeError::UnsupportedBandLayout { family, band_count } => write!(
                f,
                "{} sources with {} band(s) are not supported",
                family, band_count
            ),
            DecodeError::SourceReadFailure { band, source } => {
                write!(f, "reading band {} failed: {}", band, source)
            }
            DecodeError::OutOfMemory {
                requested: Some(bytes),
            } => write!(f, "could not allocate {} bytes for the image", bytes),
            DecodeError::OutOfMemory { requested: None } => {
                write!(f, "image byte size exceeds the address space")
            }
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::SourceReadFailure { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ============================================================================
// DECODER
// ============================================================================

#[derive(Clone, Copy, Debug, Default)]
pub struct RasterDecoder {
    layouts: LayoutTable,
}

impl RasterDecoder {
    pub fn new(layouts: LayoutTable) -> Self {
        Self { layouts }
    }

    pub fn layouts(&self) -> &LayoutTable {
        &self.layouts
    }

    /// Decode every channel-mapped band of `dataset` into an interleaved
    /// RGBA buffer.
    pub fn decode<D: Dataset + ?Sized>(&self, dataset: &mut D) -> Result<RasterImage, DecodeError> {
        let family = dataset.family();
        let width = dataset.width();
        let height = dataset.height();
        let band_count = dataset.band_count();

        if width == 0 || height == 0 {
            return Err(DecodeError::EmptyRaster { width, height });
        }
        if band_count == 0 {
            return Err(DecodeError::UnsupportedBandLayout { family, band_count });
        }

        let bands = describe_bands(dataset)?;
        let reference = bands[0].sample_type;

        let format = destination_format(reference)
            .ok_or(DecodeError::UnsupportedSampleType(reference))?;

        if !self.layouts.policy(family).accepts(band_count) {
            return Err(DecodeError::UnsupportedBandLayout { family, band_count });
        }

        let mut buffer = allocate(width, height, format)?;
        let has_alpha_band = bands.iter().any(|b| b.color_role == ColorRole::Alpha);
        if !has_alpha_band {
            fill_opaque_alpha(&mut buffer, format);
        }

        let bps = format.bytes_per_sample();
        let pixel_stride = format.bytes_per_pixel();
        for band in &bands {
            let Some(channel) = band.channel() else { continue };
            let slot = BandSlot {
                offset: channel * bps,
                pixel_stride,
                line_stride: width * pixel_stride,
            };
            // On error `buffer` is dropped here, never handed out.
            dataset
                .read_band_into(band.index, &mut buffer, slot)
                .map_err(|source| DecodeError::SourceReadFailure {
                    band: band.index,
                    source,
                })?;
        }

        Ok(RasterImage::assemble(width, height, format, buffer))
    }
}

/// Decode with the default per-family layout table.
pub fn decode<D: Dataset + ?Sized>(dataset: &mut D) -> Result<RasterImage, DecodeError> {
    RasterDecoder::default().decode(dataset)
}

/// Read every band's metadata, checking each against band 1's sample type.
fn describe_bands<D: Dataset + ?Sized>(dataset: &D) -> Result<Vec<BandDescriptor>, DecodeError> {
    let band_count = dataset.band_count();
    let reference = dataset.band_sample_type(1);
    let mut bands = Vec::with_capacity(band_count);
    for index in 1..=band_count {
        let sample_type = dataset.band_sample_type(index);
        if sample_type != reference {
            return Err(DecodeError::BandTypeMismatch {
                band: index,
                expected: reference,
                found: sample_type,
            });
        }
        bands.push(BandDescriptor {
            index,
            sample_type,
            color_role: dataset.band_color_role(index),
        });
    }
    Ok(bands)
}

/// Zeroed buffer of exactly `width * height * bytes_per_pixel` bytes.
fn allocate(width: usize, height: usize, format: PixelFormat) -> Result<Vec<u8>, DecodeError> {
    let len = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(format.bytes_per_pixel()))
        .ok_or(DecodeError::OutOfMemory { requested: None })?;
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| DecodeError::OutOfMemory {
            requested: Some(len),
        })?;
    buffer.resize(len, 0);
    Ok(buffer)
}

fn fill_opaque_alpha(buffer: &mut [u8], format: PixelFormat) {
    let alpha_at = 3 * format.bytes_per_sample();
    let max = format.max_sample_bytes();
    for pixel in buffer.chunks_exact_mut(format.bytes_per_pixel()) {
        pixel[alpha_at..].copy_from_slice(max);
    }
}

// ============================================================================
// STRIDED SCATTER — shared by every dataset adapter
// ============================================================================

/// Layout of one band plane inside a source buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaneGeometry {
    pub width: usize,
    pub height: usize,
    /// Bytes per sample; also the number of bytes written per destination pixel.
    pub sample_size: usize,
    /// First byte of sample (0, 0).
    pub offset: usize,
    /// Distance between horizontally adjacent samples.
    pub pixel_stride: usize,
    /// Distance between vertically adjacent samples; may include row padding.
    pub row_stride: usize,
}

impl PlaneGeometry {
    /// A tightly packed single-band plane.
    pub fn packed(width: usize, height: usize, sample_size: usize) -> Self {
        Self {
            width,
            height,
            sample_size,
            offset: 0,
            pixel_stride: sample_size,
            row_stride: width * sample_size,
        }
    }

    /// Band `band_offset` (0-based) of a pixel-interleaved buffer with
    /// `samples_per_pixel` samples and rows `row_stride` bytes apart.
    pub fn interleaved(
        width: usize,
        height: usize,
        sample_size: usize,
        samples_per_pixel: usize,
        band_offset: usize,
        row_stride: usize,
    ) -> Self {
        Self {
            width,
            height,
            sample_size,
            offset: band_offset * sample_size,
            pixel_stride: samples_per_pixel * sample_size,
            row_stride,
        }
    }
}

/// Byte index one past the last sample touched by a strided walk.
fn span_end(
    offset: usize,
    width: usize,
    height: usize,
    pixel_stride: usize,
    row_stride: usize,
    sample_size: usize,
) -> Option<usize> {
    let last_row = (height - 1).checked_mul(row_stride)?;
    let last_col = (width - 1).checked_mul(pixel_stride)?;
    offset
        .checked_add(last_row)?
        .checked_add(last_col)?
        .checked_add(sample_size)
}

/// Copy one band plane from `src` into its lane of the interleaved `dest`,
/// row by row in row-major order.
pub fn write_strided(
    src: &[u8],
    plane: PlaneGeometry,
    dest: &mut [u8],
    slot: BandSlot,
) -> Result<(), BandReadError> {
    if plane.width == 0 || plane.height == 0 {
        return Ok(());
    }
    let size = plane.sample_size;

    let src_end = span_end(
        plane.offset,
        plane.width,
        plane.height,
        plane.pixel_stride,
        plane.row_stride,
        size,
    )
    .unwrap_or(usize::MAX);
    if src_end > src.len() {
        return Err(BandReadError::Truncated {
            expected: src_end,
            actual: src.len(),
        });
    }

    let dest_end = span_end(
        slot.offset,
        plane.width,
        plane.height,
        slot.pixel_stride,
        slot.line_stride,
        size,
    )
    .unwrap_or(usize::MAX);
    if dest_end > dest.len() {
        return Err(BandReadError::DestinationTooSmall {
            needed: dest_end,
            available: dest.len(),
        });
    }

    for y in 0..plane.height {
        let mut s = plane.offset + y * plane.row_stride;
        let mut d = slot.offset + y * slot.line_stride;
        for _ in 0..plane.width {
            dest[d..d + size].copy_from_slice(&src[s..s + size]);
            s += plane.pixel_stride;
            d += slot.pixel_stride;
        }
    }
    Ok(())
}
