// ============================================================================
// DATASET BOUNDARY — opened multi-band sources the decoder reads from
// ============================================================================
//
// Architecture:
//   mod.rs    — `Dataset` trait, family detection, open errors
//   png.rs    — PNG adapter (png crate, 8/16-bit, gray/RGB/RGBA)
//   tiff.rs   — TIFF / GeoTIFF adapter (tiff crate, chunky multi-band)
//   memory.rs — in-memory planes (synthetic sources, headless tools)
//
// Band indices are 1-based everywhere on this boundary, matching how
// geospatial datasets number their bands.
// ============================================================================

pub mod memory;
pub mod png;
pub mod tiff;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::format::{ColorRole, SampleType};

pub use memory::MemoryDataset;
pub use self::png::PngDataset;
pub use self::tiff::TiffDataset;

/// Format family of a source, resolved once from file metadata.
///
/// Everything that differs between families (band layout acceptance, which
/// adapter opens the file) is an exhaustive match on this tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceFamily {
    Png,
    Jpeg2000,
    GeoTiff,
}

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JP2_SIGNATURE: [u8; 12] = [
    0x00, 0x00, 0x00, 0x0C, b'j', b'P', b' ', b' ', 0x0D, 0x0A, 0x87, 0x0A,
];
const J2K_CODESTREAM: [u8; 4] = [0xFF, 0x4F, 0xFF, 0x51];

impl SourceFamily {
    pub const ALL: [SourceFamily; 3] = [
        SourceFamily::Png,
        SourceFamily::Jpeg2000,
        SourceFamily::GeoTiff,
    ];

    /// Identify the family from the leading bytes of a file.
    pub fn detect(header: &[u8]) -> Option<Self> {
        if header.starts_with(&PNG_SIGNATURE) {
            return Some(SourceFamily::Png);
        }
        if header.starts_with(&JP2_SIGNATURE) || header.starts_with(&J2K_CODESTREAM) {
            return Some(SourceFamily::Jpeg2000);
        }
        // Classic TIFF and BigTIFF, both byte orders.
        match header {
            [b'I', b'I', 42, 0, ..] | [b'M', b'M', 0, 42, ..] => Some(SourceFamily::GeoTiff),
            [b'I', b'I', 43, 0, ..] | [b'M', b'M', 0, 43, ..] => Some(SourceFamily::GeoTiff),
            _ => None,
        }
    }

    /// Read the file header and identify its family.
    pub fn detect_path(path: &Path) -> std::io::Result<Option<Self>> {
        let mut header = [0u8; 12];
        let mut file = File::open(path)?;
        let mut filled = 0;
        while filled < header.len() {
            let n = file.read(&mut header[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(Self::detect(&header[..filled]))
    }

    pub fn name(self) -> &'static str {
        match self {
            SourceFamily::Png => "PNG",
            SourceFamily::Jpeg2000 => "JPEG2000",
            SourceFamily::GeoTiff => "GeoTIFF",
        }
    }
}

impl std::fmt::Display for SourceFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where one band's samples go inside an interleaved destination buffer.
///
/// Sample `(x, y)` of the band lands at
/// `offset + y * line_stride + x * pixel_stride`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BandSlot {
    pub offset: usize,
    pub pixel_stride: usize,
    pub line_stride: usize,
}

/// Failure reported by a dataset while reading one band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BandReadError {
    /// The band index is outside `1..=band_count`.
    NoSuchBand(usize),
    /// The source plane holds fewer bytes than its geometry requires.
    Truncated { expected: usize, actual: usize },
    /// The destination slot does not fit in the destination buffer.
    DestinationTooSmall { needed: usize, available: usize },
    /// The sample width requested does not match the band's sample type.
    SampleSize { expected: usize, found: usize },
    /// Any other error raised by the underlying reader.
    Source(String),
}

impl std::fmt::Display for BandReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BandReadError::NoSuchBand(band) => write!(f, "band {} does not exist", band),
            BandReadError::Truncated { expected, actual } => write!(
                f,
                "source plane truncated: expected {} bytes, got {}",
                expected, actual
            ),
            BandReadError::DestinationTooSmall { needed, available } => write!(
                f,
                "destination too small: needs {} bytes, has {}",
                needed, available
            ),
            BandReadError::SampleSize { expected, found } => write!(
                f,
                "sample size mismatch: expected {} bytes, found {}",
                expected, found
            ),
            BandReadError::Source(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for BandReadError {}

/// Affine placement of a raster in model space (GeoTIFF tie point + scale).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoReference {
    /// Model coordinates of the top-left corner of pixel (0, 0).
    pub origin: (f64, f64),
    /// Model units per pixel along x and y.
    pub pixel_size: (f64, f64),
}

/// An opened raster source exposing per-band metadata and strided reads.
pub trait Dataset {
    fn family(&self) -> SourceFamily;
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn band_count(&self) -> usize;

    /// Sample type of `band` (1-based). Only called for `1..=band_count()`.
    fn band_sample_type(&self, band: usize) -> SampleType;

    /// Color role of `band` (1-based). Only called for `1..=band_count()`.
    fn band_color_role(&self, band: usize) -> ColorRole;

    /// Copy the full plane of `band` into `dest` at the positions `slot`
    /// describes. Bytes outside those positions must not be touched.
    fn read_band_into(
        &mut self,
        band: usize,
        dest: &mut [u8],
        slot: BandSlot,
    ) -> Result<(), BandReadError>;

    /// Placement in model space, for sources that carry one.
    fn georeference(&self) -> Option<GeoReference> {
        None
    }
}

/// Error opening a file as a dataset.
#[derive(Debug)]
pub enum OpenError {
    Io(std::io::Error),
    /// The bitstream could not be parsed.
    Format(String),
    /// The file parsed but uses a layout this adapter does not expose.
    Unsupported(String),
    /// The family was recognised but no decoder for it is built in.
    NoDecoder(SourceFamily),
    /// The file signature matches no known family.
    UnknownFamily,
    /// The image is larger than the limits the adapter was opened with.
    LimitsExceeded,
}

impl std::fmt::Display for OpenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpenError::Io(e) => write!(f, "I/O error: {}", e),
            OpenError::Format(e) => write!(f, "Format error: {}", e),
            OpenError::Unsupported(e) => write!(f, "Unsupported layout: {}", e),
            OpenError::NoDecoder(family) => write!(f, "No {} decoder available", family),
            OpenError::UnknownFamily => write!(f, "Unrecognised file signature"),
            OpenError::LimitsExceeded => write!(f, "Image exceeds the decoder's size limits"),
        }
    }
}

impl std::error::Error for OpenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OpenError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for OpenError {
    fn from(e: std::io::Error) -> Self {
        OpenError::Io(e)
    }
}

impl From<::png::DecodingError> for OpenError {
    fn from(e: ::png::DecodingError) -> Self {
        match e {
            ::png::DecodingError::IoError(io) => OpenError::Io(io),
            other => OpenError::Format(other.to_string()),
        }
    }
}

impl From<::tiff::TiffError> for OpenError {
    fn from(e: ::tiff::TiffError) -> Self {
        match e {
            ::tiff::TiffError::IoError(io) => OpenError::Io(io),
            ::tiff::TiffError::UnsupportedError(u) => OpenError::Unsupported(u.to_string()),
            ::tiff::TiffError::LimitsExceeded => OpenError::LimitsExceeded,
            other => OpenError::Format(other.to_string()),
        }
    }
}

/// Open `path` with the adapter for `family`.
pub fn open_family(path: &Path, family: SourceFamily) -> Result<Box<dyn Dataset>, OpenError> {
    match family {
        SourceFamily::Png => Ok(Box::new(PngDataset::open(path)?)),
        SourceFamily::GeoTiff => Ok(Box::new(TiffDataset::open(path)?)),
        SourceFamily::Jpeg2000 => Err(OpenError::NoDecoder(SourceFamily::Jpeg2000)),
    }
}

/// Detect the family of `path` and open it.
pub fn open(path: &Path) -> Result<Box<dyn Dataset>, OpenError> {
    match SourceFamily::detect_path(path)? {
        Some(family) => open_family(path, family),
        None => Err(OpenError::UnknownFamily),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_signatures() {
        assert_eq!(
            SourceFamily::detect(&PNG_SIGNATURE),
            Some(SourceFamily::Png)
        );
        assert_eq!(
            SourceFamily::detect(&JP2_SIGNATURE),
            Some(SourceFamily::Jpeg2000)
        );
        assert_eq!(
            SourceFamily::detect(&[0xFF, 0x4F, 0xFF, 0x51, 0x00]),
            Some(SourceFamily::Jpeg2000)
        );
        assert_eq!(
            SourceFamily::detect(b"II*\0\x08\0\0\0"),
            Some(SourceFamily::GeoTiff)
        );
        assert_eq!(
            SourceFamily::detect(b"MM\0*\0\0\0\x08"),
            Some(SourceFamily::GeoTiff)
        );
        assert_eq!(SourceFamily::detect(&[0xFF, 0xD8, 0xFF, 0xE0]), None);
        assert_eq!(SourceFamily::detect(&[]), None);
    }

    #[test]
    fn jpeg2000_reports_missing_decoder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.jp2");
        let mut bytes = JP2_SIGNATURE.to_vec();
        bytes.extend_from_slice(&[0u8; 32]);
        std::fs::write(&path, bytes).unwrap();

        match open(&path) {
            Err(OpenError::NoDecoder(SourceFamily::Jpeg2000)) => {}
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("jpeg2000 should not open"),
        }
    }

    #[test]
    fn unknown_signature_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"plain text, not a raster").unwrap();
        assert!(matches!(open(&path), Err(OpenError::UnknownFamily)));
    }
}
