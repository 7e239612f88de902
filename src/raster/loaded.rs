// ============================================================================
// LOADED RASTERS — the closed set of raster kinds a viewer session holds
// ============================================================================
//
// Both kinds carry their own ViewportState and expose the same capabilities
// (pan, zoom, reset, projection). Tearing one down is plain `Drop`.
//
//   RgbaRaster    — pixels decoded by the `image` crate into RGBA8 / RGBA16
//   DatasetRaster — pixels composed band by band by the RasterDecoder
// ============================================================================

use std::path::Path;

use image::{ColorType, DynamicImage};

use super::RasterImage;
use super::dataset::{self, GeoReference, OpenError, SourceFamily};
use super::decoder::{DecodeError, RasterDecoder};
use super::format::PixelFormat;
use crate::viewport::{Mat4, ViewportState};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug)]
pub enum LoadError {
    Io(std::io::Error),
    Open(OpenError),
    Decode(DecodeError),
    Image(image::ImageError),
    /// The dataset path failed and so did the generic fallback.
    Fallback {
        primary: Box<LoadError>,
        fallback: Box<LoadError>,
    },
    /// The generic decoder produced an image with a zero dimension.
    Empty,
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "I/O error: {}", e),
            LoadError::Open(e) => write!(f, "{}", e),
            LoadError::Decode(e) => write!(f, "Decode error: {}", e),
            LoadError::Image(e) => write!(f, "Image error: {}", e),
            LoadError::Fallback { primary, fallback } => {
                write!(f, "{} (fallback also failed: {})", primary, fallback)
            }
            LoadError::Empty => write!(f, "Image has no pixels"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(e) => Some(e),
            LoadError::Open(e) => Some(e),
            LoadError::Decode(e) => Some(e),
            LoadError::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e)
    }
}

impl From<OpenError> for LoadError {
    fn from(e: OpenError) -> Self {
        LoadError::Open(e)
    }
}

impl From<DecodeError> for LoadError {
    fn from(e: DecodeError) -> Self {
        LoadError::Decode(e)
    }
}

impl From<image::ImageError> for LoadError {
    fn from(e: image::ImageError) -> Self {
        LoadError::Image(e)
    }
}

impl LoadError {
    /// Whether the generic `image` decoder is worth trying after this failure.
    ///
    /// Layouts and sample types the band decoder rejects, and families with no
    /// dataset adapter, often still open as plain pictures. Read failures and
    /// allocation failures would fail the same way again.
    pub fn allows_fallback(&self) -> bool {
        match self {
            LoadError::Open(OpenError::NoDecoder(_) | OpenError::Unsupported(_)) => true,
            LoadError::Decode(
                DecodeError::UnsupportedSampleType(_)
                | DecodeError::UnsupportedBandLayout { .. }
                | DecodeError::BandTypeMismatch { .. },
            ) => true,
            _ => false,
        }
    }
}

// ============================================================================
// RASTER KINDS
// ============================================================================

/// Pixels decoded by the `image` crate.
pub struct RgbaRaster {
    view: ViewportState,
    width: usize,
    height: usize,
    pixel_format: PixelFormat,
    pending: Option<RasterImage>,
    /// Why the dataset path was not used, when this raster is a fallback.
    fallback_reason: Option<String>,
}

impl RgbaRaster {
    pub fn open(path: &Path) -> Result<Self, LoadError> {
        let img = image::open(path)?;
        Self::from_dynamic(img)
    }

    /// 16-bit sources keep their precision; everything else becomes RGBA8.
    pub fn from_dynamic(img: DynamicImage) -> Result<Self, LoadError> {
        let image = match img.color() {
            ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16 => {
                RasterImage::from_rgba16(img.into_rgba16())
            }
            _ => RasterImage::from_rgba8(img.into_rgba8()),
        }
        .ok_or(LoadError::Empty)?;
        Ok(Self::from_image(image))
    }

    pub fn from_image(image: RasterImage) -> Self {
        Self {
            view: ViewportState::new(),
            width: image.width(),
            height: image.height(),
            pixel_format: image.pixel_format(),
            pending: Some(image),
            fallback_reason: None,
        }
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        self.fallback_reason.as_deref()
    }
}

/// Pixels composed band by band from a multi-band dataset.
pub struct DatasetRaster {
    view: ViewportState,
    family: SourceFamily,
    band_count: usize,
    georeference: Option<GeoReference>,
    width: usize,
    height: usize,
    pixel_format: PixelFormat,
    pending: Option<RasterImage>,
}

impl DatasetRaster {
    pub fn open(path: &Path, family: SourceFamily, decoder: &RasterDecoder) -> Result<Self, LoadError> {
        let mut ds = dataset::open_family(path, family)?;
        let band_count = ds.band_count();
        let georeference = ds.georeference();
        let image = decoder.decode(ds.as_mut())?;
        Ok(Self {
            view: ViewportState::new(),
            family,
            band_count,
            georeference,
            width: image.width(),
            height: image.height(),
            pixel_format: image.pixel_format(),
            pending: Some(image),
        })
    }

    pub fn family(&self) -> SourceFamily {
        self.family
    }

    pub fn band_count(&self) -> usize {
        self.band_count
    }

    pub fn georeference(&self) -> Option<GeoReference> {
        self.georeference
    }
}

// ============================================================================
// CLOSED VARIANT SET
// ============================================================================

pub enum LoadedRaster {
    Rgba(RgbaRaster),
    Dataset(DatasetRaster),
}

impl LoadedRaster {
    /// Open `path`: recognised families go through the band decoder, anything
    /// else (or a family the decoder turns down) through the `image` crate.
    pub fn open(path: &Path, decoder: &RasterDecoder) -> Result<Self, LoadError> {
        let Some(family) = SourceFamily::detect_path(path)? else {
            return RgbaRaster::open(path).map(LoadedRaster::Rgba);
        };
        match DatasetRaster::open(path, family, decoder) {
            Ok(raster) => Ok(LoadedRaster::Dataset(raster)),
            Err(primary) if primary.allows_fallback() => match RgbaRaster::open(path) {
                Ok(mut raster) => {
                    raster.fallback_reason = Some(primary.to_string());
                    Ok(LoadedRaster::Rgba(raster))
                }
                Err(fallback) => Err(LoadError::Fallback {
                    primary: Box::new(primary),
                    fallback: Box::new(fallback),
                }),
            },
            Err(primary) => Err(primary),
        }
    }

    fn view(&self) -> &ViewportState {
        match self {
            LoadedRaster::Rgba(r) => &r.view,
            LoadedRaster::Dataset(r) => &r.view,
        }
    }

    fn view_mut(&mut self) -> &mut ViewportState {
        match self {
            LoadedRaster::Rgba(r) => &mut r.view,
            LoadedRaster::Dataset(r) => &mut r.view,
        }
    }

    pub fn viewport(&self) -> ViewportState {
        *self.view()
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.view_mut().pan(dx, dy);
    }

    pub fn zoom_by(&mut self, scroll: f32) {
        self.view_mut().zoom_by(scroll);
    }

    pub fn reset_view(&mut self) {
        self.view_mut().reset();
    }

    pub fn projection_matrix(&self, width: f32, height: f32) -> Mat4 {
        self.view().projection_matrix(width, height)
    }

    pub fn width(&self) -> usize {
        match self {
            LoadedRaster::Rgba(r) => r.width,
            LoadedRaster::Dataset(r) => r.width,
        }
    }

    pub fn height(&self) -> usize {
        match self {
            LoadedRaster::Rgba(r) => r.height,
            LoadedRaster::Dataset(r) => r.height,
        }
    }

    pub fn pixel_format(&self) -> PixelFormat {
        match self {
            LoadedRaster::Rgba(r) => r.pixel_format,
            LoadedRaster::Dataset(r) => r.pixel_format,
        }
    }

    /// Human-readable origin of the pixels, for the info overlay.
    pub fn source_label(&self) -> String {
        match self {
            LoadedRaster::Rgba(_) => "image decoder".to_string(),
            LoadedRaster::Dataset(r) => format!("{} dataset, {} bands", r.family, r.band_count),
        }
    }

    /// Hand the decoded pixels over for upload. Returns `None` once taken, so
    /// the CPU copy lives only until the presenter has it.
    pub fn take_image(&mut self) -> Option<RasterImage> {
        match self {
            LoadedRaster::Rgba(r) => r.pending.take(),
            LoadedRaster::Dataset(r) => r.pending.take(),
        }
    }

    /// Borrow the decoded pixels, if they have not been handed over yet.
    pub fn image(&self) -> Option<&RasterImage> {
        match self {
            LoadedRaster::Rgba(r) => r.pending.as_ref(),
            LoadedRaster::Dataset(r) => r.pending.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::format::ColorRole;
    use crate::raster::dataset::MemoryDataset;

    fn rgba_raster() -> LoadedRaster {
        let img = image::RgbaImage::from_pixel(4, 2, image::Rgba([1, 2, 3, 4]));
        LoadedRaster::Rgba(RgbaRaster::from_dynamic(DynamicImage::ImageRgba8(img)).unwrap())
    }

    #[test]
    fn variants_share_view_capabilities() {
        let mut raster = rgba_raster();
        raster.zoom_by(80.0);
        raster.pan(5.0, 5.0);
        assert!(raster.viewport().zoom() > 1.0);
        raster.reset_view();
        assert_eq!(raster.viewport(), ViewportState::new());
        let m = raster.projection_matrix(100.0, 50.0);
        assert_eq!(m.cols[0][0], 0.02);
    }

    #[test]
    fn image_is_taken_once() {
        let mut raster = rgba_raster();
        assert_eq!((raster.width(), raster.height()), (4, 2));
        assert!(raster.image().is_some());
        let img = raster.take_image().unwrap();
        assert_eq!(img.as_bytes().len(), 4 * 2 * 4);
        assert!(raster.take_image().is_none());
        // Dimensions stay known after hand-over.
        assert_eq!(raster.width(), 4);
    }

    #[test]
    fn sixteen_bit_dynamic_keeps_depth() {
        let img = image::ImageBuffer::<image::Luma<u16>, Vec<u16>>::from_pixel(2, 2, image::Luma([40000]));
        let raster = RgbaRaster::from_dynamic(DynamicImage::ImageLuma16(img)).unwrap();
        assert_eq!(raster.pixel_format, PixelFormat::Rgba16);
        let px = raster.pending.as_ref().unwrap().pixel(1, 1).unwrap();
        assert_eq!(px, [40000, 40000, 40000, 65535]);
    }

    #[test]
    fn fallback_policy() {
        assert!(LoadError::Open(OpenError::NoDecoder(SourceFamily::Jpeg2000)).allows_fallback());
        assert!(LoadError::Decode(DecodeError::UnsupportedBandLayout {
            family: SourceFamily::Png,
            band_count: 1,
        })
        .allows_fallback());
        assert!(LoadError::Open(OpenError::Unsupported("CMYK".into())).allows_fallback());
        assert!(!LoadError::Decode(DecodeError::OutOfMemory { requested: Some(1) }).allows_fallback());
        assert!(!LoadError::Decode(DecodeError::OutOfMemory { requested: None }).allows_fallback());
        assert!(!LoadError::Open(OpenError::LimitsExceeded).allows_fallback());
        assert!(!LoadError::Io(std::io::Error::other("x")).allows_fallback());
    }

    #[test]
    fn grayscale_png_falls_back_to_image_decoder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        image::GrayImage::from_pixel(3, 3, image::Luma([90])).save(&path).unwrap();

        let raster = LoadedRaster::open(&path, &RasterDecoder::default()).unwrap();
        match &raster {
            LoadedRaster::Rgba(r) => assert!(r.fallback_reason().is_some()),
            LoadedRaster::Dataset(_) => panic!("1-band PNG should not decode as a dataset"),
        }
        assert_eq!(raster.image().unwrap().pixel(0, 0), Some([90, 90, 90, 255]));
    }

    #[test]
    fn rgb_png_decodes_as_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgb.png");
        image::RgbImage::from_pixel(2, 3, image::Rgb([10, 20, 30])).save(&path).unwrap();

        let raster = LoadedRaster::open(&path, &RasterDecoder::default()).unwrap();
        let LoadedRaster::Dataset(ds) = &raster else {
            panic!("RGB PNG should decode through the band decoder");
        };
        assert_eq!(ds.family(), SourceFamily::Png);
        assert_eq!(ds.band_count(), 3);
        assert_eq!(raster.image().unwrap().pixel(1, 2), Some([10, 20, 30, 255]));
        assert!(raster.source_label().contains("PNG"));
    }

    #[test]
    fn dataset_raster_from_memory_source() {
        let mut ds = MemoryDataset::new(SourceFamily::GeoTiff, 1, 1)
            .with_u8_band(ColorRole::Red, vec![1])
            .with_u8_band(ColorRole::Green, vec![2])
            .with_u8_band(ColorRole::Blue, vec![3]);
        let image = RasterDecoder::default().decode(&mut ds).unwrap();
        assert_eq!(image.as_bytes(), &[1, 2, 3, 255]);
    }
}
