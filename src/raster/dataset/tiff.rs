// ============================================================================
// TIFF / GEOTIFF DATASET — tiff crate decoder exposed as N bands
// ============================================================================
//
// Band roles come from the baseline tags:
//   PhotometricInterpretation  RGB → R,G,B · gray → Gray · palette → Palette
//   ExtraSamples               1/2 (assoc./unassoc. alpha) → Alpha, else Undefined
// Other colour spaces (CMYK, YCbCr, CIELab, ...) are refused as Unsupported so
// the loader can hand the file to the image crate instead.
// Sample types come from BitsPerSample + SampleFormat, per band.
// Only chunky (pixel-interleaved) storage is exposed. The whole first image is
// decoded at once, so the tiff crate's buffer limit is lifted by default.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use ::tiff::decoder::{Decoder, DecodingResult, Limits};
use ::tiff::tags::Tag;

use super::{BandReadError, BandSlot, Dataset, GeoReference, OpenError, SourceFamily};
use crate::raster::decoder::{PlaneGeometry, write_strided};
use crate::raster::format::{ColorRole, SampleType};

const PHOTOMETRIC_WHITE_IS_ZERO: u32 = 0;
const PHOTOMETRIC_BLACK_IS_ZERO: u32 = 1;
const PHOTOMETRIC_RGB: u32 = 2;
const PHOTOMETRIC_PALETTE: u32 = 3;

const PLANAR_CHUNKY: u32 = 1;

const SAMPLE_FORMAT_UINT: u32 = 1;
const SAMPLE_FORMAT_INT: u32 = 2;
const SAMPLE_FORMAT_FLOAT: u32 = 3;

const EXTRA_ASSOCIATED_ALPHA: u32 = 1;
const EXTRA_UNASSOCIATED_ALPHA: u32 = 2;

const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;

struct TiffBand {
    sample_type: SampleType,
    role: ColorRole,
}

pub struct TiffDataset {
    width: usize,
    height: usize,
    bands: Vec<TiffBand>,
    sample_size: usize,
    /// First image of the file, chunky, rows tightly packed.
    pixels: Vec<u8>,
    georeference: Option<GeoReference>,
}

impl TiffDataset {
    pub fn open(path: &Path) -> Result<Self, OpenError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self, OpenError> {
        Self::from_reader_with_limits(reader, Limits::unlimited())
    }

    /// Open with explicit decoder limits. Exceeding them is
    /// `OpenError::LimitsExceeded`.
    pub fn from_reader_with_limits<R: Read + Seek>(
        reader: R,
        limits: Limits,
    ) -> Result<Self, OpenError> {
        let mut decoder = Decoder::new(reader)?.with_limits(limits);
        let (width, height) = decoder.dimensions()?;

        let samples_per_pixel = tag_u32(&mut decoder, Tag::SamplesPerPixel)?.unwrap_or(1) as usize;
        let planar = tag_u32(&mut decoder, Tag::PlanarConfiguration)?.unwrap_or(PLANAR_CHUNKY);
        if planar != PLANAR_CHUNKY {
            return Err(OpenError::Unsupported(
                "planar TIFF storage is not supported".to_string(),
            ));
        }

        let bits = tag_u32_vec(&mut decoder, Tag::BitsPerSample)?.unwrap_or_else(|| vec![1]);
        let formats =
            tag_u32_vec(&mut decoder, Tag::SampleFormat)?.unwrap_or_else(|| vec![SAMPLE_FORMAT_UINT]);
        let photometric = tag_u32(&mut decoder, Tag::PhotometricInterpretation)?
            .unwrap_or(PHOTOMETRIC_BLACK_IS_ZERO);
        let extras = tag_u32_vec(&mut decoder, Tag::ExtraSamples)?.unwrap_or_default();

        let roles = band_roles(photometric, samples_per_pixel, &extras)?;
        let mut bands = Vec::with_capacity(samples_per_pixel);
        for (i, role) in roles.into_iter().enumerate() {
            // Single-valued tags apply to every sample.
            let bits = *bits.get(i).or(bits.last()).unwrap_or(&1);
            let format = *formats.get(i).or(formats.last()).unwrap_or(&SAMPLE_FORMAT_UINT);
            bands.push(TiffBand {
                sample_type: sample_type(bits, format)?,
                role,
            });
        }

        let georeference = read_georeference(&mut decoder);

        let (pixels, sample_size) = match decoder.read_image()? {
            DecodingResult::U8(v) => (v, 1),
            DecodingResult::U16(v) => (bytemuck::cast_slice::<u16, u8>(&v).to_vec(), 2),
            DecodingResult::U32(v) => (bytemuck::cast_slice::<u32, u8>(&v).to_vec(), 4),
            DecodingResult::F32(v) => (bytemuck::cast_slice::<f32, u8>(&v).to_vec(), 4),
            DecodingResult::F64(v) => (bytemuck::cast_slice::<f64, u8>(&v).to_vec(), 8),
            #[allow(unreachable_patterns)]
            _ => {
                return Err(OpenError::Unsupported(
                    "TIFF sample layout has no byte view".to_string(),
                ));
            }
        };

        Ok(Self {
            width: width as usize,
            height: height as usize,
            bands,
            sample_size,
            pixels,
            georeference,
        })
    }
}

fn tag_u32<R: Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> Result<Option<u32>, OpenError> {
    match decoder.find_tag(tag)? {
        Some(value) => Ok(Some(value.into_u32()?)),
        None => Ok(None),
    }
}

fn tag_u32_vec<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    tag: Tag,
) -> Result<Option<Vec<u32>>, OpenError> {
    match decoder.find_tag(tag)? {
        Some(value) => Ok(Some(value.into_u32_vec()?)),
        None => Ok(None),
    }
}

/// GeoTIFF placement, if both the tie point and pixel scale tags are present.
fn read_georeference<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoReference> {
    let scale = decoder
        .find_tag(Tag::from_u16_exhaustive(TAG_MODEL_PIXEL_SCALE))
        .ok()??
        .into_f64_vec()
        .ok()?;
    let tie = decoder
        .find_tag(Tag::from_u16_exhaustive(TAG_MODEL_TIEPOINT))
        .ok()??
        .into_f64_vec()
        .ok()?;
    if scale.len() < 2 || tie.len() < 6 {
        return None;
    }
    // Tie point maps raster (i, j) to model (x, y).
    let (i, j, x, y) = (tie[0], tie[1], tie[3], tie[4]);
    Some(GeoReference {
        origin: (x - i * scale[0], y + j * scale[1]),
        pixel_size: (scale[0], scale[1]),
    })
}

fn band_roles(
    photometric: u32,
    samples_per_pixel: usize,
    extras: &[u32],
) -> Result<Vec<ColorRole>, OpenError> {
    let base: &[ColorRole] = match photometric {
        PHOTOMETRIC_RGB => &[ColorRole::Red, ColorRole::Green, ColorRole::Blue],
        PHOTOMETRIC_WHITE_IS_ZERO | PHOTOMETRIC_BLACK_IS_ZERO => &[ColorRole::Gray],
        PHOTOMETRIC_PALETTE => &[ColorRole::Palette],
        other => {
            return Err(OpenError::Unsupported(format!(
                "photometric interpretation {} has no band roles",
                other
            )));
        }
    };
    if samples_per_pixel < base.len() {
        return Err(OpenError::Unsupported(format!(
            "photometric {} needs {} samples per pixel, file has {}",
            photometric,
            base.len(),
            samples_per_pixel
        )));
    }

    let mut roles = base.to_vec();
    for extra in 0..samples_per_pixel - base.len() {
        let role = match extras.get(extra) {
            Some(&EXTRA_ASSOCIATED_ALPHA) | Some(&EXTRA_UNASSOCIATED_ALPHA) => ColorRole::Alpha,
            _ => ColorRole::Undefined,
        };
        roles.push(role);
    }
    Ok(roles)
}

fn sample_type(bits: u32, format: u32) -> Result<SampleType, OpenError> {
    let ty = match (format, bits) {
        (SAMPLE_FORMAT_UINT, 8) => SampleType::U8,
        (SAMPLE_FORMAT_UINT, 16) => SampleType::U16,
        (SAMPLE_FORMAT_UINT, 32) => SampleType::U32,
        (SAMPLE_FORMAT_INT, 8) => SampleType::I8,
        (SAMPLE_FORMAT_INT, 16) => SampleType::I16,
        (SAMPLE_FORMAT_INT, 32) => SampleType::I32,
        (SAMPLE_FORMAT_FLOAT, 32) => SampleType::F32,
        (SAMPLE_FORMAT_FLOAT, 64) => SampleType::F64,
        _ => {
            return Err(OpenError::Unsupported(format!(
                "{}-bit samples with sample format {}",
                bits, format
            )));
        }
    };
    Ok(ty)
}

impl Dataset for TiffDataset {
    fn family(&self) -> SourceFamily {
        SourceFamily::GeoTiff
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn band_count(&self) -> usize {
        self.bands.len()
    }

    fn band_sample_type(&self, band: usize) -> SampleType {
        self.bands[band - 1].sample_type
    }

    fn band_color_role(&self, band: usize) -> ColorRole {
        self.bands[band - 1].role
    }

    fn georeference(&self) -> Option<GeoReference> {
        self.georeference
    }

    fn read_band_into(
        &mut self,
        band: usize,
        dest: &mut [u8],
        slot: BandSlot,
    ) -> Result<(), BandReadError> {
        let Some(meta) = band.checked_sub(1).and_then(|i| self.bands.get(i)) else {
            return Err(BandReadError::NoSuchBand(band));
        };
        if meta.sample_type.size_bytes() != self.sample_size {
            return Err(BandReadError::SampleSize {
                expected: meta.sample_type.size_bytes(),
                found: self.sample_size,
            });
        }
        let spp = self.bands.len();
        let geometry = PlaneGeometry::interleaved(
            self.width,
            self.height,
            self.sample_size,
            spp,
            band - 1,
            self.width * spp * self.sample_size,
        );
        write_strided(&self.pixels, geometry, dest, slot)
    }
}
