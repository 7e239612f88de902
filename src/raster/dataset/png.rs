// ============================================================================
// PNG DATASET — png crate decoder exposed as 1–4 bands
// ============================================================================
//
// Palette and sub-byte grayscale are expanded by the png crate itself
// (`Transformations::EXPAND`), so every band ends up as u8 or u16.
// 16-bit samples arrive big-endian and are swapped to native order once.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::{BandReadError, BandSlot, Dataset, OpenError, SourceFamily};
use crate::raster::decoder::{PlaneGeometry, write_strided};
use crate::raster::format::{ColorRole, SampleType};

pub struct PngDataset {
    width: usize,
    height: usize,
    sample_type: SampleType,
    roles: Vec<ColorRole>,
    /// Decoded frame, pixel-interleaved, `line_size` bytes per row.
    pixels: Vec<u8>,
    line_size: usize,
}

impl PngDataset {
    pub fn open(path: &Path) -> Result<Self, OpenError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, OpenError> {
        let mut decoder = ::png::Decoder::new(reader);
        decoder.set_transformations(::png::Transformations::EXPAND);
        let mut reader = decoder.read_info()?;

        let mut pixels = vec![0u8; reader.output_buffer_size()];
        let info = reader.next_frame(&mut pixels)?;
        pixels.truncate(info.buffer_size());

        let sample_type = match info.bit_depth {
            ::png::BitDepth::Eight => SampleType::U8,
            ::png::BitDepth::Sixteen => SampleType::U16,
            other => {
                return Err(OpenError::Unsupported(format!(
                    "PNG bit depth {:?} after expansion",
                    other
                )));
            }
        };

        let roles = match info.color_type {
            ::png::ColorType::Grayscale => vec![ColorRole::Gray],
            ::png::ColorType::GrayscaleAlpha => vec![ColorRole::Gray, ColorRole::Alpha],
            ::png::ColorType::Rgb => vec![ColorRole::Red, ColorRole::Green, ColorRole::Blue],
            ::png::ColorType::Rgba => vec![
                ColorRole::Red,
                ColorRole::Green,
                ColorRole::Blue,
                ColorRole::Alpha,
            ],
            ::png::ColorType::Indexed => {
                return Err(OpenError::Unsupported(
                    "indexed PNG was not expanded".to_string(),
                ));
            }
        };

        if sample_type == SampleType::U16 {
            for sample in pixels.chunks_exact_mut(2) {
                let value = u16::from_be_bytes([sample[0], sample[1]]);
                sample.copy_from_slice(&value.to_ne_bytes());
            }
        }

        Ok(Self {
            width: info.width as usize,
            height: info.height as usize,
            sample_type,
            roles,
            pixels,
            line_size: info.line_size,
        })
    }
}

impl Dataset for PngDataset {
    fn family(&self) -> SourceFamily {
        SourceFamily::Png
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn band_count(&self) -> usize {
        self.roles.len()
    }

    fn band_sample_type(&self, _band: usize) -> SampleType {
        self.sample_type
    }

    fn band_color_role(&self, band: usize) -> ColorRole {
        self.roles[band - 1]
    }

    fn read_band_into(
        &mut self,
        band: usize,
        dest: &mut [u8],
        slot: BandSlot,
    ) -> Result<(), BandReadError> {
        if band == 0 || band > self.roles.len() {
            return Err(BandReadError::NoSuchBand(band));
        }
        let geometry = PlaneGeometry::interleaved(
            self.width,
            self.height,
            self.sample_type.size_bytes(),
            self.roles.len(),
            band - 1,
            self.line_size,
        );
        write_strided(&self.pixels, geometry, dest, slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(width: u32, height: u32, color: ::png::ColorType, depth: ::png::BitDepth, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = ::png::Encoder::new(&mut out, width, height);
            encoder.set_color(color);
            encoder.set_depth(depth);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(data).unwrap();
        }
        out
    }

    #[test]
    fn rgb8_bands_and_roles() {
        let data: Vec<u8> = (0..2 * 2 * 3).collect();
        let bytes = encode(2, 2, ::png::ColorType::Rgb, ::png::BitDepth::Eight, &data);
        let ds = PngDataset::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!((ds.width(), ds.height(), ds.band_count()), (2, 2, 3));
        assert_eq!(ds.band_sample_type(1), SampleType::U8);
        assert_eq!(ds.band_color_role(3), ColorRole::Blue);
        assert_eq!(ds.family(), SourceFamily::Png);
    }

    #[test]
    fn sixteen_bit_samples_become_native_order() {
        let samples: [u16; 4] = [0x0102, 0xA0B0, 0xFFFF, 0x0001];
        let be: Vec<u8> = samples.iter().flat_map(|s| s.to_be_bytes()).collect();
        let bytes = encode(1, 1, ::png::ColorType::Rgba, ::png::BitDepth::Sixteen, &be);
        let mut ds = PngDataset::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(ds.band_sample_type(1), SampleType::U16);

        let mut dest = [0u8; 2];
        let slot = BandSlot {
            offset: 0,
            pixel_stride: 2,
            line_stride: 2,
        };
        ds.read_band_into(2, &mut dest, slot).unwrap();
        assert_eq!(u16::from_ne_bytes(dest), 0xA0B0);
    }

    #[test]
    fn grayscale_alpha_roles() {
        let bytes = encode(1, 1, ::png::ColorType::GrayscaleAlpha, ::png::BitDepth::Eight, &[7, 9]);
        let ds = PngDataset::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(ds.band_count(), 2);
        assert_eq!(ds.band_color_role(1), ColorRole::Gray);
        assert_eq!(ds.band_color_role(2), ColorRole::Alpha);
    }

    #[test]
    fn garbage_is_a_format_error() {
        let result = PngDataset::from_reader(Cursor::new(b"\x89PNG\r\n\x1a\nnope".to_vec()));
        assert!(matches!(result, Err(OpenError::Format(_)) | Err(OpenError::Io(_))));
    }
}
