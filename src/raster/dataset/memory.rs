// ============================================================================
// MEMORY DATASET — bands held as tightly packed planes in RAM
// ============================================================================

use super::{BandReadError, BandSlot, Dataset, SourceFamily};
use crate::raster::decoder::{PlaneGeometry, write_strided};
use crate::raster::format::{ColorRole, SampleType};

struct MemoryBand {
    sample_type: SampleType,
    role: ColorRole,
    /// Row-major samples, native byte order, no row padding.
    data: Vec<u8>,
}

/// A dataset built band by band from in-memory planes.
///
/// Used for synthetic sources and by tools that already hold decoded planes.
pub struct MemoryDataset {
    family: SourceFamily,
    width: usize,
    height: usize,
    bands: Vec<MemoryBand>,
    reads: usize,
}

impl MemoryDataset {
    pub fn new(family: SourceFamily, width: usize, height: usize) -> Self {
        Self {
            family,
            width,
            height,
            bands: Vec::new(),
            reads: 0,
        }
    }

    /// Append a band whose plane is given as raw bytes.
    pub fn with_band(mut self, sample_type: SampleType, role: ColorRole, data: Vec<u8>) -> Self {
        self.bands.push(MemoryBand {
            sample_type,
            role,
            data,
        });
        self
    }

    pub fn with_u8_band(self, role: ColorRole, data: Vec<u8>) -> Self {
        self.with_band(SampleType::U8, role, data)
    }

    pub fn with_u16_band(self, role: ColorRole, samples: &[u16]) -> Self {
        let data = bytemuck::cast_slice::<u16, u8>(samples).to_vec();
        self.with_band(SampleType::U16, role, data)
    }

    /// Number of successful or failed `read_band_into` calls so far.
    pub fn reads(&self) -> usize {
        self.reads
    }

    fn band(&self, band: usize) -> Result<&MemoryBand, BandReadError> {
        band.checked_sub(1)
            .and_then(|i| self.bands.get(i))
            .ok_or(BandReadError::NoSuchBand(band))
    }
}

impl Dataset for MemoryDataset {
    fn family(&self) -> SourceFamily {
        self.family
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

    fn read_band_into(
        &mut self,
        band: usize,
        dest: &mut [u8],
        slot: BandSlot,
    ) -> Result<(), BandReadError> {
        self.reads += 1;
        let plane = self.band(band)?;
        let geometry = PlaneGeometry::packed(self.width, self.height, plane.sample_type.size_bytes());
        write_strided(&plane.data, geometry, dest, slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_metadata_per_band() {
        let ds = MemoryDataset::new(SourceFamily::GeoTiff, 3, 2)
            .with_u16_band(ColorRole::Gray, &[0; 6])
            .with_u8_band(ColorRole::Alpha, vec![0; 6]);
        assert_eq!(ds.band_count(), 2);
        assert_eq!(ds.band_sample_type(1), SampleType::U16);
        assert_eq!(ds.band_color_role(2), ColorRole::Alpha);
    }

    #[test]
    fn unknown_band_is_an_error() {
        let mut ds = MemoryDataset::new(SourceFamily::Png, 1, 1)
            .with_u8_band(ColorRole::Red, vec![1]);
        let mut dest = [0u8; 4];
        let slot = BandSlot {
            offset: 0,
            pixel_stride: 4,
            line_stride: 4,
        };
        assert_eq!(
            ds.read_band_into(0, &mut dest, slot),
            Err(BandReadError::NoSuchBand(0))
        );
        assert_eq!(
            ds.read_band_into(2, &mut dest, slot),
            Err(BandReadError::NoSuchBand(2))
        );
        assert_eq!(ds.reads(), 2);
    }
}
