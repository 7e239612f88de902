use rasterview::raster::dataset::{MemoryDataset, SourceFamily};
use rasterview::raster::format::ColorRole;

/// A plane whose every sample depends on its position and `seed`, so a
/// misplaced or swapped band shows up as a wrong value.
pub fn pattern_u8(width: usize, height: usize, seed: u8) -> Vec<u8> {
    let mut plane = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            plane.push((x as u8).wrapping_mul(7).wrapping_add((y as u8).wrapping_mul(13)).wrapping_add(seed));
        }
    }
    plane
}

pub fn pattern_u16(width: usize, height: usize, seed: u16) -> Vec<u16> {
    let mut plane = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            plane.push((x as u16).wrapping_mul(701).wrapping_add((y as u16).wrapping_mul(1301)).wrapping_add(seed));
        }
    }
    plane
}

/// Three u8 bands tagged R, G, B with seeds 10, 20, 30.
pub fn rgb_u8(family: SourceFamily, width: usize, height: usize) -> MemoryDataset {
    MemoryDataset::new(family, width, height)
        .with_u8_band(ColorRole::Red, pattern_u8(width, height, 10))
        .with_u8_band(ColorRole::Green, pattern_u8(width, height, 20))
        .with_u8_band(ColorRole::Blue, pattern_u8(width, height, 30))
}
