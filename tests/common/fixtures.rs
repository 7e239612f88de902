use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tiff::encoder::{TiffEncoder, colortype};
use tiff::tags::Tag;

const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;

/// Write an 8-bit PNG of the given color type.
pub fn write_png(path: &Path, width: u32, height: u32, color: png::ColorType, data: &[u8]) {
    let file = BufWriter::new(File::create(path).unwrap());
    let mut encoder = png::Encoder::new(file, width, height);
    encoder.set_color(color);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(data).unwrap();
}

/// Write a 16-bit RGB PNG from native-order samples.
pub fn write_png_rgb16(path: &Path, width: u32, height: u32, samples: &[u16]) {
    let be: Vec<u8> = samples.iter().flat_map(|s| s.to_be_bytes()).collect();
    let file = BufWriter::new(File::create(path).unwrap());
    let mut encoder = png::Encoder::new(file, width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Sixteen);
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(&be).unwrap();
}

/// Write an RGB8 TIFF carrying GeoTIFF pixel-scale and tie-point tags.
pub fn write_geotiff_rgb8(
    path: &Path,
    width: u32,
    height: u32,
    data: &[u8],
    origin: (f64, f64),
    pixel_size: (f64, f64),
) {
    let mut file = File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(&mut file).unwrap();
    let mut image = encoder.new_image::<colortype::RGB8>(width, height).unwrap();
    let scale = [pixel_size.0, pixel_size.1, 0.0];
    let tie = [0.0, 0.0, 0.0, origin.0, origin.1, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(TAG_MODEL_PIXEL_SCALE), &scale[..])
        .unwrap();
    image
        .encoder()
        .write_tag(Tag::Unknown(TAG_MODEL_TIEPOINT), &tie[..])
        .unwrap();
    image.write_data(data).unwrap();
}

/// Write a single-band 8-bit grayscale TIFF.
pub fn write_tiff_gray8(path: &Path, width: u32, height: u32, data: &[u8]) {
    let mut file = File::create(path).unwrap();
    TiffEncoder::new(&mut file)
        .unwrap()
        .write_image::<colortype::Gray8>(width, height, data)
        .unwrap();
}

/// Four-sample CMYK TIFF, every pixel the same ink mix.
pub fn write_tiff_cmyk8(path: &Path, width: u32, height: u32, cmyk: [u8; 4]) {
    let data: Vec<u8> = (0..width * height).flat_map(|_| cmyk).collect();
    let mut file = File::create(path).unwrap();
    TiffEncoder::new(&mut file)
        .unwrap()
        .write_image::<colortype::CMYK8>(width, height, &data)
        .unwrap();
}

/// Interleave equally sized planes pixel by pixel.
pub fn interleave(planes: &[&[u8]]) -> Vec<u8> {
    let len = planes[0].len();
    let mut out = Vec::with_capacity(len * planes.len());
    for i in 0..len {
        for plane in planes {
            out.push(plane[i]);
        }
    }
    out
}
