mod common;

use common::fixtures::{
    interleave, write_geotiff_rgb8, write_png, write_png_rgb16, write_tiff_cmyk8, write_tiff_gray8,
};
use common::synthetic::{pattern_u16, pattern_u8};
use rasterview::raster::dataset::{self, OpenError, SourceFamily};
use rasterview::raster::format::PixelFormat;
use rasterview::raster::{DecodeError, LoadedRaster, RasterDecoder, decode};

#[test]
fn rgba_png_round_trips_through_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rgba.png");
    let (w, h) = (9usize, 7usize);
    let planes: Vec<Vec<u8>> = (0..4).map(|b| pattern_u8(w, h, b * 50)).collect();
    let refs: Vec<&[u8]> = planes.iter().map(|p| p.as_slice()).collect();
    let data = interleave(&refs);
    write_png(&path, w as u32, h as u32, png::ColorType::Rgba, &data);

    let mut ds = dataset::open(&path).unwrap();
    assert_eq!(ds.family(), SourceFamily::Png);
    let image = decode(ds.as_mut()).unwrap();
    assert_eq!(image.pixel_format(), PixelFormat::Rgba8);
    assert_eq!(image.as_bytes(), data.as_slice());
}

#[test]
fn sixteen_bit_png_keeps_precision() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rgb16.png");
    let (w, h) = (4usize, 3usize);
    let r = pattern_u16(w, h, 1000);
    let g = pattern_u16(w, h, 2000);
    let b = pattern_u16(w, h, 3000);
    let samples: Vec<u16> = (0..w * h).flat_map(|i| [r[i], g[i], b[i]]).collect();
    write_png_rgb16(&path, w as u32, h as u32, &samples);

    let mut ds = dataset::open(&path).unwrap();
    let image = decode(ds.as_mut()).unwrap();
    assert_eq!(image.pixel_format(), PixelFormat::Rgba16);
    assert_eq!(image.pixel(3, 2), Some([r[11], g[11], b[11], u16::MAX]));
}

#[test]
fn geotiff_decodes_with_placement() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.tif");
    let (w, h) = (6usize, 5usize);
    let planes: Vec<Vec<u8>> = (0..3).map(|b| pattern_u8(w, h, b * 80)).collect();
    let refs: Vec<&[u8]> = planes.iter().map(|p| p.as_slice()).collect();
    let data = interleave(&refs);
    write_geotiff_rgb8(&path, w as u32, h as u32, &data, (500_000.0, 4_100_000.0), (30.0, 30.0));

    let raster = LoadedRaster::open(&path, &RasterDecoder::default()).unwrap();
    let LoadedRaster::Dataset(ds) = &raster else {
        panic!("RGB GeoTIFF should decode through the band decoder");
    };
    assert_eq!(ds.family(), SourceFamily::GeoTiff);
    let geo = ds.georeference().expect("placement tags were written");
    assert_eq!(geo.origin, (500_000.0, 4_100_000.0));
    assert_eq!(geo.pixel_size, (30.0, 30.0));

    let image = raster.image().unwrap();
    for i in 0..w * h {
        let px = image.pixel(i % w, i / w).unwrap();
        assert_eq!(
            px,
            [planes[0][i] as u16, planes[1][i] as u16, planes[2][i] as u16, 255]
        );
    }
}

#[test]
fn single_band_tiff_is_rejected_then_shown_by_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gray.tif");
    write_tiff_gray8(&path, 3, 2, &[0, 50, 100, 150, 200, 250]);

    let mut ds = dataset::open(&path).unwrap();
    assert!(matches!(
        decode(ds.as_mut()),
        Err(DecodeError::UnsupportedBandLayout { band_count: 1, .. })
    ));

    let raster = LoadedRaster::open(&path, &RasterDecoder::default()).unwrap();
    assert!(matches!(raster, LoadedRaster::Rgba(_)));
    assert_eq!(raster.image().unwrap().pixel(1, 1), Some([200, 200, 200, 255]));
}

#[test]
fn cmyk_tiff_falls_back_instead_of_decoding_black() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ink.tif");
    // Magenta + yellow, no black: pure red.
    write_tiff_cmyk8(&path, 2, 2, [0, 255, 255, 0]);

    assert!(matches!(dataset::open(&path), Err(OpenError::Unsupported(_))));

    let raster = LoadedRaster::open(&path, &RasterDecoder::default()).unwrap();
    let LoadedRaster::Rgba(rgba) = &raster else {
        panic!("CMYK must not come out of the band decoder");
    };
    assert!(rgba.fallback_reason().is_some());
    assert_eq!(raster.image().unwrap().pixel(0, 0), Some([255, 0, 0, 255]));
}

#[test]
fn unknown_format_goes_to_image_decoder() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("photo.bmp");
    image::RgbImage::from_pixel(3, 3, image::Rgb([5, 6, 7])).save(&path).unwrap();

    assert!(matches!(dataset::open(&path), Err(OpenError::UnknownFamily)));
    let raster = LoadedRaster::open(&path, &RasterDecoder::default()).unwrap();
    assert_eq!(raster.source_label(), "image decoder");
    assert_eq!(raster.image().unwrap().pixel(2, 2), Some([5, 6, 7, 255]));
}

#[test]
fn unreadable_file_reports_both_failures() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.jp2");
    let mut bytes = vec![0x00, 0x00, 0x00, 0x0C, b'j', b'P', b' ', b' ', 0x0D, 0x0A, 0x87, 0x0A];
    bytes.extend_from_slice(&[0u8; 16]);
    std::fs::write(&path, bytes).unwrap();

    let err = LoadedRaster::open(&path, &RasterDecoder::default())
        .err()
        .expect("no decoder can read this file");
    let text = err.to_string();
    assert!(text.contains("JPEG2000"), "{}", text);
    assert!(text.contains("fallback"), "{}", text);
}
