// ============================================================================
// rasterview CLI — argument parsing and the headless `--info` mode
// ============================================================================
//
// Usage examples:
//   rasterview scene.tif                  (open the viewer)
//   rasterview --gpu integrated photo.png (prefer the low-power adapter)
//   rasterview --info scene.tif           (decode, print a summary, exit)
//
// Exactly one file path is accepted; anything else is a usage error reported
// by clap with a nonzero exit status.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::raster::{LoadedRaster, RasterDecoder};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Pan and zoom over a single raster image.
#[derive(Parser, Debug)]
#[command(
    name = "rasterview",
    version,
    about = "Interactive pan/zoom viewer for PNG, GeoTIFF and other raster images",
    long_about = "Open one raster image and pan (drag) and zoom (scroll) over it.\n\
                  Multi-band PNG and GeoTIFF sources are composed band by band into\n\
                  RGBA; other formats go through the generic image decoder.\n\n\
                  Keys: 0 resets the view, Escape quits."
)]
pub struct ViewerArgs {
    /// Raster file to open.
    #[arg(value_name = "FILE")]
    pub path: PathBuf,

    /// Decode the file, print a summary and exit without opening a window.
    #[arg(long)]
    pub info: bool,

    /// GPU adapter preference: "integrated"/"low power" or "discrete"/"high performance".
    /// Overrides `preferred_gpu` from the settings file.
    #[arg(long, value_name = "PREFERENCE")]
    pub gpu: Option<String>,

    /// Print decode timing in `--info` mode.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Headless entry point
// ============================================================================

/// Decode `args.path` and print what the viewer would show.
/// `0` = decoded, `1` = the file could not be loaded.
pub fn run_info(args: &ViewerArgs, decoder: &RasterDecoder) -> ExitCode {
    let start = Instant::now();
    match LoadedRaster::open(&args.path, decoder) {
        Ok(raster) => {
            print!("{}", describe(&args.path, &raster));
            if args.verbose {
                println!("decoded in {:.1} ms", start.elapsed().as_secs_f64() * 1000.0);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: could not load '{}': {}", args.path.display(), e);
            ExitCode::FAILURE
        }
    }
}

/// Multi-line summary of a loaded raster, one `key: value` per line.
pub fn describe(path: &Path, raster: &LoadedRaster) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mut out = String::new();
    out.push_str(&format!("file: {}\n", name));
    out.push_str(&format!("size: {} x {}\n", raster.width(), raster.height()));
    out.push_str(&format!("format: {}\n", raster.pixel_format()));
    out.push_str(&format!("source: {}\n", raster.source_label()));
    match raster {
        LoadedRaster::Dataset(ds) => {
            if let Some(geo) = ds.georeference() {
                out.push_str(&format!(
                    "origin: {}, {}\npixel size: {}, {}\n",
                    geo.origin.0, geo.origin.1, geo.pixel_size.0, geo.pixel_size.1
                ));
            }
        }
        LoadedRaster::Rgba(r) => {
            if let Some(reason) = r.fallback_reason() {
                out.push_str(&format!("fallback: {}\n", reason));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_definition_is_valid() {
        ViewerArgs::command().debug_assert();
    }

    #[test]
    fn exactly_one_path() {
        assert!(ViewerArgs::try_parse_from(["rasterview"]).is_err());
        assert!(ViewerArgs::try_parse_from(["rasterview", "a.png", "b.png"]).is_err());
        let args = ViewerArgs::try_parse_from(["rasterview", "--info", "a.png"]).unwrap();
        assert_eq!(args.path, PathBuf::from("a.png"));
        assert!(args.info);
        assert!(args.gpu.is_none());
    }

    #[test]
    fn gpu_preference_flag() {
        let args = ViewerArgs::try_parse_from(["rasterview", "--gpu", "integrated", "x.tif"]).unwrap();
        assert_eq!(args.gpu.as_deref(), Some("integrated"));
    }

    #[test]
    fn describe_lists_dimensions_and_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.png");
        image::RgbaImage::from_pixel(5, 4, image::Rgba([0, 0, 0, 255]))
            .save(&path)
            .unwrap();
        let raster = LoadedRaster::open(&path, &RasterDecoder::default()).unwrap();
        let text = describe(&path, &raster);
        assert!(text.contains("file: tile.png\n"));
        assert!(text.contains("size: 5 x 4\n"));
        assert!(text.contains("format: RGBA 8-bit\n"));
        assert!(text.contains("source: PNG dataset, 4 bands\n"));
    }

    #[test]
    fn info_mode_fails_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let args = ViewerArgs {
            path: dir.path().join("missing.png"),
            info: true,
            gpu: None,
            verbose: false,
        };
        assert_eq!(run_info(&args, &RasterDecoder::default()), ExitCode::FAILURE);
    }
}
