use std::process::ExitCode;

use clap::Parser;
use eframe::egui;

use rasterview::app::{ViewerApp, ViewerSession};
use rasterview::cli::{self, ViewerArgs};
use rasterview::raster::{LoadedRaster, RasterDecoder};
use rasterview::settings::ViewerSettings;
use rasterview::{log_err, log_info, log_warn, logger};

fn main() -> ExitCode {
    // Usage errors exit here with clap's status code.
    let args = ViewerArgs::parse();
    let decoder = RasterDecoder::default();

    // -- Headless mode --------------------------------------------------
    if args.info {
        return cli::run_info(&args, &decoder);
    }

    // -- GUI mode -------------------------------------------------------

    // Initialize session log (overwrites previous session log)
    logger::init();

    let mut settings = ViewerSettings::load();
    if let Some(gpu) = &args.gpu {
        settings.preferred_gpu = gpu.clone();
    }
    log_info!("Opening {}", args.path.display());

    let session = match ViewerSession::open(&args.path, settings, &decoder) {
        Ok(session) => session,
        Err(e) => {
            log_err!("Could not load {}: {}", args.path.display(), e);
            eprintln!("error: could not load '{}': {}", args.path.display(), e);
            return ExitCode::FAILURE;
        }
    };
    if let LoadedRaster::Rgba(r) = &session.raster
        && let Some(reason) = r.fallback_reason()
    {
        log_warn!("Band decoder declined the file ({}), used image decoder", reason);
    }
    log_info!(
        "Loaded {}x{} {} ({})",
        session.raster.width(),
        session.raster.height(),
        session.raster.pixel_format(),
        session.raster.source_label()
    );

    let title = format!("{} - rasterview", session.file_label());
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title(title),
        ..Default::default()
    };

    let result = eframe::run_native(
        "rasterview",
        options,
        Box::new(move |cc| Box::new(ViewerApp::new(cc, session))),
    );
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_err!("Event loop failed: {}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
