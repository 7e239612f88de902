//! rasterview: pan/zoom viewer for multi-band raster imagery.
//!
//! The decode engine (`raster`) and the view transform (`viewport`) carry no
//! windowing or GPU dependencies; `gpu`, `app` and `cli` make up the shell.

pub mod logger;

pub mod app;
pub mod cli;
pub mod gpu;
pub mod raster;
pub mod settings;
pub mod viewport;

pub use raster::{DecodeError, LoadedRaster, RasterDecoder, RasterImage, decode};
pub use viewport::{Mat4, ViewportState};
