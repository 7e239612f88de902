// ============================================================================
// VIEWER SETTINGS — read-only key=value configuration
// ============================================================================
//
// Example `rasterview_settings.cfg`:
//
//   preferred_gpu=integrated
//   scroll_units_per_point=0.08
//   zoom_filter_mode=nearest
//   background=128,128,128
//   show_info_window=true
//
// Unknown keys and unparsable values are ignored; missing keys keep their
// defaults. The viewer never writes this file.
// ============================================================================

use std::path::{Path, PathBuf};

/// How texels are filtered when the raster is drawn larger than 1:1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoomFilterMode {
    Nearest,
    Linear,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ViewerSettings {
    /// Adapter preference string passed to the GPU context.
    pub preferred_gpu: String,
    /// Scroll units handed to `zoom_by` per egui scroll point.
    pub scroll_units_per_point: f32,
    pub zoom_filter_mode: ZoomFilterMode,
    /// Clear colour behind the raster. Mid-gray by default.
    pub background: [u8; 3],
    pub show_info_window: bool,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            preferred_gpu: String::new(),
            scroll_units_per_point: 0.08,
            zoom_filter_mode: ZoomFilterMode::Nearest,
            background: [128, 128, 128],
            show_info_window: true,
        }
    }
}

impl ViewerSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/rasterview/rasterview_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\rasterview\rasterview_settings.cfg
    /// On macOS:   ~/Library/Application Support/rasterview/rasterview_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        config_dir().map(|d| d.join("rasterview").join("rasterview_settings.cfg"))
    }

    /// Load from the platform settings file, falling back to defaults.
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else { return Self::default() };
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "preferred_gpu" => {
                    s.preferred_gpu = val.to_string();
                }
                "scroll_units_per_point" => {
                    if let Ok(v) = val.parse::<f32>()
                        && v.is_finite()
                        && v > 0.0
                    {
                        s.scroll_units_per_point = v;
                    }
                }
                "zoom_filter_mode" => {
                    s.zoom_filter_mode = match val {
                        "linear" => ZoomFilterMode::Linear,
                        _ => ZoomFilterMode::Nearest,
                    };
                }
                "background" => {
                    if let Some(c) = Self::str_to_rgb(val) {
                        s.background = c;
                    }
                }
                "show_info_window" => {
                    s.show_info_window = val == "true";
                }
                _ => {}
            }
        }
        s
    }

    fn str_to_rgb(s: &str) -> Option<[u8; 3]> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() == 3 {
            let r = parts[0].trim().parse::<u8>().ok()?;
            let g = parts[1].trim().parse::<u8>().ok()?;
            let b = parts[2].trim().parse::<u8>().ok()?;
            Some([r, g, b])
        } else {
            None
        }
    }
}

/// Platform config directory (without the app sub-folder).
pub(crate) fn config_dir() -> Option<PathBuf> {
    platform_dir("XDG_CONFIG_HOME", &[".config"])
}

/// Platform data directory (without the app sub-folder). Holds the session log.
pub(crate) fn data_dir() -> Option<PathBuf> {
    platform_dir("XDG_DATA_HOME", &[".local", "share"])
}

// Windows and macOS keep config and data side by side; elsewhere the XDG
// variable wins over the `$HOME` default.
fn platform_dir(xdg_var: &str, home_default: &[&str]) -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let _ = (xdg_var, home_default);
        std::env::var_os("APPDATA").map(PathBuf::from)
    }
    #[cfg(target_os = "macos")]
    {
        let _ = (xdg_var, home_default);
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join("Library").join("Application Support"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(dir) = std::env::var_os(xdg_var).filter(|d| !d.is_empty()) {
            return Some(PathBuf::from(dir));
        }
        let home = PathBuf::from(std::env::var_os("HOME")?);
        Some(home_default.iter().fold(home, |p, part| p.join(part)))
    }
}
