//! Session log for the viewer shell.
//!
//! One file per run at `<data dir>/rasterview/rasterview.log`, truncated when
//! the viewer starts. Lines carry the time since the session began and a
//! level tag:
//!
//! ```text
//! [    0.412s] [INFO] Loaded 6000x4000 RGBA 8-bit (GeoTIFF dataset, 3 bands)
//! ```
//!
//! The `log_info!` / `log_warn!` / `log_err!` macros are no-ops until `init()`
//! has run, so the headless `--info` path never touches the file. The decode
//! engine does not log; only the shell does.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use crate::settings;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
    Panic,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Panic => "PANIC",
        })
    }
}

struct SessionLog {
    path: PathBuf,
    started: Instant,
    file: Mutex<File>,
}

static SESSION: OnceLock<SessionLog> = OnceLock::new();

/// Path of the active session log, once `init` has opened it.
pub fn log_path() -> Option<&'static Path> {
    SESSION.get().map(|s| s.path.as_path())
}

/// Append one tagged line. I/O errors are dropped: a full disk must not take
/// the viewer down.
pub fn write(level: Level, args: fmt::Arguments<'_>) {
    let Some(session) = SESSION.get() else { return };
    let line = format_line(session.started.elapsed().as_secs_f64(), level, args);
    if let Ok(mut file) = session.file.lock() {
        let _ = file.write_all(line.as_bytes());
    }
}

fn format_line(elapsed_secs: f64, level: Level, args: fmt::Arguments<'_>) -> String {
    format!("[{:>9.3}s] [{}] {}\n", elapsed_secs, level, args)
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Info, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Warn, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Error, format_args!($($arg)*))
    };
}

/// Open the session log in the platform data directory (the temp dir when
/// there is none).
pub fn init() {
    let base = settings::data_dir().unwrap_or_else(std::env::temp_dir);
    init_at(&base.join("rasterview").join("rasterview.log"));
}

/// Open the session log at `path` and hook panics into it. Only the first
/// call in a process takes effect.
pub fn init_at(path: &Path) {
    if SESSION.get().is_some() {
        return;
    }
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let file = match OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
    {
        Ok(f) => f,
        Err(e) => {
            // The viewer still runs, just without a log.
            eprintln!("warning: cannot open log file {}: {}", path.display(), e);
            return;
        }
    };
    let session = SessionLog {
        path: path.to_path_buf(),
        started: Instant::now(),
        file: Mutex::new(file),
    };
    if SESSION.set(session).is_err() {
        return;
    }

    if let Some(session) = SESSION.get()
        && let Ok(mut file) = session.file.lock()
    {
        let _ = writeln!(
            file,
            "rasterview {} ({} {})\n",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH
        );
    }

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write(Level::Panic, format_args!("{}", info));
        prev(info);
    }));
}
