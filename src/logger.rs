//! Session logger: a `log` backend that writes to a single file in the OS
//! data directory.
//!
//! The file is **truncated (overwritten) at each launch**, so it only ever
//! contains output from the most-recent session.
//!
//! Log location:
//!   Windows:  `%APPDATA%\Instafilter\instafilter.log`
//!   Linux:    `~/.local/share/Instafilter/instafilter.log`
//!   macOS:    `~/Library/Application Support/Instafilter/instafilter.log`
//!
//! Use the regular `log::info!` / `log::warn!` / `log::error!` macros. With
//! `echo_stderr` set, every accepted line is mirrored to stderr as well.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use log::{LevelFilter, Log, Metadata, Record};

use crate::config::{APP_DIR_NAME, data_dir};

static LOGGER: OnceLock<SessionLogger> = OnceLock::new();

struct SessionLogger {
    file: Option<Mutex<File>>,
    path: PathBuf,
    echo_stderr: bool,
}

impl SessionLogger {
    fn write_line(&self, line: &str) {
        if let Some(mutex) = &self.file
            && let Ok(mut file) = mutex.lock()
        {
            let _ = writeln!(file, "{}", line);
        }
    }
}

impl Log for SessionLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "[{}] [{}] {}",
            timestamp(),
            record.level(),
            record.args()
        );
        self.write_line(&line);
        if self.echo_stderr {
            eprintln!("{}", line);
        }
    }

    fn flush(&self) {
        if let Some(mutex) = &self.file
            && let Ok(mut file) = mutex.lock()
        {
            let _ = file.flush();
        }
    }
}

/// Returns the path to the current session log file.
pub fn log_path() -> Option<&'static PathBuf> {
    LOGGER.get().map(|l| &l.path)
}

/// Initialise the session logger. Later calls are ignored.
///
/// * Creates (or truncates) the log file.
/// * Installs a panic hook that writes the panic message to the log before
///   propagating to the default handler.
///
/// Failing to open the file is not fatal; logging then only reaches stderr
/// (when echoing) or nowhere.
pub fn init(level: LevelFilter, echo_stderr: bool) {
    let path = log_file_path();

    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path);
    let file = match file {
        Ok(f) => Some(Mutex::new(f)),
        Err(e) => {
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
            None
        }
    };

    let logger = LOGGER.get_or_init(|| SessionLogger { file, path, echo_stderr });
    if log::set_logger(logger).is_err() {
        return;
    }
    log::set_max_level(level);

    logger.write_line(&format!(
        "=== Instafilter session started {} ===",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    logger.write_line(&format!("Log file: {}", logger.path.display()));
    logger.write_line("");

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if let Some(logger) = LOGGER.get() {
            logger.write_line(&format!("[{}] [PANIC] {}", timestamp(), info));
        }
        prev(info);
    }));
}

fn log_file_path() -> PathBuf {
    data_dir().join(APP_DIR_NAME).join("instafilter.log")
}

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S%.3f").to_string()
}
