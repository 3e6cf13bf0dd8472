use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use crate::utils::app_paths::AppPaths;
use crate::utils::logging::LogEntry;

/// Global file logger instance
static DUAL_LOGGER: OnceLock<DualLogger> = OnceLock::new();

fn get_log_dir() -> PathBuf {
    AppPaths::log_dir().unwrap_or_else(|_| std::env::temp_dir().join("name-search"))
}

/// Persists log entries to a timestamped file and optionally mirrors them
/// to stderr. The in-memory side lives in [`crate::utils::logging`].
pub struct DualLogger {
    log_file: Mutex<Option<File>>,
    log_path: PathBuf,
    mirror_stderr: bool,
}

impl DualLogger {
    pub fn new(mirror_stderr: bool) -> Self {
        let log_dir = get_log_dir();
        let _ = std::fs::create_dir_all(&log_dir);

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let log_path = log_dir.join(format!("name-search_{}.log", timestamp));

        let latest_path = log_dir.join("latest.log");

        #[cfg(unix)]
        {
            let _ = std::fs::remove_file(&latest_path);
            let _ = std::os::unix::fs::symlink(&log_path, &latest_path);
        }

        #[cfg(windows)]
        {
            // Symlinks need elevated rights on Windows
            let pointer_content = format!("Current log file: {}\n", log_path.display());
            let _ = std::fs::write(&latest_path, pointer_content);
        }

        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .ok();

        Self {
            log_file: Mutex::new(log_file),
            log_path,
            mirror_stderr,
        }
    }

    /// Append one entry to the log file
    pub fn log(&self, entry: &LogEntry) {
        if let Ok(mut file_opt) = self.log_file.lock() {
            if let Some(ref mut file) = *file_opt {
                let log_line = format!("{}\n", entry.format_for_display());
                let _ = file.write_all(log_line.as_bytes());
                let _ = file.flush();
            }
        }

        if self.mirror_stderr {
            eprintln!("{}", entry.format_for_display());
        }
    }

    pub fn log_path(&self) -> &PathBuf {
        &self.log_path
    }

    pub fn flush(&self) {
        if let Ok(mut file_opt) = self.log_file.lock() {
            if let Some(ref mut file) = *file_opt {
                let _ = file.flush();
            }
        }
    }
}

/// Initialize the global file logger; later calls return the first instance
pub fn init_dual_logger(mirror_stderr: bool) -> &'static DualLogger {
    DUAL_LOGGER.get_or_init(|| DualLogger::new(mirror_stderr))
}

pub fn get_dual_logger() -> Option<&'static DualLogger> {
    DUAL_LOGGER.get()
}
