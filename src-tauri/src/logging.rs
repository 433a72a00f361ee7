use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::{Mutex, OnceLock},
};

use chrono::Local;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DesktopLogCategory {
    Startup,
    Runtime,
    Shutdown,
}

impl DesktopLogCategory {
    fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Runtime => "runtime",
            Self::Shutdown => "shutdown",
        }
    }
}

pub(crate) fn resolve_desktop_log_path(root_dir: Option<PathBuf>, file_name: &str) -> PathBuf {
    match root_dir {
        Some(root) => root.join("logs").join(file_name),
        None => std::env::temp_dir().join("meshcentral-desktop").join(file_name),
    }
}

fn backup_log_path(log_path: &Path, index: usize) -> PathBuf {
    let mut raw = log_path.as_os_str().to_os_string();
    raw.push(format!(".{index}"));
    PathBuf::from(raw)
}

/// Shifts `desktop.log` to `desktop.log.1`, `.1` to `.2` and so on once the
/// live file reaches `max_bytes`. The oldest backup is dropped.
pub(crate) fn rotate_log_if_needed(
    log_path: &Path,
    max_bytes: u64,
    backup_count: usize,
) -> Result<bool, String> {
    let size = match fs::metadata(log_path) {
        Ok(metadata) => metadata.len(),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(error) => {
            return Err(format!(
                "Failed to stat desktop log {}: {}",
                log_path.display(),
                error
            ))
        }
    };
    if max_bytes == 0 || size < max_bytes {
        return Ok(false);
    }

    if backup_count == 0 {
        fs::remove_file(log_path).map_err(|error| {
            format!(
                "Failed to truncate desktop log {}: {}",
                log_path.display(),
                error
            )
        })?;
        return Ok(true);
    }

    let oldest = backup_log_path(log_path, backup_count);
    if oldest.exists() {
        fs::remove_file(&oldest).map_err(|error| {
            format!(
                "Failed to remove oldest desktop log backup {}: {}",
                oldest.display(),
                error
            )
        })?;
    }
    for index in (1..backup_count).rev() {
        let source = backup_log_path(log_path, index);
        if source.exists() {
            let target = backup_log_path(log_path, index + 1);
            fs::rename(&source, &target).map_err(|error| {
                format!(
                    "Failed to rotate desktop log {} -> {}: {}",
                    source.display(),
                    target.display(),
                    error
                )
            })?;
        }
    }
    let first_backup = backup_log_path(log_path, 1);
    fs::rename(log_path, &first_backup).map_err(|error| {
        format!(
            "Failed to rotate desktop log {} -> {}: {}",
            log_path.display(),
            first_backup.display(),
            error
        )
    })?;
    Ok(true)
}

fn format_log_line(category: DesktopLogCategory, message: &str) -> String {
    format!(
        "[{}] [{}] {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        category.as_str(),
        message
    )
}

fn write_log_line(
    category: DesktopLogCategory,
    message: &str,
    log_path: &Path,
    max_bytes: u64,
    backup_count: usize,
) -> Result<(), String> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).map_err(|error| {
            format!(
                "Failed to create desktop log directory {}: {}",
                parent.display(),
                error
            )
        })?;
    }
    rotate_log_if_needed(log_path, max_bytes, backup_count)?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|error| {
            format!(
                "Failed to open desktop log {}: {}",
                log_path.display(),
                error
            )
        })?;
    file.write_all(format_log_line(category, message).as_bytes())
        .map_err(|error| {
            format!(
                "Failed to write desktop log {}: {}",
                log_path.display(),
                error
            )
        })
}

pub(crate) fn append_desktop_log(
    category: DesktopLogCategory,
    message: &str,
    root_dir: Option<PathBuf>,
    file_name: &str,
    max_bytes: u64,
    backup_count: usize,
    write_lock: &OnceLock<Mutex<()>>,
) {
    let log_path = resolve_desktop_log_path(root_dir, file_name);
    let lock = write_lock.get_or_init(|| Mutex::new(()));
    let _guard = match lock.lock() {
        Ok(guard) => guard,
        Err(error) => error.into_inner(),
    };

    if let Err(error) = write_log_line(category, message, &log_path, max_bytes, backup_count) {
        eprintln!("{error}; dropped log line: {message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .expect("log file should be readable")
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn resolve_desktop_log_path_uses_logs_dir_under_root() {
        let path = resolve_desktop_log_path(Some(PathBuf::from("/tmp/mc-root")), "desktop.log");
        assert_eq!(path, PathBuf::from("/tmp/mc-root/logs/desktop.log"));
    }

    #[test]
    fn append_desktop_log_writes_category_tagged_lines() {
        let temp = tempfile::tempdir().expect("tempdir");
        let lock = OnceLock::new();

        append_desktop_log(
            DesktopLogCategory::Startup,
            "desktop process starting",
            Some(temp.path().to_path_buf()),
            "desktop.log",
            1024 * 1024,
            2,
            &lock,
        );
        append_desktop_log(
            DesktopLogCategory::Shutdown,
            "exit",
            Some(temp.path().to_path_buf()),
            "desktop.log",
            1024 * 1024,
            2,
            &lock,
        );

        let lines = read_lines(&temp.path().join("logs").join("desktop.log"));
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[startup] desktop process starting"));
        assert!(lines[1].ends_with("[shutdown] exit"));
    }

    #[test]
    fn rotate_log_if_needed_skips_small_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log_path = temp.path().join("desktop.log");
        fs::write(&log_path, "short").expect("write log");

        assert_eq!(rotate_log_if_needed(&log_path, 1024, 3), Ok(false));
        assert!(log_path.exists());
    }

    #[test]
    fn rotate_log_if_needed_shifts_backups_and_drops_oldest() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log_path = temp.path().join("desktop.log");
        fs::write(&log_path, "current-log").expect("write log");
        fs::write(backup_log_path(&log_path, 1), "backup-1").expect("write backup 1");
        fs::write(backup_log_path(&log_path, 2), "backup-2").expect("write backup 2");

        assert_eq!(rotate_log_if_needed(&log_path, 4, 2), Ok(true));

        assert!(!log_path.exists());
        assert_eq!(
            fs::read_to_string(backup_log_path(&log_path, 1)).expect("read backup 1"),
            "current-log"
        );
        assert_eq!(
            fs::read_to_string(backup_log_path(&log_path, 2)).expect("read backup 2"),
            "backup-1"
        );
        assert!(!backup_log_path(&log_path, 3).exists());
    }

    #[test]
    fn rotate_log_if_needed_ignores_missing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert_eq!(
            rotate_log_if_needed(&temp.path().join("missing.log"), 1, 1),
            Ok(false)
        );
    }
}
