use std::{env, path::PathBuf};

use crate::{DESKTOP_ROOT_DIR_NAME, DESKTOP_ROOT_ENV};

/// Root directory for files owned by the desktop shell itself (logs).
///
/// The embedded server's data directory is resolved separately through the
/// Tauri path resolver, since it only becomes available once the app exists.
pub(crate) fn default_desktop_root_dir() -> Option<PathBuf> {
    if let Ok(root) = env::var(DESKTOP_ROOT_ENV) {
        let trimmed = root.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    home::home_dir().map(|home| home.join(DESKTOP_ROOT_DIR_NAME))
}
