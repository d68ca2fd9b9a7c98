use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::utils::constants::{DATA_DIR_NAMES, ROOT_SEARCH_DEPTH};

/// Locate the project root from the current working directory.
pub fn find_project_root() -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(find_project_root_from(&cwd))
}

/// Walk up from `start` looking for a directory that holds `Data/` or `data/`.
/// Falls back to the parent of `start`.
pub fn find_project_root_from(start: &Path) -> PathBuf {
    let mut current = Some(start);

    for _ in 0..ROOT_SEARCH_DEPTH {
        let Some(dir) = current else { break };
        if DATA_DIR_NAMES.iter().any(|name| dir.join(name).is_dir()) {
            return dir.to_path_buf();
        }
        current = dir.parent();
    }

    start.parent().unwrap_or(start).to_path_buf()
}

/// The data directory under `root`, preferring `Data/` over `data/`.
pub fn data_dir_in(root: &Path) -> PathBuf {
    DATA_DIR_NAMES
        .iter()
        .map(|name| root.join(name))
        .find(|dir| dir.is_dir())
        .unwrap_or_else(|| root.join(DATA_DIR_NAMES[1]))
}

/// Absolute form of `path` without touching the filesystem.
pub fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
