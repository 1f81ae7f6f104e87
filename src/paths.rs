use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use chrono::Local;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the output directory: `<exe_dir>/output/`
pub fn get_output_dir() -> PathBuf {
    get_exe_dir().join("output")
}

/// Resolves a configured path. Relative paths are taken from the exe directory.
pub fn resolve_from_exe_dir(path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        get_exe_dir().join(candidate)
    }
}

/// Creates a timestamped session folder: `<output>/YYYYMMDD_HHMMSS/`
pub fn create_session_dir() -> Result<PathBuf> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let session_dir = get_output_dir().join(timestamp);
    std::fs::create_dir_all(&session_dir).with_context(|| {
        format!("Failed to create session directory {}", session_dir.display())
    })?;
    Ok(session_dir)
}

/// Ensures all output directories exist. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())?;
    std::fs::create_dir_all(get_output_dir())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_keeps_absolute_paths() {
        let dir = tempfile::tempdir().unwrap();
        let absolute = dir.path().join("inventory.db");
        let resolved = resolve_from_exe_dir(absolute.to_str().unwrap());
        assert_eq!(resolved, absolute);
    }

    #[test]
    fn test_resolve_relative_to_exe_dir() {
        let resolved = resolve_from_exe_dir("data/inventory.db");
        assert!(resolved.starts_with(get_exe_dir()));
        assert!(resolved.ends_with("data/inventory.db"));
    }
}
