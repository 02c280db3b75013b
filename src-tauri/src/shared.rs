use std::{
    fs,
    os::unix::fs::PermissionsExt as _,
    path::{Path, PathBuf},
};
use tauri::{AppHandle, Manager, Runtime};

pub(crate) fn settings_file<R: Runtime>(app: &AppHandle<R>) -> Result<PathBuf, String> {
    let config_dir = app
        .path()
        .app_config_dir()
        .map_err(|error| format!("Failed to resolve app config dir: {error}"))?;

    fs::create_dir_all(&config_dir)
        .map_err(|error| format!("Failed to create config directory: {error}"))?;

    Ok(config_dir.join("settings.json"))
}

pub(crate) fn log_dir<R: Runtime>(app: &AppHandle<R>) -> Result<PathBuf, String> {
    let log_dir = app
        .path()
        .app_log_dir()
        .map_err(|error| format!("Failed to resolve app log dir: {error}"))?;

    fs::create_dir_all(&log_dir)
        .map_err(|error| format!("Failed to create log directory: {error}"))?;

    Ok(log_dir)
}

pub(crate) fn restrict_file_permissions(path: &Path) {
    if path.exists() {
        if let Err(error) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
            tracing::debug!("restrict_file_permissions: failed for {path:?}: {error}");
        }
    }
}

/// Shortens user-supplied text before it reaches the log.
pub(crate) fn truncate_message(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }

    let truncated: String = input.chars().take(max_chars).collect();
    format!("{truncated}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_text_untouched() {
        assert_eq!(truncate_message("hello", 10), "hello");
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        assert_eq!(truncate_message("héllo wörld", 5), "héllo...");
    }
}
