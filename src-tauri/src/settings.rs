use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tauri::{AppHandle, Runtime};

use crate::shared::{restrict_file_permissions, settings_file};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub(crate) struct StoredSettings {
    pub(crate) notifications_enabled: bool,
    pub(crate) launch_at_login: bool,
}

impl Default for StoredSettings {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            launch_at_login: true,
        }
    }
}

pub(crate) fn read_settings<R: Runtime>(app: &AppHandle<R>) -> Result<StoredSettings, String> {
    read_settings_at(&settings_file(app)?)
}

/// Reads, mutates and writes back the stored settings, returning the new value.
pub(crate) fn update_settings<R: Runtime>(
    app: &AppHandle<R>,
    apply: impl FnOnce(&mut StoredSettings),
) -> Result<StoredSettings, String> {
    let path = settings_file(app)?;
    let mut settings = read_settings_at(&path).unwrap_or_else(|error| {
        tracing::warn!("replacing unreadable settings file: {error}");
        StoredSettings::default()
    });
    apply(&mut settings);
    save_settings_at(&path, &settings)?;
    Ok(settings)
}

/// Current value of the user's notification preference. Unreadable settings fall
/// back to the defaults rather than silencing the bridge.
pub(crate) fn notifications_enabled<R: Runtime>(app: &AppHandle<R>) -> bool {
    match read_settings(app) {
        Ok(settings) => settings.notifications_enabled,
        Err(error) => {
            tracing::warn!("failed to read settings for notify: {error}");
            StoredSettings::default().notifications_enabled
        }
    }
}

pub(crate) fn read_settings_at(path: &Path) -> Result<StoredSettings, String> {
    if !path.exists() {
        return Ok(StoredSettings::default());
    }

    let content =
        fs::read_to_string(path).map_err(|error| format!("Failed to read settings: {error}"))?;
    serde_json::from_str::<StoredSettings>(&content)
        .map_err(|error| format!("Failed to parse settings: {error}"))
}

pub(crate) fn save_settings_at(path: &Path, settings: &StoredSettings) -> Result<(), String> {
    let content = serde_json::to_string_pretty(settings)
        .map_err(|error| format!("Failed to serialize settings: {error}"))?;
    fs::write(path, content).map_err(|error| format!("Failed to write settings: {error}"))?;
    restrict_file_permissions(path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        os::unix::fs::PermissionsExt as _,
        path::PathBuf,
        sync::atomic::{AtomicU64, Ordering},
    };

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn scratch_file(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "lobby-settings-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = scratch_file("settings.json");
        let settings = read_settings_at(&path).unwrap();
        assert_eq!(settings, StoredSettings::default());
        assert!(settings.notifications_enabled);
        assert!(settings.launch_at_login);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let path = scratch_file("settings.json");
        fs::write(&path, r#"{ "launch_at_login": false }"#).unwrap();
        let settings = read_settings_at(&path).unwrap();
        assert!(settings.notifications_enabled);
        assert!(!settings.launch_at_login);
    }

    #[test]
    fn saved_values_are_read_back() {
        let path = scratch_file("settings.json");
        let stored = StoredSettings {
            notifications_enabled: false,
            launch_at_login: false,
        };
        save_settings_at(&path, &stored).unwrap();
        assert_eq!(read_settings_at(&path).unwrap(), stored);

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let path = scratch_file("settings.json");
        fs::write(&path, "not json").unwrap();
        let error = read_settings_at(&path).unwrap_err();
        assert!(error.starts_with("Failed to parse settings"));
    }
}
