#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod bridge;
mod consts;
#[cfg(target_os = "macos")]
mod frame_delegate;
mod logging;
mod login_item;
mod menu;
mod model;
mod navigation;
mod notifications;
mod reachability;
mod settings;
mod shared;
mod ui_shell;
mod updater;

pub(crate) use consts::*;
pub(crate) use model::AppState;

use model::NotificationSettingsResponse;
use navigation::UrlOpener as _;
use notifications::NativeNotifier;
use tauri::{AppHandle, Manager, RunEvent, Url, Webview};
use ui_shell::WindowLifecycle;

/// Commands are scoped per window: the bridge to the hosted page, everything
/// else to the local settings window.
fn ensure_caller(label: &str, expected_label: &str) -> Result<(), String> {
    if label == expected_label {
        Ok(())
    } else {
        Err(format!("Command not available to webview {label:?}"))
    }
}

#[tauri::command]
async fn bridge_notification(app: AppHandle, webview: Webview, payload: serde_json::Value) {
    if let Err(error) = ensure_caller(webview.label(), MAIN_WINDOW_LABEL) {
        tracing::debug!("{BRIDGE_COMMAND}: {error}");
        return;
    }
    let outcome = bridge::dispatch(
        payload,
        settings::notifications_enabled(&app),
        notifications::cached_authorization(&app),
        &NativeNotifier::new(app.clone()),
    );
    tracing::debug!(?outcome, "{BRIDGE_COMMAND} handled");
}

#[tauri::command]
async fn get_notification_settings(
    app: AppHandle,
    webview: Webview,
) -> Result<NotificationSettingsResponse, String> {
    ensure_caller(webview.label(), SETTINGS_WINDOW_LABEL)?;
    let stored = settings::read_settings(&app)?;
    let authorization = notifications::refresh_authorization(&app).await;

    Ok(NotificationSettingsResponse {
        notifications_enabled: stored.notifications_enabled,
        launch_at_login: stored.launch_at_login,
        system_notifications_allowed: bridge::delivery_allowed(true, authorization),
        authorization,
    })
}

#[tauri::command]
async fn set_notifications_enabled(
    app: AppHandle,
    webview: Webview,
    enabled: bool,
) -> Result<(), String> {
    ensure_caller(webview.label(), SETTINGS_WINDOW_LABEL)?;
    settings::update_settings(&app, |settings| settings.notifications_enabled = enabled)?;
    tracing::info!(enabled, "notification preference saved");
    Ok(())
}

#[tauri::command]
async fn set_launch_at_login(app: AppHandle, webview: Webview, enabled: bool) -> Result<(), String> {
    ensure_caller(webview.label(), SETTINGS_WINDOW_LABEL)?;
    settings::update_settings(&app, |settings| settings.launch_at_login = enabled)?;
    tracing::info!(enabled, "launch at login preference saved");
    login_item::apply_launch_at_login(enabled);
    Ok(())
}

#[tauri::command]
fn open_notification_settings(webview: Webview) -> Result<(), String> {
    ensure_caller(webview.label(), SETTINGS_WINDOW_LABEL)?;
    let url = Url::parse(NOTIFICATION_SETTINGS_URL)
        .map_err(|error| format!("Invalid settings URL: {error}"))?;
    navigation::SystemBrowser.open(&url)
}

fn main() {
    let app = tauri::Builder::default()
        .manage(AppState::new())
        .plugin(tauri_plugin_dialog::init())
        .menu(menu::build_app_menu)
        .on_menu_event(menu::handle_menu_event)
        .invoke_handler(tauri::generate_handler![
            bridge_notification,
            get_notification_settings,
            set_notifications_enabled,
            set_launch_at_login,
            open_notification_settings
        ])
        .setup(|app| {
            let handle = app.handle().clone();
            let log_guard = logging::init(&handle);
            if let Ok(mut slot) = app.state::<AppState>().log_guard.lock() {
                *slot = log_guard;
            }
            tracing::info!(
                pid = std::process::id(),
                version = %app.package_info().version,
                "lobby-desktop starting"
            );

            if let Ok(path) = shared::settings_file(&handle) {
                shared::restrict_file_permissions(&path);
            }
            let startup_settings = settings::read_settings(&handle).unwrap_or_else(|error| {
                tracing::warn!("using default settings: {error}");
                settings::StoredSettings::default()
            });
            login_item::apply_launch_at_login(startup_settings.launch_at_login);

            tauri::async_runtime::spawn(notifications::request_authorization(handle.clone()));

            ui_shell::build_main_window(&handle)?;

            updater::init(&handle);
            updater::start_background_checks(&handle);

            if let Err(error) = reachability::start_monitor(&handle) {
                tracing::warn!("reachability monitor not started: {error}");
            }

            Ok(())
        })
        .on_window_event(ui_shell::handle_window_event)
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(|app_handle, event| match event {
        RunEvent::ExitRequested { api, code, .. } => {
            if !WindowLifecycle::permits_exit(code) {
                api.prevent_exit();
            }
        }
        RunEvent::Exit => {
            reachability::stop_monitor(app_handle);
            tracing::info!("lobby-desktop exiting");
        }
        #[cfg(target_os = "macos")]
        RunEvent::Reopen {
            has_visible_windows,
            ..
        } => ui_shell::handle_reopen(app_handle, has_visible_windows),
        _ => {}
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_only_accepts_the_main_window() {
        assert!(ensure_caller(MAIN_WINDOW_LABEL, MAIN_WINDOW_LABEL).is_ok());
        let error = ensure_caller(SETTINGS_WINDOW_LABEL, MAIN_WINDOW_LABEL).unwrap_err();
        assert_eq!(error, "Command not available to webview \"settings\"");
    }

    #[test]
    fn settings_commands_reject_the_hosted_page() {
        assert!(ensure_caller(SETTINGS_WINDOW_LABEL, SETTINGS_WINDOW_LABEL).is_ok());
        assert!(ensure_caller(MAIN_WINDOW_LABEL, SETTINGS_WINDOW_LABEL).is_err());
        assert!(ensure_caller("popup", SETTINGS_WINDOW_LABEL).is_err());
    }

    #[test]
    fn hosted_page_capability_grants_no_core_permissions() {
        let capability: serde_json::Value =
            serde_json::from_str(include_str!("../capabilities/remote.json")).unwrap();
        assert_eq!(capability["windows"], serde_json::json!([MAIN_WINDOW_LABEL]));
        assert_eq!(capability["permissions"], serde_json::json!([]));
    }
}
