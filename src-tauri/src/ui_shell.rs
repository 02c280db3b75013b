use tauri::webview::NewWindowResponse;
use tauri::{AppHandle, Manager, Runtime, Url, WebviewUrl, WebviewWindow, WindowEvent};

use crate::{
    bridge::BRIDGE_SCRIPT,
    navigation::{self, NavigationPolicy, NavigationTarget, SystemBrowser},
    AppState, APP_NAME, LOBBY_BASE_URL, MAIN_WINDOW_HEIGHT, MAIN_WINDOW_LABEL, MAIN_WINDOW_WIDTH,
    SETTINGS_WINDOW_HEIGHT, SETTINGS_WINDOW_LABEL, SETTINGS_WINDOW_WIDTH, TRUSTED_DOMAIN,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WindowVisibility {
    Hidden,
    Visible,
}

/// Visibility of the single main window. The window object outlives every
/// transition; only an explicit quit ends the process.
#[derive(Debug)]
pub(crate) struct WindowLifecycle {
    visibility: WindowVisibility,
}

impl WindowLifecycle {
    pub(crate) fn launched() -> Self {
        Self {
            visibility: WindowVisibility::Visible,
        }
    }

    pub(crate) fn visibility(&self) -> WindowVisibility {
        self.visibility
    }

    pub(crate) fn close_requested(&mut self) {
        self.visibility = WindowVisibility::Hidden;
    }

    /// Dock reactivation. Returns true when the window has to be shown again.
    pub(crate) fn reopen(&mut self, has_visible_windows: bool) -> bool {
        if has_visible_windows {
            return false;
        }
        self.visibility = WindowVisibility::Visible;
        true
    }

    pub(crate) fn shown(&mut self) {
        self.visibility = WindowVisibility::Visible;
    }

    /// `exit_code` is present only for exits requested through `AppHandle::exit`.
    pub(crate) fn permits_exit(exit_code: Option<i32>) -> bool {
        exit_code.is_some()
    }
}

fn with_lifecycle<R: Runtime>(app: &AppHandle<R>, apply: impl FnOnce(&mut WindowLifecycle)) {
    if let Some(state) = app.try_state::<AppState>() {
        if let Ok(mut lifecycle) = state.window.lock() {
            apply(&mut lifecycle);
        }
    }
}

pub(crate) fn main_window_visibility<R: Runtime>(app: &AppHandle<R>) -> Option<WindowVisibility> {
    let state = app.try_state::<AppState>()?;
    let lifecycle = state.window.lock().ok()?;
    Some(lifecycle.visibility())
}

pub(crate) fn build_main_window(app: &AppHandle) -> Result<WebviewWindow, String> {
    let url = Url::parse(LOBBY_BASE_URL)
        .map_err(|error| format!("Invalid base URL {LOBBY_BASE_URL}: {error}"))?;
    let policy = NavigationPolicy::new(TRUSTED_DOMAIN);
    let popup_policy = policy.clone();
    #[cfg(target_os = "macos")]
    let frame_policy = policy.clone();

    // On macOS iframe loads are decided by `frame_delegate` before this hook runs.
    let window = tauri::WebviewWindowBuilder::new(app, MAIN_WINDOW_LABEL, WebviewUrl::External(url))
        .title(APP_NAME)
        .inner_size(MAIN_WINDOW_WIDTH, MAIN_WINDOW_HEIGHT)
        .resizable(false)
        .maximizable(false)
        .center()
        .initialization_script_for_all_frames(BRIDGE_SCRIPT)
        .on_navigation(move |url| {
            navigation::route(&policy, &SystemBrowser, url, NavigationTarget::TopLevel)
        })
        .on_new_window(move |url, _features| {
            navigation::route(&popup_policy, &SystemBrowser, &url, NavigationTarget::NewWindow);
            NewWindowResponse::Deny
        })
        .build()
        .map_err(|error| format!("Failed to create main window: {error}"))?;

    #[cfg(target_os = "macos")]
    if let Err(error) = crate::frame_delegate::install(&window, frame_policy) {
        tracing::warn!("{error}");
    }

    Ok(window)
}

pub(crate) fn show_main_window<R: Runtime>(app: &AppHandle<R>) {
    if let Some(window) = app.get_webview_window(MAIN_WINDOW_LABEL) {
        let _ = window.show();
        let _ = window.unminimize();
        let _ = window.set_focus();
        with_lifecycle(app, WindowLifecycle::shown);
    }
}

pub(crate) fn handle_reopen<R: Runtime>(app: &AppHandle<R>, has_visible_windows: bool) {
    let mut show = false;
    with_lifecycle(app, |lifecycle| {
        show = lifecycle.reopen(has_visible_windows);
        tracing::debug!(
            has_visible_windows,
            visibility = ?lifecycle.visibility(),
            "dock reactivation"
        );
    });
    if show {
        show_main_window(app);
    }
}

pub(crate) fn handle_window_event<R: Runtime>(window: &tauri::Window<R>, event: &WindowEvent) {
    if window.label() != MAIN_WINDOW_LABEL {
        return;
    }

    if let WindowEvent::CloseRequested { api, .. } = event {
        api.prevent_close();
        let _ = window.hide();
        with_lifecycle(window.app_handle(), WindowLifecycle::close_requested);
    }
}

/// Shows the preference window, creating it on first use. An already open
/// window is asked to re-poll the OS notification authorization.
pub(crate) fn open_settings_window(app: &AppHandle) -> Result<(), String> {
    if let Some(window) = app.get_webview_window(SETTINGS_WINDOW_LABEL) {
        let _ = window.show();
        let _ = window.unminimize();
        let _ = window.set_focus();
        return window
            .eval("window.lobbySettings && window.lobbySettings.refresh();")
            .map_err(|error| format!("Failed to refresh settings window: {error}"));
    }

    tauri::WebviewWindowBuilder::new(
        app,
        SETTINGS_WINDOW_LABEL,
        WebviewUrl::App("settings.html".into()),
    )
    .title(format!("{APP_NAME} Settings"))
    .inner_size(SETTINGS_WINDOW_WIDTH, SETTINGS_WINDOW_HEIGHT)
    .resizable(false)
    .maximizable(false)
    .minimizable(false)
    .center()
    .build()
    .map_err(|error| format!("Failed to create settings window: {error}"))?;

    Ok(())
}
