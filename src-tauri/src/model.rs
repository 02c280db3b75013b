use std::sync::Mutex;
use tokio::sync::watch;
use tracing_appender::non_blocking::WorkerGuard;

use crate::{
    notifications::AuthorizationStatus, ui_shell::WindowLifecycle, updater::UpdaterState,
};

/// Process-lifetime context, managed by Tauri from startup until exit.
pub(crate) struct AppState {
    pub(crate) window: Mutex<WindowLifecycle>,
    pub(crate) authorization: Mutex<Option<AuthorizationStatus>>,
    pub(crate) reachability: Mutex<Option<watch::Sender<bool>>>,
    pub(crate) updater: UpdaterState,
    pub(crate) log_guard: Mutex<Option<WorkerGuard>>,
}

impl AppState {
    pub(crate) fn new() -> Self {
        Self {
            window: Mutex::new(WindowLifecycle::launched()),
            authorization: Mutex::new(None),
            reachability: Mutex::new(None),
            updater: UpdaterState::default(),
            log_guard: Mutex::new(None),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub(crate) struct NotificationSettingsResponse {
    pub(crate) notifications_enabled: bool,
    pub(crate) launch_at_login: bool,
    pub(crate) system_notifications_allowed: bool,
    pub(crate) authorization: Option<AuthorizationStatus>,
}
