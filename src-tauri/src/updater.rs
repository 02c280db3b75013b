use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};
use tauri::{AppHandle, Manager};
use tauri_plugin_dialog::{DialogExt, MessageDialogButtons, MessageDialogKind};
use tauri_plugin_updater::UpdaterExt;
use tokio::sync::oneshot;

use crate::{AppState, APP_NAME, UPDATE_CHECK_INTERVAL_SECS, UPDATE_FIRST_CHECK_DELAY_SECS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CheckTrigger {
    Scheduled,
    Manual,
}

#[derive(Debug, Default)]
pub(crate) struct UpdaterState {
    available: AtomicBool,
    checking: AtomicBool,
}

impl UpdaterState {
    pub(crate) fn mark_available(&self) {
        self.available.store(true, Ordering::Relaxed);
    }

    pub(crate) fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    /// Claims the single check slot; `None` while another check is in flight.
    pub(crate) fn try_begin_check(&self) -> Option<CheckGuard<'_>> {
        self.checking
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CheckGuard(&self.checking))
    }
}

pub(crate) struct CheckGuard<'a>(&'a AtomicBool);

impl Drop for CheckGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Registers the updater plugin against the feed in `tauri.conf.json`. A failure
/// leaves update checks inert for the rest of the session.
pub(crate) fn init(app: &AppHandle) {
    match app.plugin(tauri_plugin_updater::Builder::new().build()) {
        Ok(()) => app.state::<AppState>().updater.mark_available(),
        Err(error) => tracing::error!("updater init failed: {error}"),
    }
}

pub(crate) fn start_background_checks(app: &AppHandle) {
    let app = app.clone();
    tauri::async_runtime::spawn(async move {
        tokio::time::sleep(Duration::from_secs(UPDATE_FIRST_CHECK_DELAY_SECS)).await;
        loop {
            check_for_updates(&app, CheckTrigger::Scheduled).await;
            tokio::time::sleep(Duration::from_secs(UPDATE_CHECK_INTERVAL_SECS)).await;
        }
    });
}

pub(crate) fn spawn_manual_check(app: &AppHandle) {
    let app = app.clone();
    tauri::async_runtime::spawn(async move {
        check_for_updates(&app, CheckTrigger::Manual).await;
    });
}

pub(crate) async fn check_for_updates(app: &AppHandle, trigger: CheckTrigger) {
    let state = app.state::<AppState>();
    if !state.updater.is_available() {
        tracing::debug!(?trigger, "update check skipped: updater unavailable");
        return;
    }
    let Some(_guard) = state.updater.try_begin_check() else {
        tracing::debug!(?trigger, "update check already running");
        return;
    };

    if let Err(error) = run_check(app, trigger).await {
        tracing::warn!(?trigger, "{error}");
    }
}

async fn run_check(app: &AppHandle, trigger: CheckTrigger) -> Result<(), String> {
    let updater = app
        .updater()
        .map_err(|error| format!("Failed to create updater: {error}"))?;
    let update = updater
        .check()
        .await
        .map_err(|error| format!("Update check failed: {error}"))?;

    let Some(update) = update else {
        tracing::info!(?trigger, "no update available");
        if trigger == CheckTrigger::Manual {
            inform(
                app,
                "You're up to date",
                format!(
                    "{APP_NAME} {} is the latest version.",
                    app.package_info().version
                ),
            );
        }
        return Ok(());
    };

    tracing::info!(version = %update.version, "update available");
    let prompt = format!(
        "{APP_NAME} {} is available (you have {}). Install it now? {APP_NAME} will relaunch.",
        update.version, update.current_version
    );
    if !confirm(app, "Update Available", prompt).await {
        tracing::info!(version = %update.version, "update postponed");
        return Ok(());
    }

    update
        .download_and_install(|_chunk, _total| {}, || tracing::info!("update downloaded"))
        .await
        .map_err(|error| format!("Failed to install update: {error}"))?;

    tracing::info!("update installed, restarting");
    app.restart();
}

async fn confirm(app: &AppHandle, title: &str, message: String) -> bool {
    let (tx, rx) = oneshot::channel();
    app.dialog()
        .message(message)
        .title(title)
        .kind(MessageDialogKind::Info)
        .buttons(MessageDialogButtons::OkCancelCustom(
            "Install and Relaunch".to_string(),
            "Later".to_string(),
        ))
        .show(move |accepted| {
            let _ = tx.send(accepted);
        });
    rx.await.unwrap_or(false)
}

fn inform(app: &AppHandle, title: &str, message: String) {
    app.dialog()
        .message(message)
        .title(title)
        .kind(MessageDialogKind::Info)
        .buttons(MessageDialogButtons::Ok)
        .show(|_| {});
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updater_starts_unavailable() {
        assert!(!UpdaterState::default().is_available());
    }

    #[test]
    fn only_one_check_runs_at_a_time() {
        let state = UpdaterState::default();
        let guard = state.try_begin_check();
        assert!(guard.is_some());
        assert!(state.try_begin_check().is_none());

        drop(guard);
        assert!(state.try_begin_check().is_some());
    }
}
