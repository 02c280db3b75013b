use std::time::Duration;
use tauri::{AppHandle, Manager, Url};
use tokio::sync::watch;

use crate::{
    navigation::NavigationPolicy,
    ui_shell::{self, WindowVisibility},
    AppState, LOBBY_BASE_URL, MAIN_WINDOW_LABEL, REACHABILITY_PROBE_INTERVAL_SECS,
    REACHABILITY_PROBE_TIMEOUT_SECS, TRUSTED_DOMAIN,
};

/// Edge detector over successive reachability observations.
#[derive(Debug, Default)]
pub(crate) struct ReachabilityTracker {
    was_offline: bool,
}

impl ReachabilityTracker {
    /// Returns true exactly once per offline → online transition.
    pub(crate) fn observe(&mut self, online: bool) -> bool {
        if !online {
            self.was_offline = true;
            return false;
        }
        let reconnected = self.was_offline;
        self.was_offline = false;
        reconnected
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RecoveryAction {
    Reload,
    Navigate(Url),
}

/// How to bring the page back after reconnecting. A view whose first load failed
/// offline never committed a Lobby page, so it is sent home instead of reloaded.
pub(crate) fn recovery_action(
    policy: &NavigationPolicy,
    current: Option<&Url>,
    home: &Url,
) -> RecoveryAction {
    let on_lobby_page = current.is_some_and(|url| {
        matches!(url.scheme(), "http" | "https")
            && url.host_str().is_some_and(|host| policy.is_trusted_host(host))
    });
    if on_lobby_page {
        RecoveryAction::Reload
    } else {
        RecoveryAction::Navigate(home.clone())
    }
}

/// Probes are paused while the main window is hidden.
pub(crate) fn probe_due(visibility: Option<WindowVisibility>) -> bool {
    visibility != Some(WindowVisibility::Hidden)
}

pub(crate) fn start_monitor(app: &AppHandle) -> Result<(), String> {
    let state = app.state::<AppState>();
    let mut stop_slot = state
        .reachability
        .lock()
        .map_err(|_| "Reachability lock poisoned".to_string())?;
    if stop_slot.is_some() {
        return Ok(());
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(REACHABILITY_PROBE_TIMEOUT_SECS))
        .build()
        .map_err(|error| format!("Failed to build HTTP client: {error}"))?;

    let (tx, rx) = watch::channel(false);
    *stop_slot = Some(tx);
    drop(stop_slot);

    let app_for_task = app.clone();
    tauri::async_runtime::spawn(async move {
        run_monitor(app_for_task, client, rx).await;
    });
    Ok(())
}

pub(crate) fn stop_monitor(app: &AppHandle) {
    let Some(state) = app.try_state::<AppState>() else {
        return;
    };
    let stop_tx = match state.reachability.lock() {
        Ok(mut slot) => slot.take(),
        Err(_) => None,
    };
    if let Some(stop_tx) = stop_tx {
        let _ = stop_tx.send(true);
    }
}

async fn run_monitor(app: AppHandle, client: reqwest::Client, mut stop_rx: watch::Receiver<bool>) {
    let mut tracker = ReachabilityTracker::default();
    tracing::debug!("reachability monitor started");

    loop {
        if *stop_rx.borrow() {
            break;
        }

        if probe_due(ui_shell::main_window_visibility(&app)) {
            let online = probe(&client).await;
            if tracker.observe(online) {
                tracing::info!("connectivity restored, reloading page");
                reload_main_window(&app);
            } else if !online {
                tracing::debug!("lobby endpoint unreachable");
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(REACHABILITY_PROBE_INTERVAL_SECS)) => {}
            changed = stop_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    tracing::debug!("reachability monitor stopped");
}

/// Any HTTP response counts as reachable; only transport failures mean offline.
async fn probe(client: &reqwest::Client) -> bool {
    client.head(LOBBY_BASE_URL).send().await.is_ok()
}

fn reload_main_window(app: &AppHandle) {
    let home = match Url::parse(LOBBY_BASE_URL) {
        Ok(home) => home,
        Err(error) => {
            tracing::warn!("invalid base URL {LOBBY_BASE_URL}: {error}");
            return;
        }
    };
    let handle = app.clone();
    let result = app.run_on_main_thread(move || {
        let Some(window) = handle.get_webview_window(MAIN_WINDOW_LABEL) else {
            return;
        };
        let current = window.url().ok();
        let policy = NavigationPolicy::new(TRUSTED_DOMAIN);
        let action = recovery_action(&policy, current.as_ref(), &home);
        tracing::debug!(?action, "recovering main window");
        let outcome = match action {
            RecoveryAction::Reload => window.reload(),
            RecoveryAction::Navigate(url) => window.navigate(url),
        };
        if let Err(error) = outcome {
            tracing::warn!("failed to reload after reconnect: {error}");
        }
    });
    if let Err(error) = result {
        tracing::warn!("failed to dispatch reload: {error}");
    }
}
