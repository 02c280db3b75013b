use serde::Serialize;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};
#[cfg(target_os = "macos")]
use std::thread;
use tauri::{AppHandle, Manager};
use tokio::sync::oneshot;

#[cfg(target_os = "macos")]
use mac_notification_sys::{Notification, NotificationResponse};

use crate::{
    bridge::{BridgedNotification, NotificationSink},
    AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum AuthorizationStatus {
    NotDetermined,
    Denied,
    Authorized,
    Provisional,
}

impl AuthorizationStatus {
    pub(crate) fn allows_delivery(self) -> bool {
        matches!(self, Self::Authorized | Self::Provisional)
    }
}

/// Posts bridged notifications to Notification Center.
pub(crate) struct NativeNotifier {
    app: AppHandle,
}

impl NativeNotifier {
    pub(crate) fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl NotificationSink for NativeNotifier {
    fn post(&self, notification: BridgedNotification) {
        #[cfg(target_os = "macos")]
        send_macos_notification(self.app.clone(), notification);
        #[cfg(not(target_os = "macos"))]
        {
            let _ = &self.app;
            tracing::info!(title = %notification.title, "native notifications unavailable on this platform");
        }
    }
}

/// Counts posts whose thread is parked waiting for the user to click.
pub(crate) struct ClickWaits {
    pending: AtomicUsize,
    limit: usize,
}

impl ClickWaits {
    pub(crate) const fn new(limit: usize) -> Self {
        Self {
            pending: AtomicUsize::new(0),
            limit,
        }
    }

    /// Claims a waiting slot; `None` once `limit` posts are already waiting.
    pub(crate) fn try_claim(&self) -> Option<ClickWaitSlot<'_>> {
        self.pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |pending| {
                (pending < self.limit).then_some(pending + 1)
            })
            .ok()
            .map(|_| ClickWaitSlot(&self.pending))
    }
}

pub(crate) struct ClickWaitSlot<'a>(&'a AtomicUsize);

impl Drop for ClickWaitSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
static CLICK_WAITS: ClickWaits = ClickWaits::new(crate::MAX_NOTIFICATION_CLICK_WAITS);

#[cfg(target_os = "macos")]
fn send_macos_notification(app: AppHandle, notification: BridgedNotification) {
    let Some(slot) = CLICK_WAITS.try_claim() else {
        // Past the limit the post is fire-and-forget; clicks only activate the app.
        ensure_macos_notification_application();
        let mut native = Notification::new();
        native
            .title(&notification.title)
            .message(&notification.body)
            .default_sound()
            .asynchronous(true);
        if let Err(error) = native.send() {
            tracing::warn!("failed to show macOS notification: {error}");
        }
        return;
    };

    thread::spawn(move || {
        let _slot = slot;
        ensure_macos_notification_application();

        let mut native = Notification::new();
        native
            .title(&notification.title)
            .message(&notification.body)
            .default_sound()
            .wait_for_click(true)
            .asynchronous(false);

        match native.send() {
            Ok(NotificationResponse::Click) | Ok(NotificationResponse::ActionButton(_)) => {
                let handle = app.clone();
                if let Err(error) =
                    app.run_on_main_thread(move || crate::ui_shell::show_main_window(&handle))
                {
                    tracing::warn!("failed to show window after notification click: {error}");
                }
            }
            Ok(_) => {}
            Err(error) => {
                tracing::warn!("failed to show macOS notification: {error}");
            }
        }
    });
}

#[cfg(target_os = "macos")]
fn ensure_macos_notification_application() {
    static INIT_NOTIFICATION_APP: std::sync::Once = std::sync::Once::new();
    INIT_NOTIFICATION_APP.call_once(|| {
        // Unbundled debug builds have no identity of their own.
        for bundle_id in [crate::BUNDLE_IDENTIFIER, "com.apple.Terminal"] {
            match mac_notification_sys::set_application(bundle_id) {
                Ok(_) => return,
                Err(error) => {
                    tracing::debug!("failed to set macOS notification bundle id {bundle_id}: {error}");
                }
            }
        }
    });
}

/// Asks the OS for alert, badge and sound permission, then caches the resulting
/// authorization status. Failures leave the bridge to the OS's own decision.
pub(crate) async fn request_authorization(app: AppHandle) {
    match platform::request_authorization().await {
        Ok(true) => tracing::info!("notifications allowed"),
        Ok(false) => tracing::info!("notifications not allowed by the user"),
        Err(error) => tracing::warn!("notification authorization request failed: {error}"),
    }
    refresh_authorization(&app).await;
}

/// Polls the OS authorization and stores it in [`AppState`].
pub(crate) async fn refresh_authorization(app: &AppHandle) -> Option<AuthorizationStatus> {
    let status = match platform::authorization_status().await {
        Ok(status) => Some(status),
        Err(error) => {
            tracing::warn!("failed to read notification authorization: {error}");
            None
        }
    };
    if let Some(state) = app.try_state::<AppState>() {
        if let Ok(mut cached) = state.authorization.lock() {
            *cached = status;
        }
    }
    status
}

/// Wraps a oneshot sender for OS completion handlers, which are typed `Fn` and
/// may in principle fire more than once. Only the first value is delivered.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn once_sender<T>(tx: oneshot::Sender<T>) -> impl Fn(T) {
    let slot = Mutex::new(Some(tx));
    move |value| {
        if let Some(tx) = slot.lock().ok().and_then(|mut slot| slot.take()) {
            let _ = tx.send(value);
        }
    }
}

pub(crate) fn cached_authorization(app: &AppHandle) -> Option<AuthorizationStatus> {
    app.try_state::<AppState>()
        .and_then(|state| state.authorization.lock().ok().and_then(|cached| *cached))
}

#[cfg(target_os = "macos")]
mod platform {
    use std::ptr::NonNull;

    use block2::RcBlock;
    use objc2::runtime::Bool;
    use objc2_foundation::{NSBundle, NSError};
    use objc2_user_notifications::{
        UNAuthorizationOptions, UNAuthorizationStatus, UNNotificationSettings,
        UNUserNotificationCenter,
    };
    use tokio::sync::oneshot;

    use super::{once_sender, AuthorizationStatus};

    /// UNUserNotificationCenter raises when the process has no bundle identifier.
    fn ensure_bundled() -> Result<(), String> {
        if NSBundle::mainBundle().bundleIdentifier().is_some() {
            Ok(())
        } else {
            Err("Not running from an application bundle".to_string())
        }
    }

    pub(super) async fn request_authorization() -> Result<bool, String> {
        ensure_bundled()?;
        let (tx, rx) = oneshot::channel::<Result<bool, String>>();
        let send = once_sender(tx);
        let block = RcBlock::new(move |granted: Bool, error: *mut NSError| {
            let result = match unsafe { error.as_ref() } {
                Some(error) => Err(format!(
                    "Notification authorization failed: {}",
                    error.localizedDescription()
                )),
                None => Ok(granted.as_bool()),
            };
            send(result);
        });

        let options = UNAuthorizationOptions::Alert
            | UNAuthorizationOptions::Badge
            | UNAuthorizationOptions::Sound;
        unsafe {
            UNUserNotificationCenter::currentNotificationCenter()
                .requestAuthorizationWithOptions_completionHandler(options, &block);
        }

        rx.await
            .map_err(|_| "Notification authorization callback dropped".to_string())?
    }

    pub(super) async fn authorization_status() -> Result<AuthorizationStatus, String> {
        ensure_bundled()?;
        let (tx, rx) = oneshot::channel::<AuthorizationStatus>();
        let send = once_sender(tx);
        let block = RcBlock::new(move |settings: NonNull<UNNotificationSettings>| {
            let status = unsafe { settings.as_ref() }.authorizationStatus();
            send(map_status(status));
        });

        unsafe {
            UNUserNotificationCenter::currentNotificationCenter()
                .getNotificationSettingsWithCompletionHandler(&block);
        }

        rx.await
            .map_err(|_| "Notification settings callback dropped".to_string())
    }

    fn map_status(status: UNAuthorizationStatus) -> AuthorizationStatus {
        if status == UNAuthorizationStatus::Authorized {
            AuthorizationStatus::Authorized
        } else if status == UNAuthorizationStatus::Provisional {
            AuthorizationStatus::Provisional
        } else if status == UNAuthorizationStatus::Denied {
            AuthorizationStatus::Denied
        } else {
            AuthorizationStatus::NotDetermined
        }
    }
}

#[cfg(not(target_os = "macos"))]
mod platform {
    use super::AuthorizationStatus;

    pub(super) async fn request_authorization() -> Result<bool, String> {
        Ok(true)
    }

    pub(super) async fn authorization_status() -> Result<AuthorizationStatus, String> {
        Ok(AuthorizationStatus::Authorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_granted_states_allow_delivery() {
        assert!(AuthorizationStatus::Authorized.allows_delivery());
        assert!(AuthorizationStatus::Provisional.allows_delivery());
        assert!(!AuthorizationStatus::Denied.allows_delivery());
        assert!(!AuthorizationStatus::NotDetermined.allows_delivery());
    }

    #[test]
    fn click_waits_are_capped_and_released() {
        let waits = ClickWaits::new(2);
        let first = waits.try_claim();
        let second = waits.try_claim();
        assert!(first.is_some() && second.is_some());
        assert!(waits.try_claim().is_none());

        drop(first);
        assert!(waits.try_claim().is_some());
    }

    #[tokio::test]
    async fn completion_handler_delivers_only_the_first_value() {
        let (tx, rx) = oneshot::channel();
        let send = once_sender(tx);
        send(AuthorizationStatus::Denied);
        send(AuthorizationStatus::Authorized);
        assert_eq!(rx.await.unwrap(), AuthorizationStatus::Denied);
    }

    #[test]
    fn status_serializes_for_the_settings_window() {
        assert_eq!(
            serde_json::to_string(&AuthorizationStatus::NotDetermined).unwrap(),
            "\"not_determined\""
        );
    }
}
