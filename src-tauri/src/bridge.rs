use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{notifications::AuthorizationStatus, shared::truncate_message};

/// Runs at document start in every frame. Replaces the page's `Notification`
/// constructor with one that always reports permission as granted and forwards
/// title and body to the host over the `bridge_notification` command.
pub(crate) const BRIDGE_SCRIPT: &str = r#"
(function () {
  if (window.__lobbyNotificationBridge) {
    return;
  }
  window.__lobbyNotificationBridge = true;

  function forward(title, options) {
    var internals = window.__TAURI_INTERNALS__;
    if (!internals || typeof internals.invoke !== "function") {
      return;
    }
    var payload = {
      title: title,
      body: (options && options.body) || ""
    };
    try {
      internals.invoke("bridge_notification", { payload: payload }).catch(function () {});
    } catch (_) {}
  }

  function LobbyNotification(title, options) {
    forward(title, options);
    this.title = title;
    this.body = (options && options.body) || "";
    this.permission = "granted";
  }
  LobbyNotification.prototype.close = function () {};
  LobbyNotification.prototype.addEventListener = function () {};
  LobbyNotification.prototype.removeEventListener = function () {};

  LobbyNotification.permission = "granted";
  LobbyNotification.requestPermission = function (callback) {
    if (typeof callback === "function") {
      callback("granted");
    }
    return Promise.resolve("granted");
  };

  window.Notification = LobbyNotification;
})();
"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct BridgedNotification {
    pub(crate) title: String,
    pub(crate) body: String,
}

impl BridgedNotification {
    /// Accepts only payloads carrying string `title` and `body` fields.
    pub(crate) fn from_payload(payload: Value) -> Result<Self, String> {
        serde_json::from_value(payload)
            .map_err(|error| format!("Malformed notification payload: {error}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BridgeOutcome {
    Delivered,
    Malformed,
    DisabledByUser,
    NotAuthorized,
}

pub(crate) trait NotificationSink {
    fn post(&self, notification: BridgedNotification);
}

/// The user preference and the OS authorization are independent; both must
/// allow delivery. An authorization that has not been observed yet defers to the OS.
pub(crate) fn delivery_allowed(user_enabled: bool, os_status: Option<AuthorizationStatus>) -> bool {
    user_enabled && os_status.map_or(true, AuthorizationStatus::allows_delivery)
}

pub(crate) fn dispatch(
    payload: Value,
    user_enabled: bool,
    os_status: Option<AuthorizationStatus>,
    sink: &dyn NotificationSink,
) -> BridgeOutcome {
    let notification = match BridgedNotification::from_payload(payload) {
        Ok(notification) => notification,
        Err(error) => {
            tracing::debug!("dropping bridged notification: {error}");
            return BridgeOutcome::Malformed;
        }
    };

    if !user_enabled {
        return BridgeOutcome::DisabledByUser;
    }
    if !delivery_allowed(user_enabled, os_status) {
        tracing::debug!(?os_status, "dropping bridged notification: not authorized");
        return BridgeOutcome::NotAuthorized;
    }

    tracing::debug!(
        title = %truncate_message(&notification.title, 80),
        "delivering bridged notification"
    );
    sink.post(notification);
    BridgeOutcome::Delivered
}
