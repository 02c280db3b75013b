pub(crate) const APP_NAME: &str = "Lobby";
pub(crate) const BUNDLE_IDENTIFIER: &str = "ai.thelobby.desktop";

pub(crate) const LOBBY_BASE_URL: &str = "https://thelobby.ai/lobby/Urgent";
pub(crate) const TRUSTED_DOMAIN: &str = "thelobby.ai";

pub(crate) const MAIN_WINDOW_LABEL: &str = "main";
pub(crate) const SETTINGS_WINDOW_LABEL: &str = "settings";
pub(crate) const MAIN_WINDOW_WIDTH: f64 = 1280.0;
pub(crate) const MAIN_WINDOW_HEIGHT: f64 = 800.0;
pub(crate) const SETTINGS_WINDOW_WIDTH: f64 = 320.0;
pub(crate) const SETTINGS_WINDOW_HEIGHT: f64 = 240.0;

pub(crate) const BRIDGE_COMMAND: &str = "bridge_notification";
pub(crate) const MAX_NOTIFICATION_CLICK_WAITS: usize = 8;

pub(crate) const LAUNCH_AGENT_LABEL: &str = "ai.thelobby.desktop";

pub(crate) const NOTIFICATION_SETTINGS_URL: &str =
    "x-apple.systempreferences:com.apple.notifications-Settings";

pub(crate) const REACHABILITY_PROBE_INTERVAL_SECS: u64 = 10;
pub(crate) const REACHABILITY_PROBE_TIMEOUT_SECS: u64 = 5;

pub(crate) const UPDATE_FIRST_CHECK_DELAY_SECS: u64 = 30;
pub(crate) const UPDATE_CHECK_INTERVAL_SECS: u64 = 24 * 60 * 60;

pub(crate) const LOG_ENV_VAR: &str = "LOBBY_LOG";
pub(crate) const LOG_FILE_PREFIX: &str = "lobby-desktop.log";
