use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::LAUNCH_AGENT_LABEL;

/// What the OS currently has on file for this app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoginItemState {
    Absent,
    Current,
    /// Registered, but for an executable path this app no longer lives at.
    Stale,
}

pub(crate) trait LoginItemService {
    fn state(&self) -> Result<LoginItemState, String>;
    fn register(&self) -> Result<(), String>;
    fn unregister(&self) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoginItemChange {
    Registered,
    Unregistered,
    Unchanged,
}

/// Brings the login item in line with `enabled`, calling the service only when
/// its current state differs. A stale entry is rewritten when enabled and removed
/// when disabled.
pub(crate) fn sync_login_item(
    service: &dyn LoginItemService,
    enabled: bool,
) -> Result<LoginItemChange, String> {
    match (enabled, service.state()?) {
        (true, LoginItemState::Absent | LoginItemState::Stale) => {
            service.register()?;
            Ok(LoginItemChange::Registered)
        }
        (false, LoginItemState::Current | LoginItemState::Stale) => {
            service.unregister()?;
            Ok(LoginItemChange::Unregistered)
        }
        (true, LoginItemState::Current) | (false, LoginItemState::Absent) => {
            Ok(LoginItemChange::Unchanged)
        }
    }
}

/// Reconciles the per-user launch agent with the stored preference. Failures are
/// logged; the preference itself is left as the user set it.
pub(crate) fn apply_launch_at_login(enabled: bool) {
    #[cfg(target_os = "macos")]
    {
        let result =
            LaunchAgent::for_current_exe().and_then(|agent| sync_login_item(&agent, enabled));
        match result {
            Ok(LoginItemChange::Unchanged) => {
                tracing::debug!(enabled, "launch at login already up to date")
            }
            Ok(change) => tracing::info!(?change, "launch at login updated"),
            Err(error) => tracing::warn!("failed to configure launch at login: {error}"),
        }
    }
    #[cfg(not(target_os = "macos"))]
    tracing::debug!(enabled, "launch at login is only managed on macOS");
}

/// A `~/Library/LaunchAgents` entry that starts `program` when the user logs in.
/// launchd reads the directory at login, so registration never starts a second
/// copy of the running app.
#[derive(Debug, Clone)]
pub(crate) struct LaunchAgent {
    plist_path: PathBuf,
    program: PathBuf,
}

impl LaunchAgent {
    pub(crate) fn new(plist_path: PathBuf, program: PathBuf) -> Self {
        Self {
            plist_path,
            program,
        }
    }

    #[cfg(target_os = "macos")]
    pub(crate) fn for_current_exe() -> Result<Self, String> {
        let home = std::env::var("HOME").map_err(|error| format!("HOME is not set: {error}"))?;
        let plist_path = PathBuf::from(home)
            .join("Library/LaunchAgents")
            .join(format!("{LAUNCH_AGENT_LABEL}.plist"));
        let program = std::env::current_exe()
            .map_err(|error| format!("Failed to resolve app executable: {error}"))?;
        Ok(Self::new(plist_path, program))
    }

    pub(crate) fn plist_path(&self) -> &Path {
        &self.plist_path
    }

    fn plist_contents(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
  <key>Label</key>
  <string>{}</string>
  <key>ProgramArguments</key>
  <array>
    <string>{}</string>
  </array>
  <key>RunAtLoad</key>
  <true/>
</dict>
</plist>
"#,
            LAUNCH_AGENT_LABEL,
            xml_escape(&self.program.to_string_lossy())
        )
    }
}

impl LoginItemService for LaunchAgent {
    /// Any plist at our path is registered with launchd; it is current only while
    /// it still points at this executable.
    fn state(&self) -> Result<LoginItemState, String> {
        if !self.plist_path.exists() {
            return Ok(LoginItemState::Absent);
        }
        let on_disk = fs::read_to_string(&self.plist_path)
            .map_err(|error| format!("Failed to read launch agent: {error}"))?;
        if on_disk == self.plist_contents() {
            Ok(LoginItemState::Current)
        } else {
            Ok(LoginItemState::Stale)
        }
    }

    fn register(&self) -> Result<(), String> {
        if let Some(dir) = self.plist_path.parent() {
            fs::create_dir_all(dir)
                .map_err(|error| format!("Failed to create LaunchAgents dir: {error}"))?;
        }
        fs::write(&self.plist_path, self.plist_contents())
            .map_err(|error| format!("Failed to write launch agent: {error}"))
    }

    fn unregister(&self) -> Result<(), String> {
        if !self.plist_path.exists() {
            return Ok(());
        }
        fs::remove_file(&self.plist_path)
            .map_err(|error| format!("Failed to remove launch agent: {error}"))
    }
}

fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        cell::Cell,
        sync::atomic::{AtomicU64, Ordering},
    };

    struct FakeService {
        state: Cell<LoginItemState>,
        register_calls: Cell<u32>,
        unregister_calls: Cell<u32>,
    }

    impl FakeService {
        fn in_state(state: LoginItemState) -> Self {
            Self {
                state: Cell::new(state),
                register_calls: Cell::new(0),
                unregister_calls: Cell::new(0),
            }
        }
    }

    impl LoginItemService for FakeService {
        fn state(&self) -> Result<LoginItemState, String> {
            Ok(self.state.get())
        }

        fn register(&self) -> Result<(), String> {
            self.register_calls.set(self.register_calls.get() + 1);
            self.state.set(LoginItemState::Current);
            Ok(())
        }

        fn unregister(&self) -> Result<(), String> {
            self.unregister_calls.set(self.unregister_calls.get() + 1);
            self.state.set(LoginItemState::Absent);
            Ok(())
        }
    }

    #[test]
    fn enabling_registers_exactly_once() {
        let service = FakeService::in_state(LoginItemState::Absent);
        assert_eq!(
            sync_login_item(&service, true).unwrap(),
            LoginItemChange::Registered
        );
        assert_eq!(
            sync_login_item(&service, true).unwrap(),
            LoginItemChange::Unchanged
        );
        assert_eq!(service.register_calls.get(), 1);
        assert_eq!(service.unregister_calls.get(), 0);
    }

    #[test]
    fn disabling_unregisters_exactly_once() {
        let service = FakeService::in_state(LoginItemState::Current);
        assert_eq!(
            sync_login_item(&service, false).unwrap(),
            LoginItemChange::Unregistered
        );
        assert_eq!(
            sync_login_item(&service, false).unwrap(),
            LoginItemChange::Unchanged
        );
        assert_eq!(service.unregister_calls.get(), 1);
        assert_eq!(service.register_calls.get(), 0);
    }

    #[test]
    fn disabled_and_unregistered_makes_no_calls() {
        let service = FakeService::in_state(LoginItemState::Absent);
        assert_eq!(
            sync_login_item(&service, false).unwrap(),
            LoginItemChange::Unchanged
        );
        assert_eq!(service.register_calls.get(), 0);
        assert_eq!(service.unregister_calls.get(), 0);
    }

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn scratch_agent(program: &str) -> LaunchAgent {
        let dir = std::env::temp_dir().join(format!(
            "lobby-agent-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        LaunchAgent::new(
            dir.join("LaunchAgents").join("agent.plist"),
            PathBuf::from(program),
        )
    }

    #[test]
    fn stale_entry_is_removed_when_disabled() {
        let service = FakeService::in_state(LoginItemState::Stale);
        assert_eq!(
            sync_login_item(&service, false).unwrap(),
            LoginItemChange::Unregistered
        );
        assert_eq!(service.unregister_calls.get(), 1);
        assert_eq!(service.register_calls.get(), 0);
    }

    #[test]
    fn launch_agent_round_trip_on_disk() {
        let agent = scratch_agent("/Applications/Lobby.app/Contents/MacOS/lobby-desktop");
        assert_eq!(agent.state().unwrap(), LoginItemState::Absent);

        assert_eq!(
            sync_login_item(&agent, true).unwrap(),
            LoginItemChange::Registered
        );
        assert!(agent.plist_path().exists());
        assert_eq!(agent.state().unwrap(), LoginItemState::Current);

        assert_eq!(
            sync_login_item(&agent, false).unwrap(),
            LoginItemChange::Unregistered
        );
        assert!(!agent.plist_path().exists());
    }

    #[test]
    fn moved_app_rewrites_stale_entry() {
        let old = scratch_agent("/Users/me/Downloads/Lobby.app/Contents/MacOS/lobby-desktop");
        old.register().unwrap();
        let moved = LaunchAgent::new(
            old.plist_path().to_path_buf(),
            PathBuf::from("/Applications/Lobby.app/Contents/MacOS/lobby-desktop"),
        );

        assert_eq!(moved.state().unwrap(), LoginItemState::Stale);
        assert_eq!(
            sync_login_item(&moved, true).unwrap(),
            LoginItemChange::Registered
        );
        assert_eq!(moved.state().unwrap(), LoginItemState::Current);
    }

    #[test]
    fn moved_app_with_launch_disabled_removes_old_entry() {
        let old = scratch_agent("/Users/me/Downloads/Lobby.app/Contents/MacOS/lobby-desktop");
        old.register().unwrap();
        let moved = LaunchAgent::new(
            old.plist_path().to_path_buf(),
            PathBuf::from("/Applications/Lobby.app/Contents/MacOS/lobby-desktop"),
        );

        assert_eq!(
            sync_login_item(&moved, false).unwrap(),
            LoginItemChange::Unregistered
        );
        assert!(!moved.plist_path().exists());
        assert_eq!(
            sync_login_item(&moved, false).unwrap(),
            LoginItemChange::Unchanged
        );
    }

    #[test]
    fn program_path_is_escaped() {
        let agent = scratch_agent("/Apps/Tom & Jerry's <Lobby>.app");
        let plist = agent.plist_contents();
        assert!(plist.contains("/Apps/Tom &amp; Jerry&apos;s &lt;Lobby&gt;.app"));
        assert!(plist.contains(&format!("<string>{LAUNCH_AGENT_LABEL}</string>")));
    }
}
