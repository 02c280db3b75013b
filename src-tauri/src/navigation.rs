use std::process::Command;
use tauri::Url;

/// Schemes that render inside the document and never leave the view.
const IN_DOCUMENT_SCHEMES: [&str; 4] = ["about", "data", "blob", "javascript"];

/// Schemes the default browser (or mail/phone handler) may be asked to open.
const EXTERNAL_SCHEMES: [&str; 4] = ["http", "https", "mailto", "tel"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NavigationTarget {
    TopLevel,
    Subframe,
    NewWindow,
}

impl NavigationTarget {
    /// Classifies a request by its target frame: `None` when the request has no
    /// frame to load into, otherwise whether that frame is the main frame.
    pub(crate) fn from_frame(is_main_frame: Option<bool>) -> Self {
        match is_main_frame {
            None => Self::NewWindow,
            Some(true) => Self::TopLevel,
            Some(false) => Self::Subframe,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NavigationDecision {
    AllowInView,
    OpenExternally,
}

#[derive(Debug, Clone)]
pub(crate) struct NavigationPolicy {
    trusted_domain: String,
}

impl NavigationPolicy {
    pub(crate) fn new(trusted_domain: &str) -> Self {
        Self {
            trusted_domain: normalize_host(trusted_domain),
        }
    }

    /// True when `host` is the trusted domain or one of its subdomains.
    pub(crate) fn is_trusted_host(&self, host: &str) -> bool {
        let host = normalize_host(host);
        if host.is_empty() || self.trusted_domain.is_empty() {
            return false;
        }
        host == self.trusted_domain
            || host
                .strip_suffix(self.trusted_domain.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    }

    pub(crate) fn decide(&self, url: &Url, target: NavigationTarget) -> NavigationDecision {
        if target == NavigationTarget::NewWindow {
            return NavigationDecision::OpenExternally;
        }

        let trusted = match url.host_str() {
            Some(host) => self.is_trusted_host(host),
            None => IN_DOCUMENT_SCHEMES.contains(&url.scheme()),
        };
        if trusted {
            return NavigationDecision::AllowInView;
        }

        match target {
            NavigationTarget::TopLevel => NavigationDecision::OpenExternally,
            _ => NavigationDecision::AllowInView,
        }
    }
}

fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}

pub(crate) trait UrlOpener {
    fn open(&self, url: &Url) -> Result<(), String>;
}

/// Hands URLs to the user's default handler for their scheme.
pub(crate) struct SystemBrowser;

impl UrlOpener for SystemBrowser {
    fn open(&self, url: &Url) -> Result<(), String> {
        let candidate = url.as_str();

        #[cfg(target_os = "macos")]
        let status = Command::new("open").arg(candidate).status();
        #[cfg(target_os = "linux")]
        let status = Command::new("xdg-open").arg(candidate).status();
        #[cfg(target_os = "windows")]
        let status = Command::new("cmd")
            .arg("/C")
            .arg("start")
            .arg("")
            .arg(candidate)
            .status();

        let status = status.map_err(|error| format!("Failed to open URL: {error}"))?;
        if !status.success() {
            return Err(format!(
                "Failed to open URL (exit code {})",
                status.code().unwrap_or(-1)
            ));
        }

        Ok(())
    }
}

pub(crate) fn open_external(opener: &dyn UrlOpener, url: &Url) -> Result<(), String> {
    let scheme = url.scheme().to_ascii_lowercase();
    if !EXTERNAL_SCHEMES.contains(&scheme.as_str()) {
        return Err(format!("Unsupported URL scheme: {scheme}"));
    }
    opener.open(url)
}

/// Applies the policy to one request and returns whether the view may load it.
/// Redirected requests are handed to `opener` before returning `false`.
pub(crate) fn route(
    policy: &NavigationPolicy,
    opener: &dyn UrlOpener,
    url: &Url,
    target: NavigationTarget,
) -> bool {
    let decision = policy.decide(url, target);
    tracing::debug!(%url, ?target, ?decision, "navigation");
    match decision {
        NavigationDecision::AllowInView => true,
        NavigationDecision::OpenExternally => {
            if let Err(error) = open_external(opener, url) {
                tracing::warn!(%url, "failed to open externally: {error}");
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingOpener {
        opened: RefCell<Vec<String>>,
    }

    impl UrlOpener for RecordingOpener {
        fn open(&self, url: &Url) -> Result<(), String> {
            self.opened.borrow_mut().push(url.to_string());
            Ok(())
        }
    }

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    fn policy() -> NavigationPolicy {
        NavigationPolicy::new("thelobby.ai")
    }

    #[test]
    fn trusted_hosts_match_domain_and_subdomains_only() {
        let policy = policy();
        assert!(policy.is_trusted_host("thelobby.ai"));
        assert!(policy.is_trusted_host("app.thelobby.ai"));
        assert!(policy.is_trusted_host("a.b.thelobby.ai"));
        assert!(policy.is_trusted_host("THELOBBY.AI."));
        assert!(!policy.is_trusted_host("notthelobby.ai"));
        assert!(!policy.is_trusted_host("thelobby.ai.evil.com"));
        assert!(!policy.is_trusted_host(""));
    }

    #[test]
    fn trusted_requests_stay_in_view_for_every_frame() {
        let policy = policy();
        let opener = RecordingOpener::default();
        for target in [NavigationTarget::TopLevel, NavigationTarget::Subframe] {
            for raw in [
                "https://thelobby.ai/lobby/Urgent",
                "https://api.thelobby.ai/auth/callback?code=1",
            ] {
                assert!(route(&policy, &opener, &url(raw), target));
            }
        }
        assert!(opener.opened.borrow().is_empty());
    }

    #[test]
    fn untrusted_top_level_is_cancelled_and_opened_once() {
        let policy = policy();
        let opener = RecordingOpener::default();
        let target = url("https://example.com/article");

        assert!(!route(&policy, &opener, &target, NavigationTarget::TopLevel));
        assert_eq!(*opener.opened.borrow(), vec!["https://example.com/article"]);
    }

    #[test]
    fn untrusted_subframes_are_allowed() {
        let policy = policy();
        let opener = RecordingOpener::default();
        for raw in [
            "https://js.stripe.com/v3/elements-inner.html",
            "https://accounts.google.com/o/oauth2/iframe",
            "https://ads.example.net/slot",
        ] {
            assert!(route(&policy, &opener, &url(raw), NavigationTarget::Subframe));
        }
        assert!(opener.opened.borrow().is_empty());
    }

    #[test]
    fn untrusted_iframe_loads_stay_in_the_view() {
        let policy = policy();
        let opener = RecordingOpener::default();
        let target = NavigationTarget::from_frame(Some(false));

        assert_eq!(target, NavigationTarget::Subframe);
        assert!(route(
            &policy,
            &opener,
            &url("https://js.stripe.com/v3/elements-inner.html"),
            target
        ));
        assert!(opener.opened.borrow().is_empty());
    }

    #[test]
    fn frame_identity_maps_to_targets() {
        assert_eq!(
            NavigationTarget::from_frame(Some(true)),
            NavigationTarget::TopLevel
        );
        assert_eq!(
            NavigationTarget::from_frame(None),
            NavigationTarget::NewWindow
        );
    }

    #[test]
    fn new_windows_always_open_externally() {
        let policy = policy();
        assert_eq!(
            policy.decide(&url("https://thelobby.ai/help"), NavigationTarget::NewWindow),
            NavigationDecision::OpenExternally
        );
        assert_eq!(
            policy.decide(&url("https://example.com"), NavigationTarget::NewWindow),
            NavigationDecision::OpenExternally
        );
    }

    #[test]
    fn hostless_urls_follow_their_scheme() {
        let policy = policy();
        assert_eq!(
            policy.decide(&url("about:blank"), NavigationTarget::TopLevel),
            NavigationDecision::AllowInView
        );
        assert_eq!(
            policy.decide(&url("data:text/html,hi"), NavigationTarget::TopLevel),
            NavigationDecision::AllowInView
        );
        assert_eq!(
            policy.decide(&url("mailto:team@thelobby.ai"), NavigationTarget::TopLevel),
            NavigationDecision::OpenExternally
        );
    }

    #[test]
    fn external_open_refuses_unexpected_schemes() {
        let opener = RecordingOpener::default();
        let error = open_external(&opener, &url("file:///etc/passwd")).unwrap_err();
        assert_eq!(error, "Unsupported URL scheme: file");
        assert!(opener.opened.borrow().is_empty());

        open_external(&opener, &url("mailto:team@thelobby.ai")).unwrap();
        assert_eq!(opener.opened.borrow().len(), 1);
    }
}
