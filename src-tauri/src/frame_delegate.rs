//! WKWebView navigation delegate that tells iframe loads apart from main-frame
//! navigations. wry reports every `decidePolicyForNavigationAction` to the
//! `on_navigation` hook without frame information, so subframe requests are
//! decided here and everything else is forwarded to wry's own delegate.

use objc2::rc::Retained;
use objc2::runtime::{AnyObject, NSObject, ProtocolObject, Sel};
use objc2::{define_class, msg_send, sel, DefinedClass, MainThreadMarker, MainThreadOnly};
use objc2_foundation::{NSObjectProtocol, NSString};
use objc2_web_kit::{
    WKNavigationAction, WKNavigationActionPolicy, WKNavigationDelegate, WKWebView,
};
use tauri::{Url, WebviewWindow};

use crate::navigation::{self, NavigationPolicy, NavigationTarget, SystemBrowser};

struct FrameAwareIvars {
    wry_delegate: Retained<ProtocolObject<dyn WKNavigationDelegate>>,
    policy: NavigationPolicy,
}

define_class!(
    #[unsafe(super(NSObject))]
    #[thread_kind = MainThreadOnly]
    #[name = "LobbyFrameAwareNavigationDelegate"]
    #[ivars = FrameAwareIvars]
    struct FrameAwareNavigationDelegate;

    unsafe impl NSObjectProtocol for FrameAwareNavigationDelegate {}

    unsafe impl WKNavigationDelegate for FrameAwareNavigationDelegate {
        #[unsafe(method(webView:decidePolicyForNavigationAction:decisionHandler:))]
        fn decide_policy(
            &self,
            web_view: &WKWebView,
            navigation_action: &WKNavigationAction,
            decision_handler: &block2::Block<dyn Fn(WKNavigationActionPolicy)>,
        ) {
            let target = NavigationTarget::from_frame(target_is_main_frame(navigation_action));
            if target == NavigationTarget::Subframe {
                let allowed = match request_url(navigation_action) {
                    Some(url) => navigation::route(&self.ivars().policy, &SystemBrowser, &url, target),
                    None => true,
                };
                let decision = if allowed {
                    WKNavigationActionPolicy::Allow
                } else {
                    WKNavigationActionPolicy::Cancel
                };
                decision_handler.call((decision,));
                return;
            }

            let wry_delegate = &*self.ivars().wry_delegate;
            if !wry_delegate.respondsToSelector(sel!(webView:decidePolicyForNavigationAction:decisionHandler:)) {
                decision_handler.call((WKNavigationActionPolicy::Allow,));
                return;
            }
            unsafe {
                let _: () = msg_send![
                    wry_delegate,
                    webView: web_view,
                    decidePolicyForNavigationAction: navigation_action,
                    decisionHandler: decision_handler
                ];
            }
        }
    }

    impl FrameAwareNavigationDelegate {
        // WebKit prefers the variant with preferences when a delegate offers it,
        // which would bypass the frame check above.
        #[unsafe(method(respondsToSelector:))]
        fn responds_to_selector(&self, selector: Sel) -> bool {
            if selector == sel!(webView:decidePolicyForNavigationAction:preferences:decisionHandler:) {
                return false;
            }
            let own: bool = unsafe { msg_send![super(self), respondsToSelector: selector] };
            own || self.ivars().wry_delegate.respondsToSelector(selector)
        }

        #[unsafe(method(forwardingTargetForSelector:))]
        fn forwarding_target_for_selector(&self, _selector: Sel) -> *mut AnyObject {
            Retained::as_ptr(&self.ivars().wry_delegate)
                .cast_mut()
                .cast::<AnyObject>()
        }
    }
);

impl FrameAwareNavigationDelegate {
    fn new(
        mtm: MainThreadMarker,
        wry_delegate: Retained<ProtocolObject<dyn WKNavigationDelegate>>,
        policy: NavigationPolicy,
    ) -> Retained<Self> {
        let delegate = Self::alloc(mtm).set_ivars(FrameAwareIvars {
            wry_delegate,
            policy,
        });
        unsafe { msg_send![super(delegate), init] }
    }
}

/// `None` when the action has no target frame (a new-window request).
fn target_is_main_frame(navigation_action: &WKNavigationAction) -> Option<bool> {
    unsafe {
        let frame: *const AnyObject = msg_send![navigation_action, targetFrame];
        if frame.is_null() {
            return None;
        }
        let is_main: bool = msg_send![frame, isMainFrame];
        Some(is_main)
    }
}

fn request_url(navigation_action: &WKNavigationAction) -> Option<Url> {
    let absolute: Option<Retained<NSString>> = unsafe {
        let request: *const AnyObject = msg_send![navigation_action, request];
        if request.is_null() {
            return None;
        }
        let url: *const AnyObject = msg_send![request, URL];
        if url.is_null() {
            return None;
        }
        msg_send![url, absoluteString]
    };
    Url::parse(&absolute?.to_string()).ok()
}

/// Wraps the main window's navigation delegate so iframe loads follow the
/// subframe row of `policy` instead of reaching `on_navigation`.
pub(crate) fn install(window: &WebviewWindow, policy: NavigationPolicy) -> Result<(), String> {
    window
        .with_webview(move |webview| {
            let Some(mtm) = MainThreadMarker::new() else {
                tracing::warn!("frame-aware navigation not installed: off the main thread");
                return;
            };
            let web_view = webview.inner().cast::<AnyObject>();
            let wry_delegate: Option<Retained<ProtocolObject<dyn WKNavigationDelegate>>> =
                unsafe { msg_send![web_view, navigationDelegate] };
            let Some(wry_delegate) = wry_delegate else {
                tracing::warn!("frame-aware navigation not installed: no navigation delegate");
                return;
            };

            let delegate = FrameAwareNavigationDelegate::new(mtm, wry_delegate, policy);
            unsafe {
                let _: () = msg_send![
                    web_view,
                    setNavigationDelegate: ProtocolObject::<dyn WKNavigationDelegate>::from_ref(&*delegate)
                ];
            }
            // WKWebView holds its navigation delegate weakly; the main window
            // lives until the process exits.
            std::mem::forget(delegate);
            tracing::debug!("frame-aware navigation delegate installed");
        })
        .map_err(|error| format!("Failed to reach main webview: {error}"))
}
