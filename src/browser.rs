//! Injected browser capabilities: cookie reads, hard navigation, and
//! user-facing notices. The CSRF and session logic only ever sees these
//! traits, so it runs in unit tests without a real browser; the recording
//! implementations at the bottom exist for exactly that.

use reqwest::cookie::{CookieStore as _, Jar};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use url::Url;

/// Read access to the cookie store. The store is shared mutable state the
/// server may rewrite on any response, so callers re-read values instead of
/// caching them.
pub trait CookieSource: Send + Sync {
    /// Returns the decoded value of the named cookie, if set.
    fn get(&self, name: &str) -> Option<String>;
}

/// Hard navigation out of the current view, e.g. to the login route.
pub trait Navigator: Send + Sync {
    /// Replaces the current location with `path`.
    fn replace(&self, path: &str);
}

/// User-facing, non-blocking notices (toasts, banners).
pub trait Notifier: Send + Sync {
    fn warn(&self, message: &str);
}

/// Cookie reader over the reqwest [`Jar`] the client sends with, scoped to
/// the cookie-issuing origin.
pub struct JarCookies {
    jar: Arc<Jar>,
    origin: Url,
}

impl JarCookies {
    #[must_use]
    pub fn new(jar: Arc<Jar>, origin: Url) -> Self {
        Self { jar, origin }
    }
}

impl CookieSource for JarCookies {
    fn get(&self, name: &str) -> Option<String> {
        let header = self.jar.cookies(&self.origin)?;
        parse_cookie_header(header.to_str().ok()?, name)
    }
}

/// Extracts and percent-decodes one cookie from a `Cookie` header value.
fn parse_cookie_header(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        if key != name {
            return None;
        }
        match urlencoding::decode(value) {
            Ok(decoded) => Some(decoded.into_owned()),
            Err(_) => Some(value.to_string()),
        }
    })
}

/// Navigator that drops navigations; the default for headless embedding.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullNavigator;

impl Navigator for NullNavigator {
    fn replace(&self, path: &str) {
        tracing::debug!(path, "navigation requested with no navigator installed");
    }
}

/// Notifier that forwards notices to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }
}

/// In-memory cookie source for tests and non-browser embeddings.
#[derive(Debug, Default)]
pub struct MemoryCookies {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryCookies {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        let mut inner = self.inner.lock().expect("cookie lock poisoned");
        inner.insert(name.into(), value.into());
    }

    pub fn clear(&self, name: &str) {
        let mut inner = self.inner.lock().expect("cookie lock poisoned");
        inner.remove(name);
    }
}

impl CookieSource for MemoryCookies {
    fn get(&self, name: &str) -> Option<String> {
        let inner = self.inner.lock().expect("cookie lock poisoned");
        inner.get(name).cloned()
    }
}

/// Navigator that records every destination, for asserting redirects.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    destinations: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn destinations(&self) -> Vec<String> {
        self.destinations
            .lock()
            .expect("navigator lock poisoned")
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn replace(&self, path: &str) {
        self.destinations
            .lock()
            .expect("navigator lock poisoned")
            .push(path.to_string());
    }
}

/// Notifier that records every notice, for asserting one-shot behavior.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().expect("notifier lock poisoned").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn warn(&self, message: &str) {
        self.notices
            .lock()
            .expect("notifier lock poisoned")
            .push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cookie_header_finds_named_cookie() {
        let header = "laravel_session=abc; XSRF-TOKEN=tok-123; theme=dark";
        assert_eq!(
            parse_cookie_header(header, "XSRF-TOKEN"),
            Some("tok-123".to_string())
        );
        assert_eq!(parse_cookie_header(header, "missing"), None);
    }

    #[test]
    fn parse_cookie_header_percent_decodes_values() {
        let header = "XSRF-TOKEN=eyJpdiI6%3D%3D";
        assert_eq!(
            parse_cookie_header(header, "XSRF-TOKEN"),
            Some("eyJpdiI6==".to_string())
        );
    }

    #[test]
    fn jar_cookies_reads_from_the_shared_jar() {
        let jar = Arc::new(Jar::default());
        let origin = Url::parse("https://api.portiere.dev").expect("url");
        jar.add_cookie_str("XSRF-TOKEN=tok-456; Path=/", &origin);

        let cookies = JarCookies::new(jar, origin);
        assert_eq!(cookies.get("XSRF-TOKEN"), Some("tok-456".to_string()));
        assert_eq!(cookies.get("laravel_session"), None);
    }

    #[test]
    fn memory_cookies_set_and_clear() {
        let cookies = MemoryCookies::new();
        assert_eq!(cookies.get("XSRF-TOKEN"), None);

        cookies.set("XSRF-TOKEN", "tok-789");
        assert_eq!(cookies.get("XSRF-TOKEN"), Some("tok-789".to_string()));

        cookies.clear("XSRF-TOKEN");
        assert_eq!(cookies.get("XSRF-TOKEN"), None);
    }

    #[test]
    fn recording_navigator_captures_destinations() {
        let navigator = RecordingNavigator::new();
        navigator.replace("/login");
        navigator.replace("/unauthorized");
        assert_eq!(navigator.destinations(), vec!["/login", "/unauthorized"]);
    }
}
