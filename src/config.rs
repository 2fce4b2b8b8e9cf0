//! Client configuration: API base URL, the session/cookie-issuing origin,
//! navigation paths, and the timeout policy. Values can be loaded from the
//! environment; empty or whitespace-only values are ignored so deployments
//! can leave variables unset without clobbering defaults. Configuration is
//! public data; do not store secrets here.

use std::env;
use std::time::Duration;

/// Default request timeout applied to every HTTP call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Delay between a successful CSRF bootstrap response and the first cookie
/// read; the cookie-jar write is not guaranteed visible on the same tick.
const DEFAULT_COOKIE_SETTLE: Duration = Duration::from_millis(25);

const DEFAULT_LOGIN_PATH: &str = "/login";
const DEFAULT_UNAUTHORIZED_PATH: &str = "/unauthorized";

#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Base URL for API calls.
    pub api_base_url: String,
    /// Origin that issues the session and CSRF cookies. Usually the API
    /// origin, but deployments may split them.
    pub session_base_url: String,
    /// In-app path the client hard-redirects to when the session is gone.
    pub login_path: String,
    /// In-app path for denied-but-authenticated navigation.
    pub unauthorized_path: String,
    pub request_timeout: Duration,
    pub cookie_settle: Duration,
}

impl ApiConfig {
    /// Builds a config for the given API base URL with default paths and
    /// timeouts. The session origin defaults to the API origin.
    #[must_use]
    pub fn new(api_base_url: impl Into<String>) -> Self {
        let api_base_url = api_base_url.into();
        Self {
            session_base_url: api_base_url.clone(),
            api_base_url,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            unauthorized_path: DEFAULT_UNAUTHORIZED_PATH.to_string(),
            request_timeout: DEFAULT_TIMEOUT,
            cookie_settle: DEFAULT_COOKIE_SETTLE,
        }
    }

    /// Loads the config from `PORTIERE_*` environment variables, ignoring
    /// unset or empty values.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::new(env_value("PORTIERE_API_BASE_URL").unwrap_or_default());
        if let Some(value) = env_value("PORTIERE_SESSION_BASE_URL") {
            config.session_base_url = value;
        }
        if let Some(value) = env_value("PORTIERE_LOGIN_PATH") {
            config.login_path = value;
        }
        if let Some(value) = env_value("PORTIERE_UNAUTHORIZED_PATH") {
            config.unauthorized_path = value;
        }
        config
    }

    #[must_use]
    pub fn with_session_base_url(mut self, session_base_url: impl Into<String>) -> Self {
        self.session_base_url = session_base_url.into();
        self
    }

    #[must_use]
    pub fn with_login_path(mut self, login_path: impl Into<String>) -> Self {
        self.login_path = login_path.into();
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_cookie_settle(mut self, settle: Duration) -> Self {
        self.cookie_settle = settle;
        self
    }

    /// Joins a path onto the API base URL.
    #[must_use]
    pub(crate) fn api_url(&self, path: &str) -> String {
        join_url(&self.api_base_url, path)
    }

    /// Joins a path onto the session/cookie-issuing origin.
    #[must_use]
    pub(crate) fn session_url(&self, path: &str) -> String {
        join_url(&self.session_base_url, path)
    }
}

fn env_value(name: &str) -> Option<String> {
    normalize_value(&env::var(name).ok()?)
}

fn normalize_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiConfig, join_url, normalize_value};

    #[test]
    fn normalize_value_trims_and_rejects_empty() {
        assert_eq!(normalize_value(""), None);
        assert_eq!(normalize_value("   "), None);
        assert_eq!(
            normalize_value("  https://api.portiere.dev "),
            Some("https://api.portiere.dev".to_string())
        );
    }

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(
            join_url("https://api.portiere.dev/", "/auth/user"),
            "https://api.portiere.dev/auth/user"
        );
        assert_eq!(
            join_url("https://api.portiere.dev", "auth/user"),
            "https://api.portiere.dev/auth/user"
        );
        assert_eq!(join_url("", "/auth/user"), "/auth/user");
    }

    #[test]
    fn new_defaults_session_origin_to_api_origin() {
        let config = ApiConfig::new("https://api.portiere.dev");
        assert_eq!(config.session_base_url, "https://api.portiere.dev");
        assert_eq!(config.login_path, "/login");
        assert_eq!(config.unauthorized_path, "/unauthorized");
    }

    #[test]
    fn from_env_trims_values_and_ignores_empty_overrides() {
        temp_env::with_vars(
            [
                ("PORTIERE_API_BASE_URL", Some("  https://api.portiere.dev ")),
                ("PORTIERE_SESSION_BASE_URL", Some("   ")),
                ("PORTIERE_LOGIN_PATH", Some("/signin")),
                ("PORTIERE_UNAUTHORIZED_PATH", None),
            ],
            || {
                let config = ApiConfig::from_env();
                assert_eq!(config.api_base_url, "https://api.portiere.dev");
                // Blank override is ignored; the session origin falls back
                // to the API base.
                assert_eq!(config.session_base_url, "https://api.portiere.dev");
                assert_eq!(config.login_path, "/signin");
                assert_eq!(config.unauthorized_path, "/unauthorized");
            },
        );
    }

    #[test]
    fn builders_override_defaults() {
        let config = ApiConfig::new("https://api.portiere.dev")
            .with_session_base_url("https://session.portiere.dev")
            .with_login_path("/signin");

        assert_eq!(config.session_base_url, "https://session.portiere.dev");
        assert_eq!(config.login_path, "/signin");
        assert_eq!(
            config.session_url("/sanctum/csrf-cookie"),
            "https://session.portiere.dev/sanctum/csrf-cookie"
        );
    }
}
