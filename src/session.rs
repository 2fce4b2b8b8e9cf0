//! Session lifecycle over the console API. The store owns the current-user
//! snapshot, hydrates it once at startup, and replaces it wholesale on every
//! login/refresh; consumers read a cloned snapshot synchronously or subscribe
//! to the watch channel. Transitions are serialized by an async mutex, so a
//! login issued while a refresh is in flight queues behind it and state
//! writes always happen in event order.

use crate::authz;
use crate::browser::{Navigator, Notifier, NullNavigator, TracingNotifier};
use crate::csrf::CsrfClient;
use crate::errors::ApiError;
use crate::types::{
    Credentials, PermissionBatchRequest, PermissionBatchResponse, PermissionCheckRequest,
    PermissionCheckResponse, RegisterRequest, User, UserEnvelope,
};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::{debug, warn};

const AUTH_USER_PATH: &str = "/auth/user";
const AUTH_LOGIN_PATH: &str = "/auth/login";
const AUTH_REGISTER_PATH: &str = "/auth/register";
const AUTH_LOGOUT_PATH: &str = "/auth/logout";
const PERMISSION_CHECK_PATH: &str = "/permissions/check";
const PERMISSION_CHECK_MULTIPLE_PATH: &str = "/permissions/check-multiple";

const SESSION_EXPIRED_NOTICE: &str = "Your session has expired. Please sign in again.";
const LOGOUT_OFFLINE_NOTICE: &str = "Signed out locally; the server could not be reached.";

/// Observable session snapshot.
///
/// `is_loading` is true only while an init/refresh/login/register/logout is
/// in flight; consumers must not branch on `user` while it is set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionState {
    pub user: Option<User>,
    pub is_loading: bool,
}

impl SessionState {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Owns the authenticated-user lifecycle and re-exposes the authorization
/// predicates against the live snapshot. Explicitly injectable — multiple
/// independent stores can coexist, which the tests rely on.
pub struct SessionStore {
    client: Arc<CsrfClient>,
    state: watch::Sender<SessionState>,
    transitions: tokio::sync::Mutex<()>,
    expiry_notified: AtomicBool,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
}

impl SessionStore {
    #[must_use]
    pub fn new(client: Arc<CsrfClient>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            client,
            state,
            transitions: tokio::sync::Mutex::new(()),
            expiry_notified: AtomicBool::new(false),
            notifier: Arc::new(TracingNotifier),
            navigator: Arc::new(NullNavigator),
        }
    }

    /// Installs the notifier used for the expiry and logout notices.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Installs the navigator used for the session-expired redirect.
    #[must_use]
    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    /// Cloned snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().user.is_some()
    }

    /// Process-start hydration: fetches the current user through the CSRF
    /// pipeline. Absence of a session is a steady state, not a failure, so
    /// nothing surfaces to the user on any error.
    pub async fn init(&self) {
        let _transition = self.transitions.lock().await;
        self.set_loading(true);
        match self.fetch_current_user().await {
            Ok(user) => {
                self.expiry_notified.store(false, Ordering::SeqCst);
                self.publish(Some(user));
            }
            Err(err) => {
                debug!(%err, "no active session at startup");
                self.publish(None);
            }
        }
    }

    /// Authenticates and replaces the snapshot with the returned user.
    ///
    /// # Errors
    /// Rethrows the classified [`ApiError`]; on failure only the loading
    /// flag changes and any prior snapshot stays in place.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, ApiError> {
        let _transition = self.transitions.lock().await;
        self.set_loading(true);
        match self
            .client
            .post::<_, UserEnvelope>(AUTH_LOGIN_PATH, credentials)
            .await
        {
            Ok(envelope) => {
                self.expiry_notified.store(false, Ordering::SeqCst);
                self.publish(Some(envelope.user.clone()));
                Ok(envelope.user)
            }
            Err(err) => {
                self.set_loading(false);
                Err(err)
            }
        }
    }

    /// Registers a new account; the server signs the user in on success.
    ///
    /// # Errors
    /// Rethrows the classified [`ApiError`], same contract as [`Self::login`].
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError> {
        let _transition = self.transitions.lock().await;
        self.set_loading(true);
        match self
            .client
            .post::<_, UserEnvelope>(AUTH_REGISTER_PATH, request)
            .await
        {
            Ok(envelope) => {
                self.expiry_notified.store(false, Ordering::SeqCst);
                self.publish(Some(envelope.user.clone()));
                Ok(envelope.user)
            }
            Err(err) => {
                self.set_loading(false);
                Err(err)
            }
        }
    }

    /// Best-effort logout. The local snapshot is always cleared; a failed
    /// server call is a soft warning because "you are now logged out" is
    /// defined by local state, not server acknowledgment.
    pub async fn logout(&self) {
        let _transition = self.transitions.lock().await;
        self.set_loading(true);
        if let Err(err) = self.client.post_unit(AUTH_LOGOUT_PATH, &json!({})).await {
            warn!(%err, "server logout failed; clearing local session anyway");
            self.notifier.warn(LOGOUT_OFFLINE_NOTICE);
        }
        self.publish(None);
    }

    /// Re-runs the current-user fetch. Any failure is loss of session — a
    /// stale snapshot gating authorization decisions is strictly worse than
    /// none. A mid-session auth failure additionally fires the one-shot
    /// expiry path.
    pub async fn refresh_user(&self) -> Option<User> {
        let _transition = self.transitions.lock().await;
        let was_authenticated = self.state.borrow().user.is_some();
        self.set_loading(true);
        match self.fetch_current_user().await {
            Ok(user) => {
                self.publish(Some(user.clone()));
                Some(user)
            }
            Err(err) => {
                debug!(%err, "refresh failed; dropping session");
                self.publish(None);
                if was_authenticated && err.is_auth_error() {
                    self.notify_expired();
                }
                None
            }
        }
    }

    /// Session-expiry signal for errors from arbitrary API calls made by
    /// consumers. When the error is a 401 and a user is still held locally,
    /// the store drops to anonymous, surfaces the one-shot expiry notice,
    /// then redirects to the login route.
    pub async fn note_auth_error(&self, error: &ApiError) {
        if !error.is_auth_error() {
            return;
        }
        if !self.is_authenticated() {
            return;
        }
        let _transition = self.transitions.lock().await;
        if self.state.borrow().user.is_none() {
            return;
        }
        self.publish(None);
        self.notify_expired();
    }

    /// Role membership against the live snapshot; safe at render time.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        authz::has_role(self.state.borrow().user.as_ref(), role)
    }

    #[must_use]
    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        authz::has_any_role(self.state.borrow().user.as_ref(), roles)
    }

    /// Snapshot-only permission check; never blocks or suspends.
    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        authz::has_permission(self.state.borrow().user.as_ref(), permission)
    }

    #[must_use]
    pub fn has_any_permission<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        authz::has_any_permission(self.state.borrow().user.as_ref(), permissions)
    }

    #[must_use]
    pub fn has_all_permissions<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        authz::has_all_permissions(self.state.borrow().user.as_ref(), permissions)
    }

    /// Server-authoritative permission check, for gating an action rather
    /// than a render. The server is consulted only when the local snapshot
    /// cannot already grant: super-admin and local membership short-circuit
    /// to `true`, an anonymous store to `false`.
    ///
    /// # Errors
    /// Returns the classified [`ApiError`] when the server consult fails.
    pub async fn verify_permission(&self, permission: &str) -> Result<bool, ApiError> {
        if self.has_permission(permission) {
            return Ok(true);
        }
        if !self.is_authenticated() {
            return Ok(false);
        }
        let response: PermissionCheckResponse = self
            .client
            .post(PERMISSION_CHECK_PATH, &PermissionCheckRequest { permission })
            .await?;
        Ok(response.has_permission)
    }

    /// Batch variant of [`Self::verify_permission`]. An empty list is never
    /// satisfied.
    ///
    /// # Errors
    /// Returns the classified [`ApiError`] when the server consult fails.
    pub async fn verify_permissions(
        &self,
        permissions: &[String],
        require_all: bool,
    ) -> Result<bool, ApiError> {
        if permissions.is_empty() {
            return Ok(false);
        }
        let locally_satisfied = if require_all {
            self.has_all_permissions(permissions)
        } else {
            self.has_any_permission(permissions)
        };
        if locally_satisfied {
            return Ok(true);
        }
        if !self.is_authenticated() {
            return Ok(false);
        }
        let response: PermissionBatchResponse = self
            .client
            .post(
                PERMISSION_CHECK_MULTIPLE_PATH,
                &PermissionBatchRequest {
                    permissions,
                    require_all,
                },
            )
            .await?;
        Ok(if require_all {
            response.has_all_permissions
        } else {
            response.has_any_permission
        })
    }

    async fn fetch_current_user(&self) -> Result<User, ApiError> {
        let envelope: UserEnvelope = self.client.get(AUTH_USER_PATH).await?;
        Ok(envelope.user)
    }

    fn set_loading(&self, loading: bool) {
        self.state.send_modify(|state| state.is_loading = loading);
    }

    fn publish(&self, user: Option<User>) {
        self.state.send_modify(|state| {
            state.user = user;
            state.is_loading = false;
        });
    }

    /// One-shot until the next successful login; the notice goes out before
    /// any navigation so the user sees why they landed on the login page.
    fn notify_expired(&self) {
        if !self.expiry_notified.swap(true, Ordering::SeqCst) {
            self.notifier.warn(SESSION_EXPIRED_NOTICE);
            self.navigator
                .replace(&self.client.config().login_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use serde_json::json;

    fn offline_store() -> SessionStore {
        // Never dialed in these tests; only the sync surface is exercised.
        let config = ApiConfig::new("http://127.0.0.1:9");
        let client = CsrfClient::new(config).expect("client construction");
        SessionStore::new(Arc::new(client))
    }

    fn editor() -> User {
        serde_json::from_value(json!({
            "id": 5,
            "first_name": "Eve",
            "last_name": "Editor",
            "email": "eve@example.com",
            "roles": ["editor"],
            "permissions": ["article.write"]
        }))
        .expect("Failed to deserialize user")
    }

    #[test]
    fn default_state_is_anonymous_and_idle() {
        let store = offline_store();
        let state = store.state();
        assert_eq!(state.user, None);
        assert!(!state.is_loading);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn predicates_track_the_published_snapshot() {
        let store = offline_store();
        assert!(!store.has_role("editor"));
        assert!(!store.has_permission("article.write"));

        store.publish(Some(editor()));
        assert!(store.is_authenticated());
        assert!(store.has_role("editor"));
        assert!(store.has_permission("article.write"));
        assert!(!store.has_permission("article.publish"));
        assert!(store.has_any_permission(&["article.write", "article.publish"]));
        assert!(!store.has_all_permissions(&["article.write", "article.publish"]));

        store.publish(None);
        assert!(!store.has_role("editor"));
    }

    #[test]
    fn subscribers_observe_transitions() {
        let store = offline_store();
        let receiver = store.subscribe();

        store.set_loading(true);
        assert!(receiver.borrow().is_loading);

        store.publish(Some(editor()));
        let state = receiver.borrow();
        assert!(!state.is_loading);
        assert!(state.is_authenticated());
    }
}
