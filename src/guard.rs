//! Render-time route protection. The guard is a stateless decision over a
//! session snapshot: render, hold for loading, bounce to login with the
//! original location preserved, or bounce to the unauthorized view with the
//! denial reason. Real access control lives on the API; this is a UX guard.

use crate::authz::{self, AccessDecision, AccessRequirement};
use crate::session::SessionState;

const DEFAULT_LOGIN_PATH: &str = "/login";
const DEFAULT_UNAUTHORIZED_PATH: &str = "/unauthorized";

/// Decision for a protected view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Requirements satisfied; render the children.
    Render,
    /// The session is still resolving; render a neutral loading affordance
    /// and make no authorization decision on a possibly-stale snapshot.
    Loading,
    /// Anonymous; go to the fallback with the original location preserved
    /// so the login flow can return the user where they were headed.
    RedirectToLogin { to: String, return_to: String },
    /// Authenticated but denied; the reason names the failed requirement
    /// and its any-of/all-of semantics.
    Unauthorized { to: String, reason: String },
}

impl RouteOutcome {
    #[must_use]
    pub fn is_render(&self) -> bool {
        matches!(self, RouteOutcome::Render)
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, RouteOutcome::Loading)
    }

    /// Redirect target, when the outcome navigates.
    #[must_use]
    pub fn redirect_to(&self) -> Option<&str> {
        match self {
            RouteOutcome::RedirectToLogin { to, .. } | RouteOutcome::Unauthorized { to, .. } => {
                Some(to)
            }
            _ => None,
        }
    }
}

/// Requirement set for one protected view.
#[derive(Clone, Debug)]
pub struct RouteGuard {
    pub requirement: AccessRequirement,
    pub fallback_path: String,
    pub unauthorized_path: String,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteGuard {
    /// Guard that only requires an authenticated session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            requirement: AccessRequirement::default(),
            fallback_path: DEFAULT_LOGIN_PATH.to_string(),
            unauthorized_path: DEFAULT_UNAUTHORIZED_PATH.to_string(),
        }
    }

    #[must_use]
    pub fn with_requirement(mut self, requirement: AccessRequirement) -> Self {
        self.requirement = requirement;
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback_path: impl Into<String>) -> Self {
        self.fallback_path = fallback_path.into();
        self
    }

    #[must_use]
    pub fn with_unauthorized_path(mut self, unauthorized_path: impl Into<String>) -> Self {
        self.unauthorized_path = unauthorized_path.into();
        self
    }

    /// Decides for the current snapshot; `location` is the path being
    /// visited, carried through the login redirect for post-login return.
    #[must_use]
    pub fn evaluate(&self, state: &SessionState, location: &str) -> RouteOutcome {
        if state.is_loading {
            return RouteOutcome::Loading;
        }

        let Some(user) = &state.user else {
            return RouteOutcome::RedirectToLogin {
                to: self.fallback_path.clone(),
                return_to: location.to_string(),
            };
        };

        if self.requirement.is_empty() {
            return RouteOutcome::Render;
        }

        match authz::evaluate(Some(user), &self.requirement) {
            AccessDecision::Granted => RouteOutcome::Render,
            AccessDecision::Denied { reason } => RouteOutcome::Unauthorized {
                to: self.unauthorized_path.clone(),
                reason,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::User;
    use serde_json::json;

    fn editor_state() -> SessionState {
        let user: User = serde_json::from_value(json!({
            "id": 5,
            "first_name": "Eve",
            "last_name": "Editor",
            "email": "eve@example.com",
            "roles": ["editor"],
            "permissions": ["article.write"]
        }))
        .expect("Failed to deserialize user");
        SessionState {
            user: Some(user),
            is_loading: false,
        }
    }

    #[test]
    fn loading_defers_every_decision() {
        let state = SessionState {
            user: None,
            is_loading: true,
        };
        let guard = RouteGuard::new()
            .with_requirement(AccessRequirement::roles(["admin"]));
        assert!(guard.evaluate(&state, "/articles").is_loading());
    }

    #[test]
    fn anonymous_redirects_to_login_with_return_location() {
        let state = SessionState::default();
        let guard = RouteGuard::new().with_requirement(AccessRequirement::roles(["editor"]));

        match guard.evaluate(&state, "/articles/42/edit") {
            RouteOutcome::RedirectToLogin { to, return_to } => {
                assert_eq!(to, "/login");
                assert_eq!(return_to, "/articles/42/edit");
            }
            other => panic!("expected login redirect, got {other:?}"),
        }
    }

    #[test]
    fn authenticated_only_route_renders_without_requirements() {
        let guard = RouteGuard::new();
        assert!(guard.evaluate(&editor_state(), "/dashboard").is_render());
    }

    #[test]
    fn existential_permission_match_renders() {
        let guard = RouteGuard::new().with_requirement(AccessRequirement::permissions([
            "article.write",
            "article.publish",
        ]));
        assert!(guard.evaluate(&editor_state(), "/articles").is_render());
    }

    #[test]
    fn universal_permission_requirement_denies_with_reason() {
        let guard = RouteGuard::new().with_requirement(
            AccessRequirement::permissions(["article.write", "article.publish"]).all_of(),
        );

        match guard.evaluate(&editor_state(), "/articles/publish") {
            RouteOutcome::Unauthorized { to, reason } => {
                assert_eq!(to, "/unauthorized");
                assert_eq!(
                    reason,
                    "Requires all of permissions: article.write, article.publish"
                );
            }
            other => panic!("expected unauthorized, got {other:?}"),
        }
    }

    #[test]
    fn custom_paths_flow_through_outcomes() {
        let guard = RouteGuard::new()
            .with_requirement(AccessRequirement::roles(["admin"]))
            .with_fallback("/signin")
            .with_unauthorized_path("/denied");

        let anonymous = guard.evaluate(&SessionState::default(), "/admin");
        assert_eq!(anonymous.redirect_to(), Some("/signin"));

        let denied = guard.evaluate(&editor_state(), "/admin");
        assert_eq!(denied.redirect_to(), Some("/denied"));
    }
}
