//! # Portiere (Console Session & Authorization Core)
//!
//! `portiere` is the session, CSRF-protection, and authorization core behind
//! the console web client. The console's pages are thin CRUD forms over a
//! remote API; everything security-relevant on the client side funnels
//! through this crate.
//!
//! ## CSRF (Double-Submit Cookie)
//!
//! The API requires the `XSRF-TOKEN` cookie echoed in the `X-XSRF-TOKEN`
//! header on mutating requests. [`CsrfClient`] negotiates the bootstrap call
//! that sets the cookie, always re-reads the token from the cookie store
//! (the server may rotate it on any response), and collapses concurrent
//! bootstraps into a single round-trip.
//!
//! ## Session Lifecycle
//!
//! [`SessionStore`] hydrates the current user once at startup, replaces the
//! snapshot wholesale on login/refresh, and clears it on logout even when
//! the server is unreachable. Transitions are serialized, never interleaved.
//! A mid-session 401 drops the store to anonymous, surfaces a one-shot
//! "session expired" notice, and redirects to the login route.
//!
//! ## Authorization
//!
//! [`authz`] evaluates role/permission predicates purely and synchronously,
//! so [`RouteGuard`] can gate rendering without suspending. Roles named
//! `super_admin`/`super-admin`/`superadmin`/`administrator` (any casing)
//! bypass every permission check. Server-authoritative permission checks
//! live on the store for gating actions rather than renders.
//!
//! Browser capabilities (cookie reads, navigation, notices) are injected
//! behind the traits in [`browser`], so the whole core runs under test
//! without a real browser.

pub mod authz;
pub mod browser;
pub mod config;
pub mod csrf;
pub mod errors;
pub mod guard;
pub mod session;
pub mod types;

pub use authz::{AccessDecision, AccessRequirement};
pub use config::ApiConfig;
pub use csrf::CsrfClient;
pub use errors::ApiError;
pub use guard::{RouteGuard, RouteOutcome};
pub use session::{SessionState, SessionStore};
pub use types::{Credentials, RegisterRequest, User};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
