//! Pure role/permission predicate evaluation over a user snapshot. Nothing
//! here suspends or touches I/O, so every function is safe to call at render
//! time. Comparisons are exact on normalized names; the super-admin bypass is
//! the one deliberate exception and matches case-insensitively across its
//! spelling variants.

use crate::types::User;
use serde::{Deserialize, Serialize};

/// Roles that satisfy every permission check unconditionally.
pub const SUPER_ADMIN_ROLES: [&str; 4] = ["super_admin", "super-admin", "superadmin", "administrator"];

/// True when any of the user's roles is a super-admin spelling variant.
#[must_use]
pub fn is_super_admin(user: Option<&User>) -> bool {
    let Some(user) = user else {
        return false;
    };
    user.role_names()
        .any(|name| SUPER_ADMIN_ROLES.contains(&name.to_lowercase().as_str()))
}

/// True when the user holds the named role.
#[must_use]
pub fn has_role(user: Option<&User>, role: &str) -> bool {
    let Some(user) = user else {
        return false;
    };
    user.role_names().any(|name| name == role)
}

/// True when the user holds at least one of the named roles. An empty list
/// is never satisfied.
#[must_use]
pub fn has_any_role<S: AsRef<str>>(user: Option<&User>, roles: &[S]) -> bool {
    !roles.is_empty() && roles.iter().any(|role| has_role(user, role.as_ref()))
}

/// True when the user holds every one of the named roles. An empty list is
/// never satisfied.
#[must_use]
pub fn has_all_roles<S: AsRef<str>>(user: Option<&User>, roles: &[S]) -> bool {
    !roles.is_empty() && roles.iter().all(|role| has_role(user, role.as_ref()))
}

/// True when the user holds the named permission, or is a super-admin.
#[must_use]
pub fn has_permission(user: Option<&User>, permission: &str) -> bool {
    if is_super_admin(user) {
        return true;
    }
    let Some(user) = user else {
        return false;
    };
    user.permission_names().any(|name| name == permission)
}

/// True when the user holds at least one of the named permissions, or is a
/// super-admin. An empty list is never satisfied.
#[must_use]
pub fn has_any_permission<S: AsRef<str>>(user: Option<&User>, permissions: &[S]) -> bool {
    if permissions.is_empty() {
        return false;
    }
    if is_super_admin(user) {
        return true;
    }
    permissions
        .iter()
        .any(|permission| has_permission(user, permission.as_ref()))
}

/// True when the user holds every one of the named permissions, or is a
/// super-admin. An empty list is never satisfied.
#[must_use]
pub fn has_all_permissions<S: AsRef<str>>(user: Option<&User>, permissions: &[S]) -> bool {
    if permissions.is_empty() {
        return false;
    }
    if is_super_admin(user) {
        return true;
    }
    permissions
        .iter()
        .all(|permission| has_permission(user, permission.as_ref()))
}

/// Role and permission requirement for a view or action.
///
/// `require_all: true` is universal quantification over each populated list;
/// `false` is existential. Both populated lists must pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequirement {
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub require_all: bool,
}

impl AccessRequirement {
    #[must_use]
    pub fn roles<S: Into<String>>(roles: impl IntoIterator<Item = S>) -> Self {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn permissions<S: Into<String>>(permissions: impl IntoIterator<Item = S>) -> Self {
        Self {
            permissions: permissions.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_roles<S: Into<String>>(mut self, roles: impl IntoIterator<Item = S>) -> Self {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn all_of(mut self) -> Self {
        self.require_all = true;
        self
    }

    /// True when neither list constrains access.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.permissions.is_empty()
    }
}

/// Outcome of evaluating an [`AccessRequirement`] against a user snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    Denied { reason: String },
}

impl AccessDecision {
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted)
    }

    /// Denial reason, when denied.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            AccessDecision::Granted => None,
            AccessDecision::Denied { reason } => Some(reason),
        }
    }
}

/// Evaluates a requirement against the snapshot. An empty requirement is
/// granted for any present user; callers gate anonymity separately.
#[must_use]
pub fn evaluate(user: Option<&User>, requirement: &AccessRequirement) -> AccessDecision {
    if user.is_none() && !requirement.is_empty() {
        return AccessDecision::Denied {
            reason: "Not authenticated.".to_string(),
        };
    }

    if !requirement.roles.is_empty() {
        let satisfied = if requirement.require_all {
            has_all_roles(user, &requirement.roles)
        } else {
            has_any_role(user, &requirement.roles)
        };
        if !satisfied {
            return AccessDecision::Denied {
                reason: denial_reason("roles", &requirement.roles, requirement.require_all),
            };
        }
    }

    if !requirement.permissions.is_empty() {
        let satisfied = if requirement.require_all {
            has_all_permissions(user, &requirement.permissions)
        } else {
            has_any_permission(user, &requirement.permissions)
        };
        if !satisfied {
            return AccessDecision::Denied {
                reason: denial_reason(
                    "permissions",
                    &requirement.permissions,
                    requirement.require_all,
                ),
            };
        }
    }

    AccessDecision::Granted
}

fn denial_reason(kind: &str, names: &[String], require_all: bool) -> String {
    let quantifier = if require_all { "all" } else { "one" };
    format!("Requires {quantifier} of {kind}: {}", names.join(", "))
}
