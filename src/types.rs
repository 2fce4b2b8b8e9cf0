//! Wire types for the session and authorization APIs. Role and permission
//! entries are heterogeneous on the wire (bare name or object), so every
//! comparison goes through the `name()` accessors here instead of matching on
//! the representation at call sites. Credential payloads carry the password
//! behind `SecretString` and must never be logged.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

/// Identity snapshot for the authenticated user.
///
/// Replaced wholesale on every refresh; membership is the only semantics of
/// the `roles` and `permissions` vectors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub roles: Vec<RoleEntry>,
    #[serde(default)]
    pub permissions: Vec<PermissionEntry>,
}

impl User {
    /// Display name, falling back to `"first last"` when the server omits
    /// `full_name`.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.full_name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("{} {}", self.first_name, self.last_name),
        }
    }

    pub(crate) fn role_names(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(RoleEntry::name)
    }

    pub(crate) fn permission_names(&self) -> impl Iterator<Item = &str> {
        self.permissions.iter().map(PermissionEntry::name)
    }
}

/// A role as delivered by the API: either a bare name or an object with a
/// `name` field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoleEntry {
    Name(String),
    Object(RoleObject),
}

impl RoleEntry {
    /// Normalized role name, regardless of wire representation.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            RoleEntry::Name(name) => name,
            RoleEntry::Object(object) => &object.name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoleObject {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

/// A permission as delivered by the API: bare name or object with a `name`
/// field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PermissionEntry {
    Name(String),
    Object(PermissionObject),
}

impl PermissionEntry {
    /// Normalized permission name, regardless of wire representation.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            PermissionEntry::Name(name) => name,
            PermissionEntry::Object(object) => &object.name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PermissionObject {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

/// Login payload. The password is exposed only at the serialization boundary.
#[derive(Clone, Debug, Serialize)]
pub struct Credentials {
    pub email: String,
    #[serde(serialize_with = "serialize_secret")]
    pub password: SecretString,
    pub remember: bool,
}

impl Credentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
            remember: false,
        }
    }

    #[must_use]
    pub fn remember(mut self) -> Self {
        self.remember = true;
        self
    }
}

/// Registration payload mirroring the login shape.
#[derive(Clone, Debug, Serialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(serialize_with = "serialize_secret")]
    pub password: SecretString,
    #[serde(serialize_with = "serialize_secret")]
    pub password_confirmation: SecretString,
}

fn serialize_secret<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// `{ user }` envelope returned by the current-user, login, and register
/// endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserEnvelope {
    pub user: User,
}

#[derive(Clone, Debug, Serialize)]
pub struct PermissionCheckRequest<'a> {
    pub permission: &'a str,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionCheckResponse {
    pub has_permission: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionBatchRequest<'a> {
    pub permissions: &'a [String],
    pub require_all: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionBatchResponse {
    pub has_all_permissions: bool,
    pub has_any_permission: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_deserializes_mixed_role_representations() {
        let user: User = serde_json::from_value(json!({
            "id": 7,
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@example.com",
            "roles": ["editor", {"id": 3, "name": "reviewer"}],
            "permissions": [{"name": "article.write"}, "article.read"]
        }))
        .expect("Failed to deserialize");

        let roles: Vec<&str> = user.role_names().collect();
        assert_eq!(roles, vec!["editor", "reviewer"]);

        let permissions: Vec<&str> = user.permission_names().collect();
        assert_eq!(permissions, vec!["article.write", "article.read"]);
    }

    #[test]
    fn user_defaults_missing_collections() {
        let user: User = serde_json::from_value(json!({
            "id": 1,
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@example.com"
        }))
        .expect("Failed to deserialize");

        assert!(user.roles.is_empty());
        assert!(user.permissions.is_empty());
        assert_eq!(user.phone, None);
    }

    #[test]
    fn display_name_falls_back_to_first_last() {
        let mut user: User = serde_json::from_value(json!({
            "id": 1,
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@example.com"
        }))
        .expect("Failed to deserialize");

        assert_eq!(user.display_name(), "Ada Lovelace");

        user.full_name = Some("Countess Ada Lovelace".to_string());
        assert_eq!(user.display_name(), "Countess Ada Lovelace");
    }

    #[test]
    fn credentials_serialize_exposes_password_only_on_the_wire() {
        let credentials = Credentials::new("ada@example.com", "hunter2").remember();
        let value = serde_json::to_value(&credentials).expect("Failed to serialize");

        assert_eq!(value["email"], "ada@example.com");
        assert_eq!(value["password"], "hunter2");
        assert_eq!(value["remember"], true);

        // Debug output must stay redacted.
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn permission_batch_request_uses_camel_case() {
        let permissions = vec!["article.write".to_string()];
        let request = PermissionBatchRequest {
            permissions: &permissions,
            require_all: true,
        };
        let value = serde_json::to_value(&request).expect("Failed to serialize");

        assert_eq!(value["requireAll"], true);
        assert_eq!(value["permissions"][0], "article.write");
    }
}
