//! User model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Role, UserId};

/// A person allowed to use the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: UserId,
    /// Display name.
    #[serde(default, alias = "nome")]
    pub name: String,
    /// Single role flag.
    #[serde(default, alias = "perfil")]
    pub role: Role,
    /// Fields not modelled here, kept so rewrites preserve them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Whether the user holds the admin role.
    #[inline]
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_legacy_user() {
        let json = r#"{"id": "u1", "nome": "Administrador", "perfil": "admin"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert!(user.is_admin());
    }

    #[test]
    fn role_defaults_to_member() {
        let user: User = serde_json::from_str(r#"{"id": "u2"}"#).unwrap();
        assert!(!user.is_admin());
    }
}
