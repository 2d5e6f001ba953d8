use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::AuthError;

/// Roles recognized by the dashboard.
///
/// The auth backend sends `ROLE_*` strings; older deployments used the
/// lowercase Spanish labels, which are still accepted on the wire.
/// Closed enumeration: an unrecognized string never becomes a
/// capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ROLE_STUDENT")]
    Student,
    #[serde(rename = "ROLE_TEACHER")]
    Teacher,
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
}

impl Role {
    /// Parse a wire role name. Returns `None` for unknown strings.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "role_student" | "estudiante" => Some(Role::Student),
            "role_teacher" | "profesor" => Some(Role::Teacher),
            "role_admin" | "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "ROLE_STUDENT",
            Role::Teacher => "ROLE_TEACHER",
            Role::Admin => "ROLE_ADMIN",
        }
    }

    /// Human-facing label, as shown in the profile panel.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Student => "Estudiante",
            Role::Teacher => "Docente",
            Role::Admin => "Administrador",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of roles attached to a user.
///
/// Predicates are pure functions of the set, recomputed on every call;
/// role sets only change on a full re-login, so there is nothing to
/// cache.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    /// Build a set from wire role names. Unknown names are logged and
    /// skipped.
    pub fn from_wire(names: &[String]) -> Self {
        let mut set = BTreeSet::new();
        for name in names {
            match Role::from_wire(name) {
                Some(role) => {
                    set.insert(role);
                }
                None => {
                    tracing::warn!(role = %name, "ignoring unrecognized role from backend");
                }
            }
        }
        RoleSet(set)
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn contains_any(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| self.contains(*r))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }

    /// Admin is either the explicit `ROLE_ADMIN` or the legacy
    /// encoding of holding both student and teacher.
    pub fn is_admin(&self) -> bool {
        self.contains(Role::Admin) || (self.contains(Role::Student) && self.contains(Role::Teacher))
    }

    pub fn is_student(&self) -> bool {
        self.contains(Role::Student) && !self.is_admin()
    }

    pub fn is_teacher(&self) -> bool {
        self.contains(Role::Teacher) && !self.is_admin()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        RoleSet(iter.into_iter().collect())
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Role::as_str).collect();
        f.write_str(&names.join(", "))
    }
}

/// Immutable user snapshot received from the auth backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub email: String,
    pub roles: RoleSet,
}

impl User {
    /// Validate a wire user payload. A user without a usable role list
    /// cannot be gated anywhere in the dashboard, so it is rejected as
    /// malformed rather than admitted role-less.
    pub fn from_wire(
        username: String,
        email: String,
        roles: Option<Vec<String>>,
    ) -> Result<Self, AuthError> {
        let Some(names) = roles else {
            return Err(AuthError::MalformedResponse(
                "user payload has no roles list".into(),
            ));
        };
        let roles = RoleSet::from_wire(&names);
        if roles.is_empty() {
            return Err(AuthError::MalformedResponse(
                "user payload has an empty or unrecognized role list".into(),
            ));
        }
        Ok(User {
            username,
            email,
            roles,
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────
