//! Console users as returned by the auth service.

use serde::{Deserialize, Serialize};

use super::UserId;

/// Role of a console user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Back-office administrator; may open the admin area.
    Admin,
    /// Regular staff account.
    Client,
}

impl Role {
    /// Wire value (`ADMIN` / `CLIENT`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Client => "CLIENT",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "CLIENT" => Ok(Self::Client),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// A user account, cached by the console for the current session.
///
/// The console never edits a user in place; admin actions replace the whole
/// record with the one the service returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub login: String,
    #[serde(default)]
    pub email: Option<String>,
    pub active: bool,
    pub role: Role,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_login: Option<String>,
}

impl User {
    /// Whether this user holds the administrator role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_from_auth_service_json() {
        let user: User = serde_json::from_str(
            r#"{"id":1,"login":"alice","role":"CLIENT","active":true}"#,
        )
        .unwrap();
        assert_eq!(user.login, "alice");
        assert_eq!(user.role, Role::Client);
        assert!(user.email.is_none());
        assert!(!user.is_admin());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("admin".parse::<Role>().is_err());
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
    }
}
