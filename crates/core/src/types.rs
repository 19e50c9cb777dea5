use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Role name that marks a user as an administrator
pub const ADMIN_ROLE: &str = "ADMIN";

/// A single named permission attached to a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A role carried by a user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

/// User profile as returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl UserInfo {
    /// Check whether the user carries the administrator role
    pub fn has_admin_role(&self) -> bool {
        self.roles.iter().any(|r| r.name == ADMIN_ROLE)
    }
}

/// An authenticated session owned by the client.
///
/// Created on login or refresh, mutated on every refresh, destroyed on logout
/// or an unrecoverable authentication failure. Field names follow the
/// persisted storage layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "token")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    /// Access token expiry as epoch milliseconds
    #[serde(rename = "expiresAt")]
    pub expires_at: i64,
    #[serde(default)]
    pub user: Option<UserInfo>,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
}

impl Session {
    /// Build a session from freshly issued tokens.
    ///
    /// `expires_in` is the token lifetime in seconds as reported by the
    /// backend; the admin flag is derived from the user's roles.
    pub fn from_tokens(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in: u64,
        user: Option<UserInfo>,
    ) -> Self {
        let expires_at = Utc::now().timestamp_millis() + (expires_in as i64) * 1000;
        let is_admin = user.as_ref().is_some_and(UserInfo::has_admin_role);
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
            user,
            is_admin,
        }
    }

    /// Check whether the access token has expired
    pub fn is_expired(&self) -> bool {
        self.expires_within(Duration::ZERO)
    }

    /// Check whether the access token expires within the given margin
    pub fn expires_within(&self, margin: Duration) -> bool {
        let now = Utc::now().timestamp_millis();
        now + margin.as_millis() as i64 >= self.expires_at
    }
}
