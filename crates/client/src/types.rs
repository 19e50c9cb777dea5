//! Wire types for the Bookswap REST API

use bookswap_core::UserInfo;
use serde::{Deserialize, Serialize};

/// Application-level success code used by every backend response
pub const SUCCESS_CODE: i32 = 1000;

/// API endpoint paths
pub mod paths {
    pub const TOKEN: &str = "/auth/token";
    pub const REFRESH: &str = "/auth/refresh";
    pub const LOGOUT: &str = "/auth/logout";
    pub const MY_INFO: &str = "/users/my-info";

    /// Auth endpoints never carry a bearer header and their 401 responses
    /// are never retried.
    pub fn is_auth_endpoint(path: &str) -> bool {
        path.starts_with("/auth/")
    }
}

/// Standard response envelope wrapping every backend payload.
///
/// `code` is an application-level status; [`SUCCESS_CODE`] is the only
/// success value, regardless of the HTTP status.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    pub code: i32,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result: Option<T>,
}

/// Login request body for `POST /auth/token`
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Refresh request body for `POST /auth/refresh`.
///
/// Carries the refresh token in the body; the request itself is
/// unauthenticated.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest {
    pub token: String,
}

/// Logout request body for `POST /auth/logout`
#[derive(Debug, Clone, Serialize)]
pub struct LogoutRequest {
    pub token: String,
}

/// Token issuance result shared by login and refresh
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub user_info: Option<UserInfo>,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_endpoint_detection() {
        assert!(paths::is_auth_endpoint(paths::TOKEN));
        assert!(paths::is_auth_endpoint(paths::REFRESH));
        assert!(paths::is_auth_endpoint(paths::LOGOUT));
        assert!(!paths::is_auth_endpoint(paths::MY_INFO));
        assert!(!paths::is_auth_endpoint("/books"));
    }

    #[test]
    fn token_response_wire_format() {
        let json = serde_json::json!({
            "accessToken": "acc",
            "refreshToken": "ref",
            "authenticated": true,
            "userInfo": {
                "id": "u-1",
                "username": "reader",
                "roles": [{"name": "USER"}]
            },
            "expiresIn": 3600
        });
        let parsed: TokenResponse = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.access_token, "acc");
        assert!(parsed.authenticated);
        assert_eq!(parsed.user_info.unwrap().username, "reader");
        assert_eq!(parsed.expires_in, 3600);
    }

    #[test]
    fn envelope_tolerates_missing_result() {
        let json = serde_json::json!({"code": 1000, "message": "ok"});
        let parsed: ApiEnvelope<TokenResponse> = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.code, SUCCESS_CODE);
        assert!(parsed.result.is_none());
    }
}
