use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Account role, as issued by the auth service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Doctor,
    Patient,
}

impl Role {
    /// Landing area for a signed-in user with this role.
    pub fn landing_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin",
            Role::Doctor => "/doctor",
            Role::Patient => "/patient",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Doctor => "DOCTOR",
            Role::Patient => "PATIENT",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "DOCTOR" => Ok(Role::Doctor),
            "PATIENT" => Ok(Role::Patient),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// The signed-in user's profile.
/// Only `role` is guaranteed; the auth service omits fields it does not know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_in: i64,
    /// Present when the server rotates refresh tokens
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_landing_paths() {
        assert_eq!(Role::Admin.landing_path(), "/admin");
        assert_eq!(Role::Doctor.landing_path(), "/doctor");
        assert_eq!(Role::Patient.landing_path(), "/patient");
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("patient".parse::<Role>(), Ok(Role::Patient));
        assert_eq!(" DOCTOR ".parse::<Role>(), Ok(Role::Doctor));
        assert!("nurse".parse::<Role>().is_err());
    }

    #[test]
    fn test_parse_login_response_with_partial_user() {
        let json = r#"{"accessToken":"T1","refreshToken":"R1","expiresIn":3600,"user":{"role":"PATIENT","firstName":"Ann"}}"#;
        let resp: LoginResponse = serde_json::from_str(json).expect("Failed to parse login JSON");
        assert_eq!(resp.access_token, "T1");
        assert_eq!(resp.refresh_token, "R1");
        assert_eq!(resp.expires_in, 3600);
        assert_eq!(resp.user.role, Role::Patient);
        assert_eq!(resp.user.first_name, "Ann");
        assert_eq!(resp.user.full_name(), "Ann");
        assert!(resp.user.id.is_none());
    }

    #[test]
    fn test_refresh_response_rotation_optional() {
        let plain: RefreshResponse = serde_json::from_str(r#"{"accessToken":"T2","expiresIn":60}"#).unwrap();
        assert!(plain.refresh_token.is_none());

        let rotated: RefreshResponse =
            serde_json::from_str(r#"{"accessToken":"T2","expiresIn":60,"refreshToken":"R2"}"#).unwrap();
        assert_eq!(rotated.refresh_token.as_deref(), Some("R2"));
    }
}
