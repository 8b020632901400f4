//! Sign-in, registration and sign-out sequences.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::SessionContext;
use crate::api::ApiClient;
use crate::cache::{DraftCache, REGISTRATION_DRAFT_KEY};
use crate::models::{RegistrationRequest, Role, UserProfile};

/// Registration form state kept between runs. The password is never
/// part of the draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Option<Role>,
}

impl RegistrationDraft {
    pub fn is_complete(&self) -> bool {
        !self.first_name.trim().is_empty()
            && !self.last_name.trim().is_empty()
            && !self.email.trim().is_empty()
            && self.role.is_some()
    }

    pub fn into_request(self, password: String) -> Option<RegistrationRequest> {
        let role = self.role?;
        Some(RegistrationRequest {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            password,
            role,
        })
    }
}

/// Log in and start a session.
pub async fn sign_in(
    client: &ApiClient,
    session: &SessionContext,
    email: &str,
    password: &str,
) -> Result<UserProfile> {
    let issued = client.login(email, password).await?;
    session.login(&issued.access_token, &issued.refresh_token, issued.user.clone(), issued.expires_in)?;
    info!(role = %issued.user.role, "Signed in");
    Ok(issued.user)
}

/// Create the account, sign in with it, then drop the saved draft.
pub async fn register(
    client: &ApiClient,
    session: &SessionContext,
    drafts: Option<&DraftCache>,
    registration: RegistrationRequest,
) -> Result<UserProfile> {
    client.register(&registration).await?;
    let user = sign_in(client, session, &registration.email, &registration.password)
        .await
        .context("Account created but sign-in failed")?;

    if let Some(drafts) = drafts {
        if let Err(e) = drafts.clear(REGISTRATION_DRAFT_KEY) {
            warn!(error = %e, "Failed to clear registration draft");
        }
    }
    Ok(user)
}

/// Notify the server (best effort) and end the local session.
pub async fn sign_out(client: &ApiClient, session: &SessionContext) -> Result<()> {
    if session.is_authenticated() {
        if let Err(e) = client.logout().await {
            warn!(error = %e, "Server logout failed, clearing local session anyway");
        }
    }
    session.logout()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::StatusCode;

    use super::*;
    use crate::api::client::{LOGIN_PATH, LOGOUT_PATH, REGISTER_PATH};
    use crate::api::testing::MockTransport;
    use crate::api::ApiResponse;
    use crate::auth::{CredentialStore, MemoryCredentialStore};
    use crate::routes::{resolve, GuardDecision, Navigator};

    fn auth_server() -> MockTransport {
        MockTransport::new(|req| match req.path.as_str() {
            LOGIN_PATH => {
                let body = req.body.as_ref().expect("login body");
                if body["email"] == "a@b.com" && body["password"] == "secret123" {
                    ApiResponse::new(
                        StatusCode::OK,
                        r#"{"accessToken":"T1","refreshToken":"R1","expiresIn":3600,"user":{"role":"PATIENT","firstName":"Ann"}}"#,
                    )
                } else {
                    ApiResponse::new(StatusCode::UNAUTHORIZED, r#"{"message":"Invalid email or password"}"#)
                }
            }
            REGISTER_PATH => ApiResponse::new(StatusCode::CREATED, r#"{"success":true}"#),
            LOGOUT_PATH => ApiResponse::new(StatusCode::NO_CONTENT, ""),
            _ => ApiResponse::new(StatusCode::NOT_FOUND, ""),
        })
    }

    fn setup(transport: Arc<MockTransport>) -> (ApiClient, Arc<SessionContext>, Arc<MemoryCredentialStore>) {
        let store = Arc::new(MemoryCredentialStore::new());
        let session = Arc::new(SessionContext::new(store.clone()));
        let client = ApiClient::with_session(transport, session.clone(), Navigator::detached());
        (client, session, store)
    }

    #[tokio::test]
    async fn test_patient_login_scenario() {
        let (client, session, _) = setup(Arc::new(auth_server()));
        let user = sign_in(&client, &session, "a@b.com", "secret123").await.unwrap();

        assert_eq!(user.role, Role::Patient);
        assert!(session.is_authenticated());
        assert_eq!(session.role(), Some(Role::Patient));
        assert_eq!(resolve("/patient", &session), GuardDecision::Admit);
        assert_eq!(resolve("/admin", &session), GuardDecision::Redirect("/patient".to_string()));
    }

    #[tokio::test]
    async fn test_failed_login_leaves_no_session() {
        let (client, session, store) = setup(Arc::new(auth_server()));
        assert!(sign_in(&client, &session, "a@b.com", "nope").await.is_err());
        assert!(!session.is_authenticated());
        assert!(store.read().is_empty());
    }

    #[tokio::test]
    async fn test_register_signs_in_and_clears_draft() {
        let transport = Arc::new(auth_server());
        let (client, session, _) = setup(transport.clone());
        let dir = tempfile::tempdir().unwrap();
        let drafts = DraftCache::new(dir.path(), "secret".to_string()).unwrap();

        let draft = RegistrationDraft {
            first_name: "Ann".to_string(),
            last_name: "Lee".to_string(),
            email: "a@b.com".to_string(),
            role: Some(Role::Patient),
        };
        drafts.save(REGISTRATION_DRAFT_KEY, &draft).unwrap();
        assert!(draft.is_complete());

        let request = draft.into_request("secret123".to_string()).unwrap();
        register(&client, &session, Some(&drafts), request).await.unwrap();

        assert!(session.is_authenticated());
        assert!(drafts.load::<RegistrationDraft>(REGISTRATION_DRAFT_KEY).is_none());
        let paths: Vec<String> = transport.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec![REGISTER_PATH.to_string(), LOGIN_PATH.to_string()]);
    }

    #[tokio::test]
    async fn test_sign_out_clears_even_if_server_fails() {
        let transport = Arc::new(MockTransport::new(|req| {
            if req.path == LOGOUT_PATH {
                ApiResponse::new(StatusCode::SERVICE_UNAVAILABLE, "")
            } else {
                ApiResponse::new(StatusCode::NOT_FOUND, "")
            }
        }));
        let (client, session, store) = setup(transport.clone());
        let user = UserProfile {
            id: None,
            first_name: "Ann".to_string(),
            last_name: String::new(),
            email: String::new(),
            role: Role::Doctor,
        };
        session.login("T1", "R1", user, 3600).unwrap();

        sign_out(&client, &session).await.unwrap();
        assert!(!session.is_authenticated());
        assert!(store.read().is_empty());
        assert_eq!(transport.requests()[0].bearer.as_deref(), Some("T1"));
    }

    #[test]
    fn test_incomplete_draft() {
        let draft = RegistrationDraft {
            first_name: "Ann".to_string(),
            ..Default::default()
        };
        assert!(!draft.is_complete());
        assert!(draft.into_request("pw".to_string()).is_none());
    }
}
