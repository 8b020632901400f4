//! API client for the MediConnect REST API.
//!
//! Every resource call goes through `ApiClient::execute`, which attaches
//! the stored bearer token and, on a 401, performs at most one
//! refresh-and-replay before giving up.

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use super::refresh::RefreshCoordinator;
use super::transport::{ApiRequest, ApiResponse, Transport};
use super::ApiError;
use crate::auth::{CredentialStore, SessionContext};
use crate::models::{LoginRequest, LoginResponse, RegistrationRequest};
use crate::routes::Navigator;

// ============================================================================
// Constants
// ============================================================================

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Refresh-triggered replays allowed per logical request.
const MAX_REFRESH_RETRIES: u32 = 1;

/// API client for MediConnect.
/// Clone is cheap - all state is shared behind Arcs.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    refresher: Arc<RefreshCoordinator>,
}

impl ApiClient {
    /// Create a client that reads and refreshes credentials in `store`.
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn CredentialStore>, navigator: Navigator) -> Self {
        let refresher = RefreshCoordinator::new(transport.clone(), store.clone(), navigator, None);
        Self {
            transport,
            store,
            refresher: Arc::new(refresher),
        }
    }

    /// Create a client that also keeps `session` in step with refreshes and
    /// forced sign-outs.
    pub fn with_session(transport: Arc<dyn Transport>, session: Arc<SessionContext>, navigator: Navigator) -> Self {
        let store = session.store().clone();
        let refresher = RefreshCoordinator::new(transport.clone(), store.clone(), navigator, Some(session));
        Self {
            transport,
            store,
            refresher: Arc::new(refresher),
        }
    }

    /// Attach the stored access token, if any.
    pub fn authorize(&self, request: ApiRequest) -> ApiRequest {
        let token = self.store.read().access_token;
        request.with_bearer(token)
    }

    /// Send an authorized request, refreshing the token once on 401.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut attempt: u32 = 0;
        let mut outgoing = self.authorize(request);

        loop {
            debug!(method = %outgoing.method, path = %outgoing.path, attempt = attempt, "Sending request");
            let response = self.transport.send(&outgoing).await?;

            if response.status != StatusCode::UNAUTHORIZED {
                return Self::check_response(response);
            }

            if attempt >= MAX_REFRESH_RETRIES {
                warn!(path = %outgoing.path, "Still unauthorized after token refresh");
                self.refresher.expire_session();
                return Err(ApiError::Unauthorized);
            }

            attempt += 1;
            let token = self.refresher.refresh(outgoing.bearer.as_deref()).await?;
            outgoing = outgoing.with_bearer(Some(token));
        }
    }

    /// Send without bearer token or refresh handling (login, registration).
    async fn execute_public(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        debug!(method = %request.method, path = %request.path, "Sending public request");
        let response = self.transport.send(&request).await?;
        Self::check_response(response)
    }

    /// Check if response is successful, returning an error with body if not.
    fn check_response(response: ApiResponse) -> Result<ApiResponse, ApiError> {
        if response.is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_status(response.status, &response.body))
        }
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let mut request = ApiRequest::get(path);
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        let response = self
            .execute(request)
            .await
            .with_context(|| format!("Failed to send GET request to {}", path))?;
        response
            .json()
            .with_context(|| format!("Failed to parse JSON response from {}", path))
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .execute(ApiRequest::post(path).json(body)?)
            .await
            .with_context(|| format!("Failed to send POST request to {}", path))?;
        response
            .json()
            .with_context(|| format!("Failed to parse JSON response from {}", path))
    }

    pub(crate) async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .execute(ApiRequest::put(path).json(body)?)
            .await
            .with_context(|| format!("Failed to send PUT request to {}", path))?;
        response
            .json()
            .with_context(|| format!("Failed to parse JSON response from {}", path))
    }

    // ===== Authentication =====

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let request = ApiRequest::post(LOGIN_PATH).json(&LoginRequest { email, password })?;
        let response = self
            .execute_public(request)
            .await
            .context("Failed to send login request")?;
        response.json().context("Failed to parse login response")
    }

    pub async fn register(&self, registration: &RegistrationRequest) -> Result<()> {
        let request = ApiRequest::post(REGISTER_PATH).json(registration)?;
        self.execute_public(request)
            .await
            .context("Failed to send registration request")?;
        info!(role = %registration.role, "Account registered");
        Ok(())
    }

    /// Tell the server the session is over. Goes through refresh handling
    /// like any other authorized call.
    pub async fn logout(&self) -> Result<()> {
        self.execute(ApiRequest::post(LOGOUT_PATH))
            .await
            .context("Failed to send logout request")?;
        Ok(())
    }
}
