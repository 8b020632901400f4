//! Access-token refresh with single-flight coordination.
//!
//! Concurrent requests that hit a 401 share one refresh exchange: the first
//! caller starts it, later callers await the same shared future. The
//! outcome (store update, or sign-out and redirect) is applied once by the
//! flight itself, not by each waiter.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::transport::{ApiRequest, Transport};
use super::{ApiError, RefreshError};
use crate::auth::credentials::{expiry_from_now, CredentialStore};
use crate::auth::SessionContext;
use crate::models::{RefreshRequest, RefreshResponse};
use crate::routes::Navigator;

pub const REFRESH_PATH: &str = "/auth/refresh";

type RefreshFlight = Shared<BoxFuture<'static, Result<String, RefreshError>>>;

pub struct RefreshCoordinator {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    navigator: Navigator,
    session: Option<Arc<SessionContext>>,
    inflight: Mutex<Option<RefreshFlight>>,
}

impl RefreshCoordinator {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
        navigator: Navigator,
        session: Option<Arc<SessionContext>>,
    ) -> Self {
        Self {
            transport,
            store,
            navigator,
            session,
            inflight: Mutex::new(None),
        }
    }

    /// Obtain a usable access token after `failed_token` was rejected.
    ///
    /// If the store already holds a different token, another request has
    /// refreshed in the meantime and that token is returned without an
    /// exchange.
    pub async fn refresh(&self, failed_token: Option<&str>) -> Result<String, ApiError> {
        let record = self.store.read();
        if let Some(current) = record.access_token.as_deref() {
            if failed_token != Some(current) {
                debug!("Access token already replaced, reusing it");
                return Ok(current.to_string());
            }
        }

        let Some(refresh_token) = record.refresh_token else {
            warn!("No refresh token available, redirecting to login");
            self.navigator.redirect_to_login();
            return Err(ApiError::SessionExpired);
        };

        let flight = {
            let mut slot = self.inflight.lock().await;
            // A finished flight left behind by cancelled waiters is stale.
            match slot.as_ref().filter(|existing| existing.peek().is_none()) {
                Some(existing) => {
                    debug!("Joining in-flight token refresh");
                    existing.clone()
                }
                None => {
                    let started = self.start(refresh_token).boxed().shared();
                    *slot = Some(started.clone());
                    started
                }
            }
        };

        let result = flight.clone().await;

        let mut slot = self.inflight.lock().await;
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&flight)) {
            *slot = None;
        }

        result.map_err(ApiError::from)
    }

    /// Sign out locally and send the user to the login screen.
    pub fn expire_session(&self) {
        expire(self.store.as_ref(), self.session.as_deref(), &self.navigator);
    }

    fn start(&self, refresh_token: String) -> impl std::future::Future<Output = Result<String, RefreshError>> + Send + 'static {
        let transport = self.transport.clone();
        let store = self.store.clone();
        let navigator = self.navigator.clone();
        let session = self.session.clone();

        async move {
            debug!("Exchanging refresh token");
            match exchange(transport.as_ref(), &refresh_token).await {
                Ok(issued) => {
                    let expiry = expiry_from_now(issued.expires_in);
                    match store.write_tokens(&issued.access_token, issued.refresh_token.as_deref(), expiry) {
                        Ok(()) => {
                            if let Some(ref session) = session {
                                session.apply_refresh(&issued.access_token, issued.refresh_token.as_deref(), expiry);
                            }
                        }
                        // The mirror keeps following the store; the new token is still used for the replay.
                        Err(e) => warn!(error = %e, "Failed to persist refreshed token"),
                    }
                    info!("Access token refreshed");
                    Ok(issued.access_token)
                }
                Err(e) => {
                    warn!(error = %e, "Token refresh failed, signing out");
                    expire(store.as_ref(), session.as_deref(), &navigator);
                    Err(e)
                }
            }
        }
    }
}

fn expire(store: &dyn CredentialStore, session: Option<&SessionContext>, navigator: &Navigator) {
    if let Err(e) = store.clear() {
        warn!(error = %e, "Failed to clear stored credentials");
    }
    if let Some(session) = session {
        session.reset();
    }
    navigator.redirect_to_login();
}

/// Trade a refresh token for a new access token. Sent without a bearer.
async fn exchange(transport: &dyn Transport, refresh_token: &str) -> Result<RefreshResponse, RefreshError> {
    let request = ApiRequest::post(REFRESH_PATH)
        .json(&RefreshRequest { refresh_token })
        .map_err(|e| RefreshError::Malformed(e.to_string()))?;

    let response = transport
        .send(&request)
        .await
        .map_err(|e| RefreshError::Transport(e.to_string()))?;

    if !response.is_success() {
        return Err(RefreshError::Rejected {
            status: response.status.as_u16(),
            message: ApiError::server_message(&response.body),
        });
    }

    response
        .json::<RefreshResponse>()
        .map_err(|e| RefreshError::Malformed(e.to_string()))
}
