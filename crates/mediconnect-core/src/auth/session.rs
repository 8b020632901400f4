//! In-memory session mirror of the credential store.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{info, warn};

use super::credentials::{expiry_from_now, CredentialRecord, CredentialStore};
use crate::models::{Role, UserProfile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionData {
    fn from_record(record: &CredentialRecord) -> Option<Self> {
        let access_token = record.access_token.clone()?;
        Some(Self {
            access_token,
            refresh_token: record.refresh_token.clone(),
            user: record.user.clone(),
            expires_at: record.expires_at(),
        })
    }

    /// Advisory only: the server's 401 decides actual expiry
    pub fn is_expired(&self) -> bool {
        self.expires_at.map(|at| Utc::now() > at).unwrap_or(false)
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> Option<i64> {
        self.expires_at
            .map(|at| (at - Utc::now()).num_minutes().max(0))
    }
}

/// UI-facing view of the current session.
///
/// Mutations go to the credential store first; the mirror is only updated
/// once the store has accepted the write.
pub struct SessionContext {
    store: Arc<dyn CredentialStore>,
    data: RwLock<Option<SessionData>>,
}

impl SessionContext {
    /// Create a context rehydrated from the store.
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        let context = Self {
            store,
            data: RwLock::new(None),
        };
        context.restore();
        context
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Re-synchronize the mirror from the store.
    pub fn restore(&self) -> bool {
        let restored = SessionData::from_record(&self.store.read());
        let found = restored.is_some();
        *self.data.write() = restored;
        found
    }

    pub fn login(
        &self,
        access_token: &str,
        refresh_token: &str,
        user: UserProfile,
        expires_in: i64,
    ) -> Result<()> {
        let record = CredentialRecord {
            access_token: Some(access_token.to_string()),
            refresh_token: Some(refresh_token.to_string()),
            user: Some(user),
            token_expiry: Some(expiry_from_now(expires_in)),
        };
        self.store.write(&record).context("Failed to persist session")?;
        info!(role = ?record.user.as_ref().map(|u| u.role), "Session started");
        *self.data.write() = SessionData::from_record(&record);
        Ok(())
    }

    /// Clear store and mirror. The mirror is cleared even if the store fails.
    pub fn logout(&self) -> Result<()> {
        *self.data.write() = None;
        info!("Session ended");
        self.store.clear().context("Failed to clear stored session")
    }

    /// Persist a new profile; tokens are left untouched.
    pub fn update_user(&self, user: UserProfile) -> Result<()> {
        self.store.write_user(&user).context("Failed to persist profile")?;
        if let Some(ref mut data) = *self.data.write() {
            data.user = Some(user);
        }
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.data.read().is_some()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.data.read().as_ref().and_then(|d| d.user.clone())
    }

    pub fn role(&self) -> Option<Role> {
        self.data.read().as_ref().and_then(|d| d.user.as_ref().map(|u| u.role))
    }

    pub fn snapshot(&self) -> Option<SessionData> {
        self.data.read().clone()
    }

    /// Mirror a token refresh already written to the store.
    pub(crate) fn apply_refresh(&self, access_token: &str, refresh_token: Option<&str>, token_expiry: i64) {
        if let Some(ref mut data) = *self.data.write() {
            data.access_token = access_token.to_string();
            if let Some(refresh) = refresh_token {
                data.refresh_token = Some(refresh.to_string());
            }
            data.expires_at = DateTime::<Utc>::from_timestamp_millis(token_expiry);
        } else {
            warn!("Token refreshed without an active session mirror; restoring");
            self.restore();
        }
    }

    /// Drop the mirror after the store has been cleared elsewhere.
    pub(crate) fn reset(&self) {
        *self.data.write() = None;
    }
}
