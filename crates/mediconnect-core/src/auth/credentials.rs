//! Durable storage for the current session's credentials.
//!
//! A `CredentialRecord` holds the four persisted fields (access token,
//! refresh token, user profile, token expiry in epoch milliseconds). Every
//! write replaces the whole record, so readers never observe a token from
//! one write paired with an expiry from another.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use keyring::Entry;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::UserProfile;

/// Keychain service name
const SERVICE_NAME: &str = "mediconnect";

/// Keychain account holding the serialized credential record
const SESSION_ACCOUNT: &str = "session";

/// Credentials file name in cache directory
const CREDENTIALS_FILE: &str = "credentials.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
    /// Epoch milliseconds
    pub token_expiry: Option<i64>,
}

impl CredentialRecord {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none()
            && self.refresh_token.is_none()
            && self.user.is_none()
            && self.token_expiry.is_none()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.token_expiry.and_then(DateTime::<Utc>::from_timestamp_millis)
    }
}

/// Absolute expiry for a token issued now with the given lifetime.
pub fn expiry_from_now(expires_in_secs: i64) -> i64 {
    (Utc::now() + Duration::seconds(expires_in_secs)).timestamp_millis()
}

/// The single durable owner of session credentials.
///
/// `read` never fails: an unavailable or corrupt backend reads as empty.
pub trait CredentialStore: Send + Sync {
    fn read(&self) -> CredentialRecord;

    /// Replace the stored record as a whole.
    fn write(&self, record: &CredentialRecord) -> Result<()>;

    fn clear(&self) -> Result<()>;

    /// Store a freshly issued access token (and rotated refresh token, if any).
    fn write_tokens(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        token_expiry: i64,
    ) -> Result<()> {
        let mut record = self.read();
        record.access_token = Some(access_token.to_string());
        if let Some(refresh) = refresh_token {
            record.refresh_token = Some(refresh.to_string());
        }
        record.token_expiry = Some(token_expiry);
        self.write(&record)
    }

    /// Store a new profile, leaving tokens untouched.
    fn write_user(&self, user: &UserProfile) -> Result<()> {
        let mut record = self.read();
        record.user = Some(user.clone());
        self.write(&record)
    }
}

/// JSON file in the cache directory, replaced atomically on every write.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            path: cache_dir.join(CREDENTIALS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Option<CredentialRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read credentials file")?;
        let record = serde_json::from_str(&contents)
            .context("Failed to parse credentials file")?;
        Ok(Some(record))
    }
}

impl CredentialStore for FileCredentialStore {
    fn read(&self) -> CredentialRecord {
        match self.load() {
            Ok(record) => record.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable credentials file");
                CredentialRecord::default()
            }
        }
    }

    fn write(&self, record: &CredentialRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(record)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).context("Failed to write credentials file")?;
        restrict_permissions(&tmp)?;
        std::fs::rename(&tmp, &self.path).context("Failed to replace credentials file")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove credentials file")?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// The whole record as one OS keychain secret.
pub struct KeychainCredentialStore {
    account: String,
}

impl KeychainCredentialStore {
    pub fn new() -> Self {
        Self::with_account(SESSION_ACCOUNT)
    }

    pub fn with_account(account: &str) -> Self {
        Self {
            account: account.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.account).context("Failed to create keyring entry")
    }
}

impl Default for KeychainCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeychainCredentialStore {
    fn read(&self) -> CredentialRecord {
        let secret = match self.entry().and_then(|e| {
            e.get_password()
                .context("Failed to retrieve session from keychain")
        }) {
            Ok(secret) => secret,
            Err(_) => return CredentialRecord::default(),
        };
        serde_json::from_str(&secret).unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring corrupt keychain session");
            CredentialRecord::default()
        })
    }

    fn write(&self, record: &CredentialRecord) -> Result<()> {
        let secret = serde_json::to_string(record)?;
        self.entry()?
            .set_password(&secret)
            .context("Failed to store session in keychain")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete session from keychain"),
        }
    }
}

/// Process-local store, used in tests and for throwaway sessions.
#[derive(Default)]
pub struct MemoryCredentialStore {
    record: RwLock<CredentialRecord>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: CredentialRecord) -> Self {
        Self {
            record: RwLock::new(record),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn read(&self) -> CredentialRecord {
        self.record.read().clone()
    }

    fn write(&self, record: &CredentialRecord) -> Result<()> {
        *self.record.write() = record.clone();
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.record.write() = CredentialRecord::default();
        Ok(())
    }
}
