// Drafts can hold personal details, so they are encrypted at rest.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use argon2::Argon2;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use chrono::{DateTime, Utc};
use keyring::Entry;
use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

/// Fixed key for the in-progress registration form
pub const REGISTRATION_DRAFT_KEY: &str = "registration_form_cache";

/// Draft files live in their own subdirectory of the cache dir
const DRAFTS_DIR: &str = "drafts";
const DRAFT_EXTENSION: &str = "draft";

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

const KEYCHAIN_SERVICE: &str = "mediconnect";
const KEYCHAIN_ACCOUNT: &str = "draft-key";
const PASSPHRASE_LEN: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Includes clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}

#[derive(Debug, Clone)]
pub struct DraftInfo {
    pub key: String,
    pub saved_at: DateTime<Utc>,
}

/// Encrypted key/value store for partially completed forms.
///
/// Each draft is one file: `salt || nonce || ciphertext`, with the key
/// derived by Argon2 from the cache passphrase and the per-file salt.
/// Unreadable drafts are reported as absent.
pub struct DraftCache {
    dir: PathBuf,
    passphrase: String,
}

impl DraftCache {
    pub fn new(cache_dir: &Path, passphrase: String) -> Result<Self> {
        let dir = cache_dir.join(DRAFTS_DIR);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create drafts directory {}", dir.display()))?;
        Ok(Self { dir, passphrase })
    }

    /// Open the cache with the passphrase kept in the OS keychain,
    /// generating one on first use.
    pub fn with_keychain(cache_dir: &Path) -> Result<Self> {
        Self::new(cache_dir, keychain_passphrase()?)
    }

    fn draft_path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.{}", name, DRAFT_EXTENSION))
    }

    fn derive_key(&self, salt: &[u8]) -> Result<[u8; KEY_LEN]> {
        let mut key = [0u8; KEY_LEN];
        Argon2::default()
            .hash_password_into(self.passphrase.as_bytes(), salt, &mut key)
            .map_err(|e| anyhow!("Failed to derive draft key: {}", e))?;
        Ok(key)
    }

    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut rng = rand::thread_rng();
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut salt);
        rng.fill_bytes(&mut nonce);

        let key = self.derive_key(&salt)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| anyhow!("Failed to encrypt draft"))?;

        let mut sealed = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&salt);
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn open(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < SALT_LEN + NONCE_LEN {
            return Err(anyhow!("Draft file too short"));
        }
        let (salt, rest) = sealed.split_at(SALT_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
        let key = self.derive_key(salt)?;
        ChaCha20Poly1305::new(Key::from_slice(&key))
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| anyhow!("Failed to decrypt draft"))
    }

    fn read_entry<T: DeserializeOwned>(&self, path: &Path) -> Result<CachedData<T>> {
        let sealed = std::fs::read(path).context("Failed to read draft file")?;
        let plaintext = self.open(&sealed)?;
        serde_json::from_slice(&plaintext).context("Failed to parse draft")
    }

    pub fn save<T: Serialize>(&self, key: &str, data: &T) -> Result<()> {
        let plaintext = serde_json::to_vec(&CachedData::new(data))?;
        let sealed = self.seal(&plaintext)?;
        let path = self.draft_path(key);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, sealed).context("Failed to write draft file")?;
        std::fs::rename(&tmp, &path).context("Failed to replace draft file")?;
        debug!(key = key, "Draft saved");
        Ok(())
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<CachedData<T>> {
        let path = self.draft_path(key);
        if !path.exists() {
            return None;
        }
        match self.read_entry(&path) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(key = key, error = %e, "Ignoring unreadable draft");
                None
            }
        }
    }

    pub fn clear(&self, key: &str) -> Result<()> {
        let path = self.draft_path(key);
        if path.exists() {
            std::fs::remove_file(&path).context("Failed to remove draft file")?;
        }
        Ok(())
    }

    /// All readable drafts, oldest first
    pub fn list(&self) -> Result<Vec<DraftInfo>> {
        let mut drafts = Vec::new();
        for entry in std::fs::read_dir(&self.dir).context("Failed to list drafts")? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DRAFT_EXTENSION) {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            match self.read_entry::<serde_json::Value>(&path) {
                Ok(entry) => drafts.push(DraftInfo {
                    key,
                    saved_at: entry.cached_at,
                }),
                Err(e) => warn!(key = %key, error = %e, "Skipping unreadable draft"),
            }
        }
        drafts.sort_by_key(|d| d.saved_at);
        Ok(drafts)
    }
}

/// Fetch the draft passphrase from the OS keychain, creating it if missing.
pub fn keychain_passphrase() -> Result<String> {
    let entry = Entry::new(KEYCHAIN_SERVICE, KEYCHAIN_ACCOUNT)
        .context("Failed to create keyring entry")?;
    match entry.get_password() {
        Ok(passphrase) => Ok(passphrase),
        Err(keyring::Error::NoEntry) => {
            let passphrase: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(PASSPHRASE_LEN)
                .map(char::from)
                .collect();
            entry
                .set_password(&passphrase)
                .context("Failed to store draft key in keychain")?;
            Ok(passphrase)
        }
        Err(e) => Err(e).context("Failed to retrieve draft key from keychain"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Form {
        first_name: String,
        step: u8,
    }

    fn form() -> Form {
        Form {
            first_name: "Ann".to_string(),
            step: 1,
        }
    }

    #[test]
    fn test_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DraftCache::new(dir.path(), "secret".to_string()).unwrap();
        assert!(cache.load::<Form>(REGISTRATION_DRAFT_KEY).is_none());

        cache.save(REGISTRATION_DRAFT_KEY, &form()).unwrap();
        let loaded = cache.load::<Form>(REGISTRATION_DRAFT_KEY).unwrap();
        assert_eq!(loaded.data, form());
        assert_eq!(loaded.age_display(), "just now");

        cache.clear(REGISTRATION_DRAFT_KEY).unwrap();
        assert!(cache.load::<Form>(REGISTRATION_DRAFT_KEY).is_none());
    }

    #[test]
    fn test_drafts_are_not_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DraftCache::new(dir.path(), "secret".to_string()).unwrap();
        cache.save("form", &form()).unwrap();
        let raw = std::fs::read(cache.draft_path("form")).unwrap();
        assert!(!String::from_utf8_lossy(&raw).contains("Ann"));
    }

    #[test]
    fn test_wrong_passphrase_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        DraftCache::new(dir.path(), "secret".to_string())
            .unwrap()
            .save("form", &form())
            .unwrap();

        let other = DraftCache::new(dir.path(), "different".to_string()).unwrap();
        assert!(other.load::<Form>("form").is_none());
        assert!(other.list().unwrap().is_empty());
    }

    #[test]
    fn test_truncated_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DraftCache::new(dir.path(), "secret".to_string()).unwrap();
        std::fs::write(cache.draft_path("form"), b"short").unwrap();
        assert!(cache.load::<Form>("form").is_none());
    }

    #[test]
    fn test_list_drafts() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DraftCache::new(dir.path(), "secret".to_string()).unwrap();
        cache.save("a", &form()).unwrap();
        cache.save("b/c", &form()).unwrap();
        let keys: Vec<String> = cache.list().unwrap().into_iter().map(|d| d.key).collect();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&"a".to_string()));
        assert!(keys.contains(&"b_c".to_string()));
    }

    #[test]
    fn test_age_display() {
        let mut cached = CachedData::new(1);
        cached.cached_at = Utc::now() - Duration::minutes(5);
        assert_eq!(cached.age_display(), "5m ago");
        cached.cached_at = Utc::now() - Duration::minutes(125);
        assert_eq!(cached.age_display(), "2h ago");
        cached.cached_at = Utc::now() - Duration::days(3);
        assert_eq!(cached.age_display(), "3d ago");
        cached.cached_at = Utc::now() + Duration::minutes(10);
        assert_eq!(cached.age_display(), "just now");
    }
}
