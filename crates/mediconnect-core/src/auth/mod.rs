//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `CredentialStore`: durable storage of tokens, profile and expiry
//!   (file, OS keychain, or in-memory backends)
//! - `SessionContext`: in-memory mirror with login/logout/update
//! - `flow`: sign-in, registration and sign-out sequences

pub mod credentials;
pub mod flow;
pub mod session;

pub use credentials::{
    CredentialRecord, CredentialStore, FileCredentialStore, KeychainCredentialStore,
    MemoryCredentialStore,
};
pub use session::{SessionContext, SessionData};
