//! MediConnect core library.
//!
//! Session-aware access to the MediConnect appointment-booking API:
//!
//! - `api`: request dispatch with bearer tokens and single-flight token refresh
//! - `auth`: credential storage, the session context, sign-in flows
//! - `routes`: route guards and declarative navigation commands
//! - `cache`: encrypted drafts of in-progress forms
//! - `config`: on-disk configuration
//! - `models`: API data types

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod routes;

pub use api::{ApiClient, ApiError, HttpTransport};
pub use auth::{CredentialStore, SessionContext};
pub use config::Config;
pub use routes::{GuardDecision, NavigationCommand, Navigator};
