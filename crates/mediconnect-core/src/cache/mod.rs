//! Local caching of in-progress form drafts.
//!
//! This module provides the `DraftCache` for storing partially completed
//! forms (the registration wizard) so they survive a restart. Drafts are
//! encrypted at rest and stamped with their save time.

pub mod drafts;

pub use drafts::{CachedData, DraftCache, DraftInfo, REGISTRATION_DRAFT_KEY};
