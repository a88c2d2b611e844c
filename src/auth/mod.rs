//! Authentication module for the local credential store and session state.
//!
//! This module provides:
//! - `CredentialStore`: two-tier persistence (OS keychain for secrets,
//!   plain files for the rest)
//! - `SessionManager`: the account session as one replaceable state value,
//!   with change events for subscribers
//!
//! Tokens are owned by the store; the session reads and clears them but
//! never caches a copy.

pub mod session;
pub mod store;

pub use session::{SessionEvent, SessionManager, SessionState};
pub use store::CredentialStore;
