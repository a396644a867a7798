//! Authentication module for session, claims, and credential storage.
//!
//! This module provides:
//! - `SessionManager`: login, refresh, initialization, and logout
//! - `decode_claims`: local access-token claims inspection
//! - `TokenStore`: pluggable persistence for the credential pair
//!
//! The session is authenticated only while both tokens are stored; the
//! manager resolves one-sided states during initialization.

pub mod claims;
pub mod session;
pub mod store;

pub use claims::{decode_claims, DecodeError, DecodedClaims, Role};
pub use session::{AuthEvent, LoginError, Navigator, SessionManager, SessionState};
pub use store::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenKind, TokenStore};
