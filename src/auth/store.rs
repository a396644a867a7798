//! Credential storage backends.
//!
//! The session holds exactly two persisted values: the access token and the
//! refresh token. `TokenStore` abstracts where they live so hosts can pick
//! a backend:
//!
//! - `FileTokenStore`: JSON file in the cache directory (desktop default)
//! - `KeyringTokenStore`: OS keychain entries via keyring
//! - `MemoryTokenStore`: in-process map, for tests and custom hosts

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use keyring::Entry;
use parking_lot::Mutex;
use tracing::warn;

use crate::config::Config;

/// Keychain service name for `KeyringTokenStore` entries
const SERVICE_NAME: &str = "tasktrack";

/// Token file name for `FileTokenStore`
const TOKENS_FILE: &str = "tokens.json";

/// Which of the two session credentials a store operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    /// Storage key, shared across backends
    pub fn key(self) -> &'static str {
        match self {
            TokenKind::Access => "access_token",
            TokenKind::Refresh => "refresh_token",
        }
    }
}

/// Persistent key-value storage for the credential pair.
///
/// Operations are infallible by contract: a backend that hits a storage
/// error logs it and surfaces the value as absent on the next read. Last
/// write wins; callers that need the pair to stay consistent serialize
/// their writes.
pub trait TokenStore: Send + Sync {
    fn get(&self, kind: TokenKind) -> Option<String>;
    fn set(&self, kind: TokenKind, value: &str);
    fn clear(&self, kind: TokenKind);

    /// Remove both credentials
    fn clear_all(&self) {
        self.clear(TokenKind::Access);
        self.clear(TokenKind::Refresh);
    }
}

// ===== In-memory store =====

/// In-process store for tests and embedders that manage persistence
/// themselves.
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<&'static str, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, kind: TokenKind) -> Option<String> {
        self.tokens.lock().get(kind.key()).cloned()
    }

    fn set(&self, kind: TokenKind, value: &str) {
        self.tokens.lock().insert(kind.key(), value.to_string());
    }

    fn clear(&self, kind: TokenKind) {
        self.tokens.lock().remove(kind.key());
    }
}

// ===== File-backed store =====

/// JSON-file-backed store, the desktop default.
///
/// Both tokens live in `tokens.json` under the given directory. The file
/// is written with owner-only permissions on Unix.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store under the standard cache directory
    pub fn new() -> Result<Self> {
        Ok(Self::at(Config::cache_dir()?))
    }

    /// Store under a caller-chosen directory
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(TOKENS_FILE),
        }
    }

    fn read_map(&self) -> HashMap<String, String> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => HashMap::new(),
        }
    }

    fn write_map(&self, map: &HashMap<String, String>) {
        if let Err(e) = self.try_write_map(map) {
            warn!(error = %e, path = %self.path.display(), "Failed to persist tokens");
        }
    }

    fn try_write_map(&self, map: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create token directory")?;
        }
        let contents = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, contents).context("Failed to write token file")?;

        // Tokens grant account access; keep them out of reach of other users
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to restrict token file permissions")?;
        }

        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, kind: TokenKind) -> Option<String> {
        self.read_map().get(kind.key()).cloned()
    }

    fn set(&self, kind: TokenKind, value: &str) {
        let mut map = self.read_map();
        map.insert(kind.key().to_string(), value.to_string());
        self.write_map(&map);
    }

    fn clear(&self, kind: TokenKind) {
        let mut map = self.read_map();
        if map.remove(kind.key()).is_some() {
            self.write_map(&map);
        }
    }
}

// ===== Keychain store =====

/// OS keychain store via the `keyring` crate.
///
/// Each credential is a separate keychain entry under the `tasktrack`
/// service. Keychain failures degrade to an absent value.
pub struct KeyringTokenStore {
    service: String,
}

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    /// Use a custom keychain service name (for side-by-side installs)
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, kind: TokenKind) -> Option<Entry> {
        match Entry::new(&self.service, kind.key()) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Failed to create keyring entry");
                None
            }
        }
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeyringTokenStore {
    fn get(&self, kind: TokenKind) -> Option<String> {
        self.entry(kind)?.get_password().ok()
    }

    fn set(&self, kind: TokenKind, value: &str) {
        if let Some(entry) = self.entry(kind) {
            if let Err(e) = entry.set_password(value) {
                warn!(error = %e, "Failed to store token in keychain");
            }
        }
    }

    fn clear(&self, kind: TokenKind) {
        if let Some(entry) = self.entry(kind) {
            // A missing entry already satisfies a clear
            if let Err(e) = entry.delete_credential() {
                if !matches!(e, keyring::Error::NoEntry) {
                    warn!(error = %e, "Failed to delete token from keychain");
                }
            }
        }
    }
}
