//! Shared helpers for integration tests.

// Shared across test binaries; not every binary uses every helper
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::Value;
use tasktrack_client::auth::{MemoryTokenStore, Navigator, SessionManager};

/// Mint an unsigned JWT carrying the given payload. The client never
/// verifies signatures, so a placeholder signature segment is enough.
pub fn make_token(payload: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.sig", header, body)
}

/// Seconds since the Unix epoch, `delta` seconds from now
pub fn epoch_in(delta: i64) -> i64 {
    chrono::Utc::now().timestamp() + delta
}

/// Session manager talking to a mock server, backed by an in-memory store
pub fn session_for(server_url: &str) -> (Arc<SessionManager>, Arc<MemoryTokenStore>) {
    let store = Arc::new(MemoryTokenStore::new());
    let session = Arc::new(
        SessionManager::new(server_url, store.clone()).expect("failed to build session manager"),
    );
    (session, store)
}

/// Like [`session_for`], with a recording navigator attached
pub fn session_with_navigator(
    server_url: &str,
) -> (
    Arc<SessionManager>,
    Arc<MemoryTokenStore>,
    Arc<RecordingNavigator>,
) {
    let store = Arc::new(MemoryTokenStore::new());
    let navigator = Arc::new(RecordingNavigator::default());
    let session = Arc::new(
        SessionManager::new(server_url, store.clone())
            .expect("failed to build session manager")
            .with_navigator(navigator.clone()),
    );
    (session, store, navigator)
}

/// Counts login redirects instead of navigating anywhere.
#[derive(Default)]
pub struct RecordingNavigator {
    redirects: AtomicUsize,
}

impl RecordingNavigator {
    pub fn redirect_count(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Navigator for RecordingNavigator {
    fn redirect_to_login(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}
