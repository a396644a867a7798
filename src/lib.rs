//! Client library for the TaskTrack API.
//!
//! Manages the access/refresh token pair for a signed-in user,
//! transparently renews expired access tokens (one refresh, one retry),
//! and exposes typed helpers for the task, project, activity log, and
//! user endpoints.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tasktrack_client::api::ApiClient;
//! use tasktrack_client::auth::{FileTokenStore, SessionManager};
//! use tasktrack_client::config::Config;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let store = Arc::new(FileTokenStore::new()?);
//! let session = Arc::new(SessionManager::from_config(&config, store)?);
//!
//! // Restore a previous session, or sign in fresh
//! if !session.initialize().await.is_authenticated() {
//!     session.login("alice", "s3cret").await?;
//! }
//!
//! let client = ApiClient::new(session);
//! for task in client.list_tasks().await? {
//!     println!("{} [{}]", task.title, task.status);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthEvent, Role, SessionManager, SessionState};
pub use config::Config;
