//! REST API client module for the TaskTrack backend.
//!
//! This module provides the `ApiClient` for communicating with the
//! backend's task, project, activity log, and user endpoints.
//!
//! The API uses JWT bearer token authentication; an expired token is
//! refreshed transparently (once) before the caller sees a failure.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
