//! Data models for TaskTrack entities.
//!
//! This module contains the data structures used to represent
//! tracker data including:
//!
//! - `Task`, `TaskStatus`, `NewTask`: tasks and their workflow state
//! - `Project`, `NewProject`: project grouping
//! - `ActivityLog`: the admin-only audit trail
//! - `TaskExport`: the due-soon/overdue/recently-completed report
//! - `UserProfile`: the signed-in user's identity record

pub mod activity;
pub mod project;
pub mod task;
pub mod user;

pub use activity::ActivityLog;
pub use project::{NewProject, Project};
pub use task::{NewTask, Task, TaskExport, TaskStatus};
pub use user::UserProfile;
