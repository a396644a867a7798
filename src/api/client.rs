//! API client for the TaskTrack REST API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests. Every call attaches the stored bearer token; a 401 answer
//! triggers exactly one token refresh and one retry before the caller
//! sees anything. Typed helpers cover the task, project, activity log,
//! and user endpoints.

use std::sync::Arc;

use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::auth::claims::decode_claims;
use crate::auth::SessionManager;
use crate::models::{
    ActivityLog, NewProject, NewTask, Project, Task, TaskExport, TaskStatus, UserProfile,
};

use super::ApiError;

/// Authenticated API client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection
/// pooling, and the session manager is shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    session: Arc<SessionManager>,
}

impl ApiClient {
    /// Create a client sharing the session's connection pool
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self {
            client: session.http_client().clone(),
            session,
        }
    }

    /// The session manager backing this client
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    // ===== Request wrapper =====

    /// Perform an authenticated request against an API path.
    ///
    /// `path` is joined onto the configured base URL; absolute URLs pass
    /// through untouched. See [`Self::request_with`] for the full contract.
    pub async fn request(&self, method: Method, path: &str) -> Result<Response, ApiError> {
        self.request_with(method, path, HeaderMap::new(), None).await
    }

    /// Perform an authenticated request with extra headers and an optional
    /// JSON body.
    ///
    /// The stored access token is attached as a bearer header, overriding
    /// any caller-supplied Authorization. A token that decodes as already
    /// expired is refreshed before the call goes out; a 401 answer triggers
    /// exactly one refresh and one retry, and the retry's response is
    /// returned as-is even if it is another 401. When a needed refresh
    /// fails the session is torn down and the call fails with
    /// [`ApiError::AuthenticationFailed`].
    ///
    /// Fails with [`ApiError::NoCredential`], without any network call,
    /// when no access token is stored. All other statuses are returned
    /// unmodified for the caller to interpret.
    pub async fn request_with(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        body: Option<Value>,
    ) -> Result<Response, ApiError> {
        let access = self.session.access_token().ok_or(ApiError::NoCredential)?;

        // Refresh up front when the token is visibly expired. An undecodable
        // token still goes to the server, which stays the judge.
        let expired = match decode_claims(&access) {
            Ok(claims) => !claims.is_valid_now(),
            Err(_) => false,
        };
        let access = if expired {
            debug!(path, "Access token expired, refreshing before request");
            self.renew_or_teardown().await?
        } else {
            access
        };

        let url = self.resolve_url(path);
        let response = self
            .send_once(method.clone(), &url, &access, headers.clone(), body.as_ref())
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!(path, "Got 401, refreshing token and retrying");
        let access = self.renew_or_teardown().await?;

        // One retry only; its response is final
        self.send_once(method, &url, &access, headers, body.as_ref())
            .await
    }

    /// Run the refresh flow; when it fails, end the session and fail the
    /// call. The original 401 is never surfaced past this point.
    async fn renew_or_teardown(&self) -> Result<String, ApiError> {
        if self.session.refresh().await {
            if let Some(access) = self.session.access_token() {
                return Ok(access);
            }
        }
        self.session.teardown();
        Err(ApiError::AuthenticationFailed)
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        access: &str,
        mut headers: HeaderMap,
        body: Option<&Value>,
    ) -> Result<Response, ApiError> {
        // The builder appends same-name headers instead of replacing them;
        // drop any caller Authorization so the session token is the only
        // one sent
        headers.remove(AUTHORIZATION);
        let mut request = self
            .client
            .request(method, url)
            .headers(headers)
            .bearer_auth(access);
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Join a path onto the base URL; absolute URLs pass through
    fn resolve_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", self.session.base_url(), path)
        } else {
            format!("{}/{}", self.session.base_url(), path)
        }
    }

    // ===== Typed endpoints =====

    /// Fetch the signed-in user's profile
    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        self.get_json("/api/users/me/").await
    }

    /// List all projects visible to the user
    pub async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        let list: ListResponse<Project> = self.get_json("/api/projects/").await?;
        Ok(list.into_items())
    }

    /// Create a project
    pub async fn create_project(&self, draft: &NewProject) -> Result<Project, ApiError> {
        let body = serde_json::json!({
            "title": draft.title,
            "description": draft.description,
        });
        let response = self
            .request_with(Method::POST, "/api/projects/", HeaderMap::new(), Some(body))
            .await?;
        Self::parse_json(response).await
    }

    /// Delete a project
    pub async fn delete_project(&self, project_id: i64) -> Result<(), ApiError> {
        let response = self
            .request(Method::DELETE, &format!("/api/projects/{}/", project_id))
            .await?;
        Self::expect_success(response).await
    }

    /// List all tasks visible to the user
    pub async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        let list: ListResponse<Task> = self.get_json("/api/tasks/").await?;
        Ok(list.into_items())
    }

    /// Create a task
    pub async fn create_task(&self, draft: &NewTask) -> Result<Task, ApiError> {
        let body = serde_json::json!({
            "title": draft.title,
            "description": draft.description,
            "status": draft.status,
            "due_date": draft.due_date,
            "assigned_to": draft.assigned_to,
            "project": draft.project,
        });
        let response = self
            .request_with(Method::POST, "/api/tasks/", HeaderMap::new(), Some(body))
            .await?;
        Self::parse_json(response).await
    }

    /// Update just the workflow status of a task
    pub async fn update_task_status(
        &self,
        task_id: i64,
        status: TaskStatus,
    ) -> Result<Task, ApiError> {
        let body = serde_json::json!({ "status": status });
        let response = self
            .request_with(
                Method::PATCH,
                &format!("/api/tasks/{}/", task_id),
                HeaderMap::new(),
                Some(body),
            )
            .await?;
        Self::parse_json(response).await
    }

    /// Delete a task
    pub async fn delete_task(&self, task_id: i64) -> Result<(), ApiError> {
        let response = self
            .request(Method::DELETE, &format!("/api/tasks/{}/", task_id))
            .await?;
        Self::expect_success(response).await
    }

    /// List activity log entries. Admin-only server-side; contributors get
    /// an access-denied error.
    pub async fn list_activity_logs(&self) -> Result<Vec<ActivityLog>, ApiError> {
        let list: ListResponse<ActivityLog> = self.get_json("/api/activity-logs/").await?;
        Ok(list.into_items())
    }

    /// Fetch the task export report (due soon, overdue, recently completed)
    pub async fn export_tasks(&self) -> Result<TaskExport, ApiError> {
        self.get_json("/api/tasks/export/").await
    }

    // ===== Response plumbing =====

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.request(Method::GET, path).await?;
        Self::parse_json(response).await
    }

    async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_status(status, &text));
        }
        serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    async fn expect_success(response: Response) -> Result<(), ApiError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }
}

// Internal API response types for parsing

/// List endpoints answer either a bare array or a pagination envelope
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListResponse<T> {
    Paginated { results: Vec<T> },
    Plain(Vec<T>),
}

impl<T> ListResponse<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            ListResponse::Paginated { results } => results,
            ListResponse::Plain(items) => items,
        }
    }
}
