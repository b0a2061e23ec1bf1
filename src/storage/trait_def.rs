use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::analytics::daterange::BucketGranularity;
use crate::analytics::models::{BucketCount, NewPageView, PaginatedPageRow};
use crate::models::{ProjectRecord, SessionRecord, UserRecord};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record already exists")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage access abstraction injected into every component at construction
/// time. Also what tests substitute with an in-memory SQLite pool.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables, indexes)
    async fn init(&self) -> Result<()>;

    // -- page views -------------------------------------------------------

    /// Append one page view row; `received_at` is assigned here, at the
    /// moment of the write
    async fn insert_page_view(&self, view: &NewPageView) -> Result<()>;

    /// Views per bucket for a project, `received_at >= since`, grouped by
    /// the granularity's truncation and ordered chronologically. Buckets
    /// with no rows are absent
    async fn page_view_counts(
        &self,
        project_id: &str,
        since: i64,
        granularity: BucketGranularity,
    ) -> Result<Vec<BucketCount>>;

    /// One page of paths ranked by view count (desc, then path asc), with
    /// the windowed total of matching paths on every row
    async fn top_pages(
        &self,
        project_id: &str,
        since: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PaginatedPageRow>>;

    // -- projects ---------------------------------------------------------

    async fn create_project(
        &self,
        project_id: &str,
        name: &str,
        base_url: &str,
    ) -> StorageResult<ProjectRecord>;

    /// Returns None when the project does not exist
    async fn update_project(
        &self,
        project_id: &str,
        name: &str,
        base_url: &str,
    ) -> Result<Option<ProjectRecord>>;

    async fn get_project(&self, project_id: &str) -> Result<Option<ProjectRecord>>;

    /// All projects, newest first
    async fn list_projects(&self) -> Result<Vec<ProjectRecord>>;

    // -- settings ---------------------------------------------------------

    async fn get_setting(&self, key: &str) -> Result<Option<String>>;

    async fn set_setting(&self, key: &str, value: &str) -> Result<()>;

    // -- users ------------------------------------------------------------

    async fn has_users(&self) -> Result<bool>;

    /// Fails with [`StorageError::Conflict`] when the email is taken
    async fn insert_user(
        &self,
        user_id: &str,
        email: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> StorageResult<UserRecord>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>>;

    async fn update_password(&self, user_id: &str, password_hash: &str) -> Result<bool>;

    // -- sessions ---------------------------------------------------------

    async fn create_session(&self, session_id: &str, user_id: &str, expires_at: i64)
        -> Result<()>;

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>>;

    /// Delete sessions with `expires_at < now`; returns how many went away
    async fn delete_expired_sessions(&self, now: i64) -> Result<u64>;
}
