use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;

use crate::analytics::daterange::BucketGranularity;
use crate::analytics::models::{BucketCount, NewPageView, PaginatedPageRow};
use crate::models::{ProjectRecord, SessionRecord, UserRecord};
use crate::storage::{Storage, StorageError, StorageResult};

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Append a page view with an explicit `received_at`. Backfill/seeding
    /// entry point; the serving path always goes through
    /// [`Storage::insert_page_view`].
    pub async fn insert_page_view_at(&self, view: &NewPageView, received_at: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pageviews (project_id, path, title, referrer, visitor_hash, user_agent, received_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&view.project_id)
        .bind(&view.path)
        .bind(&view.title)
        .bind(&view.referrer)
        .bind(&view.visitor_hash)
        .bind(&view.user_agent)
        .bind(received_at)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pageviews (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                project_id TEXT NOT NULL,
                path TEXT NOT NULL,
                title TEXT NOT NULL DEFAULT '',
                referrer TEXT NOT NULL DEFAULT '',
                visitor_hash TEXT NOT NULL DEFAULT '',
                user_agent TEXT NOT NULL DEFAULT '',
                received_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        // Both read queries filter on project + window
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_pageviews_project_received
             ON pageviews(project_id, received_at)",
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS projects (
                project_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                base_url TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                is_admin INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                session_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at)",
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn insert_page_view(&self, view: &NewPageView) -> Result<()> {
        self.insert_page_view_at(view, Utc::now().timestamp()).await
    }

    async fn page_view_counts(
        &self,
        project_id: &str,
        since: i64,
        granularity: BucketGranularity,
    ) -> Result<Vec<BucketCount>> {
        // Hour and day buckets truncate by integer division; months are not
        // fixed-width, so they go through STRFTIME
        let bucket_expr = match granularity {
            BucketGranularity::Hour => "(received_at / 3600) * 3600",
            BucketGranularity::Day => "(received_at / 86400) * 86400",
            BucketGranularity::Month => {
                "CAST(STRFTIME('%s', STRFTIME('%Y-%m-01 00:00:00', received_at, 'unixepoch')) AS INTEGER)"
            }
        };

        let query = format!(
            r#"
            SELECT
                {bucket_expr} AS bucket,
                COUNT(*) AS count
            FROM
                pageviews
            WHERE
                project_id = ?
                AND received_at >= ?
            GROUP BY
                bucket
            ORDER BY
                bucket
            "#
        );

        let rows = sqlx::query_as::<_, BucketCount>(&query)
            .bind(project_id)
            .bind(since)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows)
    }

    async fn top_pages(
        &self,
        project_id: &str,
        since: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PaginatedPageRow>> {
        let rows = sqlx::query_as::<_, PaginatedPageRow>(
            r#"
            SELECT
                path,
                MIN(title) AS title,
                COUNT(*) AS view_count,
                COUNT(*) OVER () AS total_matching_rows
            FROM
                pageviews
            WHERE
                project_id = ?
                AND received_at >= ?
            GROUP BY
                path
            ORDER BY
                view_count DESC,
                path ASC
            LIMIT ?
            OFFSET ?
            "#,
        )
        .bind(project_id)
        .bind(since)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }

    async fn create_project(
        &self,
        project_id: &str,
        name: &str,
        base_url: &str,
    ) -> StorageResult<ProjectRecord> {
        let now = Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO projects (project_id, name, base_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(project_id) DO NOTHING
            "#,
        )
        .bind(project_id)
        .bind(name)
        .bind(base_url)
        .bind(now)
        .bind(now)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        let project = sqlx::query_as::<_, ProjectRecord>(
            "SELECT project_id, name, base_url, created_at FROM projects WHERE project_id = ?",
        )
        .bind(project_id)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        Ok(project)
    }

    async fn update_project(
        &self,
        project_id: &str,
        name: &str,
        base_url: &str,
    ) -> Result<Option<ProjectRecord>> {
        let result = sqlx::query(
            r#"
            UPDATE projects
            SET name = ?, base_url = ?, updated_at = ?
            WHERE project_id = ?
            "#,
        )
        .bind(name)
        .bind(base_url)
        .bind(Utc::now().timestamp())
        .bind(project_id)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_project(project_id).await
    }

    async fn get_project(&self, project_id: &str) -> Result<Option<ProjectRecord>> {
        let project = sqlx::query_as::<_, ProjectRecord>(
            "SELECT project_id, name, base_url, created_at FROM projects WHERE project_id = ?",
        )
        .bind(project_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(project)
    }

    async fn list_projects(&self) -> Result<Vec<ProjectRecord>> {
        let projects = sqlx::query_as::<_, ProjectRecord>(
            "SELECT project_id, name, base_url, created_at FROM projects ORDER BY created_at DESC",
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(projects)
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(value)
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value)
            VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn has_users(&self) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count > 0)
    }

    async fn insert_user(
        &self,
        user_id: &str,
        email: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> StorageResult<UserRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (user_id, email, password_hash, is_admin, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(email) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(email)
        .bind(password_hash)
        .bind(is_admin)
        .bind(Utc::now().timestamp())
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        let user = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, password_hash, is_admin FROM users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, password_hash, is_admin FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, password_hash, is_admin FROM users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn update_password(&self, user_id: &str, password_hash: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE user_id = ?")
            .bind(password_hash)
            .bind(user_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_session(
        &self,
        session_id: &str,
        user_id: &str,
        expires_at: i64,
    ) -> Result<()> {
        sqlx::query("INSERT INTO sessions (session_id, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let session = sqlx::query_as::<_, SessionRecord>(
            "SELECT session_id, user_id, expires_at FROM sessions WHERE session_id = ?",
        )
        .bind(session_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(session)
    }

    async fn delete_expired_sessions(&self, now: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(now)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected())
    }
}
