use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectRecord {
    pub project_id: String,
    pub name: String,
    pub base_url: String,
    pub created_at: i64,
}

/// Body for both project creation and update.
#[derive(Debug, Deserialize)]
pub struct ProjectInput {
    pub name: String,
    pub base_url: String,
}
