//! Data models for the analytics engine

use serde::{Deserialize, Serialize};

/// A page view accepted by the collector, ready to be persisted.
///
/// `received_at` is assigned by storage at write time; rows are immutable
/// once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPageView {
    /// Project the view belongs to
    pub project_id: String,

    /// Normalized URL path, always starting with "/"
    pub path: String,

    /// Document title, may be empty
    pub title: String,

    /// Referrer URL, may be empty
    pub referrer: String,

    /// Daily-rotating visitor fingerprint (64 hex chars), empty when
    /// visitor hashing is disabled
    pub visitor_hash: String,

    /// Raw user-agent string
    pub user_agent: String,
}

/// A stored page view row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PageViewRecord {
    pub id: i64,
    pub project_id: String,
    pub path: String,
    pub title: String,
    pub referrer: String,
    pub visitor_hash: String,
    pub user_agent: String,
    /// Server-assigned write time, UNIX seconds UTC
    pub received_at: i64,
}

/// Raw per-bucket count as returned by storage: the truncated bucket start
/// (UNIX seconds) and the number of views in it. Buckets with zero views are
/// never present.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BucketCount {
    pub bucket: i64,
    pub count: i64,
}

/// One labeled point of a chart series. Produced fresh per query, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSeriesPoint {
    pub label: String,
    pub count: i64,
}

/// One row of the ranked top-pages table.
///
/// `total_matching_rows` is the windowed count of all distinct paths matching
/// the query filter, repeated on every row so pagination links can be built
/// without a second query round-trip.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PaginatedPageRow {
    pub path: String,
    pub title: String,
    pub view_count: i64,
    pub total_matching_rows: i64,
}
