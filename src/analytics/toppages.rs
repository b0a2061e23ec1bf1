//! Ranked top-pages queries
//!
//! Groups stored page views by path over a lookback window, ranks by view
//! count, and returns one page of rows. Every row carries the windowed total
//! of matching paths so callers can build pagination links from a single
//! query.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::analytics::daterange::DateRangeSelector;
use crate::analytics::models::PaginatedPageRow;
use crate::storage::Storage;

pub struct TopPagesPaginator {
    storage: Arc<dyn Storage>,
}

impl TopPagesPaginator {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// One page of top pages for `project_id` over the selector's window.
    ///
    /// Ordered by view count descending, then path ascending so equal counts
    /// have a stable order. Repeat views of one path all count; grouping is
    /// by path, not by visitor. An offset past the last row returns an empty
    /// page, not an error. Negative limits and offsets are clamped.
    pub async fn top_pages(
        &self,
        project_id: &str,
        selector: DateRangeSelector,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PaginatedPageRow>> {
        let range = selector.resolve(Utc::now());

        self.storage
            .top_pages(project_id, range.start.timestamp(), limit.max(1), offset.max(0))
            .await
            .context("error retrieving top pages")
    }
}
