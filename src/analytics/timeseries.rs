//! Time-bucketed visit counts
//!
//! Groups stored page views into chronological buckets for the dashboard
//! chart. Buckets come back from storage already truncated and ordered by
//! their underlying timestamp; this layer attaches the display labels.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::analytics::daterange::DateRangeSelector;
use crate::analytics::models::TimeSeriesPoint;
use crate::storage::Storage;

pub struct TimeSeriesAggregator {
    storage: Arc<dyn Storage>,
}

impl TimeSeriesAggregator {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Count page views per bucket for `project_id` over the selector's
    /// lookback window.
    ///
    /// Points are ordered strictly chronologically by bucket start, not by
    /// label text. Buckets with no views are absent; callers building
    /// fixed-width charts must tolerate sparse series.
    pub async fn counts_by_interval(
        &self,
        project_id: &str,
        selector: DateRangeSelector,
    ) -> Result<Vec<TimeSeriesPoint>> {
        let range = selector.resolve(Utc::now());

        let buckets = self
            .storage
            .page_view_counts(project_id, range.start.timestamp(), range.granularity)
            .await
            .context("error retrieving page view counts")?;

        Ok(buckets
            .into_iter()
            .filter_map(|row| {
                DateTime::from_timestamp(row.bucket, 0).map(|start| TimeSeriesPoint {
                    label: range.granularity.label(start),
                    count: row.count,
                })
            })
            .collect())
    }
}
