//! Dashboard read endpoints: the chart series and the top-pages table

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::handlers::{internal_error, AppState};
use crate::analytics::{BarChart, DateRangeSelector, PaginatedPageRow, TimeSeriesPoint};

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct SeriesQuery {
    #[serde(default)]
    pub daterange: String,
}

#[derive(Debug, Serialize)]
pub struct SeriesResponse {
    /// Selector the query actually ran with, after fallback
    pub daterange: &'static str,
    pub total_views: i64,
    pub points: Vec<TimeSeriesPoint>,
    pub chart: BarChart,
}

pub async fn project_series(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Query(query): Query<SeriesQuery>,
) -> Response {
    let selector = DateRangeSelector::parse_or_default(&query.daterange);

    match state.series.counts_by_interval(&project_id, selector).await {
        Ok(points) => {
            let total_views = points.iter().map(|p| p.count).sum();
            let chart = BarChart::from_points(&points);
            Json(SeriesResponse {
                daterange: selector.token(),
                total_views,
                points,
                chart,
            })
            .into_response()
        }
        Err(err) => internal_error("Failed to retrieve page view counts", err),
    }
}

#[derive(Debug, Deserialize)]
pub struct PagesQuery {
    #[serde(default)]
    pub daterange: String,
    pub limit: Option<i64>,
    /// Kept as a string so garbage values default to 0 instead of rejecting
    /// the request
    pub offset: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PagesResponse {
    pub daterange: &'static str,
    pub rows: Vec<PaginatedPageRow>,
    pub pagination: Pagination,
}

/// Pagination state derived from one windowed query: no second count
/// round-trip.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total_rows: i64,
    /// 1-based ordinal of the first row on this page, 0 when empty
    pub page_start: i64,
    pub page_end: i64,
    /// Controls render only when there is more than one page
    pub show_controls: bool,
    pub prev_offset: Option<i64>,
    pub next_offset: Option<i64>,
}

pub async fn project_pages(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Query(query): Query<PagesQuery>,
) -> Response {
    let selector = DateRangeSelector::parse_or_default(&query.daterange);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = parse_offset(query.offset.as_deref());

    match state
        .top_pages
        .top_pages(&project_id, selector, limit, offset)
        .await
    {
        Ok(rows) => {
            let total = rows.first().map(|r| r.total_matching_rows).unwrap_or(0);
            let pagination = paginate(offset, limit, total, rows.len() as i64);
            Json(PagesResponse {
                daterange: selector.token(),
                rows,
                pagination,
            })
            .into_response()
        }
        Err(err) => internal_error("Failed to retrieve top pages", err),
    }
}

/// Invalid or negative offsets default to 0, mirroring the selector fallback
/// policy: pagination input never errors.
fn parse_offset(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(0)
        .max(0)
}

fn paginate(offset: i64, limit: i64, total: i64, returned: i64) -> Pagination {
    let show_controls = total > limit;
    Pagination {
        total_rows: total,
        page_start: if returned == 0 { 0 } else { offset + 1 },
        page_end: if returned == 0 { 0 } else { offset + returned },
        show_controls,
        prev_offset: (show_controls && offset > 0).then(|| (offset - limit).max(0)),
        next_offset: (show_controls && offset + limit < total).then_some(offset + limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_default_to_zero_on_garbage() {
        assert_eq!(parse_offset(None), 0);
        assert_eq!(parse_offset(Some("")), 0);
        assert_eq!(parse_offset(Some("abc")), 0);
        assert_eq!(parse_offset(Some("-5")), 0);
        assert_eq!(parse_offset(Some("30")), 30);
    }

    #[test]
    fn controls_hidden_when_everything_fits_on_one_page() {
        let p = paginate(0, 10, 8, 8);
        assert!(!p.show_controls);
        assert_eq!(p.prev_offset, None);
        assert_eq!(p.next_offset, None);
        assert_eq!(p.page_start, 1);
        assert_eq!(p.page_end, 8);
    }

    #[test]
    fn first_of_two_pages_links_forward_only() {
        let p = paginate(0, 10, 15, 10);
        assert!(p.show_controls);
        assert_eq!(p.prev_offset, None);
        assert_eq!(p.next_offset, Some(10));
    }

    #[test]
    fn last_page_links_backward_only() {
        let p = paginate(10, 10, 15, 5);
        assert!(p.show_controls);
        assert_eq!(p.prev_offset, Some(0));
        assert_eq!(p.next_offset, None);
        assert_eq!(p.page_start, 11);
        assert_eq!(p.page_end, 15);
    }

    #[test]
    fn empty_page_has_no_ordinals() {
        let p = paginate(40, 10, 0, 0);
        assert_eq!(p.page_start, 0);
        assert_eq!(p.page_end, 0);
        assert!(!p.show_controls);
    }
}
