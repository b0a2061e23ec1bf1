//! The page-view beacon endpoint
//!
//! Sites embed a script that fires `GET /collect` on every page load. The
//! endpoint is public and CORS-open by necessity; the only failure surfaced
//! to the client is an unparseable path.

use axum::{
    extract::{ConnectInfo, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;

use super::handlers::{AppState, ErrorResponse};
use crate::analytics::{IngestError, RawPageView};

#[derive(Debug, Deserialize)]
pub struct CollectParams {
    #[serde(default)]
    pub project_id: String,
    /// Full URL or rootless path of the viewed page
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub referrer: String,
}

pub async fn collect_page_view(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CollectParams>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("")
        .to_string();

    let client_addr = addr.to_string();

    let raw = RawPageView {
        project_id: params.project_id,
        url: params.path,
        title: params.title,
        referrer: params.referrer,
        client_addr,
        user_agent,
    };

    match state.collector.record(raw).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(IngestError::InvalidPath(err)) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )
            .into_response(),
        Err(IngestError::Storage(err)) => {
            tracing::error!("Failed to record page view: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to record page view".to_string(),
                }),
            )
                .into_response()
        }
    }
}
