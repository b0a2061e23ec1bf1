pub mod password;
pub mod session;

pub use session::{SessionService, SESSION_COOKIE};

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Session-cookie gate for the private API routes.
///
/// While no user accounts exist the gate is open, so the first-run onboarding
/// flow can create the initial admin account.
pub async fn require_session(
    sessions: SessionService,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    match sessions.first_run().await {
        Ok(true) => return next.run(request).await,
        Ok(false) => {}
        Err(err) => {
            tracing::error!(error = %err, "error checking for existing users");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "storage failure" })),
            )
                .into_response();
        }
    }

    let Some(session_id) = SessionService::session_id_from(&headers) else {
        return unauthorized();
    };

    if sessions.is_valid(&session_id).await {
        next.run(request).await
    } else {
        unauthorized()
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "authentication required" })),
    )
        .into_response()
}
