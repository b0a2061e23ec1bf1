use axum::{
    extract::Request,
    http::{HeaderMap, Method},
    middleware::{self, Next},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::auth::require_session;

use super::collect::collect_page_view;
use super::dashboard::{project_pages, project_series};
use super::handlers::{
    change_password, create_project, create_user, get_project, get_setting, health_check,
    list_projects, login, put_setting, update_project, AppState,
};

pub fn create_router(state: Arc<AppState>) -> Router {
    let sessions = state.sessions.clone();

    let private_routes = Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route(
            "/api/projects/{project_id}",
            get(get_project).put(update_project),
        )
        .route("/api/projects/{project_id}/views/series", get(project_series))
        .route("/api/projects/{project_id}/views/pages", get(project_pages))
        .route("/api/settings/{key}", get(get_setting).put(put_setting))
        .route("/api/users", post(create_user))
        .route("/api/users/me/password", post(change_password))
        .route_layer(middleware::from_fn(
            move |headers: HeaderMap, request: Request, next: Next| {
                let sessions = sessions.clone();
                require_session(sessions, headers, request, next)
            },
        ))
        .with_state(Arc::clone(&state));

    // The beacon is loaded from the tracked sites' origins, so it must
    // answer cross-origin requests
    let beacon_routes = Router::new()
        .route("/collect", get(collect_page_view))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        )
        .with_state(Arc::clone(&state));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/login", post(login))
        .with_state(state)
        .merge(beacon_routes)
        .merge(private_routes)
}
