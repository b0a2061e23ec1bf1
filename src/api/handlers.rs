//! Projects, settings, users, and login handlers

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

use crate::analytics::{PageViewCollector, TimeSeriesAggregator, TopPagesPaginator};
use crate::auth::{password, SessionService};
use crate::models::{
    generate_id, ChangePasswordRequest, LoginRequest, NewUserRequest, ProjectInput, ProjectRecord,
};
use crate::storage::{Storage, StorageError};

pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub collector: PageViewCollector,
    pub series: TimeSeriesAggregator,
    pub top_pages: TopPagesPaginator,
    pub sessions: SessionService,
}

impl AppState {
    /// Wire every component to the same storage handle. Each component gets
    /// its own clone of the trait object rather than reaching for a global.
    pub fn new(storage: Arc<dyn Storage>, visitor_hashing: bool) -> Self {
        Self {
            collector: PageViewCollector::new(Arc::clone(&storage), visitor_hashing),
            series: TimeSeriesAggregator::new(Arc::clone(&storage)),
            top_pages: TopPagesPaginator::new(Arc::clone(&storage)),
            sessions: SessionService::new(Arc::clone(&storage)),
            storage,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

/// Log the failure with context and answer with a generic 500.
pub(crate) fn internal_error(context: &str, err: anyhow::Error) -> Response {
    tracing::error!("{}: {}", context, err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: context.to_string(),
        }),
    )
        .into_response()
}

/// Health check endpoint
pub async fn health_check() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: "OK".to_string(),
    })
}

// -- login ----------------------------------------------------------------

#[derive(Serialize, Default)]
pub struct LoginErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_error: Option<String>,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Response {
    let user = match state.storage.get_user_by_email(&payload.email).await {
        Ok(user) => user,
        Err(err) => return internal_error("Failed to log in", err),
    };

    let Some(user) = user else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(LoginErrors {
                email_error: Some("Email address does not exist".to_string()),
                ..Default::default()
            }),
        )
            .into_response();
    };

    if !password::verify_password(&payload.password, &user.password_hash) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(LoginErrors {
                password_error: Some("Password is incorrect".to_string()),
                ..Default::default()
            }),
        )
            .into_response();
    }

    match state.sessions.create(&user.user_id).await {
        Ok(session) => (
            [(header::SET_COOKIE, SessionService::cookie_for(&session))],
            Json(SuccessResponse {
                message: "Logged in".to_string(),
            }),
        )
            .into_response(),
        Err(err) => internal_error("Failed to create session", err),
    }
}

// -- users ----------------------------------------------------------------

#[derive(Serialize, Default)]
pub struct UserErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_error: Option<String>,
}

/// Create a user account. The first account ever created becomes the admin
/// and is logged in immediately (onboarding).
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewUserRequest>,
) -> Response {
    let email = payload.email.trim();

    let mut errors = UserErrors::default();
    if !is_valid_email(email) {
        errors.email_error = Some("Please enter a valid email address".to_string());
    }
    if payload.password.trim().is_empty() {
        errors.password_error = Some("Password should not be empty".to_string());
    }
    if errors.email_error.is_some() || errors.password_error.is_some() {
        return (StatusCode::BAD_REQUEST, Json(errors)).into_response();
    }

    let has_users = match state.storage.has_users().await {
        Ok(v) => v,
        Err(err) => return internal_error("Failed to create user", err),
    };

    let password_hash = match password::hash_password(&payload.password) {
        Ok(hash) => hash,
        Err(err) => return internal_error("Failed to hash password", err),
    };

    // First user is admin
    let user = match state
        .storage
        .insert_user(&generate_id(), email, &password_hash, !has_users)
        .await
    {
        Ok(user) => user,
        Err(StorageError::Conflict) => {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: "Email address is already registered".to_string(),
                }),
            )
                .into_response();
        }
        Err(StorageError::Other(err)) => return internal_error("Failed to create user", err),
    };

    if !has_users {
        return match state.sessions.create(&user.user_id).await {
            Ok(session) => (
                StatusCode::CREATED,
                [(header::SET_COOKIE, SessionService::cookie_for(&session))],
                Json(user),
            )
                .into_response(),
            Err(err) => internal_error("Failed to create session", err),
        };
    }

    (StatusCode::CREATED, Json(user)).into_response()
}

#[derive(Serialize, Default)]
pub struct PasswordErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_password_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_password_error: Option<String>,
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ChangePasswordRequest>,
) -> Response {
    let Some(session_id) = SessionService::session_id_from(&headers) else {
        return not_logged_in();
    };
    let user_id = match state.sessions.user_for(&session_id).await {
        Ok(Some(user_id)) => user_id,
        Ok(None) => return not_logged_in(),
        Err(err) => return internal_error("Failed to change password", err),
    };
    let user = match state.storage.get_user(&user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return not_logged_in(),
        Err(err) => return internal_error("Failed to change password", err),
    };

    if !password::verify_password(&payload.old_password, &user.password_hash) {
        return (
            StatusCode::BAD_REQUEST,
            Json(PasswordErrors {
                old_password_error: Some("Old password is incorrect".to_string()),
                ..Default::default()
            }),
        )
            .into_response();
    }

    if payload.old_password == payload.new_password {
        return (
            StatusCode::BAD_REQUEST,
            Json(PasswordErrors {
                new_password_error: Some(
                    "New password should be different from old password".to_string(),
                ),
                ..Default::default()
            }),
        )
            .into_response();
    }

    let password_hash = match password::hash_password(&payload.new_password) {
        Ok(hash) => hash,
        Err(err) => return internal_error("Failed to hash password", err),
    };

    match state.storage.update_password(&user.user_id, &password_hash).await {
        Ok(true) => Json(SuccessResponse {
            message: "Password updated".to_string(),
        })
        .into_response(),
        Ok(false) => not_logged_in(),
        Err(err) => return internal_error("Failed to change password", err),
    }
}

fn not_logged_in() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "Not logged in".to_string(),
        }),
    )
        .into_response()
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

// -- projects -------------------------------------------------------------

#[derive(Serialize, Default)]
pub struct ProjectErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url_error: Option<String>,
}

#[derive(Serialize)]
pub struct ProjectDetailResponse {
    #[serde(flatten)]
    pub project: ProjectRecord,
    /// Script tag the user embeds in their site's HTML head
    pub tracking_snippet: String,
}

fn validate_project_input(input: &ProjectInput) -> Option<ProjectErrors> {
    let mut errors = ProjectErrors::default();
    if input.name.trim().is_empty() {
        errors.name_error = Some("Project name should not be empty".to_string());
    }
    if Url::parse(&input.base_url).is_err() {
        errors.base_url_error = Some("Please enter a valid URL".to_string());
    }
    if errors.name_error.is_some() || errors.base_url_error.is_some() {
        Some(errors)
    } else {
        None
    }
}

pub async fn list_projects(State(state): State<Arc<AppState>>) -> Response {
    match state.storage.list_projects().await {
        Ok(projects) => Json(projects).into_response(),
        Err(err) => internal_error("Failed to list projects", err),
    }
}

pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ProjectInput>,
) -> Response {
    if let Some(errors) = validate_project_input(&payload) {
        return (StatusCode::BAD_REQUEST, Json(errors)).into_response();
    }

    match state
        .storage
        .create_project(&generate_id(), payload.name.trim(), &payload.base_url)
        .await
    {
        Ok(project) => (StatusCode::CREATED, Json(project)).into_response(),
        Err(StorageError::Conflict) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "Project already exists".to_string(),
            }),
        )
            .into_response(),
        Err(StorageError::Other(err)) => internal_error("Failed to create project", err),
    }
}

pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> Response {
    let project = match state.storage.get_project(&project_id).await {
        Ok(Some(project)) => project,
        Ok(None) => return project_not_found(),
        Err(err) => return internal_error("Failed to get project", err),
    };

    let server_url = match state.storage.get_setting("server_url").await {
        Ok(value) => value.unwrap_or_default(),
        Err(err) => return internal_error("Failed to get project", err),
    };

    let tracking_snippet = tracking_snippet(&server_url, &project.project_id);
    Json(ProjectDetailResponse {
        project,
        tracking_snippet,
    })
    .into_response()
}

pub async fn update_project(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Json(payload): Json<ProjectInput>,
) -> Response {
    if let Some(errors) = validate_project_input(&payload) {
        return (StatusCode::BAD_REQUEST, Json(errors)).into_response();
    }

    match state
        .storage
        .update_project(&project_id, payload.name.trim(), &payload.base_url)
        .await
    {
        Ok(Some(project)) => Json(project).into_response(),
        Ok(None) => project_not_found(),
        Err(err) => internal_error("Failed to update project", err),
    }
}

fn project_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Project not found".to_string(),
        }),
    )
        .into_response()
}

/// Render the beacon snippet a site owner embeds at the end of their head
/// tag. Sends `location.pathname`, the document title, and the referrer to
/// the collect endpoint on every page load.
fn tracking_snippet(server_url: &str, project_id: &str) -> String {
    format!(
        r#"<!-- pagetally snippet -->
<script>
	(function() {{
		var COLLECT_URL = "{server_url}/collect";
		var PROJECT_ID = "{project_id}";

		window.__pagetally__ = {{}};

		window.__pagetally__.sendPageView = function() {{
			var url =
				COLLECT_URL +
				"?project_id=" +
				PROJECT_ID +
				"&title=" +
				encodeURIComponent(document.title) +
				"&path=" +
				encodeURIComponent(location.pathname) +
				"&referrer=" +
				encodeURIComponent(document.referrer);

			var xhr = new XMLHttpRequest();
			xhr.open("GET", url);
			xhr.send();
		}};

		window.__pagetally__.sendPageView();
	}})();
</script>"#
    )
}

// -- settings -------------------------------------------------------------

#[derive(Serialize)]
pub struct SettingResponse {
    pub key: String,
    pub value: String,
}

#[derive(Deserialize)]
pub struct SettingInput {
    pub value: String,
}

/// Missing keys read as empty rather than 404 so the settings form can
/// render before anything has been saved.
pub async fn get_setting(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Response {
    match state.storage.get_setting(&key).await {
        Ok(value) => Json(SettingResponse {
            key,
            value: value.unwrap_or_default(),
        })
        .into_response(),
        Err(err) => internal_error("Failed to get setting", err),
    }
}

pub async fn put_setting(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(payload): Json<SettingInput>,
) -> Response {
    match state.storage.set_setting(&key, &payload.value).await {
        Ok(()) => Json(SuccessResponse {
            message: "Setting saved".to_string(),
        })
        .into_response(),
        Err(err) => internal_error("Failed to save setting", err),
    }
}
