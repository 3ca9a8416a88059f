mod courses;
mod upload;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Router, extract::State, http::StatusCode};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::models::Course;
use crate::state::{AppState, UPLOADS_URL_PREFIX};

/// Multipart framing allowance on top of the image ceiling, so oversized
/// images reach the handler and get the envelope instead of a bare 413.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Debug, Serialize)]
pub struct CourseListResponse {
    pub success: bool,
    pub courses: Vec<Course>,
}

#[derive(Debug, Serialize)]
pub struct CourseResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub course: Course,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn router(state: AppState) -> Router {
    let public_dir = state.config.public_dir.clone();
    let upload_limit = state
        .config
        .max_upload_bytes
        .saturating_mul(2)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/health", get(health))
        .route(
            "/api/courses",
            get(courses::list_courses)
                .post(courses::create_course)
                .put(courses::update_course_by_query)
                .delete(courses::delete_course_by_query)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/courses/featured",
            get(courses::list_featured_courses).fallback(method_not_allowed),
        )
        .route(
            "/api/courses/{id}",
            get(courses::get_course)
                .put(courses::update_course)
                .delete(courses::delete_course)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/upload",
            post(upload::upload_image)
                .fallback(method_not_allowed)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route_service("/", ServeFile::new(public_dir.join("index.html")))
        .route_service("/admin", ServeFile::new(public_dir.join("admin.html")))
        .route_service("/curso/{id}", ServeFile::new(public_dir.join("curso.html")))
        .nest_service(UPLOADS_URL_PREFIX, ServeDir::new(&state.config.upload_dir))
        .fallback_service(ServeDir::new(&public_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.db.read().await?;
    Ok(StatusCode::OK)
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
