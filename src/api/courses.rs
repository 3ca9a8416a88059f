use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::info;

use super::{CourseListResponse, CourseResponse};
use crate::db::repository;
use crate::error::AppError;
use crate::models::course::parse_leading_int;
use crate::models::{NewCourseRequest, UpdateCourseRequest};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    id: Option<String>,
}

impl IdQuery {
    /// An empty `?id=` counts as no id.
    fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|s| !s.is_empty())
    }
}

/// Ids that do not parse can never match a course.
fn parse_id(raw: &str) -> Result<u64, AppError> {
    parse_leading_int(raw)
        .and_then(|n| u64::try_from(n).ok())
        .ok_or(AppError::NotFound)
}

fn query_id(query: &IdQuery) -> Result<u64, AppError> {
    let raw = query
        .id()
        .ok_or_else(|| AppError::BadRequest("Missing course id".to_string()))?;
    parse_id(raw)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(req)| req)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

fn found(course: crate::models::Course) -> Json<CourseResponse> {
    Json(CourseResponse {
        success: true,
        message: None,
        course,
    })
}

/// `GET /api/courses`, or a single course with `?id=`.
pub async fn list_courses(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<Response, AppError> {
    if query.id().is_some() {
        let id = query_id(&query)?;
        return Ok(fetch_one(&state, id).await?.into_response());
    }

    let courses = repository::fetch_courses(&state.db).await?;
    Ok(Json(CourseListResponse {
        success: true,
        courses,
    })
    .into_response())
}

pub async fn list_featured_courses(
    State(state): State<AppState>,
) -> Result<Json<CourseListResponse>, AppError> {
    let courses = repository::fetch_featured_courses(&state.db).await?;
    Ok(Json(CourseListResponse {
        success: true,
        courses,
    }))
}

pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CourseResponse>, AppError> {
    fetch_one(&state, parse_id(&id)?).await
}

async fn fetch_one(state: &AppState, id: u64) -> Result<Json<CourseResponse>, AppError> {
    let course = repository::find_course_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(found(course))
}

pub async fn create_course(
    State(state): State<AppState>,
    payload: Result<Json<NewCourseRequest>, JsonRejection>,
) -> Result<Json<CourseResponse>, AppError> {
    let req = body(payload)?;
    let course = repository::insert_course(&state.db, req).await?;
    info!("created course {} ({})", course.id, course.name);
    Ok(found(course))
}

pub async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateCourseRequest>, JsonRejection>,
) -> Result<Json<CourseResponse>, AppError> {
    apply_update(&state, parse_id(&id)?, body(payload)?).await
}

pub async fn update_course_by_query(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
    payload: Result<Json<UpdateCourseRequest>, JsonRejection>,
) -> Result<Json<CourseResponse>, AppError> {
    apply_update(&state, query_id(&query)?, body(payload)?).await
}

async fn apply_update(
    state: &AppState,
    id: u64,
    req: UpdateCourseRequest,
) -> Result<Json<CourseResponse>, AppError> {
    let course = repository::update_course(&state.db, id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    info!("updated course {}", course.id);
    Ok(found(course))
}

pub async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CourseResponse>, AppError> {
    remove(&state, parse_id(&id)?).await
}

pub async fn delete_course_by_query(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<Json<CourseResponse>, AppError> {
    remove(&state, query_id(&query)?).await
}

async fn remove(state: &AppState, id: u64) -> Result<Json<CourseResponse>, AppError> {
    let course = repository::delete_course(&state.db, id)
        .await?
        .ok_or(AppError::NotFound)?;
    info!("deleted course {}", course.id);
    Ok(Json(CourseResponse {
        success: true,
        message: Some("Course deleted".to_string()),
        course,
    }))
}
