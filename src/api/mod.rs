use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query};
use axum::routing::{patch, post};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::*;
use crate::services::{CourseAccessManager, EnrollmentService, TaskCompletionAggregator};
use crate::state::AppState;
use crate::store::{StoreError, collections};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/courses", post(create_course))
        .route("/courses/{id}", get(get_course))
        .route("/courses/{id}/access-code", post(rotate_access_code))
        .route("/enrollments", post(enroll))
        .route("/students/{id}/courses", get(list_enrolled_courses))
        .route("/tasks", post(create_task))
        .route("/tasks/{id}/complete", patch(complete_task))
        .route("/reports/weekly-completion", get(weekly_completion))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    // Any store round trip will do; a miss still proves the backend is up.
    match state.store.get_by_id(collections::COURSES, "health-probe").await {
        Ok(_) | Err(StoreError::NotFound) => Ok(StatusCode::OK),
        Err(e) => Err(e.into()),
    }
}

async fn create_course(
    State(state): State<AppState>,
    Json(req): Json<NewCourseRequest>,
) -> Result<Json<Course>, AppError> {
    let manager = CourseAccessManager::new(state.store.clone());
    let course = manager.create_course(req).await?;
    Ok(Json(course))
}

async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Course>, AppError> {
    let manager = CourseAccessManager::new(state.store.clone());
    let course = manager.get_course(&id).await?;
    Ok(Json(course))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RotatedAccessCode {
    access_code: String,
}

async fn rotate_access_code(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RotatedAccessCode>, AppError> {
    let manager = CourseAccessManager::new(state.store.clone());
    let access_code = manager.rotate(&id).await?;
    Ok(Json(RotatedAccessCode { access_code }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrollRequest {
    access_code: String,
    student_id: String,
    email: String,
}

async fn enroll(
    State(state): State<AppState>,
    Json(req): Json<EnrollRequest>,
) -> Result<Json<EnrollmentWithCourse>, AppError> {
    let service = EnrollmentService::new(state.store.clone());
    let enrollment = service
        .enroll(&req.access_code, &req.student_id, &req.email)
        .await?;
    Ok(Json(enrollment))
}

async fn list_enrolled_courses(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<EnrolledCourse>>, AppError> {
    let service = EnrollmentService::new(state.store.clone());
    let courses = service.list_enrolled_courses(&id).await?;
    Ok(Json(courses))
}

async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<NewTaskRequest>,
) -> Result<Json<StudentTask>, AppError> {
    let task = StudentTask {
        id: String::new(),
        student_id: req.student_id,
        title: req.title,
        due_date: req.due_date,
        completed: false,
        completed_at: None,
    };
    let id = state
        .store
        .insert(collections::STUDENT_TASKS, serde_json::to_value(&task)?)
        .await?;
    Ok(Json(StudentTask { id, ..task }))
}

async fn complete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let completion = TaskCompletion {
        completed: true,
        completed_at: Utc::now(),
    };
    state
        .store
        .update(
            collections::STUDENT_TASKS,
            &id,
            serde_json::to_value(&completion)?,
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct WeeklyReportParams {
    date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WeeklyCompletionReport {
    days: Vec<DayBucket>,
    student_names: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

async fn weekly_completion(
    State(state): State<AppState>,
    Query(params): Query<WeeklyReportParams>,
) -> Result<Json<WeeklyCompletionReport>, AppError> {
    let reference: DateTime<Utc> = match params.date {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map_err(|_| AppError::BadRequest(format!("Invalid date: {raw}")))?
            .and_time(NaiveTime::MIN)
            .and_utc(),
        None => Utc::now(),
    };

    let aggregator = TaskCompletionAggregator::new(state.store.clone());
    let days = aggregator.weekly_completion(reference).await?;

    let student_ids: Vec<String> = days
        .iter()
        .flat_map(|bucket| bucket.tasks.iter().map(|task| task.student_id.clone()))
        .collect();
    let resolution = aggregator.resolve_student_names(&student_ids).await;

    Ok(Json(WeeklyCompletionReport {
        days,
        student_names: resolution.names,
        warning: resolution.warning,
    }))
}
