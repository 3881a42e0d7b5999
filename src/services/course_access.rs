use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::models::{AccessCodeRotation, Course, CourseStatus, NewCourseRequest};
use crate::services::access_code;
use crate::store::{DocumentStore, Filter, collections};

const MAX_ISSUE_ATTEMPTS: usize = 5;

/// Issues and rotates course access codes, keeping a single code-to-course
/// binding valid at any time.
pub struct CourseAccessManager {
    store: Arc<dyn DocumentStore>,
}

impl CourseAccessManager {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Creates a course as draft with its first access code issued.
    pub async fn create_course(&self, req: NewCourseRequest) -> Result<Course, AppError> {
        let code = self.issue_unique_code().await?;
        let now = Utc::now();

        let course = Course {
            id: String::new(),
            title: req.title,
            description: req.description,
            instructor_id: req.instructor_id,
            access_code: Some(code),
            access_code_created_at: Some(now),
            status: CourseStatus::Draft,
            created_at: now,
            updated_at: now,
        };

        let id = self
            .store
            .insert(collections::COURSES, serde_json::to_value(&course)?)
            .await?;
        info!("course {} created with access code issued", id);

        Ok(Course { id, ..course })
    }

    pub async fn get_course(&self, course_id: &str) -> Result<Course, AppError> {
        let doc = self.store.get_by_id(collections::COURSES, course_id).await?;
        Ok(serde_json::from_value(doc)?)
    }

    /// Replaces the course's access code unconditionally. There is no prior
    /// existence check: a missing id surfaces as the store's NotFound. The
    /// old code stops matching future lookups immediately; enrollments
    /// already created under it stand.
    pub async fn rotate(&self, course_id: &str) -> Result<String, AppError> {
        let code = self.issue_unique_code().await?;
        let now = Utc::now();

        let rotation = AccessCodeRotation {
            access_code: code.clone(),
            access_code_created_at: now,
            updated_at: now,
        };
        self.store
            .update(
                collections::COURSES,
                course_id,
                serde_json::to_value(&rotation)?,
            )
            .await?;
        info!("access code rotated for course {}", course_id);

        Ok(code)
    }

    /// Generates a code and retries while it collides with a currently
    /// active one, so lookups never have to tie-break between courses.
    async fn issue_unique_code(&self) -> Result<String, AppError> {
        for _ in 0..MAX_ISSUE_ATTEMPTS {
            let code = access_code::generate(access_code::DEFAULT_CODE_LENGTH);
            let holders = self
                .store
                .query(
                    collections::COURSES,
                    &[Filter::eq("accessCode", Value::String(code.clone()))],
                    None,
                )
                .await?;
            if holders.is_empty() {
                return Ok(code);
            }
            warn!("access code collision on issuance, retrying");
        }

        error!("access code issuance exhausted {} attempts", MAX_ISSUE_ATTEMPTS);
        Err(AppError::InternalServerError)
    }
}
