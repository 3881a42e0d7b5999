use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::{
    Course, CourseSummary, EnrolledCourse, Enrollment, EnrollmentMethod, EnrollmentStatus,
    EnrollmentWithCourse,
};
use crate::services::access_code;
use crate::store::{DocumentStore, Filter, StoreError, collections};

/// Resolves access codes to courses and creates enrollment records.
pub struct EnrollmentService {
    store: Arc<dyn DocumentStore>,
}

impl EnrollmentService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Enrolls a student into the course bound to `access_code`.
    ///
    /// The duplicate check and the insert are separate store calls, so two
    /// concurrent enrollments for the same pair can both pass the check.
    /// Accepted: the store holds no unique constraint on the pair.
    pub async fn enroll(
        &self,
        access_code: &str,
        student_id: &str,
        email: &str,
    ) -> Result<EnrollmentWithCourse, AppError> {
        if !access_code::validate_format(access_code) {
            return Err(AppError::InvalidAccessCode);
        }

        // Lookup is unfiltered by course status.
        let matches = self
            .store
            .query(
                collections::COURSES,
                &[Filter::eq("accessCode", Value::String(access_code.to_string()))],
                None,
            )
            .await?;
        let course: Course = match matches.into_iter().next() {
            Some(doc) => serde_json::from_value(doc)?,
            None => return Err(AppError::InvalidAccessCode),
        };

        let existing = self
            .store
            .query(
                collections::ENROLLMENTS,
                &[
                    Filter::eq("courseId", Value::String(course.id.clone())),
                    Filter::eq("studentId", Value::String(student_id.to_string())),
                ],
                None,
            )
            .await?;
        if !existing.is_empty() {
            return Err(AppError::AlreadyEnrolled);
        }

        let enrollment = Enrollment {
            id: String::new(),
            course_id: course.id.clone(),
            student_id: student_id.to_string(),
            email: email.to_string(),
            enrolled_at: Utc::now(),
            status: EnrollmentStatus::Active,
            progress: 0,
            enrollment_method: EnrollmentMethod::AccessCode,
        };
        let id = self
            .store
            .insert(collections::ENROLLMENTS, serde_json::to_value(&enrollment)?)
            .await?;
        info!("student {} enrolled in course {}", student_id, course.id);

        Ok(EnrollmentWithCourse {
            enrollment: Enrollment { id, ..enrollment },
            course: CourseSummary::from(&course),
        })
    }

    /// All courses the student is enrolled in, in the store's natural
    /// enrollment order, each carrying the enrollment's progress and status.
    pub async fn list_enrolled_courses(
        &self,
        student_id: &str,
    ) -> Result<Vec<EnrolledCourse>, AppError> {
        let docs = self
            .store
            .query(
                collections::ENROLLMENTS,
                &[Filter::eq("studentId", Value::String(student_id.to_string()))],
                None,
            )
            .await?;

        let mut courses = Vec::new();
        for doc in docs {
            let enrollment: Enrollment = serde_json::from_value(doc)?;
            let course_doc = match self
                .store
                .get_by_id(collections::COURSES, &enrollment.course_id)
                .await
            {
                Ok(doc) => doc,
                Err(StoreError::NotFound) => {
                    warn!(
                        "enrollment {} references missing course {}, skipping",
                        enrollment.id, enrollment.course_id
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let course: Course = serde_json::from_value(course_doc)?;
            courses.push(EnrolledCourse {
                course,
                progress: enrollment.progress,
                enrollment_id: enrollment.id,
                enrollment_status: enrollment.status,
            });
        }

        Ok(courses)
    }
}
