use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::course::{Course, CourseSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnrollmentMethod {
    AccessCode,
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: String,
    pub course_id: String,
    pub student_id: String,
    pub email: String,
    pub enrolled_at: DateTime<Utc>,
    pub status: EnrollmentStatus,
    pub progress: u8,
    pub enrollment_method: EnrollmentMethod,
}

/// Enrollment as returned to the caller right after creation, carrying a
/// minimal projection of the course it points at.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentWithCourse {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub course: CourseSummary,
}

/// A course the student is enrolled in, with the enrollment's own fields
/// attached for the student dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledCourse {
    #[serde(flatten)]
    pub course: Course,
    pub progress: u8,
    pub enrollment_id: String,
    pub enrollment_status: EnrollmentStatus,
}
