pub mod course;
pub mod enrollment;
pub mod task;
pub mod user;

pub use course::{AccessCodeRotation, Course, CourseStatus, CourseSummary, NewCourseRequest};
pub use enrollment::{
    EnrolledCourse, Enrollment, EnrollmentMethod, EnrollmentStatus, EnrollmentWithCourse,
};
pub use task::{DayBucket, NewTaskRequest, StudentTask, TaskCompletion, TaskSummary};
pub use user::UserRecord;
