pub mod access_code;
pub mod aggregation;
pub mod course_access;
pub mod enrollment;

pub use aggregation::{NameResolution, TaskCompletionAggregator};
pub use course_access::CourseAccessManager;
pub use enrollment::EnrollmentService;
