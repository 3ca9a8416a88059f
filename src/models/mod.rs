pub mod course;

pub use course::{Course, CourseDocument, NewCourseRequest, UpdateCourseRequest, DEFAULT_THUMBNAIL};
