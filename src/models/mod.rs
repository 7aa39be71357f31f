pub mod certificate;
pub mod course_overview;

// Re-export core models for easy access
pub use certificate::CertificateRecord;
pub use course_overview::{CertificatesDisplayBehavior, CourseOverviewSnapshot, CourseRunKey};
