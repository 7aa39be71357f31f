use serde::{Deserialize, Serialize};

use super::CourseRunKey;

/// A learner's course certificate as reported by award/change/revoke signals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub username: String,
    pub course_key: CourseRunKey,
    /// Enrollment mode, e.g. "audit", "honor", "verified"
    pub mode: String,
    /// Certificate status, e.g. "downloadable", "revoked"
    pub status: String,
}

impl CertificateRecord {
    pub fn new(
        username: impl Into<String>,
        course_key: impl Into<CourseRunKey>,
        mode: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            course_key: course_key.into(),
            mode: mode.into(),
            status: status.into(),
        }
    }
}
