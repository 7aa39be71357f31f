use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Course run identifier, e.g. `course-v1:edX+DemoX+2024_T1`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseRunKey(String);

impl CourseRunKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Organization segment of the key
    ///
    /// Keys that are not in `course-v1:{org}+{course}+{run}` form are
    /// returned whole.
    pub fn org(&self) -> &str {
        self.0
            .strip_prefix("course-v1:")
            .and_then(|rest| rest.split('+').next())
            .filter(|org| !org.is_empty())
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for CourseRunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CourseRunKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for CourseRunKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// When certificates issued in a course run become visible to learners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificatesDisplayBehavior {
    /// Immediately upon passing
    EarlyNoInfo,
    /// Tied to the course end date
    End,
    /// On a specific certificate available date
    EndWithDate,
}

impl CertificatesDisplayBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EarlyNoInfo => "early_no_info",
            Self::End => "end",
            Self::EndWithDate => "end_with_date",
        }
    }
}

impl fmt::Display for CertificatesDisplayBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable point-in-time view of a course run's overview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseOverviewSnapshot {
    pub id: CourseRunKey,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub self_paced: bool,
    pub certificate_available_date: Option<DateTime<Utc>>,
    pub certificates_display_behavior: Option<CertificatesDisplayBehavior>,
}

impl CourseOverviewSnapshot {
    /// Instructor-paced snapshot with no dates set
    pub fn new(id: impl Into<CourseRunKey>) -> Self {
        Self {
            id: id.into(),
            start: None,
            end: None,
            self_paced: false,
            certificate_available_date: None,
            certificates_display_behavior: None,
        }
    }

    pub fn with_start(mut self, start: Option<DateTime<Utc>>) -> Self {
        self.start = start;
        self
    }

    pub fn with_end(mut self, end: Option<DateTime<Utc>>) -> Self {
        self.end = end;
        self
    }

    pub fn with_self_paced(mut self, self_paced: bool) -> Self {
        self.self_paced = self_paced;
        self
    }

    pub fn with_certificate_available_date(mut self, date: Option<DateTime<Utc>>) -> Self {
        self.certificate_available_date = date;
        self
    }

    pub fn with_display_behavior(mut self, behavior: Option<CertificatesDisplayBehavior>) -> Self {
        self.certificates_display_behavior = behavior;
        self
    }
}
