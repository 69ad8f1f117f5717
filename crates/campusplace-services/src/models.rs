//! Row models for the hosted tables.
//!
//! Field names mirror the snake_case wire columns one-to-one; serde does
//! the narrowing when rows come off the transport or the change feed.
//! `New*` types are the insert payloads - no `id`, no `created_at`, the
//! service fills those.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Verification state of a student registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    /// Awaiting review by a college admin.
    Pending,
    /// Approved.
    Verified,
    /// Rejected.
    Rejected,
}

impl VerificationStatus {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub college_id: i64,
    pub branch: String,
    pub cgpa: f64,
    pub verification_status: VerificationStatus,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a student registration.
#[derive(Debug, Clone, Serialize)]
pub struct NewStudent {
    pub full_name: String,
    pub email: String,
    pub college_id: i64,
    pub branch: String,
    pub cgpa: f64,
    pub verification_status: VerificationStatus,
}

impl NewStudent {
    /// New registration, starting out pending verification.
    pub fn new(
        full_name: impl Into<String>,
        email: impl Into<String>,
        college_id: i64,
        branch: impl Into<String>,
        cgpa: f64,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            email: email.into(),
            college_id,
            branch: branch.into(),
            cgpa,
            verification_status: VerificationStatus::Pending,
        }
    }
}

/// A placement success story shown on the portal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessStory {
    pub id: i64,
    pub student_id: i64,
    pub college_id: i64,
    pub title: String,
    pub body: String,
    pub company: String,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a success story. Stories start unapproved.
#[derive(Debug, Clone, Serialize)]
pub struct NewSuccessStory {
    pub student_id: i64,
    pub college_id: i64,
    pub title: String,
    pub body: String,
    pub company: String,
    pub approved: bool,
}

impl NewSuccessStory {
    pub fn new(
        student_id: i64,
        college_id: i64,
        title: impl Into<String>,
        body: impl Into<String>,
        company: impl Into<String>,
    ) -> Self {
        Self {
            student_id,
            college_id,
            title: title.into(),
            body: body.into(),
            company: company.into(),
            approved: false,
        }
    }
}

/// A notification delivered to one portal user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub body: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a notification. Notifications start unread.
#[derive(Debug, Clone, Serialize)]
pub struct NewNotification {
    pub user_id: i64,
    pub title: String,
    pub body: String,
    pub read: bool,
}

impl NewNotification {
    pub fn new(user_id: i64, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            user_id,
            title: title.into(),
            body: body.into(),
            read: false,
        }
    }
}

/// State of a seat allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationStatus {
    /// Offered to the student.
    Proposed,
    /// Accepted and locked in.
    Confirmed,
    /// Declined by the student.
    Declined,
    /// Withdrawn by the college.
    Withdrawn,
}

impl AllocationStatus {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationStatus::Proposed => "proposed",
            AllocationStatus::Confirmed => "confirmed",
            AllocationStatus::Declined => "declined",
            AllocationStatus::Withdrawn => "withdrawn",
        }
    }
}

impl std::fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A seat allocation for one student at one college.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: i64,
    pub student_id: i64,
    pub college_id: i64,
    pub status: AllocationStatus,
    pub updated_at: DateTime<Utc>,
}

/// One entry in an allocation's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationEvent {
    pub id: i64,
    pub allocation_id: i64,
    pub status: AllocationStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for an allocation history entry.
#[derive(Debug, Clone, Serialize)]
pub struct NewAllocationEvent {
    pub allocation_id: i64,
    pub status: AllocationStatus,
    pub note: Option<String>,
}

impl NewAllocationEvent {
    pub fn new(allocation_id: i64, status: AllocationStatus) -> Self {
        Self {
            allocation_id,
            status,
            note: None,
        }
    }

    /// Attach a free-form note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}
