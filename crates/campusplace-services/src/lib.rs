//! Campusplace service adapters.
//!
//! Thin data-access services for the student-placement portal. Each service
//! wraps a [`campusplace_client::DataClient`] for reads and writes and,
//! where the UI needs live updates, registers watches through a
//! [`campusplace_client::FeedManager`]:
//!
//! - [`registration`] - student registration and profiles
//! - [`verification`] - college-admin verification dashboard
//! - [`stories`] - success-story testimonials
//! - [`notifications`] - per-user notifications
//! - [`allocations`] - seat allocations and their history
//!
//! Services hold no state of their own; every call is a filtered
//! select/insert/update against the hosted tables.

pub mod allocations;
pub mod models;
pub mod notifications;
pub mod registration;
pub mod stories;
pub mod verification;

pub use allocations::AllocationService;
pub use notifications::NotificationService;
pub use registration::RegistrationService;
pub use stories::StoryService;
pub use verification::VerificationService;

/// Hosted table names.
pub mod tables {
    /// Student registrations and profiles.
    pub const STUDENTS: &str = "students";
    /// Success-story testimonials.
    pub const SUCCESS_STORIES: &str = "success_stories";
    /// Per-user notifications.
    pub const NOTIFICATIONS: &str = "notifications";
    /// Seat allocations.
    pub const ALLOCATIONS: &str = "allocations";
    /// Allocation history events.
    pub const ALLOCATION_EVENTS: &str = "allocation_events";
}
