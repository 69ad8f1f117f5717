//! College-admin verification dashboard.

use std::sync::Arc;

use tracing::debug;

use campusplace_client::{DataClient, Error, FeedManager, Teardown};
use campusplace_proto::{ChangeEvent, EqFilter, OrderSpec, Row, SelectQuery};

use crate::models::{Student, VerificationStatus};
use crate::tables;

/// Verification workflows for college admins: the pending queue, status
/// decisions, and the live dashboard watch.
pub struct VerificationService {
    client: Arc<DataClient>,
}

impl VerificationService {
    /// Create the service over a data client.
    pub fn new(client: Arc<DataClient>) -> Self {
        Self { client }
    }

    /// Students of a college still awaiting verification, oldest first so
    /// the queue drains fairly.
    pub async fn pending_for_college(&self, college_id: i64) -> Result<Vec<Student>, Error> {
        self.client
            .fetch(
                SelectQuery::new(tables::STUDENTS)
                    .with_filter(EqFilter::new("college_id", college_id))
                    .with_filter(EqFilter::new(
                        "verification_status",
                        VerificationStatus::Pending.as_str(),
                    ))
                    .with_order(OrderSpec::asc("created_at")),
            )
            .await
    }

    /// Record a verification decision and return the updated student.
    pub async fn set_status(
        &self,
        student_id: i64,
        status: VerificationStatus,
    ) -> Result<Student, Error> {
        let mut changes = Row::new();
        changes.insert(
            "verification_status".into(),
            serde_json::Value::from(status.as_str()),
        );

        let mut updated: Vec<Student> = self
            .client
            .update_returning(
                tables::STUDENTS,
                vec![EqFilter::new("id", student_id)],
                changes,
            )
            .await?;

        let student = updated
            .pop()
            .ok_or_else(|| Error::NotFound(tables::STUDENTS.to_string()))?;
        debug!(student_id, status = %status, "verification status set");
        Ok(student)
    }

    /// Watch a college's student records for verification-status changes.
    ///
    /// Updates that leave the status untouched (profile edits and the like)
    /// are filtered out before the callback sees them, so the dashboard
    /// only repaints when a decision actually lands. Fetch the pending
    /// queue first; the watch only covers subsequent deltas.
    pub fn watch_college<F>(
        &self,
        manager: &FeedManager,
        college_id: i64,
        callback: F,
    ) -> Teardown
    where
        F: Fn(ChangeEvent<Student>) + Send + Sync + 'static,
    {
        manager.subscribe_with_change_filter::<Student, _>(
            tables::STUDENTS,
            Some(EqFilter::new("college_id", college_id)),
            vec!["verification_status".into()],
            callback,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campusplace_client::{ClientConfig, MemoryFeed, MemoryStore};
    use campusplace_proto::RawChange;
    use parking_lot::Mutex;
    use serde_json::json;

    fn student_row(id: i64, college_id: i64, status: &str) -> Row {
        let row = json!({
            "id": id,
            "full_name": format!("Student {}", id),
            "email": format!("s{}@college.edu", id),
            "college_id": college_id,
            "branch": "CSE",
            "cgpa": 8.0,
            "verification_status": status,
            "created_at": format!("2026-08-0{}T10:00:00Z", id),
        });
        match row {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn service_with_store() -> (Arc<MemoryStore>, VerificationService) {
        let store = Arc::new(MemoryStore::new());
        let client = Arc::new(DataClient::new(store.clone(), ClientConfig::default()));
        (store, VerificationService::new(client))
    }

    #[tokio::test]
    async fn test_pending_queue_is_filtered_and_ordered() {
        let (store, service) = service_with_store();
        store.seed(
            tables::STUDENTS,
            vec![
                student_row(2, 3, "pending"),
                student_row(1, 3, "pending"),
                student_row(3, 3, "verified"),
                student_row(4, 9, "pending"),
            ],
        );

        let pending = service.pending_for_college(3).await.unwrap();
        assert_eq!(pending.len(), 2);
        // Oldest first
        assert_eq!(pending[0].id, 1);
        assert_eq!(pending[1].id, 2);
    }

    #[tokio::test]
    async fn test_set_status() {
        let (store, service) = service_with_store();
        store.seed(tables::STUDENTS, vec![student_row(1, 3, "pending")]);

        let student = service
            .set_status(1, VerificationStatus::Verified)
            .await
            .unwrap();
        assert_eq!(student.verification_status, VerificationStatus::Verified);

        let pending = service.pending_for_college(3).await.unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_watch_college_only_sees_status_changes() {
        let (_, service) = service_with_store();
        let feed = Arc::new(MemoryFeed::new());
        let manager = FeedManager::new(feed.clone());

        let seen: Arc<Mutex<Vec<(i64, VerificationStatus)>>> = Arc::new(Mutex::new(vec![]));
        let sink = seen.clone();
        let teardown = service.watch_college(&manager, 3, move |event| {
            let student = event.new_row().expect("updates carry new state");
            sink.lock().push((student.id, student.verification_status));
        });

        // Profile edit, status unchanged: suppressed.
        feed.publish(RawChange::update(
            tables::STUDENTS,
            student_row(1, 3, "pending"),
            student_row(1, 3, "pending"),
        ));
        // Other college: filtered by predicate.
        feed.publish(RawChange::update(
            tables::STUDENTS,
            student_row(4, 9, "pending"),
            student_row(4, 9, "verified"),
        ));
        // Decision for this college: delivered.
        feed.publish(RawChange::update(
            tables::STUDENTS,
            student_row(1, 3, "pending"),
            student_row(1, 3, "verified"),
        ));

        assert_eq!(
            seen.lock().clone(),
            vec![(1, VerificationStatus::Verified)]
        );
        teardown.invoke();
        assert_eq!(manager.active_channels(), 0);
    }
}
