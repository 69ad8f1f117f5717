//! Seat allocations and their history.

use std::sync::Arc;

use tracing::debug;

use campusplace_client::{DataClient, Error, FeedManager, Teardown};
use campusplace_proto::{ChangeEvent, EqFilter, OpFilter, OrderSpec, Row, SelectQuery};

use crate::models::{Allocation, AllocationEvent, AllocationStatus, NewAllocationEvent};
use crate::tables;

/// Allocation reads, history writes, and the combined live watch used by
/// the college dashboard.
pub struct AllocationService {
    client: Arc<DataClient>,
}

impl AllocationService {
    /// Create the service over a data client.
    pub fn new(client: Arc<DataClient>) -> Self {
        Self { client }
    }

    /// Allocations held by one student.
    pub async fn for_student(&self, student_id: i64) -> Result<Vec<Allocation>, Error> {
        self.client
            .fetch(
                SelectQuery::new(tables::ALLOCATIONS)
                    .with_filter(EqFilter::new("student_id", student_id)),
            )
            .await
    }

    /// History of one allocation, oldest first.
    pub async fn history(&self, allocation_id: i64) -> Result<Vec<AllocationEvent>, Error> {
        self.client
            .fetch(
                SelectQuery::new(tables::ALLOCATION_EVENTS)
                    .with_filter(EqFilter::new("allocation_id", allocation_id))
                    .with_order(OrderSpec::asc("created_at")),
            )
            .await
    }

    /// Move an allocation to a new status and append the history entry.
    pub async fn set_status(
        &self,
        allocation_id: i64,
        status: AllocationStatus,
        note: Option<String>,
    ) -> Result<Allocation, Error> {
        let mut changes = Row::new();
        changes.insert("status".into(), serde_json::Value::from(status.as_str()));

        let mut updated: Vec<Allocation> = self
            .client
            .update_returning(
                tables::ALLOCATIONS,
                vec![EqFilter::new("id", allocation_id)],
                changes,
            )
            .await?;
        let allocation = updated
            .pop()
            .ok_or_else(|| Error::NotFound(tables::ALLOCATIONS.to_string()))?;

        let mut event = NewAllocationEvent::new(allocation_id, status);
        event.note = note;
        let _: AllocationEvent = self.client.insert(tables::ALLOCATION_EVENTS, &event).await?;

        debug!(allocation_id, status = %status, "allocation status changed");
        Ok(allocation)
    }

    /// Watch a college's allocations: row changes on `allocations` plus
    /// insert events on `allocation_events`, under one teardown.
    ///
    /// Both subscriptions live and die together; invoking the returned
    /// handle releases both channels even if one release fails.
    pub fn watch_college<A, E>(
        &self,
        manager: &FeedManager,
        college_id: i64,
        on_allocation: A,
        on_event: E,
    ) -> Teardown
    where
        A: Fn(ChangeEvent<Allocation>) + Send + Sync + 'static,
        E: Fn(ChangeEvent<AllocationEvent>) + Send + Sync + 'static,
    {
        let allocations = manager.subscribe::<Allocation, _>(
            tables::ALLOCATIONS,
            Some(EqFilter::new("college_id", college_id)),
            OpFilter::Any,
            on_allocation,
        );
        let events = manager.subscribe::<AllocationEvent, _>(
            tables::ALLOCATION_EVENTS,
            None,
            OpFilter::Insert,
            on_event,
        );
        Teardown::join(vec![allocations, events])
    }
}
