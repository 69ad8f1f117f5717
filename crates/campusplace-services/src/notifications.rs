//! Per-user notifications.

use std::sync::Arc;

use tracing::debug;

use campusplace_client::{DataClient, Error, FeedManager, Teardown};
use campusplace_proto::{ChangeEvent, EqFilter, OpFilter, OrderSpec, Row, SelectQuery};

use crate::models::{NewNotification, Notification};
use crate::tables;

/// Notification delivery and read-state tracking.
pub struct NotificationService {
    client: Arc<DataClient>,
}

impl NotificationService {
    /// Create the service over a data client.
    pub fn new(client: Arc<DataClient>) -> Self {
        Self { client }
    }

    /// Unread notifications for a user, newest first.
    pub async fn unread_for(&self, user_id: i64) -> Result<Vec<Notification>, Error> {
        self.client
            .fetch(
                SelectQuery::new(tables::NOTIFICATIONS)
                    .with_filter(EqFilter::new("user_id", user_id))
                    .with_filter(EqFilter::new("read", false))
                    .with_order(OrderSpec::desc("created_at")),
            )
            .await
    }

    /// Push a notification to a user.
    pub async fn push(&self, new: NewNotification) -> Result<Notification, Error> {
        let notification: Notification = self.client.insert(tables::NOTIFICATIONS, &new).await?;
        debug!(
            notification_id = notification.id,
            user_id = notification.user_id,
            "notification pushed"
        );
        Ok(notification)
    }

    /// Mark one notification read.
    pub async fn mark_read(&self, id: i64) -> Result<Notification, Error> {
        let mut changes = Row::new();
        changes.insert("read".into(), serde_json::Value::Bool(true));

        let mut updated: Vec<Notification> = self
            .client
            .update_returning(tables::NOTIFICATIONS, vec![EqFilter::new("id", id)], changes)
            .await?;
        updated
            .pop()
            .ok_or_else(|| Error::NotFound(tables::NOTIFICATIONS.to_string()))
    }

    /// Watch for notifications arriving for one user.
    ///
    /// Insert-only: read-state flips and deletions do not fire the
    /// callback. Fetch [`NotificationService::unread_for`] first for the
    /// backlog; the watch covers what arrives afterwards.
    pub fn watch_user<F>(&self, manager: &FeedManager, user_id: i64, callback: F) -> Teardown
    where
        F: Fn(ChangeEvent<Notification>) + Send + Sync + 'static,
    {
        manager.subscribe::<Notification, _>(
            tables::NOTIFICATIONS,
            Some(EqFilter::new("user_id", user_id)),
            OpFilter::Insert,
            callback,
        )
    }
}
