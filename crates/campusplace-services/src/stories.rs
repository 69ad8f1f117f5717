//! Success-story testimonials.

use std::sync::Arc;

use tracing::debug;

use campusplace_client::{DataClient, Error};
use campusplace_proto::{EqFilter, OrderSpec, Row, SelectQuery};

use crate::models::{NewSuccessStory, SuccessStory};
use crate::tables;

/// Testimonial submission and moderation.
pub struct StoryService {
    client: Arc<DataClient>,
}

impl StoryService {
    /// Create the service over a data client.
    pub fn new(client: Arc<DataClient>) -> Self {
        Self { client }
    }

    /// Submit a story. It stays hidden until a moderator approves it.
    pub async fn submit(&self, new: NewSuccessStory) -> Result<SuccessStory, Error> {
        let story: SuccessStory = self.client.insert(tables::SUCCESS_STORIES, &new).await?;
        debug!(story_id = story.id, student_id = story.student_id, "story submitted");
        Ok(story)
    }

    /// Approved stories, newest first.
    pub async fn published(&self) -> Result<Vec<SuccessStory>, Error> {
        self.client
            .fetch(
                SelectQuery::new(tables::SUCCESS_STORIES)
                    .with_filter(EqFilter::new("approved", true))
                    .with_order(OrderSpec::desc("created_at")),
            )
            .await
    }

    /// Approve a story and return it.
    pub async fn approve(&self, id: i64) -> Result<SuccessStory, Error> {
        let mut changes = Row::new();
        changes.insert("approved".into(), serde_json::Value::Bool(true));

        let mut updated: Vec<SuccessStory> = self
            .client
            .update_returning(tables::SUCCESS_STORIES, vec![EqFilter::new("id", id)], changes)
            .await?;
        updated
            .pop()
            .ok_or_else(|| Error::NotFound(tables::SUCCESS_STORIES.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campusplace_client::{ClientConfig, MemoryStore};

    fn service() -> StoryService {
        let store = Arc::new(MemoryStore::new());
        let client = Arc::new(DataClient::new(store, ClientConfig::default()));
        StoryService::new(client)
    }

    #[tokio::test]
    async fn test_submission_starts_unapproved() {
        let service = service();
        let story = service
            .submit(NewSuccessStory::new(
                11,
                3,
                "Placed at Orbit Labs",
                "Interview prep that worked...",
                "Orbit Labs",
            ))
            .await
            .unwrap();

        assert!(!story.approved);
        assert!(service.published().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_approve_publishes() {
        let service = service();
        let story = service
            .submit(NewSuccessStory::new(11, 3, "Placed", "Body", "Orbit Labs"))
            .await
            .unwrap();

        let approved = service.approve(story.id).await.unwrap();
        assert!(approved.approved);

        let published = service.published().await.unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].id, story.id);
    }

    #[tokio::test]
    async fn test_approve_missing_story() {
        let service = service();
        assert!(matches!(
            service.approve(404).await,
            Err(Error::NotFound(_))
        ));
    }
}
