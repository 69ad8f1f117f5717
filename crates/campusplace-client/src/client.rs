//! Typed data-access client.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use campusplace_proto::{EqFilter, InsertRequest, Row, SelectQuery, UpdateRequest};

use crate::config::ClientConfig;
use crate::error::Error;
use crate::transport::DataTransport;

/// Client for the hosted data service.
///
/// Constructed explicitly with the transport it should use; nothing in this
/// crate holds a process-wide instance. Rows cross the transport as
/// snake_case column maps and are narrowed into typed models at this
/// boundary.
pub struct DataClient {
    transport: Arc<dyn DataTransport>,
    config: ClientConfig,
}

impl DataClient {
    /// Create a client over the given transport.
    pub fn new(transport: Arc<dyn DataTransport>, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run a select and deserialize each row into `T`.
    pub async fn fetch<T: DeserializeOwned>(&self, query: SelectQuery) -> Result<Vec<T>, Error> {
        let rows = self.transport.select(&query).await?;
        rows.into_iter()
            .map(|row| decode_row(&query.table, row))
            .collect()
    }

    /// Run a select expected to match exactly one row.
    pub async fn fetch_one<T: DeserializeOwned>(&self, query: SelectQuery) -> Result<T, Error> {
        let table = query.table.clone();
        let mut rows = self.fetch::<T>(query.with_limit(1)).await?;
        match rows.pop() {
            Some(row) => Ok(row),
            None => Err(Error::NotFound(table)),
        }
    }

    /// Insert a value and return the stored row, defaults applied.
    pub async fn insert<T, R>(&self, table: &str, value: &T) -> Result<R, Error>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let row = encode_row(table, value)?;
        let mut stored = self
            .transport
            .insert(&InsertRequest::single(table, row))
            .await?;
        match stored.pop() {
            Some(row) => decode_row(table, row),
            None => Err(Error::Transport(format!(
                "insert into {} returned no rows",
                table
            ))),
        }
    }

    /// Apply column changes to the rows matched by the filters.
    pub async fn update(
        &self,
        table: &str,
        filters: Vec<EqFilter>,
        changes: Row,
    ) -> Result<Vec<Row>, Error> {
        let request = UpdateRequest {
            table: table.to_string(),
            filters,
            changes,
        };
        self.transport.update(&request).await
    }

    /// Like [`DataClient::update`], deserializing the updated rows.
    pub async fn update_returning<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: Vec<EqFilter>,
        changes: Row,
    ) -> Result<Vec<T>, Error> {
        let rows = self.update(table, filters, changes).await?;
        rows.into_iter()
            .map(|row| decode_row(table, row))
            .collect()
    }
}

impl std::fmt::Debug for DataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataClient")
            .field("url", &self.config.url)
            .field("client_ref", &self.config.client_ref)
            .finish()
    }
}

fn encode_row<T: Serialize>(table: &str, value: &T) -> Result<Row, Error> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(row) => Ok(row),
        _ => Err(Error::NotARow(table.to_string())),
    }
}

fn decode_row<T: DeserializeOwned>(table: &str, row: Row) -> Result<T, Error> {
    serde_json::from_value(serde_json::Value::Object(row)).map_err(|e| {
        Error::Proto(campusplace_proto::Error::MalformedEvent(format!(
            "row on {} failed validation: {}",
            table, e
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryStore;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize)]
    struct NewTag {
        label: String,
    }

    #[derive(Debug, Deserialize)]
    struct Tag {
        id: i64,
        label: String,
    }

    fn client() -> DataClient {
        DataClient::new(Arc::new(MemoryStore::new()), ClientConfig::default())
    }

    #[tokio::test]
    async fn test_insert_and_fetch_typed() {
        let client = client();

        let tag: Tag = client
            .insert(
                "tags",
                &NewTag {
                    label: "placed".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(tag.label, "placed");

        let tags: Vec<Tag> = client.fetch(SelectQuery::new("tags")).await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].id, tag.id);
    }

    #[tokio::test]
    async fn test_fetch_one_not_found() {
        let client = client();
        let result = client.fetch_one::<Tag>(SelectQuery::new("tags")).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_returning() {
        let client = client();
        let tag: Tag = client
            .insert(
                "tags",
                &NewTag {
                    label: "pending".into(),
                },
            )
            .await
            .unwrap();

        let mut changes = Row::new();
        changes.insert("label".into(), json!("done"));
        let updated: Vec<Tag> = client
            .update_returning("tags", vec![EqFilter::new("id", tag.id)], changes)
            .await
            .unwrap();

        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].label, "done");
    }
}
