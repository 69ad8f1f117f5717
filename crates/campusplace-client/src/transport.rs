//! Data transport seam and the in-memory test double.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};

use async_trait::async_trait;
use dashmap::DashMap;

use campusplace_proto::{InsertRequest, Row, SelectQuery, UpdateRequest};

use crate::error::Error;

/// Abstraction over the hosted data service's row-level API.
///
/// The real implementation speaks HTTP to the service; [`MemoryStore`]
/// keeps tables in process so services and their tests can run against the
/// same seam without a backend.
#[async_trait]
pub trait DataTransport: Send + Sync {
    /// Run a filtered select and return the matching rows.
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>, Error>;

    /// Insert rows and return them as stored (ids and defaults filled in).
    async fn insert(&self, request: &InsertRequest) -> Result<Vec<Row>, Error>;

    /// Apply column changes to matching rows and return the updated rows.
    async fn update(&self, request: &UpdateRequest) -> Result<Vec<Row>, Error>;
}

/// In-process [`DataTransport`] backed by per-table row vectors.
///
/// Rows without an `id` column get a sequential one on insert, and a
/// missing `created_at` is stamped, mirroring the column defaults the
/// hosted service applies.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: DashMap<String, Vec<Row>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of rows currently in a table.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.get(table).map(|rows| rows.len()).unwrap_or(0)
    }

    /// Seed a table with rows, bypassing default-filling.
    pub fn seed(&self, table: impl Into<String>, rows: Vec<Row>) {
        self.tables.entry(table.into()).or_default().extend(rows);
    }

    fn fill_defaults(&self, row: &mut Row) {
        if !row.contains_key("id") {
            let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst);
            row.insert("id".into(), serde_json::Value::from(id));
        }
        if !row.contains_key("created_at") {
            let now = chrono::Utc::now().to_rfc3339();
            row.insert("created_at".into(), serde_json::Value::from(now));
        }
    }
}

#[async_trait]
impl DataTransport for MemoryStore {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>, Error> {
        let mut rows: Vec<Row> = match self.tables.get(&query.table) {
            Some(rows) => rows
                .iter()
                .filter(|row| query.row_matches(row))
                .cloned()
                .collect(),
            None => vec![],
        };

        if let Some(order) = &query.order_by {
            rows.sort_by(|a, b| {
                let ord = compare_values(a.get(&order.column), b.get(&order.column));
                if order.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit as usize);
        }

        if !query.columns.is_empty() {
            rows = rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .filter(|(k, _)| query.columns.iter().any(|c| c == k))
                        .collect()
                })
                .collect();
        }

        Ok(rows)
    }

    async fn insert(&self, request: &InsertRequest) -> Result<Vec<Row>, Error> {
        let mut stored = Vec::with_capacity(request.rows.len());
        for row in &request.rows {
            let mut row = row.clone();
            self.fill_defaults(&mut row);
            stored.push(row);
        }

        self.tables
            .entry(request.table.clone())
            .or_default()
            .extend(stored.clone());

        Ok(stored)
    }

    async fn update(&self, request: &UpdateRequest) -> Result<Vec<Row>, Error> {
        let mut updated = Vec::new();
        if let Some(mut rows) = self.tables.get_mut(&request.table) {
            for row in rows.iter_mut() {
                if request.row_matches(row) {
                    for (column, value) in &request.changes {
                        row.insert(column.clone(), value.clone());
                    }
                    updated.push(row.clone());
                }
            }
        }
        Ok(updated)
    }
}

/// Order two optional JSON scalars; values of different shapes compare
/// equal so sorts stay stable.
fn compare_values(a: Option<&serde_json::Value>, b: Option<&serde_json::Value>) -> Ordering {
    use serde_json::Value;

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            }
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campusplace_proto::{EqFilter, OrderSpec};
    use serde_json::json;

    fn row(pairs: &[(&str, serde_json::Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_insert_fills_defaults() {
        let store = MemoryStore::new();
        let rows = store
            .insert(&InsertRequest::single(
                "students",
                row(&[("full_name", json!("Asha Rao"))]),
            ))
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert!(rows[0].contains_key("id"));
        assert!(rows[0].contains_key("created_at"));
        assert_eq!(store.row_count("students"), 1);
    }

    #[tokio::test]
    async fn test_select_filters_and_orders() {
        let store = MemoryStore::new();
        store.seed(
            "students",
            vec![
                row(&[("id", json!(1)), ("college_id", json!(7)), ("cgpa", json!(8.1))]),
                row(&[("id", json!(2)), ("college_id", json!(7)), ("cgpa", json!(9.4))]),
                row(&[("id", json!(3)), ("college_id", json!(9)), ("cgpa", json!(7.0))]),
            ],
        );

        let query = SelectQuery::new("students")
            .with_filter(EqFilter::new("college_id", 7))
            .with_order(OrderSpec::desc("cgpa"));
        let rows = store.select(&query).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("id"), Some(&json!(2)));
        assert_eq!(rows[1].get("id"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_select_projects_columns() {
        let store = MemoryStore::new();
        store.seed(
            "students",
            vec![row(&[("id", json!(1)), ("email", json!("a@b.edu"))])],
        );

        let query = SelectQuery::new("students").with_columns(vec!["id".into()]);
        let rows = store.select(&query).await.unwrap();

        assert_eq!(rows[0].len(), 1);
        assert!(rows[0].contains_key("id"));
    }

    #[tokio::test]
    async fn test_update_returns_changed_rows() {
        let store = MemoryStore::new();
        store.seed(
            "notifications",
            vec![
                row(&[("id", json!(1)), ("read", json!(false))]),
                row(&[("id", json!(2)), ("read", json!(false))]),
            ],
        );

        let mut changes = Row::new();
        changes.insert("read".into(), json!(true));
        let updated = store
            .update(&UpdateRequest::new(
                "notifications",
                EqFilter::new("id", 1),
                changes,
            ))
            .await
            .unwrap();

        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].get("read"), Some(&json!(true)));

        // Untouched row keeps its state
        let rest = store
            .select(&SelectQuery::new("notifications").with_filter(EqFilter::new("id", 2)))
            .await
            .unwrap();
        assert_eq!(rest[0].get("read"), Some(&json!(false)));
    }
}
