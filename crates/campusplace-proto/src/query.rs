//! Request IR for the hosted data service.
//!
//! Services never build wire requests by hand; they assemble these values
//! and hand them to the client, which owns the transport.

use serde::{Deserialize, Serialize};

use crate::event::Row;
use crate::filter::EqFilter;

/// Ordering specification for a select.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Column to order by.
    pub column: String,
    /// Descending order when true.
    pub descending: bool,
}

impl OrderSpec {
    /// Ascending order on a column.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    /// Descending order on a column.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

/// A filtered select against one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectQuery {
    /// Table to read.
    pub table: String,
    /// Columns to return; empty means all columns.
    pub columns: Vec<String>,
    /// Equality filters, all of which must hold.
    pub filters: Vec<EqFilter>,
    /// Optional ordering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderSpec>,
    /// Optional row limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl SelectQuery {
    /// Create a select returning all columns of a table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: vec![],
            filters: vec![],
            order_by: None,
            limit: None,
        }
    }

    /// Restrict the returned columns.
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    /// Add an equality filter.
    pub fn with_filter(mut self, filter: EqFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Set the ordering.
    pub fn with_order(mut self, order: OrderSpec) -> Self {
        self.order_by = Some(order);
        self
    }

    /// Limit the number of returned rows.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a row satisfies every filter on this query.
    pub fn row_matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }
}

/// An insert of one or more rows into a table, returning the stored rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertRequest {
    /// Target table.
    pub table: String,
    /// Rows to insert.
    pub rows: Vec<Row>,
}

impl InsertRequest {
    /// Insert a single row.
    pub fn single(table: impl Into<String>, row: Row) -> Self {
        Self {
            table: table.into(),
            rows: vec![row],
        }
    }

    /// Insert a batch of rows.
    pub fn batch(table: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            table: table.into(),
            rows,
        }
    }
}

/// A filtered update on one table, returning the updated rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    /// Target table.
    pub table: String,
    /// Equality filters selecting the rows to update.
    pub filters: Vec<EqFilter>,
    /// Column changes to apply.
    pub changes: Row,
}

impl UpdateRequest {
    /// Create an update with a single filter.
    pub fn new(table: impl Into<String>, filter: EqFilter, changes: Row) -> Self {
        Self {
            table: table.into(),
            filters: vec![filter],
            changes,
        }
    }

    /// Add another filter.
    pub fn with_filter(mut self, filter: EqFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Whether a row is selected by this update.
    pub fn row_matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }
}
