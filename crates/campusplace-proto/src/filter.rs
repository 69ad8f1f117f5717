//! Channel and query filters.
//!
//! The hosted service's filter language supports exactly one predicate
//! form: equality between a column and a scalar. Anything richer (cross-row
//! diffing, ranges) has to happen client-side after receipt.

use serde::{Deserialize, Serialize};

use crate::event::{ChangeKind, RawChange, Row};

/// Operation filter for a subscription: which change kinds to deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpFilter {
    /// Inserts only.
    Insert,
    /// Updates only.
    Update,
    /// Deletes only.
    Delete,
    /// All change kinds.
    Any,
}

impl OpFilter {
    /// Wire representation (`*` for any).
    pub fn as_str(&self) -> &'static str {
        match self {
            OpFilter::Insert => "INSERT",
            OpFilter::Update => "UPDATE",
            OpFilter::Delete => "DELETE",
            OpFilter::Any => "*",
        }
    }

    /// Whether a change of the given kind passes this filter.
    pub fn matches(&self, kind: ChangeKind) -> bool {
        match self {
            OpFilter::Insert => kind == ChangeKind::Insert,
            OpFilter::Update => kind == ChangeKind::Update,
            OpFilter::Delete => kind == ChangeKind::Delete,
            OpFilter::Any => true,
        }
    }
}

impl std::fmt::Display for OpFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An equality predicate on a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqFilter {
    /// Column name (snake_case, as stored).
    pub column: String,
    /// Value the column must equal.
    pub value: serde_json::Value,
}

impl EqFilter {
    /// Create a new equality filter.
    pub fn new(column: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Whether a row satisfies this predicate. A row without the column
    /// does not match.
    pub fn matches(&self, row: &Row) -> bool {
        row.get(&self.column) == Some(&self.value)
    }

    /// Render the predicate in the service's filter syntax,
    /// e.g. `college_id=eq.42`.
    pub fn wire(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => format!("{}=eq.{}", self.column, s),
            other => format!("{}=eq.{}", self.column, other),
        }
    }

    /// Value rendered as a plain string, used in channel-name derivation.
    pub fn value_key(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// The filter registered on a channel before activation: operation kind,
/// schema, table, and an optional row predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelFilter {
    /// Which change kinds to deliver.
    pub event: OpFilter,
    /// Schema of the watched table.
    pub schema: String,
    /// Watched table.
    pub table: String,
    /// Optional equality predicate restricting which rows produce events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicate: Option<EqFilter>,
}

impl ChannelFilter {
    /// Create a filter on a table in the default schema.
    pub fn new(table: impl Into<String>, event: OpFilter) -> Self {
        Self {
            event,
            schema: crate::DEFAULT_SCHEMA.to_string(),
            table: table.into(),
            predicate: None,
        }
    }

    /// Set the row predicate.
    pub fn with_predicate(mut self, predicate: EqFilter) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Set the schema.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Whether a raw event passes this filter.
    ///
    /// The predicate is evaluated against the new row for inserts and
    /// updates and against the old row for deletes, matching how the
    /// service applies it server-side.
    pub fn matches(&self, change: &RawChange) -> bool {
        if !self.event.matches(change.kind) {
            return false;
        }
        if change.schema != self.schema || change.table != self.table {
            return false;
        }
        match &self.predicate {
            None => true,
            Some(predicate) => {
                let row = match change.kind {
                    ChangeKind::Delete => change.old_row.as_ref(),
                    _ => change.new_row.as_ref(),
                };
                row.map(|r| predicate.matches(r)).unwrap_or(false)
            }
        }
    }
}
