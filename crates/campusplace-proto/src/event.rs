//! Change-feed event types and typed narrowing.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A flat row record as delivered by the data service: column name to
/// scalar (or null) value, snake_case keys.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// The kind of a received row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    /// A new row was inserted.
    Insert,
    /// An existing row was modified.
    Update,
    /// A row was removed.
    Delete,
}

impl ChangeKind {
    /// Wire representation of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Update => "UPDATE",
            ChangeKind::Delete => "DELETE",
        }
    }

    /// Parse a wire string into a change kind.
    pub fn parse(s: &str) -> Result<Self, Error> {
        match s {
            "INSERT" => Ok(ChangeKind::Insert),
            "UPDATE" => Ok(ChangeKind::Update),
            "DELETE" => Ok(ChangeKind::Delete),
            other => Err(Error::UnknownKind(other.to_string())),
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw event as delivered by the change-feed collaborator.
///
/// Which row states are present depends on the kind: inserts carry only the
/// new row, deletes only the old row, updates both. A feed may still deliver
/// events that violate this; [`RawChange::narrow`] is where that is sorted
/// out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawChange {
    /// Kind of change.
    pub kind: ChangeKind,
    /// Schema the table lives in.
    pub schema: String,
    /// Table the changed row belongs to.
    pub table: String,
    /// New row state (insert/update).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_row: Option<Row>,
    /// Previous row state (update/delete).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_row: Option<Row>,
}

impl RawChange {
    /// Create an insert event.
    pub fn insert(table: impl Into<String>, new_row: Row) -> Self {
        Self {
            kind: ChangeKind::Insert,
            schema: crate::DEFAULT_SCHEMA.to_string(),
            table: table.into(),
            new_row: Some(new_row),
            old_row: None,
        }
    }

    /// Create an update event.
    pub fn update(table: impl Into<String>, old_row: Row, new_row: Row) -> Self {
        Self {
            kind: ChangeKind::Update,
            schema: crate::DEFAULT_SCHEMA.to_string(),
            table: table.into(),
            new_row: Some(new_row),
            old_row: Some(old_row),
        }
    }

    /// Create a delete event.
    pub fn delete(table: impl Into<String>, old_row: Row) -> Self {
        Self {
            kind: ChangeKind::Delete,
            schema: crate::DEFAULT_SCHEMA.to_string(),
            table: table.into(),
            new_row: None,
            old_row: Some(old_row),
        }
    }

    /// Narrow this raw event into a typed [`ChangeEvent`].
    ///
    /// Shape rules:
    /// - an insert without a new row is malformed and rejected;
    /// - an update without a new row is malformed and rejected;
    /// - an update without an old row is tolerated (`old: None`) so the
    ///   subscriber layer can apply its deliver-optimistically policy;
    /// - a delete without an old row yields `old: None`.
    ///
    /// Row payloads that fail to deserialize into `T` are rejected as
    /// malformed rather than passed through untyped.
    pub fn narrow<T: DeserializeOwned>(&self) -> Result<ChangeEvent<T>, Error> {
        match self.kind {
            ChangeKind::Insert => {
                let new = self.decode_row(self.new_row.as_ref(), "new_row")?;
                Ok(ChangeEvent::Insert { new })
            }
            ChangeKind::Update => {
                let new = self.decode_row(self.new_row.as_ref(), "new_row")?;
                let old = match &self.old_row {
                    Some(row) => Some(Self::decode(&self.table, row)?),
                    None => None,
                };
                Ok(ChangeEvent::Update { new, old })
            }
            ChangeKind::Delete => {
                let old = match &self.old_row {
                    Some(row) => Some(Self::decode(&self.table, row)?),
                    None => None,
                };
                Ok(ChangeEvent::Delete { old })
            }
        }
    }

    fn decode_row<T: DeserializeOwned>(&self, row: Option<&Row>, field: &str) -> Result<T, Error> {
        match row {
            Some(row) => Self::decode(&self.table, row),
            None => Err(Error::MalformedEvent(format!(
                "{} event on {} is missing {}",
                self.kind, self.table, field
            ))),
        }
    }

    fn decode<T: DeserializeOwned>(table: &str, row: &Row) -> Result<T, Error> {
        serde_json::from_value(serde_json::Value::Object(row.clone()))
            .map_err(|e| Error::MalformedEvent(format!("row on {} failed validation: {}", table, e)))
    }
}

/// A typed, narrowed change notification.
///
/// `T` is the row model for the watched table. For an update, `old` is
/// `None` only when the feed delivered a malformed event; callers that diff
/// against the previous state must treat that case as "everything changed".
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent<T> {
    /// A row was inserted.
    Insert {
        /// The inserted row.
        new: T,
    },
    /// A row was updated.
    Update {
        /// The row after the update.
        new: T,
        /// The row before the update, if the feed supplied it.
        old: Option<T>,
    },
    /// A row was deleted.
    Delete {
        /// The row before deletion, if the feed supplied it.
        old: Option<T>,
    },
}

impl<T> ChangeEvent<T> {
    /// Kind of this event.
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeEvent::Insert { .. } => ChangeKind::Insert,
            ChangeEvent::Update { .. } => ChangeKind::Update,
            ChangeEvent::Delete { .. } => ChangeKind::Delete,
        }
    }

    /// New row state, if this event carries one.
    pub fn new_row(&self) -> Option<&T> {
        match self {
            ChangeEvent::Insert { new } | ChangeEvent::Update { new, .. } => Some(new),
            ChangeEvent::Delete { .. } => None,
        }
    }

    /// Previous row state, if this event carries one.
    pub fn old_row(&self) -> Option<&T> {
        match self {
            ChangeEvent::Insert { .. } => None,
            ChangeEvent::Update { old, .. } | ChangeEvent::Delete { old } => old.as_ref(),
        }
    }
}
