//! Protocol error types.

use thiserror::Error;

/// Protocol errors.
#[derive(Debug, Error)]
pub enum Error {
    /// An event arrived missing a field its kind requires, or its row
    /// payload failed shape validation.
    #[error("malformed change event: {0}")]
    MalformedEvent(String),

    /// An operation kind string was not recognized.
    #[error("unknown change kind: {0}")]
    UnknownKind(String),
}
