//! Client error types.

use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level failure reaching the hosted service.
    #[error("transport error: {0}")]
    Transport(String),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Proto(#[from] campusplace_proto::Error),

    /// Row (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A value handed to the client did not serialize to a row object.
    #[error("payload for {0} is not a row object")]
    NotARow(String),

    /// Change-feed channel failure (activation or release).
    #[error("channel error: {0}")]
    Channel(String),

    /// The service rejected the request.
    #[error("server error {code}: {message}")]
    Server {
        /// Service error code.
        code: u32,
        /// Human-readable message.
        message: String,
    },

    /// A single-row fetch matched nothing.
    #[error("no row found in {0}")]
    NotFound(String),
}
