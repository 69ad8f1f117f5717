//! Campusplace protocol types.
//!
//! This crate defines the wire-level types shared between the hosted
//! data-service client and the portal's service adapters:
//!
//! - [`event`] - Raw change-feed events and their typed narrowing
//! - [`filter`] - Operation-kind and equality filters for channels and queries
//! - [`query`] - Select/insert/update request IR for the data service
//! - [`error`] - Protocol error types
//!
//! Rows cross the wire as flat snake_case column maps. Application models
//! deserialize from those maps with serde; the narrowing step in
//! [`event::RawChange::narrow`] is the only place untyped records are
//! allowed to exist.

pub mod error;
pub mod event;
pub mod filter;
pub mod query;

pub use error::Error;

// Re-export commonly used types at crate root
pub use event::{ChangeEvent, ChangeKind, RawChange, Row};
pub use filter::{ChannelFilter, EqFilter, OpFilter};
pub use query::{InsertRequest, OrderSpec, SelectQuery, UpdateRequest};

/// Default schema used by the hosted data service.
pub const DEFAULT_SCHEMA: &str = "public";
