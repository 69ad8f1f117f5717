//! Campusplace client - data access and live change notifications.
//!
//! This crate provides the client side of the campusplace portal's hosted
//! data service:
//!
//! - [`DataClient`] - typed select/insert/update against remote tables,
//!   built on an injected [`DataTransport`]
//! - [`FeedManager`] - registration, filtered dispatch, and teardown of
//!   live change-feed subscriptions
//! - [`MemoryStore`] / [`MemoryFeed`] - in-process implementations of both
//!   collaborator seams, used by tests and local development
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use campusplace_client::{ClientConfig, DataClient, FeedManager, MemoryFeed, MemoryStore};
//! use campusplace_proto::{EqFilter, OpFilter, SelectQuery};
//!
//! let store = Arc::new(MemoryStore::new());
//! let client = DataClient::new(store, ClientConfig::default());
//!
//! let feed = Arc::new(MemoryFeed::new());
//! let manager = FeedManager::new(feed);
//! let teardown = manager.subscribe::<serde_json::Map<String, serde_json::Value>, _>(
//!     "students",
//!     Some(EqFilter::new("college_id", 7)),
//!     OpFilter::Update,
//!     |event| println!("{:?}", event.kind()),
//! );
//!
//! // ... later
//! teardown.invoke();
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod transport;

pub use client::DataClient;
pub use config::ClientConfig;
pub use error::Error;
pub use feed::{ChangeFeed, ChannelRef, FeedManager, MemoryFeed, SubscriptionRequest, Teardown};
pub use transport::{DataTransport, MemoryStore};

/// Re-export protocol types.
pub use campusplace_proto as proto;
