//! Live change-feed subscriptions.
//!
//! The hosted service pushes row-level change events over named channels.
//! [`FeedManager`] owns the mapping from logical subscriptions to live
//! channels: it derives channel names, registers kind/predicate filters,
//! narrows raw events into typed [`campusplace_proto::ChangeEvent`]s, and
//! hands back idempotent [`Teardown`] capabilities.

mod channel;
mod manager;
mod memory;
mod teardown;

pub use channel::{ChangeFeed, ChannelRef, RawHandler};
pub use manager::{FeedManager, SubscriptionRequest};
pub use memory::MemoryFeed;
pub use teardown::Teardown;
