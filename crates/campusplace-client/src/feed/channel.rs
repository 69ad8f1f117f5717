//! Change-feed collaborator contract.

use campusplace_proto::{ChannelFilter, RawChange};

use crate::error::Error;

/// Handler invoked with each raw event delivered on a channel.
pub type RawHandler = Box<dyn Fn(RawChange) + Send + Sync>;

/// Opaque reference to a channel on the collaborator's side.
///
/// Exactly one logical subscription owns a ref at a time; it is released
/// through [`ChangeFeed::release`] when that subscription is torn down.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelRef {
    id: u64,
    name: String,
}

impl ChannelRef {
    /// Create a channel reference.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Collaborator-assigned channel id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Logical channel name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// The change-feed transport this layer builds on.
///
/// Lifecycle per channel: open, register one or more filtered handlers,
/// activate (delivery before activation is not guaranteed), release.
/// Reconnection and backoff are the transport's concern, not this crate's.
pub trait ChangeFeed: Send + Sync {
    /// Open a channel scoped to a name.
    fn open_channel(&self, name: &str) -> ChannelRef;

    /// Attach a filtered handler to a channel. Must be called before
    /// [`ChangeFeed::activate`].
    fn register(&self, channel: &ChannelRef, filter: ChannelFilter, handler: RawHandler);

    /// Begin delivery on a channel.
    fn activate(&self, channel: &ChannelRef) -> Result<(), Error>;

    /// Stop delivery and release server-side resources. Safe to call on an
    /// already-released channel.
    fn release(&self, channel: &ChannelRef) -> Result<(), Error>;
}
