//! In-process change feed used by tests and local development.

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::error;

use campusplace_proto::{ChannelFilter, RawChange};

use super::channel::{ChangeFeed, ChannelRef, RawHandler};
use crate::error::Error;

struct ChannelState {
    name: String,
    active: AtomicBool,
    handlers: Mutex<Vec<(ChannelFilter, RawHandler)>>,
}

/// An in-process [`ChangeFeed`].
///
/// Delivery semantics match the hosted transport where it matters to this
/// layer: events only reach channels that are activated at publish time,
/// each channel's handlers run sequentially in publish order, and release
/// is idempotent. Failure injection hooks cover the activation and release
/// paths.
#[derive(Default)]
pub struct MemoryFeed {
    channels: DashMap<u64, Arc<ChannelState>>,
    next_id: AtomicU64,
    // Serializes publishes so arrival order is stable under test.
    dispatch: Mutex<()>,
    fail_activation: AtomicBool,
    fail_release: Mutex<HashSet<String>>,
    released: Mutex<HashSet<String>>,
}

impl MemoryFeed {
    /// Create an empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to every active channel whose filter matches.
    /// Returns the number of handler invocations.
    pub fn publish(&self, change: RawChange) -> usize {
        let _order = self.dispatch.lock();

        let states: Vec<Arc<ChannelState>> = self
            .channels
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut delivered = 0;
        for state in states {
            if !state.active.load(Ordering::SeqCst) {
                continue;
            }
            let handlers = state.handlers.lock();
            for (filter, handler) in handlers.iter() {
                if filter.matches(&change) {
                    if catch_unwind(AssertUnwindSafe(|| handler(change.clone()))).is_err() {
                        error!(channel = %state.name, "handler panicked during dispatch");
                    }
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Make every subsequent activation fail.
    pub fn fail_activation(&self, fail: bool) {
        self.fail_activation.store(fail, Ordering::SeqCst);
    }

    /// Make releasing the named channel fail.
    pub fn fail_release_of(&self, name: impl Into<String>) {
        self.fail_release.lock().insert(name.into());
    }

    /// Whether a channel with this name has been released.
    pub fn released(&self, name: &str) -> bool {
        self.released.lock().contains(name)
    }

    /// Number of open channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl ChangeFeed for MemoryFeed {
    fn open_channel(&self, name: &str) -> ChannelRef {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.channels.insert(
            id,
            Arc::new(ChannelState {
                name: name.to_string(),
                active: AtomicBool::new(false),
                handlers: Mutex::new(vec![]),
            }),
        );
        ChannelRef::new(id, name)
    }

    fn register(&self, channel: &ChannelRef, filter: ChannelFilter, handler: RawHandler) {
        if let Some(state) = self.channels.get(&channel.id()) {
            state.handlers.lock().push((filter, handler));
        }
    }

    fn activate(&self, channel: &ChannelRef) -> Result<(), Error> {
        if self.fail_activation.load(Ordering::SeqCst) {
            return Err(Error::Channel(format!(
                "activation refused for {}",
                channel
            )));
        }
        match self.channels.get(&channel.id()) {
            Some(state) => {
                state.active.store(true, Ordering::SeqCst);
                Ok(())
            }
            None => Err(Error::Channel(format!("unknown channel {}", channel))),
        }
    }

    fn release(&self, channel: &ChannelRef) -> Result<(), Error> {
        if self.fail_release.lock().contains(channel.name()) {
            return Err(Error::Channel(format!(
                "release refused for {}",
                channel
            )));
        }
        // Idempotent: releasing an unknown or already-released channel is Ok.
        self.channels.remove(&channel.id());
        self.released.lock().insert(channel.name().to_string());
        Ok(())
    }
}
