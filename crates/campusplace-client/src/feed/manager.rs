//! Subscription manager for the change feed.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use tracing::{debug, error, trace, warn};

use campusplace_proto::{ChangeEvent, ChannelFilter, EqFilter, OpFilter, RawChange, Row};

use super::channel::{ChangeFeed, ChannelRef, RawHandler};
use super::teardown::Teardown;

/// Owns the mapping from logical subscriptions to live channels.
///
/// A logical subscription is a (table, predicate, kind) interest plus a
/// callback. The manager opens one channel per logical name, narrows the
/// raw events it receives into typed [`ChangeEvent`]s, and returns a
/// [`Teardown`] that releases the channel exactly once.
///
/// Events reach a subscription's callback sequentially, in the order the
/// feed emits them; the manager never reorders or batches. Events emitted
/// before the channel finishes activating may be dropped, so callers that
/// need a consistent snapshot fetch current state first and treat the feed
/// as deltas.
pub struct FeedManager {
    feed: Arc<dyn ChangeFeed>,
    channels: Arc<DashMap<String, ChannelRef>>,
}

impl FeedManager {
    /// Create a manager over a change-feed transport.
    pub fn new(feed: Arc<dyn ChangeFeed>) -> Self {
        Self {
            feed,
            channels: Arc::new(DashMap::new()),
        }
    }

    /// Number of live channels held by this manager.
    pub fn active_channels(&self) -> usize {
        self.channels.len()
    }

    /// Subscribe to changes on a table.
    ///
    /// Opens one channel named after the target and predicate, so repeated
    /// subscriptions to the same logical interest share a channel instead
    /// of leaking a second one. The callback must not block the dispatch
    /// path; long-running work belongs on a task of its own.
    ///
    /// If channel activation fails the error is logged and the returned
    /// teardown still works; the subscription is simply inert until the
    /// caller tears it down and retries.
    pub fn subscribe<T, F>(
        &self,
        table: &str,
        predicate: Option<EqFilter>,
        kind: OpFilter,
        callback: F,
    ) -> Teardown
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(ChangeEvent<T>) + Send + Sync + 'static,
    {
        let handler = typed_handler(table.to_string(), None, callback);
        self.subscribe_raw(table, predicate, kind, handler)
    }

    /// Subscribe to updates on a table, suppressing updates where none of
    /// the named fields actually changed.
    ///
    /// The service's filter language only supports equality on request
    /// parameters, so every update still crosses the wire; the diff runs
    /// here, after receipt, and only delivery to the callback is
    /// suppressed. An update arriving without its previous row state is
    /// delivered optimistically rather than silently dropped.
    pub fn subscribe_with_change_filter<T, F>(
        &self,
        table: &str,
        predicate: Option<EqFilter>,
        compare_fields: Vec<String>,
        callback: F,
    ) -> Teardown
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(ChangeEvent<T>) + Send + Sync + 'static,
    {
        let handler = typed_handler(table.to_string(), Some(compare_fields), callback);
        self.subscribe_raw(table, predicate, OpFilter::Update, handler)
    }

    /// Establish a group of subscriptions under a single teardown.
    ///
    /// Each request is subscribed individually; the returned handle tears
    /// all of them down and keeps going past individual release failures.
    pub fn subscribe_multi(&self, requests: Vec<SubscriptionRequest>) -> Teardown {
        let parts = requests
            .into_iter()
            .map(|request| {
                let SubscriptionRequest {
                    table,
                    predicate,
                    kind,
                    callback,
                } = request;
                self.subscribe::<Row, _>(&table, predicate, kind, move |event| callback(event))
            })
            .collect();
        Teardown::join(parts)
    }

    /// Derive the logical channel name for a target and predicate.
    fn channel_name(table: &str, predicate: Option<&EqFilter>) -> String {
        match predicate {
            Some(p) => format!("{}-{}-{}", table, p.column, p.value_key()),
            None => format!("{}-changes", table),
        }
    }

    fn subscribe_raw(
        &self,
        table: &str,
        predicate: Option<EqFilter>,
        kind: OpFilter,
        handler: RawHandler,
    ) -> Teardown {
        let name = Self::channel_name(table, predicate.as_ref());

        let mut created = false;
        let channel = match self.channels.entry(name.clone()) {
            Entry::Occupied(entry) => {
                // Single-winner: the second caller gets the existing
                // channel's lifecycle, never a second live channel.
                warn!(
                    channel = %name,
                    "logical subscription already active, handing back existing channel"
                );
                entry.get().clone()
            }
            Entry::Vacant(slot) => {
                let mut filter = ChannelFilter::new(table, kind);
                filter.predicate = predicate;
                let channel = self.feed.open_channel(&name);
                self.feed.register(&channel, filter, handler);
                slot.insert(channel.clone());
                created = true;
                channel
            }
        };

        if created {
            match self.feed.activate(&channel) {
                Ok(()) => debug!(channel = %name, table, kind = %kind, "subscription active"),
                Err(err) => error!(
                    channel = %name,
                    error = %err,
                    "channel activation failed, subscription is inert until torn down"
                ),
            }
        }

        let feed = Arc::clone(&self.feed);
        let channels = Arc::clone(&self.channels);
        Teardown::new(move || {
            // Drop the registry entry first so a concurrent re-subscribe
            // opens a fresh channel instead of finding this dying one.
            channels.remove_if(&name, |_, live| live.id() == channel.id());
            if let Err(err) = feed.release(&channel) {
                warn!(channel = %name, error = %err, "channel release failed");
            } else {
                debug!(channel = %name, "subscription torn down");
            }
        })
    }
}

impl std::fmt::Debug for FeedManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedManager")
            .field("active_channels", &self.active_channels())
            .finish()
    }
}

/// One member of a [`FeedManager::subscribe_multi`] group. Callbacks here
/// receive untyped rows; groups that want typed payloads subscribe each
/// member through [`FeedManager::subscribe`] and join the teardowns.
pub struct SubscriptionRequest {
    table: String,
    predicate: Option<EqFilter>,
    kind: OpFilter,
    callback: Box<dyn Fn(ChangeEvent<Row>) + Send + Sync>,
}

impl SubscriptionRequest {
    /// Create a request for a table and operation kind.
    pub fn new(
        table: impl Into<String>,
        kind: OpFilter,
        callback: impl Fn(ChangeEvent<Row>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            table: table.into(),
            predicate: None,
            kind,
            callback: Box::new(callback),
        }
    }

    /// Restrict the request to rows matching an equality predicate.
    pub fn with_predicate(mut self, predicate: EqFilter) -> Self {
        self.predicate = Some(predicate);
        self
    }
}

impl std::fmt::Debug for SubscriptionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRequest")
            .field("table", &self.table)
            .field("kind", &self.kind)
            .field("predicate", &self.predicate)
            .finish()
    }
}

/// Build the raw handler for a typed subscription: optional field-diff
/// suppression, shape narrowing, and callback isolation.
fn typed_handler<T, F>(table: String, compare_fields: Option<Vec<String>>, callback: F) -> RawHandler
where
    T: DeserializeOwned + Send + 'static,
    F: Fn(ChangeEvent<T>) + Send + Sync + 'static,
{
    Box::new(move |raw: RawChange| {
        if let Some(fields) = &compare_fields {
            if unchanged(&raw, fields) {
                trace!(table = %table, "suppressing update with unchanged fields");
                return;
            }
        }

        match raw.narrow::<T>() {
            Ok(event) => {
                // A panicking subscriber must not take down dispatch for
                // everyone else sharing the feed.
                if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                    error!(table = %table, "subscriber callback panicked");
                }
            }
            Err(err) => {
                warn!(table = %table, error = %err, "discarding malformed change event");
            }
        }
    })
}

/// Whether every compared field is identical between the old and new row.
/// Missing previous state counts as changed so a possibly-real change is
/// delivered rather than dropped.
fn unchanged(raw: &RawChange, fields: &[String]) -> bool {
    match (&raw.old_row, &raw.new_row) {
        (Some(old), Some(new)) => fields.iter().all(|field| old.get(field) == new.get(field)),
        _ => {
            warn!(table = %raw.table, "update event missing previous state, delivering optimistically");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::memory::MemoryFeed;
    use parking_lot::Mutex;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Student {
        id: i64,
        verification_status: String,
    }

    fn row(pairs: &[(&str, serde_json::Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn student_row(id: i64, status: &str) -> Row {
        row(&[
            ("id", json!(id)),
            ("verification_status", json!(status)),
        ])
    }

    fn setup() -> (Arc<MemoryFeed>, FeedManager) {
        let feed = Arc::new(MemoryFeed::new());
        let manager = FeedManager::new(feed.clone());
        (feed, manager)
    }

    #[test]
    fn test_kind_and_predicate_filtering() {
        let (feed, manager) = setup();
        let seen: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(vec![]));

        let sink = seen.clone();
        let _teardown = manager.subscribe::<Student, _>(
            "students",
            Some(EqFilter::new("id", 7)),
            OpFilter::Update,
            move |event| {
                sink.lock().push(event.new_row().unwrap().id);
            },
        );

        // Mixed stream: wrong kind, wrong id, and the one match.
        feed.publish(RawChange::insert("students", student_row(7, "pending")));
        feed.publish(RawChange::update(
            "students",
            student_row(3, "pending"),
            student_row(3, "verified"),
        ));
        feed.publish(RawChange::delete("students", student_row(7, "pending")));
        feed.publish(RawChange::update(
            "students",
            student_row(7, "pending"),
            student_row(7, "verified"),
        ));

        assert_eq!(seen.lock().clone(), vec![7]);
    }

    #[test]
    fn test_ordering_preserved() {
        let (feed, manager) = setup();
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(vec![]));

        let sink = seen.clone();
        let _teardown = manager.subscribe::<Student, _>(
            "students",
            None,
            OpFilter::Update,
            move |event| {
                sink.lock()
                    .push(event.new_row().unwrap().verification_status.clone());
            },
        );

        for status in ["a", "b", "c", "d"] {
            feed.publish(RawChange::update(
                "students",
                student_row(1, "x"),
                student_row(1, status),
            ));
        }

        assert_eq!(seen.lock().clone(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_teardown_releases_channel_once() {
        let (feed, manager) = setup();
        let teardown =
            manager.subscribe::<Student, _>("students", None, OpFilter::Any, |_| {});

        assert_eq!(manager.active_channels(), 1);

        teardown.invoke();
        teardown.invoke();
        teardown.invoke();

        assert_eq!(manager.active_channels(), 0);
        assert!(feed.released("students-changes"));

        // No delivery after teardown.
        let delivered = feed.publish(RawChange::insert("students", student_row(1, "pending")));
        assert_eq!(delivered, 0);
    }

    #[test]
    fn test_duplicate_subscription_single_winner() {
        let (feed, manager) = setup();
        let first_seen = Arc::new(Mutex::new(0u32));

        let sink = first_seen.clone();
        let first = manager.subscribe::<Student, _>("students", None, OpFilter::Any, move |_| {
            *sink.lock() += 1;
        });
        let second =
            manager.subscribe::<Student, _>("students", None, OpFilter::Any, |_| {});

        // One channel only; the winner's handler stays attached.
        assert_eq!(manager.active_channels(), 1);
        feed.publish(RawChange::insert("students", student_row(1, "pending")));
        assert_eq!(*first_seen.lock(), 1);

        // Either handle releases the shared channel; the other is a no-op.
        second.invoke();
        assert_eq!(manager.active_channels(), 0);
        first.invoke();
        assert!(feed.released("students-changes"));
    }

    #[test]
    fn test_change_filter_suppresses_unchanged_field() {
        let (feed, manager) = setup();
        let seen = Arc::new(Mutex::new(0u32));

        let sink = seen.clone();
        let _teardown = manager.subscribe_with_change_filter::<Student, _>(
            "students",
            None,
            vec!["verification_status".into()],
            move |_| {
                *sink.lock() += 1;
            },
        );

        // Same status on both sides: suppressed.
        feed.publish(RawChange::update(
            "students",
            student_row(1, "pending"),
            student_row(1, "pending"),
        ));
        assert_eq!(*seen.lock(), 0);

        // Status changed: delivered.
        feed.publish(RawChange::update(
            "students",
            student_row(1, "pending"),
            student_row(1, "verified"),
        ));
        assert_eq!(*seen.lock(), 1);
    }

    #[test]
    fn test_change_filter_missing_old_row_delivers() {
        let (feed, manager) = setup();
        let seen = Arc::new(Mutex::new(0u32));

        let sink = seen.clone();
        let _teardown = manager.subscribe_with_change_filter::<Student, _>(
            "students",
            None,
            vec!["verification_status".into()],
            move |_| {
                *sink.lock() += 1;
            },
        );

        let mut malformed = RawChange::update(
            "students",
            Row::new(),
            student_row(1, "verified"),
        );
        malformed.old_row = None;
        feed.publish(malformed);

        assert_eq!(*seen.lock(), 1);
    }

    #[test]
    fn test_malformed_event_does_not_stop_dispatch() {
        let (feed, manager) = setup();
        let seen = Arc::new(Mutex::new(0u32));

        let sink = seen.clone();
        let _teardown =
            manager.subscribe::<Student, _>("students", None, OpFilter::Insert, move |_| {
                *sink.lock() += 1;
            });

        // Insert with a row that fails shape validation: dropped.
        feed.publish(RawChange::insert(
            "students",
            row(&[("id", json!("not-a-number"))]),
        ));
        assert_eq!(*seen.lock(), 0);

        // Dispatch keeps working afterwards.
        feed.publish(RawChange::insert("students", student_row(2, "pending")));
        assert_eq!(*seen.lock(), 1);
    }

    #[test]
    fn test_panicking_callback_is_isolated() {
        let (feed, manager) = setup();
        let seen = Arc::new(Mutex::new(0u32));

        let _panicky =
            manager.subscribe::<Student, _>("students", None, OpFilter::Insert, |_| {
                panic!("subscriber bug");
            });

        let sink = seen.clone();
        let _healthy = manager.subscribe::<Student, _>(
            "students",
            Some(EqFilter::new("id", 1)),
            OpFilter::Insert,
            move |_| {
                *sink.lock() += 1;
            },
        );

        feed.publish(RawChange::insert("students", student_row(1, "pending")));
        assert_eq!(*seen.lock(), 1);
    }

    #[test]
    fn test_activation_failure_still_returns_teardown() {
        let (feed, manager) = setup();
        feed.fail_activation(true);

        let teardown =
            manager.subscribe::<Student, _>("students", None, OpFilter::Any, |_| {});

        // Inert but cleanly releasable.
        assert_eq!(feed.publish(RawChange::insert("students", student_row(1, "p"))), 0);
        teardown.invoke();
        assert_eq!(manager.active_channels(), 0);
    }

    #[test]
    fn test_subscribe_multi_tears_everything_down() {
        let (feed, manager) = setup();

        let teardown = manager.subscribe_multi(vec![
            SubscriptionRequest::new("allocations", OpFilter::Any, |_| {})
                .with_predicate(EqFilter::new("college_id", 4)),
            SubscriptionRequest::new("allocation_events", OpFilter::Insert, |_| {}),
            SubscriptionRequest::new("notifications", OpFilter::Insert, |_| {}),
        ]);
        assert_eq!(manager.active_channels(), 3);

        // One release fails; the others must still be released.
        feed.fail_release_of("allocation_events-changes");
        teardown.invoke();

        assert!(feed.released("allocations-college_id-4"));
        assert!(feed.released("notifications-changes"));
        assert_eq!(manager.active_channels(), 0);
    }

    #[test]
    fn test_channel_name_derivation() {
        assert_eq!(
            FeedManager::channel_name("students", None),
            "students-changes"
        );
        assert_eq!(
            FeedManager::channel_name("students", Some(&EqFilter::new("college_id", 42))),
            "students-college_id-42"
        );
        assert_eq!(
            FeedManager::channel_name("students", Some(&EqFilter::new("status", "pending"))),
            "students-status-pending"
        );
    }
}
