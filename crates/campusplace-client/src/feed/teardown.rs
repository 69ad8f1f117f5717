//! Teardown capabilities for live subscriptions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

type Action = Box<dyn FnOnce() + Send>;

/// Capability that stops delivery and releases resources for one
/// subscription (or a group).
///
/// Invoking it more than once is a no-op; the underlying action runs
/// exactly once. The caller owns the lifecycle: dropping a `Teardown`
/// without invoking it leaks the live channel on purpose, so the manager
/// never cancels a subscription behind the caller's back.
pub struct Teardown {
    inner: Arc<Inner>,
}

struct Inner {
    fired: AtomicBool,
    action: Mutex<Option<Action>>,
}

impl Teardown {
    /// Wrap a cleanup action.
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                fired: AtomicBool::new(false),
                action: Mutex::new(Some(Box::new(action))),
            }),
        }
    }

    /// A teardown that does nothing.
    pub fn noop() -> Self {
        Self {
            inner: Arc::new(Inner {
                fired: AtomicBool::new(true),
                action: Mutex::new(None),
            }),
        }
    }

    /// Run the cleanup action. Repeat invocations are no-ops.
    pub fn invoke(&self) {
        if self.inner.fired.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(action) = self.inner.action.lock().take() {
            action();
        }
    }

    /// Whether this teardown has been invoked.
    pub fn is_fired(&self) -> bool {
        self.inner.fired.load(Ordering::SeqCst)
    }

    /// Aggregate several teardowns under one handle.
    ///
    /// Invoking the joined handle invokes every part; teardown is
    /// best-effort cleanup, so a part that fails to release its channel
    /// (parts log their own errors) never stops the rest from running.
    pub fn join(parts: Vec<Teardown>) -> Self {
        Teardown::new(move || {
            for part in &parts {
                part.invoke();
            }
        })
    }
}

impl std::fmt::Debug for Teardown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Teardown")
            .field("fired", &self.is_fired())
            .finish()
    }
}
