//! Evented state-variable set shared between RMRender crates.
//!
//! This crate provides [`VariableSet`], a mapping from variable name to its
//! current string value, with synchronous change notification. It carries no
//! transport semantics: the transport layer decides *which* variables exist
//! and *when* they change, this crate only guarantees the notification
//! contract:
//!
//! - a notification fires only when a value actually changes, never on a
//!   no-op write;
//! - listeners are invoked in registration order, on the caller's thread;
//! - listeners receive `(name, old_value, new_value)`.
//!
//! Listeners must be non-blocking: the publish layer that forwards changes to
//! remote subscribers owns its own buffering. Calling [`VariableSet::set`]
//! from within a listener is a contract violation and panics in debug builds.
//!
//! # Examples
//!
//! ```rust
//! use rmrevents::VariableSet;
//!
//! let variables = VariableSet::new();
//! let token = variables.subscribe(std::sync::Arc::new(|name, old, new| {
//!     println!("{name}: '{old}' -> '{new}'");
//! }));
//!
//! assert!(variables.set("TransportState", "STOPPED"));
//! assert!(!variables.set("TransportState", "STOPPED")); // no-op, no event
//! variables.unsubscribe(token);
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use tracing::warn;

/// Well-known variable names published by the renderer.
///
/// Kept here so that the transport layer and its observers agree on the
/// vocabulary without depending on each other.
pub mod names {
    pub const TRANSPORT_STATE: &str = "TransportState";
    pub const TRANSPORT_STATUS: &str = "TransportStatus";
    pub const CURRENT_TRACK_URI: &str = "CurrentTrackURI";
    pub const NEXT_TRACK_URI: &str = "NextTrackURI";
    pub const CURRENT_TRACK_METADATA: &str = "CurrentTrackMetaData";
    pub const CURRENT_TRACK_DURATION: &str = "CurrentTrackDuration";
    pub const VOLUME: &str = "Volume";
    pub const MUTE: &str = "Mute";
}

/// Callback invoked with `(name, old_value, new_value)` on every effective
/// variable change.
pub type VariableListener = Arc<dyn Fn(&str, &str, &str) + Send + Sync>;

/// Opaque handle returned by [`VariableSet::subscribe`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerToken(u64);

struct Inner {
    values: HashMap<String, String>,
    listeners: Vec<(ListenerToken, VariableListener)>,
    next_token: u64,
    /// Threads currently walking the listener list. Used to fail fast on
    /// listener reentrancy; concurrent notifiers each leave their own mark.
    notifying_on: Vec<ThreadId>,
}

/// Removes the calling thread's reentrancy mark once its listener walk is
/// over, including when a listener panics and unwinds through `set`.
struct NotifyGuard<'a> {
    inner: &'a Mutex<Inner>,
    thread: ThreadId,
}

impl Drop for NotifyGuard<'_> {
    fn drop(&mut self) {
        self.inner.lock().notifying_on.retain(|t| *t != self.thread);
    }
}

/// Name→value mapping with change-only subscriber notification.
///
/// Cheap to clone; clones share the same underlying map and listener list.
#[derive(Clone)]
pub struct VariableSet {
    inner: Arc<Mutex<Inner>>,
}

impl VariableSet {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                values: HashMap::new(),
                listeners: Vec::new(),
                next_token: 0,
                notifying_on: Vec::new(),
            })),
        }
    }

    /// Updates `name` to `value` and notifies listeners iff the value
    /// actually changed. Returns `true` when a change was published.
    ///
    /// A variable set for the first time notifies with an empty `old_value`.
    ///
    /// # Panics
    ///
    /// In debug builds, panics when called from within a listener of this
    /// same set (reentrancy is a contract violation). In release builds the
    /// reentrant write is dropped with a log record.
    pub fn set(&self, name: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        let me = thread::current().id();
        let (old, listeners) = {
            let mut inner = self.inner.lock();
            if inner.notifying_on.contains(&me) {
                debug_assert!(
                    false,
                    "VariableSet::set('{name}') re-entered from a listener"
                );
                warn!(
                    target: "rmrevents",
                    "dropping reentrant write to variable '{}'", name
                );
                return false;
            }
            if inner.values.get(name).is_some_and(|v| *v == value) {
                return false;
            }
            let old = inner
                .values
                .insert(name.to_string(), value.clone())
                .unwrap_or_default();
            inner.notifying_on.push(me);
            let listeners: Vec<VariableListener> = inner
                .listeners
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect();
            (old, listeners)
        };
        let _guard = NotifyGuard {
            inner: &self.inner,
            thread: me,
        };

        // Listeners run on the caller's thread, outside the lock, so that a
        // slow observer cannot stall writers on other threads.
        for listener in &listeners {
            listener(name, &old, &value);
        }
        true
    }

    /// Returns the current value of `name`, if it was ever set.
    pub fn get(&self, name: &str) -> Option<String> {
        self.inner.lock().values.get(name).cloned()
    }

    /// Returns a copy of the whole mapping, for initial event dumps.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.inner.lock().values.clone()
    }

    /// Registers a listener; listeners are invoked in registration order.
    pub fn subscribe(&self, listener: VariableListener) -> ListenerToken {
        let mut inner = self.inner.lock();
        let token = ListenerToken(inner.next_token);
        inner.next_token += 1;
        inner.listeners.push((token, listener));
        token
    }

    /// Removes a listener. Returns `false` when the token is unknown.
    pub fn unsubscribe(&self, token: ListenerToken) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|(t, _)| *t != token);
        inner.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }
}

impl Default for VariableSet {
    fn default() -> Self {
        Self::new()
    }
}
