//! Per-connection session state.
//!
//! Each client connection owns exactly one `SessionState`. Client request
//! handlers mutate it; the content generation loop reads it. Content path
//! changes are broadcast to subscribers, which is how the content manager
//! learns it has to regenerate.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// A single `key:value` label predicate selected by the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filter {
    pub key: String,
    pub value: String,
}

impl Filter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.key, self.value)
    }
}

type ContentPathCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct Observers {
    next_id: u64,
    callbacks: Vec<(u64, ContentPathCallback)>,
}

/// Mutable state for one client connection.
#[derive(Default)]
pub struct SessionState {
    content_path: RwLock<String>,
    content_revision: AtomicU64,
    namespace: RwLock<String>,
    filters: RwLock<Vec<Filter>>,
    observers: Arc<Mutex<Observers>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content_path(&self) -> String {
        self.content_path.read().clone()
    }

    /// Set the content path and notify every content path subscriber.
    ///
    /// Callbacks run on the caller's task after the write lock is released,
    /// so a callback may read the state back.
    pub fn set_content_path(&self, content_path: impl Into<String>) {
        let content_path = content_path.into();
        *self.content_path.write() = content_path.clone();
        self.content_revision.fetch_add(1, Ordering::SeqCst);

        let callbacks: Vec<ContentPathCallback> = self
            .observers
            .lock()
            .callbacks
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        for callback in callbacks {
            callback(&content_path);
        }
    }

    /// Move the content path without notifying subscribers or bumping the
    /// revision. Used for server-side redirects.
    pub fn redirect_content_path(&self, content_path: impl Into<String>) {
        *self.content_path.write() = content_path.into();
    }

    /// Count of `set_content_path` calls. Redirects don't change it.
    pub fn content_path_revision(&self) -> u64 {
        self.content_revision.load(Ordering::SeqCst)
    }

    pub fn namespace(&self) -> String {
        self.namespace.read().clone()
    }

    pub fn set_namespace(&self, namespace: impl Into<String>) {
        *self.namespace.write() = namespace.into();
    }

    pub fn filters(&self) -> Vec<Filter> {
        self.filters.read().clone()
    }

    pub fn set_filters(&self, filters: Vec<Filter>) {
        *self.filters.write() = filters;
    }

    /// Register a callback for content path updates.
    ///
    /// The callback stays registered until the returned `Subscription` is
    /// dropped or cancelled.
    pub fn on_content_path_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let mut observers = self.observers.lock();
        let id = observers.next_id;
        observers.next_id += 1;
        observers.callbacks.push((id, Arc::new(callback)));

        Subscription {
            id,
            observers: Arc::downgrade(&self.observers),
        }
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.observers.lock().callbacks.len()
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("content_path", &*self.content_path.read())
            .field("namespace", &*self.namespace.read())
            .field("filters", &*self.filters.read())
            .finish_non_exhaustive()
    }
}

/// Disposer for a content path subscription.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    observers: Weak<Mutex<Observers>>,
}

impl Subscription {
    /// Unsubscribe explicitly. Equivalent to dropping the handle.
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(observers) = self.observers.upgrade() {
            observers.lock().callbacks.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn getters_return_what_was_set() {
        let state = SessionState::new();
        assert_eq!(state.content_path(), "");

        state.set_content_path("/content/overview");
        state.set_namespace("kube-system");
        state.set_filters(vec![Filter::new("app", "web")]);

        assert_eq!(state.content_path(), "/content/overview");
        assert_eq!(state.namespace(), "kube-system");
        assert_eq!(state.filters(), vec![Filter::new("app", "web")]);
    }

    #[test]
    fn content_path_change_notifies_subscribers() {
        let state = SessionState::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let _sub = state.on_content_path_change(move |path| {
            seen_clone.lock().push(path.to_string());
        });

        state.set_content_path("/content/a");
        state.set_content_path("/content/b");

        assert_eq!(*seen.lock(), vec!["/content/a", "/content/b"]);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let state = SessionState::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let sub = state.on_content_path_change(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        state.set_content_path("/content/a");
        sub.cancel();
        state.set_content_path("/content/b");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.subscriber_count(), 0);
    }

    #[test]
    fn unsubscribing_one_keeps_others() {
        let state = SessionState::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let c1 = Arc::clone(&calls);
        let first = state.on_content_path_change(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        });
        let c2 = Arc::clone(&calls);
        let _second = state.on_content_path_change(move |_| {
            c2.fetch_add(10, Ordering::SeqCst);
        });

        drop(first);
        state.set_content_path("/content/x");

        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn redirect_is_silent() {
        let state = SessionState::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let _sub = state.on_content_path_change(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        state.set_content_path("/content/foo/bar");
        let revision = state.content_path_revision();
        state.redirect_content_path("/content/foo");

        assert_eq!(state.content_path(), "/content/foo");
        assert_eq!(state.content_path_revision(), revision);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callback_can_read_state_back() {
        let state = Arc::new(SessionState::new());
        let observed = Arc::new(Mutex::new(String::new()));

        let weak = Arc::downgrade(&state);
        let observed_clone = Arc::clone(&observed);
        let _sub = state.on_content_path_change(move |_| {
            if let Some(state) = weak.upgrade() {
                *observed_clone.lock() = state.content_path();
            }
        });

        state.set_content_path("/content/workloads");
        assert_eq!(*observed.lock(), "/content/workloads");
    }

    #[test]
    fn subscription_outliving_state_is_harmless() {
        let state = SessionState::new();
        let sub = state.on_content_path_change(|_| {});
        drop(state);
        drop(sub);
    }
}
