// ── Observable per-resource state ──
//
// Collection snapshot plus loading/error flags behind `watch` channels,
// with a DashMap index for O(1) keyed lookups. Subscribers see every
// change; snapshot reads are cheap `Arc` clones.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;

/// Observable state of one mirrored collection.
///
/// Invariants maintained by the owning store:
/// - `loading` is true only while an operation is in flight and is
///   reset on every exit path.
/// - `error` is `Some` only immediately after a failed operation and is
///   cleared when the next one begins.
/// - The snapshot is never cleared while loading; a refresh keeps stale
///   data visible until the replacement arrives.
pub(crate) struct ResourceState<T: Send + Sync + 'static> {
    /// Keyed index over the current snapshot (MAC or filename).
    by_key: DashMap<String, Arc<T>>,

    /// Full snapshot in deterministic order, rebuilt on every refetch.
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,

    loading: watch::Sender<bool>,
    error: watch::Sender<Option<String>>,

    /// When the collection last matched the server.
    last_synced: watch::Sender<Option<DateTime<Utc>>>,
}

impl<T: Send + Sync + 'static> ResourceState<T> {
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        let (loading, _) = watch::channel(false);
        let (error, _) = watch::channel(None);
        let (last_synced, _) = watch::channel(None);

        Self {
            by_key: DashMap::new(),
            snapshot,
            loading,
            error,
            last_synced,
        }
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Enter the loading state: flag set, stale error cleared.
    pub(crate) fn begin(&self) {
        self.loading.send_replace(true);
        self.error.send_replace(None);
    }

    /// Leave the loading state after success.
    pub(crate) fn finish(&self) {
        self.loading.send_replace(false);
    }

    /// Record a failure and leave the loading state.
    pub(crate) fn fail(&self, message: String) {
        self.error.send_replace(Some(message));
        self.loading.send_replace(false);
    }

    /// Replace the whole collection with a freshly fetched one.
    ///
    /// Entries arrive in the order the snapshot should expose; on a
    /// duplicate key the first occurrence wins in both the index and
    /// the snapshot, so the one-entry-per-key invariant holds.
    pub(crate) fn replace(&self, entries: Vec<(String, T)>) {
        self.by_key.clear();

        let mut snapshot = Vec::with_capacity(entries.len());
        for (key, entity) in entries {
            if self.by_key.contains_key(&key) {
                continue;
            }
            let entity = Arc::new(entity);
            self.by_key.insert(key, Arc::clone(&entity));
            snapshot.push(entity);
        }

        self.snapshot.send_replace(Arc::new(snapshot));
        self.last_synced.send_replace(Some(Utc::now()));
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// Current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    /// Look up an entity by its key.
    pub(crate) fn get(&self, key: &str) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }

    pub(crate) fn loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub(crate) fn error(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    pub(crate) fn last_synced(&self) -> Option<DateTime<Utc>> {
        *self.last_synced.borrow()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub(crate) fn subscribe_error(&self) -> watch::Receiver<Option<String>> {
        self.error.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_and_empty() {
        let state: ResourceState<String> = ResourceState::new();
        assert!(!state.loading());
        assert!(state.error().is_none());
        assert!(state.snapshot().is_empty());
        assert!(state.last_synced().is_none());
    }

    #[test]
    fn begin_sets_loading_and_clears_error() {
        let state: ResourceState<String> = ResourceState::new();
        state.fail("boom".into());
        assert_eq!(state.error().as_deref(), Some("boom"));

        state.begin();
        assert!(state.loading());
        assert!(state.error().is_none());
    }

    #[test]
    fn fail_records_message_and_releases_loading() {
        let state: ResourceState<String> = ResourceState::new();
        state.begin();
        state.fail("server unreachable".into());

        assert!(!state.loading());
        assert_eq!(state.error().as_deref(), Some("server unreachable"));
    }

    #[test]
    fn replace_rebuilds_snapshot_and_index() {
        let state: ResourceState<String> = ResourceState::new();
        state.replace(vec![("a".into(), "x".into()), ("b".into(), "y".into())]);

        assert_eq!(state.len(), 2);
        assert_eq!(state.snapshot().len(), 2);
        assert_eq!(*state.get("a").unwrap(), "x");
        assert!(state.last_synced().is_some());
    }

    #[test]
    fn replace_drops_stale_entries() {
        let state: ResourceState<String> = ResourceState::new();
        state.replace(vec![("a".into(), "x".into())]);
        state.replace(vec![("b".into(), "y".into())]);

        assert!(state.get("a").is_none());
        assert_eq!(state.snapshot().len(), 1);
    }

    #[test]
    fn replace_keeps_one_entry_per_key() {
        let state: ResourceState<String> = ResourceState::new();
        state.replace(vec![("a".into(), "x".into()), ("a".into(), "x2".into())]);

        assert_eq!(state.len(), 1);
        assert_eq!(state.snapshot().len(), 1);
        assert_eq!(*state.get("a").unwrap(), "x");
    }

    #[test]
    fn failure_keeps_previous_snapshot() {
        let state: ResourceState<String> = ResourceState::new();
        state.replace(vec![("a".into(), "x".into())]);

        state.begin();
        state.fail("boom".into());

        assert_eq!(state.snapshot().len(), 1);
    }

    #[test]
    fn subscribers_observe_changes() {
        let state: ResourceState<String> = ResourceState::new();
        let mut loading_rx = state.subscribe_loading();
        let snapshot_rx = state.subscribe();

        state.begin();
        assert!(loading_rx.has_changed().unwrap());
        assert!(*loading_rx.borrow_and_update());

        state.replace(vec![("a".into(), "x".into())]);
        assert_eq!(snapshot_rx.borrow().len(), 1);
    }
}
