// ── Generic reactive entity collection ──
//
// Concurrent storage with O(1) lookups and push-based change notification
// via `watch` channels.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

/// A reactive collection for a single entity type, keyed by its canonical
/// identifier string (network id, peer address).
///
/// Mutations only happen from the store writer task; readers take cheap
/// snapshots or subscribe. Writes come in two flavours: `upsert`/`remove`
/// publish immediately, while `stage_*` defer publication to an explicit
/// `publish()` so a whole refresh lands as one snapshot.
pub(crate) struct EntityCollection<T: Clone + Send + Sync + 'static> {
    by_key: DashMap<String, Arc<T>>,

    /// Version counter, bumped on every publish.
    version: watch::Sender<u64>,

    /// Full snapshot ordered by key, rebuilt on publish.
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            by_key: DashMap::new(),
            version,
            snapshot,
        }
    }

    /// Insert or replace an entity and publish. Returns the previous value.
    pub(crate) fn upsert(&self, key: String, entity: T) -> Option<Arc<T>> {
        let previous = self.stage_upsert(key, entity);
        self.publish();
        previous
    }

    /// Remove an entity by key and publish if it existed.
    pub(crate) fn remove(&self, key: &str) -> Option<Arc<T>> {
        let removed = self.stage_remove(key);
        if removed.is_some() {
            self.publish();
        }
        removed
    }

    pub(crate) fn stage_upsert(&self, key: String, entity: T) -> Option<Arc<T>> {
        self.by_key.insert(key, Arc::new(entity))
    }

    pub(crate) fn stage_remove(&self, key: &str) -> Option<Arc<T>> {
        self.by_key.remove(key).map(|(_, v)| v)
    }

    /// Rebuild the snapshot and notify subscribers.
    pub(crate) fn publish(&self) {
        let mut entries: Vec<(String, Arc<T>)> = self
            .by_key
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let values: Vec<Arc<T>> = entries.into_iter().map(|(_, v)| v).collect();

        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
        self.version.send_modify(|v| *v += 1);
    }

    pub(crate) fn get(&self, key: &str) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// Current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.by_key.iter().map(|r| r.key().clone()).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn upsert_returns_previous_value() {
        let col: EntityCollection<String> = EntityCollection::new();
        assert!(col.upsert("key1".into(), "hello".into()).is_none());
        let prev = col.upsert("key1".into(), "world".into());
        assert_eq!(*prev.unwrap(), "hello");
        assert_eq!(col.len(), 1);
    }

    #[test]
    fn snapshot_is_sorted_by_key() {
        let col: EntityCollection<String> = EntityCollection::new();
        col.upsert("b".into(), "second".into());
        col.upsert("a".into(), "first".into());

        let snap = col.snapshot();
        let values: Vec<&str> = snap.iter().map(|s| s.as_str()).collect();
        assert_eq!(values, ["first", "second"]);
    }

    #[test]
    fn staged_changes_publish_once() {
        let col: EntityCollection<String> = EntityCollection::new();
        let before = col.version();

        col.stage_upsert("a".into(), "x".into());
        col.stage_upsert("b".into(), "y".into());
        assert!(col.snapshot().is_empty());
        assert_eq!(col.version(), before);

        col.publish();
        assert_eq!(col.snapshot().len(), 2);
        assert_eq!(col.version(), before + 1);
    }

    #[test]
    fn remove_missing_key_does_not_publish() {
        let col: EntityCollection<String> = EntityCollection::new();
        let before = col.version();
        assert!(col.remove("nope").is_none());
        assert_eq!(col.version(), before);
    }

    #[tokio::test]
    async fn subscribers_see_new_snapshots() {
        let col: EntityCollection<String> = EntityCollection::new();
        let mut rx = col.subscribe();

        col.upsert("a".into(), "x".into());
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().len(), 1);
        assert!(col.contains("a"));
        assert_eq!(*col.get("a").unwrap(), "x");
    }
}
