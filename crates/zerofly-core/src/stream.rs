// ── Reactive entity streams ──
//
// Per-collection views and the change-set stream handed to consumers.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::store::ChangeSet;

/// Live view of one entity collection, addressed by the key the store uses
/// for it (network id, peer address).
///
/// Used to wait for an entity to reach a state that only a later poll can
/// reveal, such as a joined network receiving its config.
pub struct EntityStream<T: Send + Sync + 'static> {
    receiver: watch::Receiver<Arc<Vec<Arc<T>>>>,
    key_of: fn(&T) -> &str,
}

impl<T: Send + Sync + 'static> EntityStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<Arc<Vec<Arc<T>>>>, key_of: fn(&T) -> &str) -> Self {
        Self { receiver, key_of }
    }

    /// Latest published collection, ordered by key.
    pub fn current(&self) -> Arc<Vec<Arc<T>>> {
        self.receiver.borrow().clone()
    }

    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        find(&self.receiver.borrow(), self.key_of, key)
    }

    /// Wait for the next publish. `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<Arc<Vec<Arc<T>>>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Resolve with the entity under `key` as soon as it exists and
    /// satisfies `ready`, checking the current collection first. `None` once
    /// the store is gone.
    pub async fn wait_for(
        &mut self,
        key: &str,
        mut ready: impl FnMut(&T) -> bool,
    ) -> Option<Arc<T>> {
        let key_of = self.key_of;
        let items = self
            .receiver
            .wait_for(|items| find(items, key_of, key).is_some_and(|e| ready(e.as_ref())))
            .await
            .ok()?;
        find(&items, key_of, key)
    }
}

fn find<T>(items: &[Arc<T>], key_of: fn(&T) -> &str, key: &str) -> Option<Arc<T>> {
    items.iter().find(|e| key_of(e) == key).cloned()
}

/// `Stream` of change sets. Lagging subscribers skip what they missed
/// instead of failing; the model snapshot is always available to catch up.
pub struct ChangeStream {
    inner: BroadcastStream<Arc<ChangeSet>>,
}

impl ChangeStream {
    pub(crate) fn new(receiver: broadcast::Receiver<Arc<ChangeSet>>) -> Self {
        Self {
            inner: BroadcastStream::new(receiver),
        }
    }
}

impl Stream for ChangeStream {
    type Item = Arc<ChangeSet>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                    tracing::debug!(skipped, "change subscriber lagged");
                }
                Poll::Ready(Some(Ok(changes))) => return Poll::Ready(Some(changes)),
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::StreamExt;

    use super::*;
    use crate::store::Change;

    #[tokio::test]
    async fn change_stream_skips_lag() {
        let (tx, rx) = broadcast::channel(1);
        let mut stream = ChangeStream::new(rx);

        for address in ["aaaaaaaaaa", "bbbbbbbbbb"] {
            tx.send(Arc::new(ChangeSet {
                peers: vec![Change::Added {
                    key: address.to_string(),
                }],
                ..Default::default()
            }))
            .unwrap();
        }
        drop(tx);

        let got = stream.next().await.unwrap();
        assert_eq!(got.peers[0].key(), "bbbbbbbbbb");
        assert!(stream.next().await.is_none());
    }

    struct Item {
        key: String,
        settled: bool,
    }

    fn items(entries: &[(&str, bool)]) -> Arc<Vec<Arc<Item>>> {
        Arc::new(
            entries
                .iter()
                .map(|(key, settled)| {
                    Arc::new(Item {
                        key: (*key).to_owned(),
                        settled: *settled,
                    })
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn wait_for_resolves_on_a_later_publish() {
        let (tx, rx) = watch::channel(items(&[("a", false)]));
        let mut stream = EntityStream::new(rx, |i| i.key.as_str());
        assert!(stream.get("a").is_some());
        assert!(stream.get("b").is_none());

        let waiter = tokio::spawn(async move { stream.wait_for("b", |i| i.settled).await });
        tx.send_replace(items(&[("a", true), ("b", false)]));
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        tx.send_replace(items(&[("a", true), ("b", true)]));
        let found = waiter.await.unwrap().unwrap();
        assert_eq!(found.key, "b");
        assert!(found.settled);
    }

    #[tokio::test]
    async fn wait_for_checks_current_state_and_ends_with_the_store() {
        let (tx, rx) = watch::channel(items(&[("a", true)]));
        let mut stream = EntityStream::new(rx, |i| i.key.as_str());
        assert!(stream.wait_for("a", |i| i.settled).await.is_some());

        drop(tx);
        assert!(stream.wait_for("missing", |_| true).await.is_none());
        assert!(stream.changed().await.is_none());
    }
}
