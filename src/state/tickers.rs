use std::future::Future;

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::task::JoinHandle;
use uuid::Uuid;

struct TickerEntry {
    generation: Uuid,
    handle: JoinHandle<()>,
}

/// Table of background tickers, at most one live ticker per room.
#[derive(Default)]
pub struct RoomTickers {
    entries: DashMap<String, TickerEntry>,
}

impl RoomTickers {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the ticker built by `make` unless a live one already runs for `room_id`.
    ///
    /// `make` receives the generation the ticker must pass to [`RoomTickers::finish`].
    /// Returns whether a ticker was spawned.
    pub fn start<F, Fut>(&self, room_id: &str, make: F) -> bool
    where
        F: FnOnce(Uuid) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        match self.entries.entry(room_id.to_string()) {
            Entry::Occupied(entry) if !entry.get().handle.is_finished() => false,
            Entry::Occupied(mut entry) => {
                let generation = Uuid::new_v4();
                let handle = tokio::spawn(make(generation));
                entry.insert(TickerEntry { generation, handle });
                true
            }
            Entry::Vacant(entry) => {
                let generation = Uuid::new_v4();
                let handle = tokio::spawn(make(generation));
                entry.insert(TickerEntry { generation, handle });
                true
            }
        }
    }

    /// Remove the entry of a ticker that is stopping on its own.
    ///
    /// Only the ticker holding `generation` is removed.
    pub fn finish(&self, room_id: &str, generation: Uuid) -> bool {
        self.entries
            .remove_if(room_id, |_, entry| entry.generation == generation)
            .is_some()
    }

    /// Abort and forget the ticker of `room_id`, if any.
    pub fn cancel(&self, room_id: &str) -> bool {
        match self.entries.remove(room_id) {
            Some((_, entry)) => {
                entry.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Whether a live ticker drives `room_id`.
    pub fn is_running(&self, room_id: &str) -> bool {
        self.entries
            .get(room_id)
            .is_some_and(|entry| !entry.handle.is_finished())
    }

    /// Number of tracked tickers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no ticker is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Abort every ticker. Called on server shutdown.
    pub fn shutdown(&self) {
        let room_ids = self
            .entries
            .iter()
            .map(|entry| entry.key().clone())
            .collect::<Vec<_>>();
        for room_id in room_ids {
            self.cancel(&room_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use tokio::sync::oneshot;

    use super::*;

    #[tokio::test]
    async fn second_start_is_a_noop_while_running() {
        let tickers = RoomTickers::new();
        let spawned = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let spawned = spawned.clone();
            tickers.start("ABC123", move |_| async move {
                spawned.fetch_add(1, Ordering::SeqCst);
                std::future::pending::<()>().await;
            });
        }

        tokio::task::yield_now().await;
        assert_eq!(spawned.load(Ordering::SeqCst), 1);
        assert!(tickers.is_running("ABC123"));
        assert_eq!(tickers.len(), 1);
        tickers.shutdown();
    }

    #[tokio::test]
    async fn stale_generation_cannot_remove_a_newer_ticker() {
        let tickers = RoomTickers::new();
        let (tx, rx) = oneshot::channel();

        tickers.start("ABC123", move |generation| async move {
            let _ = tx.send(generation);
            std::future::pending::<()>().await;
        });
        let generation = rx.await.unwrap();

        assert!(!tickers.finish("ABC123", Uuid::new_v4()));
        assert!(tickers.is_running("ABC123"));
        assert!(tickers.finish("ABC123", generation));
        assert!(!tickers.finish("ABC123", generation));
        assert!(tickers.is_empty());
    }

    #[tokio::test]
    async fn cancel_aborts_the_task() {
        let tickers = RoomTickers::new();
        tickers.start("ABC123", |_| std::future::pending::<()>());

        assert!(tickers.cancel("ABC123"));
        assert!(!tickers.cancel("ABC123"));
        assert!(!tickers.is_running("ABC123"));
    }

    #[tokio::test]
    async fn finished_ticker_can_be_replaced() {
        let tickers = RoomTickers::new();
        tickers.start("ABC123", |_| async {});
        while tickers.is_running("ABC123") {
            tokio::task::yield_now().await;
        }

        assert!(tickers.start("ABC123", |_| std::future::pending::<()>()));
        assert!(tickers.is_running("ABC123"));
        tickers.shutdown();
        assert!(tickers.is_empty());
    }
}
