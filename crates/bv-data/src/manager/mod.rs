//! Named dataset slots, generation-counted loads and the notification
//! bus.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use tracing::{error, info, warn};

use bv_core::events::{SubscriptionId, Subscribers};
use bv_core::record::{DatasetKey, DatePair, Dataset};

use crate::fetch::{FetchParams, RecordFetcher};
use crate::DataError;

/// Outcome of a completed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The dataset was replaced and subscribers saw exactly one change
    /// notification; carries the new record count.
    Applied(usize),
    /// A newer load for the same key was requested while this one was
    /// in flight; the response was discarded untouched.
    Superseded,
}

#[derive(Default)]
struct Slot {
    data: Dataset,
    /// Generation of the most recently requested load for this key.
    requested: u64,
    /// Failure from the latest completed load, cleared by the next
    /// applied one. Drives the connection-lost affordance.
    last_error: Option<String>,
}

/// Owns the current snapshot of every named dataset plus the per-key,
/// hover and point-query subscriber groups.
///
/// Datasets are replaced wholesale, never patched. Overlapping loads
/// for one key resolve last-request-wins.
pub struct DataManager {
    fetcher: Arc<dyn RecordFetcher>,
    handle: tokio::runtime::Handle,
    slots: RwLock<AHashMap<DatasetKey, Slot>>,
    dataset_subs: RwLock<AHashMap<DatasetKey, Arc<Subscribers<Dataset>>>>,
    hover_subs: Subscribers<DatePair>,
    query_subs: Subscribers<DatePair>,
}

impl DataManager {
    pub fn new(fetcher: Arc<dyn RecordFetcher>, handle: tokio::runtime::Handle) -> Self {
        Self {
            fetcher,
            handle,
            slots: RwLock::new(AHashMap::new()),
            dataset_subs: RwLock::new(AHashMap::new()),
            hover_subs: Subscribers::new(),
            query_subs: Subscribers::new(),
        }
    }

    /// Replace the dataset for `key` with a fresh fetch.
    ///
    /// A response outpaced by a newer request for the same key is
    /// discarded without touching the slot or notifying anyone. A
    /// failed fetch leaves the previous dataset in place and records a
    /// sticky error for [`last_load_error`](Self::last_load_error).
    /// Applied loads notify subscribers before the internal lock is
    /// released, so notification order always matches apply order.
    pub async fn load(&self, key: &str, params: FetchParams) -> Result<LoadOutcome, DataError> {
        let generation = self.next_generation(key);
        self.run_load(key, params, generation).await
    }

    /// Fire-and-forget form of [`load`](Self::load) for UI callers.
    /// The request claims its place in the last-request-wins order
    /// here, not when the spawned task first runs.
    pub fn request_load(self: &Arc<Self>, key: &str, params: FetchParams) {
        let generation = self.next_generation(key);
        let manager = Arc::clone(self);
        let key = key.to_string();
        self.handle.spawn(async move {
            // Failures are already logged and recorded by the load.
            let _ = manager.run_load(&key, params, generation).await;
        });
    }

    fn next_generation(&self, key: &str) -> u64 {
        let mut slots = self.slots.write();
        let slot = slots.entry(key.to_string()).or_default();
        slot.requested += 1;
        slot.requested
    }

    async fn run_load(
        &self,
        key: &str,
        params: FetchParams,
        generation: u64,
    ) -> Result<LoadOutcome, DataError> {
        let records = match self.fetcher.fetch(key, &params).await {
            Ok(records) => records,
            Err(source) => {
                error!(key, %source, source_name = self.fetcher.source_name(), "dataset fetch failed");
                let mut slots = self.slots.write();
                if let Some(slot) = slots.get_mut(key) {
                    // A stale failure must not mask a newer outcome.
                    if generation == slot.requested {
                        slot.last_error = Some(source.to_string());
                    }
                }
                return Err(DataError::Fetch {
                    key: key.to_string(),
                    source,
                });
            }
        };

        let dataset = Dataset::new(records);
        {
            let mut slots = self.slots.write();
            let slot = slots.entry(key.to_string()).or_default();
            if generation < slot.requested {
                warn!(
                    key,
                    generation,
                    latest = slot.requested,
                    "discarding stale load response"
                );
                return Ok(LoadOutcome::Superseded);
            }
            slot.data = dataset.clone();
            slot.last_error = None;
            info!(key, rows = dataset.len(), "dataset replaced");
            // Emitted with the slot still locked: an overlapping load
            // cannot apply, and so cannot notify, in between.
            self.dataset_channel(key).emit(&dataset);
        }
        Ok(LoadOutcome::Applied(dataset.len()))
    }

    /// Register a handler for dataset replaces on `key`. The handler
    /// receives the full new snapshot, never a diff. It runs with the
    /// manager's dataset state locked, so it must hand the snapshot
    /// off rather than call back into the manager.
    pub fn subscribe_dataset<F>(&self, key: &str, handler: F) -> SubscriptionId
    where
        F: FnMut(&Dataset) + Send + 'static,
    {
        self.dataset_channel(key).subscribe(handler)
    }

    /// Register a handler for hover broadcasts from any chart.
    pub fn subscribe_hover<F>(&self, handler: F) -> SubscriptionId
    where
        F: FnMut(&DatePair) + Send + 'static,
    {
        self.hover_subs.subscribe(handler)
    }

    /// Register a handler for point-query requests from any chart.
    pub fn subscribe_query<F>(&self, handler: F) -> SubscriptionId
    where
        F: FnMut(&DatePair) + Send + 'static,
    {
        self.query_subs.subscribe(handler)
    }

    /// Detach a handler from whichever channel it is registered on.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        if self.hover_subs.unsubscribe(id) || self.query_subs.unsubscribe(id) {
            return true;
        }
        let channels: Vec<_> = self.dataset_subs.read().values().cloned().collect();
        channels.iter().any(|channel| channel.unsubscribe(id))
    }

    /// Broadcast a hovered date pair to every hover subscriber,
    /// regardless of which chart produced it.
    pub fn publish_hover(&self, pair: DatePair) {
        self.hover_subs.emit(&pair);
    }

    /// Broadcast a point-query request.
    pub fn publish_query(&self, pair: DatePair) {
        self.query_subs.emit(&pair);
    }

    /// Current snapshot for `key`; `None` before the first load.
    pub fn dataset(&self, key: &str) -> Option<Dataset> {
        self.slots.read().get(key).map(|slot| slot.data.clone())
    }

    /// Failure message from the latest completed load for `key`, if
    /// that load failed.
    pub fn last_load_error(&self, key: &str) -> Option<String> {
        self.slots.read().get(key).and_then(|slot| slot.last_error.clone())
    }

    fn dataset_channel(&self, key: &str) -> Arc<Subscribers<Dataset>> {
        if let Some(channel) = self.dataset_subs.read().get(key) {
            return channel.clone();
        }
        self.dataset_subs
            .write()
            .entry(key.to_string())
            .or_default()
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchError, RecordFetcher};
    use async_trait::async_trait;
    use bv_core::record::BitemporalRecord;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::VecDeque;
    use tokio::sync::oneshot;

    fn record(value: serde_json::Value) -> BitemporalRecord {
        serde_json::from_value(value).unwrap()
    }

    fn rows(tags: &[u32]) -> Vec<BitemporalRecord> {
        tags.iter()
            .map(|tag| {
                record(json!({
                    "tag": tag,
                    "valid_from": "2020-01-01",
                    "tran_from": "2020-01-01",
                }))
            })
            .collect()
    }

    /// Replays a scripted sequence of responses, one per fetch call.
    struct ScriptedFetcher {
        script: Mutex<VecDeque<Result<Vec<BitemporalRecord>, FetchError>>>,
    }

    impl ScriptedFetcher {
        fn new(script: Vec<Result<Vec<BitemporalRecord>, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
            })
        }
    }

    #[async_trait]
    impl RecordFetcher for ScriptedFetcher {
        async fn fetch(
            &self,
            _key: &str,
            _params: &FetchParams,
        ) -> Result<Vec<BitemporalRecord>, FetchError> {
            self.script.lock().pop_front().expect("unscripted fetch")
        }
    }

    /// Each fetch pops a (gate, response) pair and waits for the gate
    /// before responding, so tests control completion order.
    struct GatedFetcher {
        calls: Mutex<VecDeque<(oneshot::Receiver<()>, Vec<BitemporalRecord>)>>,
    }

    #[async_trait]
    impl RecordFetcher for GatedFetcher {
        async fn fetch(
            &self,
            _key: &str,
            _params: &FetchParams,
        ) -> Result<Vec<BitemporalRecord>, FetchError> {
            let (gate, response) = self.calls.lock().pop_front().expect("unscripted fetch");
            let _ = gate.await;
            Ok(response)
        }
    }

    /// Resolves instantly, picking the response by the request's `req`
    /// filter instead of by call order.
    struct RoutedFetcher {
        responses: Mutex<AHashMap<String, Vec<BitemporalRecord>>>,
    }

    #[async_trait]
    impl RecordFetcher for RoutedFetcher {
        async fn fetch(
            &self,
            _key: &str,
            params: &FetchParams,
        ) -> Result<Vec<BitemporalRecord>, FetchError> {
            let tag = params
                .filters
                .iter()
                .find(|(name, _)| name == "req")
                .map(|(_, value)| value.clone())
                .expect("missing req filter");
            Ok(self.responses.lock().remove(&tag).expect("unscripted fetch"))
        }
    }

    #[tokio::test]
    async fn test_load_replaces_dataset_and_notifies_once() {
        let fetcher = ScriptedFetcher::new(vec![Ok(rows(&[1, 2, 3]))]);
        let manager = DataManager::new(fetcher, tokio::runtime::Handle::current());

        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            manager.subscribe_dataset("dept", move |dataset: &Dataset| {
                seen.lock().push(dataset.len());
            });
        }

        let outcome = manager.load("dept", FetchParams::default()).await.unwrap();
        assert_eq!(outcome, LoadOutcome::Applied(3));
        assert_eq!(*seen.lock(), vec![3]);
        assert_eq!(manager.dataset("dept").unwrap().len(), 3);
        assert!(manager.last_load_error("dept").is_none());
    }

    #[tokio::test]
    async fn test_overlapping_loads_resolve_last_request_wins() {
        let (first_tx, first_rx) = oneshot::channel();
        let (second_tx, second_rx) = oneshot::channel();
        let fetcher = Arc::new(GatedFetcher {
            calls: Mutex::new(VecDeque::from([
                (first_rx, rows(&[1])),
                (second_rx, rows(&[2, 2])),
            ])),
        });
        let manager = DataManager::new(fetcher, tokio::runtime::Handle::current());

        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            manager.subscribe_dataset("dept", move |dataset: &Dataset| {
                seen.lock().push(dataset.len());
            });
        }

        let first = manager.load("dept", FetchParams::default());
        let second = manager.load("dept", FetchParams::default());
        let release = async move {
            // Let the newer response land first, then the stale one.
            let _ = second_tx.send(());
            tokio::task::yield_now().await;
            let _ = first_tx.send(());
        };
        let (first, second, _) = tokio::join!(first, second, release);

        assert!(matches!(first, Ok(LoadOutcome::Superseded)));
        assert!(matches!(second, Ok(LoadOutcome::Applied(2))));
        assert_eq!(*seen.lock(), vec![2]);

        let dataset = manager.dataset("dept").unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.get(0).unwrap().get("tag"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_applied_loads_notify_in_apply_order() {
        let fetcher = ScriptedFetcher::new(vec![Ok(rows(&[1])), Ok(rows(&[2, 2]))]);
        let manager = DataManager::new(fetcher, tokio::runtime::Handle::current());

        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            manager.subscribe_dataset("dept", move |dataset: &Dataset| {
                seen.lock().push(dataset.len());
            });
        }

        let first = manager.load("dept", FetchParams::default()).await.unwrap();
        let second = manager.load("dept", FetchParams::default()).await.unwrap();
        assert_eq!(first, LoadOutcome::Applied(1));
        assert_eq!(second, LoadOutcome::Applied(2));

        // One notification per applied load, in apply order; the last
        // one carries the snapshot the slot holds.
        assert_eq!(*seen.lock(), vec![1, 2]);
        assert_eq!(manager.dataset("dept").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_request_load_sequences_by_call_order() {
        let responses = AHashMap::from_iter([
            ("a".to_string(), rows(&[1])),
            ("b".to_string(), rows(&[2, 2])),
        ]);
        let fetcher = Arc::new(RoutedFetcher {
            responses: Mutex::new(responses),
        });
        let manager = Arc::new(DataManager::new(fetcher, tokio::runtime::Handle::current()));

        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            manager.subscribe_dataset("dept", move |dataset: &Dataset| {
                seen.lock().push(dataset.len());
            });
        }

        // Both requests are sequenced by these calls, before either
        // spawned task has run, so the earlier one is already stale no
        // matter which task the scheduler finishes first.
        manager.request_load("dept", FetchParams::default().with_filter("req", "a"));
        manager.request_load("dept", FetchParams::default().with_filter("req", "b"));
        // Let both spawned tasks run to completion.
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        assert_eq!(*seen.lock(), vec![2]);
        let dataset = manager.dataset("dept").unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.get(0).unwrap().get("tag"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_failed_load_keeps_data_and_sets_sticky_error() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(rows(&[1, 2])),
            Err(FetchError::Status(503)),
            Ok(rows(&[3])),
        ]);
        let manager = DataManager::new(fetcher, tokio::runtime::Handle::current());

        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            manager.subscribe_dataset("emp", move |dataset: &Dataset| {
                seen.lock().push(dataset.len());
            });
        }

        manager.load("emp", FetchParams::default()).await.unwrap();

        let failed = manager.load("emp", FetchParams::default()).await;
        assert!(matches!(failed, Err(DataError::Fetch { .. })));
        // Previous snapshot intact, no notification for the failure.
        assert_eq!(manager.dataset("emp").unwrap().len(), 2);
        assert_eq!(*seen.lock(), vec![2]);
        let message = manager.last_load_error("emp").unwrap();
        assert!(message.contains("503"), "unexpected message: {message}");

        manager.load("emp", FetchParams::default()).await.unwrap();
        assert!(manager.last_load_error("emp").is_none());
        assert_eq!(*seen.lock(), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_hover_and_query_channels_are_separate() {
        let fetcher = ScriptedFetcher::new(vec![]);
        let manager = DataManager::new(fetcher, tokio::runtime::Handle::current());

        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let log = log.clone();
            manager.subscribe_hover(move |pair: &DatePair| {
                log.lock().push(("hover", pair.valid_date));
            });
        }
        {
            let log = log.clone();
            manager.subscribe_query(move |pair: &DatePair| {
                log.lock().push(("query", pair.valid_date));
            });
        }

        let date = |y: i32| chrono::NaiveDate::from_ymd_opt(y, 1, 1).unwrap();
        manager.publish_hover(DatePair::new(date(2021), date(2022)));
        manager.publish_query(DatePair::new(date(2023), date(2024)));

        assert_eq!(
            *log.lock(),
            vec![("hover", date(2021)), ("query", date(2023))]
        );
    }

    #[tokio::test]
    async fn test_unsubscribe_finds_the_right_channel() {
        let fetcher = ScriptedFetcher::new(vec![Ok(rows(&[1]))]);
        let manager = DataManager::new(fetcher, tokio::runtime::Handle::current());

        let count = Arc::new(Mutex::new(0));
        let dataset_id = {
            let count = count.clone();
            manager.subscribe_dataset("dept", move |_: &Dataset| {
                *count.lock() += 1;
            })
        };
        let hover_id = manager.subscribe_hover(|_| {});

        assert!(manager.unsubscribe(dataset_id));
        assert!(manager.unsubscribe(hover_id));
        assert!(!manager.unsubscribe(hover_id));

        manager.load("dept", FetchParams::default()).await.unwrap();
        assert_eq!(*count.lock(), 0);
    }

    #[tokio::test]
    async fn test_dataset_is_none_before_first_load() {
        let fetcher = ScriptedFetcher::new(vec![]);
        let manager = DataManager::new(fetcher, tokio::runtime::Handle::current());
        assert!(manager.dataset("nope").is_none());
        assert!(manager.last_load_error("nope").is_none());
    }
}
