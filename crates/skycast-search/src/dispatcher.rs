//! Query dispatch with caching and stale-response suppression.
//!
//! Every dispatch takes the next sequence number. A result is only published
//! if its sequence number is still the latest when it resolves; otherwise the
//! currently visible results are kept. Superseded requests are not cancelled,
//! their answers are just dropped.
//!
//! Clearing the query also starts a new epoch. Scheduled lookups capture the
//! epoch when they are scheduled and are skipped if a clear happened before
//! they got to run.

use std::sync::Arc;

use parking_lot::Mutex;
use skycast_weather::{LocationApi, LocationCandidate};
use tokio::sync::watch;

use crate::cache::ResultCache;
use crate::selection::SearchState;

/// The most recent dispatch
#[derive(Debug, Default)]
struct InFlight {
    sequence: u64,
    query: String,
    /// Bumped by every clear
    epoch: u64,
}

pub struct QueryDispatcher<A> {
    api: Arc<A>,
    cache: Mutex<ResultCache>,
    in_flight: Mutex<InFlight>,
    store: Arc<watch::Sender<SearchState>>,
}

impl<A: LocationApi> QueryDispatcher<A> {
    pub fn new(api: Arc<A>, store: Arc<watch::Sender<SearchState>>) -> Self {
        Self {
            api,
            cache: Mutex::new(ResultCache::new()),
            in_flight: Mutex::new(InFlight::default()),
            store,
        }
    }

    /// Resolve `raw` into the visible result list.
    ///
    /// Never fails: network errors publish an empty list, stale answers leave
    /// the current list untouched. Returns the results visible afterwards.
    pub async fn dispatch(&self, raw: &str) -> Vec<LocationCandidate> {
        let query = raw.trim();
        let sequence = self.begin(query);
        self.resolve(sequence, query).await
    }

    /// Like [`dispatch`](Self::dispatch), for a lookup scheduled during
    /// `epoch`. Returns `None` without dispatching if the query has been
    /// cleared since.
    pub async fn dispatch_in(&self, epoch: u64, raw: &str) -> Option<Vec<LocationCandidate>> {
        let query = raw.trim();
        let Some(sequence) = self.begin_in(epoch, query) else {
            tracing::debug!(query, epoch, "Skipping search scheduled before a clear");
            return None;
        };
        Some(self.resolve(sequence, query).await)
    }

    /// Dispatch the empty query: clears the results without touching the
    /// network or the cache, and ends the current epoch.
    pub fn clear(&self) -> Vec<LocationCandidate> {
        let sequence = {
            let mut in_flight = self.in_flight.lock();
            in_flight.epoch += 1;
            Self::advance(&mut in_flight, "")
        };
        self.publish(sequence, Vec::new(), None)
    }

    pub fn epoch(&self) -> u64 {
        self.in_flight.lock().epoch
    }

    pub fn cached(&self, query: &str) -> Option<Vec<LocationCandidate>> {
        self.cache.lock().get(query)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().len()
    }

    fn begin(&self, query: &str) -> u64 {
        Self::advance(&mut self.in_flight.lock(), query)
    }

    /// Take the next sequence number unless `epoch` has ended. Checked and
    /// taken under one lock so a concurrent clear cannot slip in between.
    fn begin_in(&self, epoch: u64, query: &str) -> Option<u64> {
        let mut in_flight = self.in_flight.lock();
        (in_flight.epoch == epoch).then(|| Self::advance(&mut in_flight, query))
    }

    fn advance(in_flight: &mut InFlight, query: &str) -> u64 {
        in_flight.sequence += 1;
        in_flight.query = query.to_string();
        in_flight.sequence
    }

    async fn resolve(&self, sequence: u64, query: &str) -> Vec<LocationCandidate> {
        if query.is_empty() {
            return self.publish(sequence, Vec::new(), None);
        }

        let cached = self.cache.lock().get(query);
        if let Some(results) = cached {
            tracing::debug!(query, hits = results.len(), "Serving search from cache");
            return self.publish(sequence, results, None);
        }

        match self.api.search_query(query).await {
            Ok(results) => {
                tracing::debug!(query, hits = results.len(), "Search returned");
                self.publish(sequence, results, Some(query))
            }
            Err(e) => {
                tracing::warn!(query, "Location search failed: {}", e);
                self.publish(sequence, Vec::new(), None)
            }
        }
    }

    /// Publish `results` if `sequence` is still the latest dispatch, caching
    /// them under `cache_key` when given.
    fn publish(
        &self,
        sequence: u64,
        results: Vec<LocationCandidate>,
        cache_key: Option<&str>,
    ) -> Vec<LocationCandidate> {
        let mut visible = Vec::new();
        self.store.send_if_modified(|state| {
            {
                let in_flight = self.in_flight.lock();
                if in_flight.sequence != sequence {
                    tracing::debug!(
                        sequence,
                        latest = in_flight.sequence,
                        superseded_by = %in_flight.query,
                        "Discarding stale search results"
                    );
                    visible = state.results().to_vec();
                    return false;
                }
            }

            if let Some(key) = cache_key {
                self.cache.lock().put(key, results.clone());
            }
            state.show_results(results);
            visible = state.results().to_vec();
            true
        });
        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{candidate, StubApi};
    use std::time::Duration;

    fn dispatcher(
        api: StubApi,
    ) -> (
        Arc<StubApi>,
        QueryDispatcher<StubApi>,
        watch::Receiver<SearchState>,
    ) {
        let api = Arc::new(api);
        let (tx, rx) = watch::channel(SearchState::default());
        let dispatcher = QueryDispatcher::new(Arc::clone(&api), Arc::new(tx));
        (api, dispatcher, rx)
    }

    #[tokio::test]
    async fn test_empty_query_skips_network() {
        let (api, dispatcher, rx) = dispatcher(StubApi::new());

        let results = dispatcher.dispatch("   ").await;

        assert!(results.is_empty());
        assert!(rx.borrow().results().is_empty());
        assert!(api.query_calls().is_empty());
        assert_eq!(dispatcher.cache_len(), 0);
    }

    #[tokio::test]
    async fn test_success_caches_and_highlights_first() {
        let results = vec![candidate(1252431, "Ho Chi Minh City"), candidate(1252432, "Ha Noi")];
        let (api, dispatcher, rx) = dispatcher(StubApi::new().respond("h", results.clone()));

        let visible = dispatcher.dispatch("h").await;

        assert_eq!(visible, results);
        assert_eq!(dispatcher.cached("h"), Some(results.clone()));
        let state = rx.borrow();
        assert_eq!(state.results(), results.as_slice());
        assert_eq!(state.highlighted_item(), Some(&results[0]));
        assert_eq!(api.query_calls(), vec!["h".to_string()]);
    }

    #[tokio::test]
    async fn test_query_is_trimmed_before_lookup() {
        let (api, dispatcher, _rx) =
            dispatcher(StubApi::new().respond("paris", vec![candidate(615702, "Paris")]));

        let visible = dispatcher.dispatch("  paris ").await;

        assert_eq!(visible.len(), 1);
        assert_eq!(api.query_calls(), vec!["paris".to_string()]);
        assert!(dispatcher.cached("paris").is_some());
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let results = vec![candidate(1, "Amsterdam"), candidate(2, "Athens")];
        let (api, dispatcher, rx) = dispatcher(StubApi::new().respond("a", results.clone()));

        dispatcher.dispatch("a").await;
        dispatcher.clear();
        assert!(rx.borrow().highlighted_item().is_none());

        let visible = dispatcher.dispatch("a").await;

        assert_eq!(visible, results);
        assert_eq!(api.query_calls().len(), 1);
        assert_eq!(rx.borrow().highlighted_item(), Some(&results[0]));
    }

    #[tokio::test]
    async fn test_empty_upstream_result_is_cached() {
        let (api, dispatcher, rx) = dispatcher(StubApi::new().respond("zzzz", Vec::new()));

        assert!(dispatcher.dispatch("zzzz").await.is_empty());
        assert!(dispatcher.dispatch("zzzz").await.is_empty());

        assert_eq!(api.query_calls().len(), 1);
        assert!(rx.borrow().highlighted_item().is_none());
    }

    #[tokio::test]
    async fn test_server_error_yields_empty_results() {
        let (api, dispatcher, rx) = dispatcher(
            StubApi::new()
                .respond("h", vec![candidate(1, "Helsinki")])
                .fail("a", 500),
        );

        dispatcher.dispatch("h").await;
        let visible = dispatcher.dispatch("a").await;

        assert!(visible.is_empty());
        assert!(rx.borrow().results().is_empty());
        assert!(rx.borrow().highlighted_item().is_none());
        assert!(dispatcher.cached("a").is_none());

        // Failures are not cached, so the next attempt goes out again
        dispatcher.dispatch("a").await;
        assert_eq!(api.query_calls(), vec!["h", "a", "a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_for_superseded_query_is_dropped() {
        let london = vec![candidate(44418, "London")];
        let (_api, dispatcher, rx) = dispatcher(
            StubApi::new()
                .respond_after("lon", Duration::from_millis(300), vec![candidate(1, "Lonavala")])
                .respond("london", london.clone()),
        );

        let (first, second) = tokio::join!(dispatcher.dispatch("lon"), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            dispatcher.dispatch("london").await
        });

        assert_eq!(second, london);
        // The stale answer reports what is on screen instead of its own data
        assert_eq!(first, london);
        assert_eq!(rx.borrow().results(), london.as_slice());
        assert!(dispatcher.cached("lon").is_none());
        assert!(dispatcher.cached("london").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_response_for_superseded_query_is_dropped() {
        let (_api, dispatcher, rx) = dispatcher(
            StubApi::new()
                .respond_after("lon", Duration::from_millis(10), vec![candidate(1, "Lonavala")])
                .respond_after("london", Duration::from_millis(50), vec![candidate(44418, "London")]),
        );

        let (first, second) = tokio::join!(dispatcher.dispatch("lon"), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            dispatcher.dispatch("london").await
        });

        assert!(first.is_empty());
        assert_eq!(second.len(), 1);
        assert_eq!(rx.borrow().results()[0].title, "London");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_failure_keeps_current_results() {
        let (_api, dispatcher, rx) = dispatcher(
            StubApi::new()
                .fail_after("lo", Duration::from_millis(200), 503)
                .respond("london", vec![candidate(44418, "London")]),
        );

        let (failed, newer) = tokio::join!(dispatcher.dispatch("lo"), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            dispatcher.dispatch("london").await
        });

        assert_eq!(newer.len(), 1);
        assert_eq!(failed, newer);
        assert_eq!(rx.borrow().results().len(), 1);
        assert_eq!(rx.borrow().highlighted_item().map(|i| i.id), Some(44418));
    }

    #[tokio::test]
    async fn test_lookup_scheduled_before_clear_is_skipped() {
        let (api, dispatcher, rx) =
            dispatcher(StubApi::new().respond("lon", vec![candidate(1, "Lonavala")]));

        let epoch = dispatcher.epoch();
        dispatcher.clear();

        assert!(dispatcher.dispatch_in(epoch, "lon").await.is_none());
        assert!(api.query_calls().is_empty());
        assert!(rx.borrow().results().is_empty());

        let visible = dispatcher.dispatch_in(dispatcher.epoch(), "lon").await;
        assert_eq!(visible.map(|v| v.len()), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_drops_lookup_in_flight() {
        let (_api, dispatcher, rx) = dispatcher(StubApi::new().respond_after(
            "lon",
            Duration::from_millis(300),
            vec![candidate(1, "Lonavala")],
        ));

        let (visible, _) = tokio::join!(dispatcher.dispatch_in(dispatcher.epoch(), "lon"), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            dispatcher.clear();
        });

        assert_eq!(visible, Some(Vec::new()));
        assert!(rx.borrow().results().is_empty());
        assert!(dispatcher.cached("lon").is_none());
    }
}
