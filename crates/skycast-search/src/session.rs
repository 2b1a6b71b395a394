//! The search session: one per search box.
//!
//! Owns the observable [`SearchState`] and is its only writer. Query edits are
//! routed through the throttle or debounce scheduler depending on length,
//! keyboard and pointer events drive the selection transitions, and the
//! geolocation fallback runs at most once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use skycast_core::SearchConfig;
use skycast_weather::{GeolocationProvider, LocationApi, LocationCandidate};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::dispatcher::QueryDispatcher;
use crate::geolocation::resolve_current_location;
use crate::scheduler::{Debounce, Throttle};
use crate::selection::{GeolocationStatus, SearchState};

type SelectCallback = Box<dyn Fn(&LocationCandidate) + Send + Sync>;

pub struct SearchSession<A, G> {
    store: Arc<watch::Sender<SearchState>>,
    dispatcher: Arc<QueryDispatcher<A>>,
    api: Arc<A>,
    geolocation: Arc<G>,
    throttle: Throttle,
    debounce: Debounce,
    debounce_threshold: usize,
    on_select: Option<SelectCallback>,
    located: AtomicBool,
}

impl<A: LocationApi, G: GeolocationProvider> SearchSession<A, G> {
    pub fn new(api: Arc<A>, geolocation: Arc<G>, config: &SearchConfig) -> Self {
        let (store, _) = watch::channel(SearchState::new());
        let store = Arc::new(store);
        Self {
            dispatcher: Arc::new(QueryDispatcher::new(Arc::clone(&api), Arc::clone(&store))),
            store,
            api,
            geolocation,
            throttle: Throttle::new(config.window()),
            debounce: Debounce::new(config.window()),
            debounce_threshold: config.debounce_threshold,
            on_select: None,
            located: AtomicBool::new(false),
        }
    }

    /// Register the collaborator notified whenever a location is confirmed.
    pub fn on_select<F>(mut self, callback: F) -> Self
    where
        F: Fn(&LocationCandidate) + Send + Sync + 'static,
    {
        self.on_select = Some(Box::new(callback));
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.store.subscribe()
    }

    /// Snapshot of the current state
    pub fn state(&self) -> SearchState {
        self.store.borrow().clone()
    }

    pub fn active_location(&self) -> Option<LocationCandidate> {
        self.store.borrow().active_location().cloned()
    }

    pub fn cached(&self, query: &str) -> Option<Vec<LocationCandidate>> {
        self.dispatcher.cached(query.trim())
    }

    /// Record an edit of the search text and schedule the lookup.
    ///
    /// Short queries are throttled so results keep up with typing; longer ones
    /// wait for a pause. An empty query clears the results right away.
    /// Must be called from within a Tokio runtime.
    pub fn set_query(&self, text: &str) {
        self.store.send_modify(|state| state.set_query(text));

        let query = text.trim();
        if query.is_empty() {
            self.throttle.cancel();
            self.debounce.cancel();
            self.dispatcher.clear();
            return;
        }

        // A clear before the action runs must win over it
        let epoch = self.dispatcher.epoch();
        let dispatcher = Arc::clone(&self.dispatcher);
        let action = move |key: String| async move {
            dispatcher.dispatch_in(epoch, &key).await;
        };

        if query.chars().count() < self.debounce_threshold {
            self.debounce.cancel();
            self.throttle.schedule(query, action);
        } else {
            self.throttle.cancel();
            self.debounce.schedule(query, action);
        }
    }

    pub fn next_item(&self) -> bool {
        self.store.send_if_modified(|state| state.next_item())
    }

    pub fn prev_item(&self) -> bool {
        self.store.send_if_modified(|state| state.prev_item())
    }

    pub fn highlight_item(&self, item: &LocationCandidate) -> bool {
        self.store.send_if_modified(|state| state.highlight_item(item))
    }

    /// Set or clear the selection without notifying the select collaborator.
    pub fn select_item(&self, item: Option<LocationCandidate>) {
        self.store.send_modify(|state| state.select_item(item));
    }

    /// Confirm the highlighted candidate (the Enter key).
    pub fn confirm(&self) -> Option<LocationCandidate> {
        let highlighted = self.store.borrow().highlighted_item().cloned();
        let item = highlighted?;
        self.commit(item.clone());
        Some(item)
    }

    /// Confirm a candidate picked from the list directly.
    ///
    /// Candidates that are not in the current results are ignored.
    pub fn choose(&self, item: &LocationCandidate) -> Option<LocationCandidate> {
        let listed = self
            .store
            .borrow()
            .results()
            .iter()
            .find(|r| r.id == item.id)
            .cloned();
        let item = listed?;
        self.commit(item.clone());
        Some(item)
    }

    /// Run the geolocation fallback. Later calls return the recorded status
    /// without asking again.
    pub async fn locate(&self) -> GeolocationStatus {
        if self.located.swap(true, Ordering::SeqCst) {
            return self.store.borrow().geolocation();
        }
        locate_into(self.api.as_ref(), self.geolocation.as_ref(), &self.store).await
    }

    /// Start the geolocation fallback in the background.
    ///
    /// Returns `None` when it has already been started.
    pub fn spawn_geolocation(&self) -> Option<JoinHandle<GeolocationStatus>> {
        if self.located.swap(true, Ordering::SeqCst) {
            return None;
        }
        let api = Arc::clone(&self.api);
        let geolocation = Arc::clone(&self.geolocation);
        let store = Arc::clone(&self.store);
        Some(tokio::spawn(async move {
            locate_into(api.as_ref(), geolocation.as_ref(), &store).await
        }))
    }

    fn commit(&self, item: LocationCandidate) {
        tracing::info!(id = item.id, title = %item.title, "Location selected");
        self.store.send_modify(|state| state.select_item(Some(item.clone())));
        if let Some(callback) = &self.on_select {
            callback(&item);
        }
    }
}

async fn locate_into<A, G>(
    api: &A,
    geolocation: &G,
    store: &watch::Sender<SearchState>,
) -> GeolocationStatus
where
    A: LocationApi,
    G: GeolocationProvider,
{
    let outcome = resolve_current_location(api, geolocation).await;
    let status = outcome.status();
    store.send_modify(|state| state.set_current_item(outcome.into_candidate(), status));
    status
}
