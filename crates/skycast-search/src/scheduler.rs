//! Rate limiting for query dispatch.
//!
//! Both schedulers take a key (the query) and an async action. Actions run as
//! their own Tokio tasks, so cancelling a pending timer never aborts an action
//! that has already started. Create one of each per session; the coalescing
//! state lives in the scheduler, not in the caller.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

type BoxedAction = Box<dyn FnOnce(String) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

/// A keyed action waiting to run.
struct Pending {
    key: String,
    action: BoxedAction,
}

impl Pending {
    fn new<F, Fut>(key: String, action: F) -> Self
    where
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            key,
            action: Box::new(move |key| Box::pin(action(key))),
        }
    }

    fn fire(self) {
        tracing::trace!(key = %self.key, "Scheduler firing");
        tokio::spawn((self.action)(self.key));
    }
}

/// Runs the latest scheduled action once input has been quiet for `window`.
pub struct Debounce {
    window: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Debounce {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            timer: Mutex::new(None),
        }
    }

    /// Replace any pending action and restart the quiet period.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F, Fut>(&self, key: impl Into<String>, action: F)
    where
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let pending = Pending::new(key.into(), action);
        let window = self.window;

        let mut timer = self.timer.lock();
        if let Some(previous) = timer.take() {
            previous.abort();
        }
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            pending.fire();
        }));
    }

    /// Drop the pending action, if any.
    pub fn cancel(&self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.timer
            .lock()
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }
}

#[derive(Default)]
struct ThrottleState {
    last_fired: Option<Instant>,
    trailing: Option<Pending>,
    timer: Option<JoinHandle<()>>,
    /// Bumped whenever the timer is replaced or cancelled
    generation: u64,
}

/// Runs at most one action per `window`.
///
/// The first call in a quiet period fires immediately (leading edge). Calls
/// made inside the window are coalesced: the last one fires when the window
/// closes (trailing edge) and opens a new window.
pub struct Throttle {
    window: Duration,
    state: Arc<Mutex<ThrottleState>>,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: Arc::new(Mutex::new(ThrottleState::default())),
        }
    }

    /// Must be called from within a Tokio runtime.
    pub fn schedule<F, Fut>(&self, key: impl Into<String>, action: F)
    where
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let pending = Pending::new(key.into(), action);
        let now = Instant::now();

        let mut state = self.state.lock();
        let elapsed = state
            .last_fired
            .map(|fired| now.saturating_duration_since(fired));

        match elapsed {
            Some(elapsed) if elapsed < self.window => {
                state.trailing = Some(pending);
                if state.timer.is_none() {
                    state.generation += 1;
                    let generation = state.generation;
                    let shared = Arc::clone(&self.state);
                    let delay = self.window - elapsed;
                    state.timer = Some(tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let trailing = {
                            let mut state = shared.lock();
                            if state.generation != generation {
                                return;
                            }
                            state.timer = None;
                            let trailing = state.trailing.take();
                            if trailing.is_some() {
                                state.last_fired = Some(Instant::now());
                            }
                            trailing
                        };
                        if let Some(pending) = trailing {
                            pending.fire();
                        }
                    }));
                }
            }
            _ => {
                state.last_fired = Some(now);
                state.trailing = None;
                Self::stop_timer(&mut state);
                drop(state);
                pending.fire();
            }
        }
    }

    /// Drop any trailing action and forget the current window, so the next
    /// call fires immediately.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.trailing = None;
        state.last_fired = None;
        Self::stop_timer(&mut state);
    }

    pub fn is_pending(&self) -> bool {
        self.state.lock().trailing.is_some()
    }

    fn stop_timer(state: &mut ThrottleState) {
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.generation += 1;
    }
}
