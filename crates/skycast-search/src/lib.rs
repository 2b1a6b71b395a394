//! Location search state machine for SkyCast.
//!
//! Turns keystrokes into location lookups: throttled or debounced dispatch,
//! a session-lifetime result cache, stale-response suppression, keyboard
//! highlight/selection, and a one-shot geolocation fallback.

pub mod cache;
pub mod dispatcher;
pub mod geolocation;
pub mod scheduler;
pub mod selection;
pub mod session;

#[cfg(test)]
mod testing;

pub use cache::ResultCache;
pub use dispatcher::QueryDispatcher;
pub use geolocation::{resolve_current_location, GeolocationOutcome};
pub use scheduler::{Debounce, Throttle};
pub use selection::{GeolocationStatus, SearchState};
pub use session::SearchSession;
