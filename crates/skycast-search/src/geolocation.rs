//! One-shot "where am I" lookup.

use skycast_weather::{GeolocationProvider, LocationApi, LocationCandidate};

use crate::selection::GeolocationStatus;

#[derive(Debug, Clone, PartialEq)]
pub enum GeolocationOutcome {
    /// No geolocation capability; nothing was requested
    Unsupported,
    Resolved(LocationCandidate),
    /// Denied, failed, or no location near the position
    Unresolved,
}

impl GeolocationOutcome {
    pub fn status(&self) -> GeolocationStatus {
        match self {
            Self::Unsupported => GeolocationStatus::Unsupported,
            Self::Resolved(_) => GeolocationStatus::Resolved,
            Self::Unresolved => GeolocationStatus::Unresolved,
        }
    }

    pub fn into_candidate(self) -> Option<LocationCandidate> {
        match self {
            Self::Resolved(candidate) => Some(candidate),
            _ => None,
        }
    }
}

/// Find the location nearest the device.
///
/// Never fails. The coordinate search is only made once a position is known;
/// its first candidate wins.
#[tracing::instrument(skip_all, level = "info")]
pub async fn resolve_current_location<A, G>(api: &A, geolocation: &G) -> GeolocationOutcome
where
    A: LocationApi,
    G: GeolocationProvider,
{
    if !geolocation.is_available() {
        tracing::info!("Geolocation unavailable, skipping current location");
        return GeolocationOutcome::Unsupported;
    }

    let position = match geolocation.current_position().await {
        Ok(position) => position,
        Err(e) => {
            tracing::info!("No device position: {}", e);
            return GeolocationOutcome::Unresolved;
        }
    };

    match api.search_lattlong(position.coordinates).await {
        Ok(results) => match results.into_iter().next() {
            Some(nearest) => {
                tracing::info!(id = nearest.id, title = %nearest.title, "Resolved current location");
                GeolocationOutcome::Resolved(nearest)
            }
            None => {
                tracing::info!(coordinates = %position.coordinates, "No location near device position");
                GeolocationOutcome::Unresolved
            }
        },
        Err(e) => {
            tracing::warn!(coordinates = %position.coordinates, "Coordinate search failed: {}", e);
            GeolocationOutcome::Unresolved
        }
    }
}
