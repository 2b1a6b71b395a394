//! In-memory collaborators for unit tests.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use skycast_weather::{
    ApiError, Coordinates, GeolocationProvider, LocationApi, LocationCandidate, LocationError,
    Position,
};

pub(crate) fn candidate(id: u64, title: &str) -> LocationCandidate {
    LocationCandidate {
        id,
        title: title.to_string(),
        location_type: "City".to_string(),
        latt_long: String::new(),
    }
}

#[derive(Debug, Clone)]
enum StubResponse {
    Found {
        results: Vec<LocationCandidate>,
        delay: Duration,
    },
    Status {
        status: u16,
        delay: Duration,
    },
}

/// Canned location API. Unknown queries answer with an empty list.
#[derive(Debug, Default)]
pub(crate) struct StubApi {
    responses: Mutex<HashMap<String, StubResponse>>,
    query_calls: Mutex<Vec<String>>,
    lattlong_calls: Mutex<Vec<Coordinates>>,
}

impl StubApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, key: &str, results: Vec<LocationCandidate>) -> Self {
        self.respond_after(key, Duration::ZERO, results)
    }

    pub(crate) fn respond_after(
        self,
        key: &str,
        delay: Duration,
        results: Vec<LocationCandidate>,
    ) -> Self {
        self.responses
            .lock()
            .insert(key.to_string(), StubResponse::Found { results, delay });
        self
    }

    pub(crate) fn fail(self, key: &str, status: u16) -> Self {
        self.fail_after(key, Duration::ZERO, status)
    }

    pub(crate) fn fail_after(self, key: &str, delay: Duration, status: u16) -> Self {
        self.responses
            .lock()
            .insert(key.to_string(), StubResponse::Status { status, delay });
        self
    }

    pub(crate) fn query_calls(&self) -> Vec<String> {
        self.query_calls.lock().clone()
    }

    pub(crate) fn lattlong_calls(&self) -> Vec<Coordinates> {
        self.lattlong_calls.lock().clone()
    }

    async fn answer(&self, key: &str, endpoint: String) -> Result<Vec<LocationCandidate>, ApiError> {
        let response = self.responses.lock().get(key).cloned();
        let delay = match &response {
            Some(StubResponse::Found { delay, .. }) | Some(StubResponse::Status { delay, .. }) => {
                *delay
            }
            None => Duration::ZERO,
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match response {
            Some(StubResponse::Found { results, .. }) => Ok(results),
            Some(StubResponse::Status { status, .. }) => Err(ApiError::Status { status, endpoint }),
            None => Ok(Vec::new()),
        }
    }
}

impl LocationApi for StubApi {
    async fn search_query(&self, query: &str) -> Result<Vec<LocationCandidate>, ApiError> {
        self.query_calls.lock().push(query.to_string());
        self.answer(query, format!("/api/search/query/{}", query))
            .await
    }

    async fn search_lattlong(
        &self,
        coordinates: Coordinates,
    ) -> Result<Vec<LocationCandidate>, ApiError> {
        self.lattlong_calls.lock().push(coordinates);
        let key = coordinates.to_string();
        self.answer(&key, format!("/api/search/lattlong/{}", key))
            .await
    }
}

/// Geolocation that answers with a fixed outcome.
#[derive(Debug)]
pub(crate) struct StubGeolocation {
    available: bool,
    outcome: Result<Position, LocationError>,
    requests: Mutex<usize>,
}

impl StubGeolocation {
    pub(crate) fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            available: true,
            outcome: Ok(Position {
                coordinates: Coordinates::new(latitude, longitude),
                accuracy_meters: Some(20.0),
            }),
            requests: Mutex::new(0),
        }
    }

    pub(crate) fn denied() -> Self {
        Self {
            available: true,
            outcome: Err(LocationError::PermissionDenied),
            requests: Mutex::new(0),
        }
    }

    pub(crate) fn unsupported() -> Self {
        Self {
            available: false,
            outcome: Err(LocationError::ServiceUnavailable),
            requests: Mutex::new(0),
        }
    }

    pub(crate) fn requests(&self) -> usize {
        *self.requests.lock()
    }
}

impl GeolocationProvider for StubGeolocation {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn current_position(&self) -> Result<Position, LocationError> {
        *self.requests.lock() += 1;
        self.outcome.clone()
    }
}
