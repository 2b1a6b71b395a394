//! Forecast state for the active location.

use crate::types::{ApiError, DailyForecast, Forecast, LocationCandidate};

/// Daily forecast for the active location, as shown by the front end.
#[derive(Debug, Clone, Default)]
pub struct ForecastState {
    location: Option<LocationCandidate>,
    items: Vec<DailyForecast>,
    loading: bool,
}

impl ForecastState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start loading for a new location; previous items are kept until `finish`.
    pub fn begin(&mut self, location: LocationCandidate) {
        self.location = Some(location);
        self.loading = true;
    }

    /// Apply a fetch result. Results for a location other than the current one
    /// are ignored. Failures clear the items.
    ///
    /// Returns whether the state changed.
    pub fn finish(&mut self, location_id: u64, result: Result<Forecast, ApiError>) -> bool {
        if self.location.as_ref().map(|l| l.id) != Some(location_id) {
            tracing::debug!("Dropping forecast for superseded location {}", location_id);
            return false;
        }

        self.loading = false;
        self.items = match result {
            Ok(forecast) => forecast.consolidated_weather,
            Err(e) => {
                tracing::warn!("Forecast fetch failed for {}: {}", location_id, e);
                Vec::new()
            }
        };
        true
    }

    pub fn location(&self) -> Option<&LocationCandidate> {
        self.location.as_ref()
    }

    pub fn items(&self) -> &[DailyForecast] {
        &self.items
    }

    /// Still fetching, or no location to forecast yet
    pub fn is_loading(&self) -> bool {
        self.loading || self.location.is_none()
    }

    pub fn today(&self) -> Option<&DailyForecast> {
        self.items.first()
    }

    /// Days after today
    pub fn upcoming(&self) -> &[DailyForecast] {
        self.items.get(1..).unwrap_or(&[])
    }

    /// Plain-text rendering for the terminal
    pub fn render(&self) -> String {
        if self.is_loading() {
            return match &self.location {
                Some(location) => format!("Forecasting {}...", location.title),
                None => "Forecasting...".to_string(),
            };
        }

        let (Some(location), Some(today)) = (&self.location, self.today()) else {
            return "No forecast available.".to_string();
        };

        let mut out = format!(
            "{}\n  {} ({})  {}°\n  Min: {}°  Max: {}°\n",
            location.title,
            today.weather_state_name,
            today.condition().icon_name(),
            degrees(today.the_temp),
            degrees(today.min_temp),
            degrees(today.max_temp),
        );
        for day in self.upcoming() {
            out.push_str(&format!(
                "  {:<9}  {:<14}  Min: {}°  Max: {}°\n",
                day.weekday(),
                day.weather_state_name,
                degrees(day.min_temp),
                degrees(day.max_temp),
            ));
        }
        out
    }
}

/// Whole degrees, without a `-0` for values just below zero
fn degrees(temp: f64) -> f64 {
    let rounded = temp.round();
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
