//! Weather data access for SkyCast
//!
//! Talks to the weather proxy (location search by text or coordinates, daily
//! forecast by location id) and describes the device geolocation capability.

pub mod client;
pub mod forecast;
pub mod location;
pub mod types;

pub use client::{ApiClient, LocationApi};
pub use forecast::ForecastState;
pub use location::{GeolocationProvider, StaticGeolocation};
pub use types::*;
