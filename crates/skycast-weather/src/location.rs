//! Device geolocation capability.

use std::future::Future;

use skycast_core::GeolocationConfig;

use crate::types::{Coordinates, LocationError, Position};

/// Source of the device position.
pub trait GeolocationProvider: Send + Sync + 'static {
    /// Whether the capability exists at all on this system.
    fn is_available(&self) -> bool;

    /// Request the current position once.
    fn current_position(&self) -> impl Future<Output = Result<Position, LocationError>> + Send;
}

/// Geolocation backed by configuration rather than a sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticGeolocation {
    available: bool,
    position: Option<Position>,
}

impl StaticGeolocation {
    /// A device that always reports `coordinates`.
    pub fn fixed(coordinates: Coordinates) -> Self {
        Self {
            available: true,
            position: Some(Position {
                coordinates,
                accuracy_meters: None,
            }),
        }
    }

    /// A device with geolocation support but no position fix.
    pub fn without_fix() -> Self {
        Self {
            available: true,
            position: None,
        }
    }

    /// No geolocation support.
    pub fn unsupported() -> Self {
        Self {
            available: false,
            position: None,
        }
    }

    pub fn from_config(config: &GeolocationConfig) -> Self {
        if !config.enabled {
            return Self::unsupported();
        }
        match config.position() {
            Some((lat, long)) => Self::fixed(Coordinates::new(lat, long)),
            None => Self::without_fix(),
        }
    }
}

impl GeolocationProvider for StaticGeolocation {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn current_position(&self) -> Result<Position, LocationError> {
        if !self.available {
            return Err(LocationError::ServiceUnavailable);
        }
        self.position.ok_or(LocationError::ServiceUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_position() {
        let geo = StaticGeolocation::fixed(Coordinates::new(51.1, 45.3));
        assert!(geo.is_available());
        let position = geo.current_position().await.unwrap();
        assert_eq!(position.coordinates, Coordinates::new(51.1, 45.3));
    }

    #[tokio::test]
    async fn test_without_fix() {
        let geo = StaticGeolocation::without_fix();
        assert!(geo.is_available());
        assert_eq!(
            geo.current_position().await,
            Err(LocationError::ServiceUnavailable)
        );
    }

    #[test]
    fn test_from_config() {
        let mut config = GeolocationConfig::default();
        assert_eq!(StaticGeolocation::from_config(&config), StaticGeolocation::without_fix());

        config.latitude = Some(10.75);
        config.longitude = Some(106.66);
        assert_eq!(
            StaticGeolocation::from_config(&config),
            StaticGeolocation::fixed(Coordinates::new(10.75, 106.66))
        );

        config.enabled = false;
        let geo = StaticGeolocation::from_config(&config);
        assert!(!geo.is_available());
    }
}
