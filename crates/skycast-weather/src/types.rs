use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use skycast_core::NetworkError;

/// One search result or resolved place, as returned by the location search endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCandidate {
    /// Upstream "where on earth" id; stable per place
    #[serde(rename = "woeid", alias = "id")]
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub location_type: String,
    /// Coordinates as upstream text, `"lat,long"`
    #[serde(default)]
    pub latt_long: String,
}

impl LocationCandidate {
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.latt_long.parse().ok()
    }
}

/// Latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Formats as the `lat,long` path segment the coordinate search expects
impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

impl std::str::FromStr for Coordinates {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, long) = s
            .split_once(',')
            .ok_or_else(|| ApiError::Parse(format!("Expected \"lat,long\", got {:?}", s)))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| ApiError::Parse(format!("Bad coordinate {:?}: {}", part, e)))
        };
        Ok(Self::new(parse(lat)?, parse(long)?))
    }
}

/// Device position reported by a geolocation provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub coordinates: Coordinates,
    pub accuracy_meters: Option<f64>,
}

/// Weather condition categories mapped from upstream state abbreviations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    LightCloud,
    HeavyCloud,
    Showers,
    LightRain,
    HeavyRain,
    Thunderstorm,
    Hail,
    Sleet,
    Snow,
}

impl WeatherCondition {
    /// Map an upstream `weather_state_abbr` (e.g. `"hc"`) to a condition
    pub fn from_abbr(abbr: &str) -> Self {
        match abbr {
            "c" => Self::Clear,
            "lc" => Self::LightCloud,
            "hc" => Self::HeavyCloud,
            "s" => Self::Showers,
            "lr" => Self::LightRain,
            "hr" => Self::HeavyRain,
            "t" => Self::Thunderstorm,
            "h" => Self::Hail,
            "sl" => Self::Sleet,
            "sn" => Self::Snow,
            _ => Self::Clear, // Unknown codes default to clear
        }
    }

    /// Get icon name
    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::Clear => "sun",
            Self::LightCloud => "cloud_sun",
            Self::HeavyCloud => "cloud",
            Self::Showers | Self::LightRain | Self::HeavyRain => "cloud_rain",
            Self::Thunderstorm => "cloud_lightning",
            Self::Hail | Self::Sleet | Self::Snow => "cloud_snow",
        }
    }
}

/// Daily forecast entry (`consolidated_weather[]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub id: u64,
    #[serde(default)]
    pub weather_state_name: String,
    #[serde(default)]
    pub weather_state_abbr: String,
    pub applicable_date: NaiveDate,
    #[serde(default)]
    pub min_temp: f64,
    #[serde(default)]
    pub max_temp: f64,
    #[serde(default)]
    pub the_temp: f64,
}

impl DailyForecast {
    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_abbr(&self.weather_state_abbr)
    }

    pub fn weekday(&self) -> &'static str {
        match self.applicable_date.weekday() {
            Weekday::Sun => "Sunday",
            Weekday::Mon => "Monday",
            Weekday::Tue => "Tuesday",
            Weekday::Wed => "Wednesday",
            Weekday::Thu => "Thursday",
            Weekday::Fri => "Friday",
            Weekday::Sat => "Saturday",
        }
    }
}

/// Location details with its multi-day forecast (`GET /api/location/{id}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub woeid: u64,
    pub title: String,
    #[serde(default)]
    pub location_type: String,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub consolidated_weather: Vec<DailyForecast>,
}

/// Geolocation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Other(String),
}

/// Weather proxy errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("Unexpected status {status} from {endpoint}")]
    Status { status: u16, endpoint: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ApiError::Network(e) => e.user_message(),
            ApiError::Status { status, .. } if *status >= 500 => {
                "The weather service is experiencing issues. Please try again later."
            }
            ApiError::Status { .. } => "The weather service rejected the request.",
            ApiError::Parse(_) => "Received unreadable weather data.",
            ApiError::InvalidUrl(_) => "The weather service address is invalid. Check settings.",
        }
    }
}
