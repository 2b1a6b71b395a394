//! Shared error types for SkyCast.
//!
//! `Display` keeps the detail for logs; `user_message()` is what the terminal
//! shows.

use thiserror::Error;

/// Transport-level failure talking to the weather proxy.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Weather proxy unreachable: {0}")]
    Unreachable(String),

    #[error("Request to weather proxy timed out")]
    Timeout,

    #[error("Weather proxy answered {status}: {reason}")]
    Rejected { status: u16, reason: String },

    #[error("Undecodable body from weather proxy: {0}")]
    Undecodable(String),

    #[error("HTTP transport error: {0}")]
    Transport(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unreachable(_) | Self::Transport(_) => {
                "Unable to reach the weather service. Check your connection."
            }
            Self::Timeout => "The weather service took too long to answer.",
            Self::Rejected { status, .. } if *status >= 500 => {
                "The weather service is experiencing issues. Please try again later."
            }
            Self::Rejected { .. } => "The weather service rejected the request.",
            Self::Undecodable(_) => "Received unreadable weather data.",
        }
    }
}

/// Problems with the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No configuration file at {0}")]
    Missing(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Malformed configuration file: {0}")]
    Malformed(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Missing(_) => "No configuration file found.",
            Self::Invalid(_) => "The configuration has invalid values. Check config.toml.",
            Self::Malformed(_) => "config.toml is not valid TOML.",
        }
    }
}

/// Sort `reqwest` failures into [`NetworkError`] variants.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        let detail = self.to_string();
        match self.status() {
            _ if self.is_timeout() => NetworkError::Timeout,
            _ if self.is_connect() => NetworkError::Unreachable(detail),
            _ if self.is_decode() => NetworkError::Undecodable(detail),
            Some(status) => NetworkError::Rejected {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            },
            None => NetworkError::Transport(detail),
        }
    }
}
