//! Geocoding errors.
//!
//! Every variant here is recoverable: the address validator answers any of
//! them with the offline heuristic instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeoError {
    /// Request could not be sent or timed out.
    #[error("Geocoding request failed: {0}")]
    Http(String),

    /// Geocoder answered with a non-success status.
    #[error("Geocoder returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not the expected JSON shape.
    #[error("Could not decode geocoder response: {0}")]
    Decode(String),

    /// Configured base URL is malformed.
    #[error("Invalid geocoder URL: {0}")]
    InvalidUrl(String),

    /// Latitude or longitude is out of range.
    #[error("Invalid coordinates: lat {lat}, lon {lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },
}

impl From<reqwest::Error> for GeoError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GeoError::Decode(err.to_string())
        } else {
            GeoError::Http(err.to_string())
        }
    }
}

impl From<url::ParseError> for GeoError {
    fn from(err: url::ParseError) -> Self {
        GeoError::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for GeoError {
    fn from(err: serde_json::Error) -> Self {
        GeoError::Decode(err.to_string())
    }
}

pub type GeoResult<T> = Result<T, GeoError>;
