//! # Address Validator
//!
//! ```text
//! validate("12 King Street, London")
//!      │
//!      ▼
//! geocoder.search(text, limit)
//!      ├── Ok([hit, ..]) ──► valid, normalized = hit       (source: Geocoder)
//!      ├── Ok([])        ──► invalid, "Address could not be found"
//!      └── Err(_)        ──► validate_address_basic(text)  (source: Fallback)
//! ```

use std::sync::Arc;

use hearth_core::validation::validate_address_basic;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GeoError, GeoResult};
use crate::nominatim::Geocoder;
use crate::types::NormalizedAddress;

pub const ADDRESS_NOT_FOUND: &str = "Address could not be found";

/// Where a validation verdict came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationSource {
    Geocoder,
    /// Offline heuristic; the geocoder was unreachable or the text was blank.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressValidation {
    pub is_valid: bool,
    pub reason: Option<String>,
    pub normalized: Option<NormalizedAddress>,
    pub source: ValidationSource,
}

impl AddressValidation {
    fn fallback(text: &str) -> Self {
        match validate_address_basic(text) {
            Ok(()) => AddressValidation {
                is_valid: true,
                reason: None,
                normalized: None,
                source: ValidationSource::Fallback,
            },
            Err(e) => AddressValidation {
                is_valid: false,
                reason: Some(e.to_string()),
                normalized: None,
                source: ValidationSource::Fallback,
            },
        }
    }
}

/// Validates addresses against a [`Geocoder`].
#[derive(Clone)]
pub struct AddressValidator {
    geocoder: Arc<dyn Geocoder>,
    result_limit: usize,
}

impl AddressValidator {
    pub fn new(geocoder: Arc<dyn Geocoder>, result_limit: usize) -> Self {
        AddressValidator {
            geocoder,
            result_limit: result_limit.max(1),
        }
    }

    /// Never fails: geocoder errors degrade to the heuristic.
    pub async fn validate(&self, text: &str) -> AddressValidation {
        let text = text.trim();
        if text.is_empty() {
            return AddressValidation::fallback(text);
        }

        match self.geocoder.search(text, self.result_limit).await {
            Ok(results) => match results.first() {
                Some(hit) => {
                    debug!(candidates = results.len(), "Address resolved");
                    AddressValidation {
                        is_valid: true,
                        reason: None,
                        normalized: Some(NormalizedAddress::from_result(hit)),
                        source: ValidationSource::Geocoder,
                    }
                }
                None => AddressValidation {
                    is_valid: false,
                    reason: Some(ADDRESS_NOT_FOUND.to_string()),
                    normalized: None,
                    source: ValidationSource::Geocoder,
                },
            },
            Err(e) => {
                warn!(error = %e, "Geocoder unavailable, using offline address check");
                AddressValidation::fallback(text)
            }
        }
    }

    /// Address at a coordinate, for "use my current location".
    pub async fn current_address(&self, lat: f64, lon: f64) -> GeoResult<Option<NormalizedAddress>> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(GeoError::InvalidCoordinates { lat, lon });
        }

        let result = self.geocoder.reverse(lat, lon).await?;
        Ok(result.as_ref().map(NormalizedAddress::from_result))
    }
}

impl std::fmt::Debug for AddressValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressValidator")
            .field("result_limit", &self.result_limit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AddressDetails, GeocodeResult};
    use async_trait::async_trait;

    struct FixedGeocoder(Vec<GeocodeResult>);

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn reverse(&self, _lat: f64, _lon: f64) -> GeoResult<Option<GeocodeResult>> {
            Ok(self.0.first().cloned())
        }

        async fn search(&self, _query: &str, limit: usize) -> GeoResult<Vec<GeocodeResult>> {
            Ok(self.0.iter().take(limit).cloned().collect())
        }
    }

    struct DownGeocoder;

    #[async_trait]
    impl Geocoder for DownGeocoder {
        async fn reverse(&self, _lat: f64, _lon: f64) -> GeoResult<Option<GeocodeResult>> {
            Err(GeoError::Http("connection refused".to_string()))
        }

        async fn search(&self, _query: &str, _limit: usize) -> GeoResult<Vec<GeocodeResult>> {
            Err(GeoError::Http("connection refused".to_string()))
        }
    }

    fn king_street() -> GeocodeResult {
        GeocodeResult {
            lat: 51.5117,
            lon: -0.124,
            display_name: "12, King Street, London".to_string(),
            address: AddressDetails {
                house_number: Some("12".to_string()),
                road: Some("King Street".to_string()),
                city: Some("London".to_string()),
                country_code: Some("gb".to_string()),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_geocoder_hit_is_valid() {
        let validator = AddressValidator::new(Arc::new(FixedGeocoder(vec![king_street()])), 5);
        let result = validator.validate("12 King Street, London").await;

        assert!(result.is_valid);
        assert_eq!(result.source, ValidationSource::Geocoder);
        let normalized = result.normalized.unwrap();
        assert_eq!(normalized.street_line().as_deref(), Some("12 King Street"));
        assert_eq!(normalized.country_code.as_deref(), Some("GB"));
    }

    #[tokio::test]
    async fn test_no_hit_is_invalid() {
        let validator = AddressValidator::new(Arc::new(FixedGeocoder(Vec::new())), 5);
        let result = validator.validate("99 Nowhere Lane").await;

        assert!(!result.is_valid);
        assert_eq!(result.reason.as_deref(), Some(ADDRESS_NOT_FOUND));
        assert_eq!(result.source, ValidationSource::Geocoder);
    }

    #[tokio::test]
    async fn test_geocoder_failure_falls_back_to_heuristic() {
        let validator = AddressValidator::new(Arc::new(DownGeocoder), 5);

        let ok = validator.validate("12 King Street, London").await;
        assert!(ok.is_valid);
        assert_eq!(ok.source, ValidationSource::Fallback);
        assert!(ok.normalized.is_none());

        let bad = validator.validate("abc").await;
        assert!(!bad.is_valid);
        assert_eq!(bad.source, ValidationSource::Fallback);
        assert!(bad.reason.is_some());
    }

    #[tokio::test]
    async fn test_blank_text_skips_geocoder() {
        let validator = AddressValidator::new(Arc::new(FixedGeocoder(vec![king_street()])), 5);
        let result = validator.validate("   ").await;
        assert!(!result.is_valid);
        assert_eq!(result.source, ValidationSource::Fallback);
    }

    #[tokio::test]
    async fn test_current_address() {
        let validator = AddressValidator::new(Arc::new(FixedGeocoder(vec![king_street()])), 5);
        let address = validator.current_address(51.5117, -0.124).await.unwrap().unwrap();
        assert_eq!(address.city.as_deref(), Some("London"));

        let err = validator.current_address(123.0, 0.0).await.unwrap_err();
        assert!(matches!(err, GeoError::InvalidCoordinates { .. }));

        let down = AddressValidator::new(Arc::new(DownGeocoder), 5);
        assert!(down.current_address(0.0, 0.0).await.is_err());
    }
}
