//! # Geocoding Records
//!
//! Raw geocoder results and the normalized address the app displays.
//!
//! ## Response Shape
//! ```text
//! {
//!   "lat": "51.5072", "lon": "-0.1276",        ← strings on the wire
//!   "display_name": "12, King Street, London, ...",
//!   "address": {
//!     "house_number": "12", "road": "King Street",
//!     "city" | "town" | "village": "London",   ← first present wins
//!     "state": "England", "postcode": "WC2E 8HN",
//!     "country": "United Kingdom", "country_code": "gb"
//!   }
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize};

/// Address components as the geocoder reports them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressDetails {
    #[serde(default)]
    pub house_number: Option<String>,
    #[serde(default)]
    pub road: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub town: Option<String>,
    #[serde(default)]
    pub village: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
}

/// One geocoder hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    #[serde(deserialize_with = "coordinate")]
    pub lat: f64,
    #[serde(deserialize_with = "coordinate")]
    pub lon: f64,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub address: AddressDetails,
}

/// Accepts `"51.5"` as well as `51.5`.
fn coordinate<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

// =============================================================================
// Normalized Address
// =============================================================================

/// Address in the shape the app stores and renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedAddress {
    pub house_number: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    /// ISO 3166-1 alpha-2, upper-case.
    pub country_code: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
}

impl NormalizedAddress {
    pub fn from_result(result: &GeocodeResult) -> Self {
        let a = &result.address;
        let locality = non_empty(&a.city)
            .or_else(|| non_empty(&a.town))
            .or_else(|| non_empty(&a.village));

        NormalizedAddress {
            house_number: non_empty(&a.house_number),
            street: non_empty(&a.road),
            city: locality,
            state: non_empty(&a.state),
            postal_code: non_empty(&a.postcode),
            country: non_empty(&a.country),
            country_code: non_empty(&a.country_code).map(|c| c.to_uppercase()),
            latitude: result.lat,
            longitude: result.lon,
            display_name: result.display_name.trim().to_string(),
        }
    }

    /// `"12 King Street"`, or just the street when there is no number.
    pub fn street_line(&self) -> Option<String> {
        match (&self.house_number, &self.street) {
            (Some(number), Some(street)) => Some(format!("{} {}", number, street)),
            (None, Some(street)) => Some(street.clone()),
            _ => None,
        }
    }

    /// Single-line rendering; falls back to the geocoder's display name.
    pub fn formatted(&self) -> String {
        let parts: Vec<String> = [
            self.street_line(),
            self.city.clone(),
            self.state.clone(),
            self.postal_code.clone(),
            self.country.clone(),
        ]
        .into_iter()
        .flatten()
        .collect();

        if parts.is_empty() {
            self.display_name.clone()
        } else {
            parts.join(", ")
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
