//! # hearth-geo: Geocoding for Hearth
//!
//! Reverse geocoding for "use my location", forward geocoding for address
//! validation, and normalization of both into [`NormalizedAddress`].
//!
//! ## Modules
//!
//! - [`nominatim`] - [`Geocoder`] trait and the HTTP client
//! - [`types`] - Wire records and the normalized address
//! - [`validator`] - Address validation with offline fallback
//! - [`error`] - [`GeoError`]

pub mod error;
pub mod nominatim;
pub mod types;
pub mod validator;

pub use error::{GeoError, GeoResult};
pub use nominatim::{Geocoder, GeocoderConfig, NominatimGeocoder, DEFAULT_BASE_URL};
pub use types::{AddressDetails, GeocodeResult, NormalizedAddress};
pub use validator::{AddressValidation, AddressValidator, ValidationSource, ADDRESS_NOT_FOUND};
