//! # Geocoder Client
//!
//! The [`Geocoder`] seam and its HTTP implementation against a
//! Nominatim-compatible service.
//!
//! ## Requests
//! ```text
//! GET {base}/reverse?format=jsonv2&lat={lat}&lon={lon}&addressdetails=1
//! GET {base}/search?format=jsonv2&q={query}&limit={n}&addressdetails=1
//! ```
//! No authentication. A descriptive User-Agent is required by the public
//! service's usage policy.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{GeoError, GeoResult};
use crate::types::GeocodeResult;

// =============================================================================
// Geocoder Trait
// =============================================================================

/// Forward and reverse address lookup.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Best match for a coordinate, or `None` when nothing is there.
    async fn reverse(&self, lat: f64, lon: f64) -> GeoResult<Option<GeocodeResult>>;

    /// Candidates for free-form address text, best first.
    async fn search(&self, query: &str, limit: usize) -> GeoResult<Vec<GeocodeResult>>;
}

// =============================================================================
// Configuration
// =============================================================================

pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    /// Default `limit` for searches issued by the validator.
    pub result_limit: usize,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        GeocoderConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: format!("hearth-client/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(10),
            result_limit: 5,
        }
    }
}

// =============================================================================
// Nominatim Client
// =============================================================================

/// HTTP geocoder.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    http: Client,
    base: Url,
    config: GeocoderConfig,
}

impl NominatimGeocoder {
    pub fn new(config: GeocoderConfig) -> GeoResult<Self> {
        // Trailing slash so joins append rather than replace the last segment
        let mut base = config.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base = Url::parse(&base)?;

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(NominatimGeocoder { http, base, config })
    }

    pub fn config(&self) -> &GeocoderConfig {
        &self.config
    }

    pub(crate) fn reverse_url(&self, lat: f64, lon: f64) -> GeoResult<Url> {
        let mut url = self.base.join("reverse")?;
        url.query_pairs_mut()
            .append_pair("format", "jsonv2")
            .append_pair("lat", &lat.to_string())
            .append_pair("lon", &lon.to_string())
            .append_pair("addressdetails", "1");
        Ok(url)
    }

    pub(crate) fn search_url(&self, query: &str, limit: usize) -> GeoResult<Url> {
        let mut url = self.base.join("search")?;
        url.query_pairs_mut()
            .append_pair("format", "jsonv2")
            .append_pair("q", query)
            .append_pair("limit", &limit.to_string())
            .append_pair("addressdetails", "1");
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> GeoResult<T> {
        let response = self
            .http
            .get(url.clone())
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(GeoError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    #[instrument(skip(self))]
    async fn reverse(&self, lat: f64, lon: f64) -> GeoResult<Option<GeocodeResult>> {
        let url = self.reverse_url(lat, lon)?;
        let body: serde_json::Value = self.get_json(url).await?;

        // Nothing at the point comes back as 200 {"error": "Unable to geocode"}
        if body.get("error").is_some() {
            debug!("No reverse geocoding result");
            return Ok(None);
        }

        Ok(Some(serde_json::from_value(body)?))
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, limit: usize) -> GeoResult<Vec<GeocodeResult>> {
        let url = self.search_url(query, limit)?;
        let results: Vec<GeocodeResult> = self.get_json(url).await?;
        debug!(hits = results.len(), "Search complete");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serves one canned HTTP response and hands back the request head.
    async fn serve_once(status: &str, body: &str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            let _ = tx.send(String::from_utf8_lossy(&request).into_owned());
        });

        (base, rx)
    }

    fn geocoder(base: &str) -> NominatimGeocoder {
        NominatimGeocoder::new(GeocoderConfig {
            base_url: base.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_reverse_url() {
        let url = geocoder("https://geo.example.com").reverse_url(51.5, -0.12).unwrap();
        assert_eq!(
            url.as_str(),
            "https://geo.example.com/reverse?format=jsonv2&lat=51.5&lon=-0.12&addressdetails=1"
        );
    }

    #[test]
    fn test_search_url_keeps_base_path_and_encodes_query() {
        let url = geocoder("https://geo.example.com/nominatim/")
            .search_url("12 King St & Co", 3)
            .unwrap();
        assert_eq!(url.path(), "/nominatim/search");

        let q: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(q.contains(&("q".to_string(), "12 King St & Co".to_string())));
        assert!(q.contains(&("limit".to_string(), "3".to_string())));
    }

    #[test]
    fn test_invalid_base_url() {
        let result = NominatimGeocoder::new(GeocoderConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(GeoError::InvalidUrl(_))));
    }

    #[test]
    fn test_decode_search_body() {
        let body = r#"[
            {"lat": "40.7128", "lon": "-74.0060", "display_name": "New York",
             "address": {"city": "New York", "country_code": "us"}},
            {"lat": "43.0", "lon": "-75.0", "display_name": "New York State", "address": {}}
        ]"#;
        let results: Vec<GeocodeResult> = serde_json::from_str(body).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].address.city.as_deref(), Some("New York"));
    }

    #[tokio::test]
    async fn test_non_ok_status_is_reported() {
        let (base, _) = serve_once("503 Service Unavailable", r#"{"message":"busy"}"#).await;

        let err = geocoder(&base).search("Lagos", 3).await.unwrap_err();
        match err {
            GeoError::Status { status, body } => {
                assert_eq!(status, 503);
                assert!(body.contains("busy"));
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reverse_error_body_means_no_result() {
        let (base, request) = serve_once("200 OK", r#"{"error":"Unable to geocode"}"#).await;

        let result = geocoder(&base).reverse(0.0, 0.0).await.unwrap();
        assert!(result.is_none());

        let head = request.await.unwrap().to_lowercase();
        assert!(head.starts_with("get /reverse?format=jsonv2"));
        assert!(head.contains("user-agent: hearth-client/"));
    }

    #[tokio::test]
    async fn test_search_decodes_results() {
        let body = r#"[{"lat": "6.5244", "lon": "3.3792", "display_name": "Lagos",
                        "address": {"city": "Lagos", "country_code": "ng"}}]"#;
        let (base, _) = serve_once("200 OK", body).await;

        let results = geocoder(&base).search("Lagos", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].address.city.as_deref(), Some("Lagos"));
    }
}
