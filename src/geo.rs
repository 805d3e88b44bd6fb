//! Geolocation collaborator
//!
//! One lookup per session, on a background task. The session never waits for
//! it and never retries: any failure collapses to the configured placeholder.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::GeolocationError;
use crate::observability::metrics;

/// Resolves the visitor's city.
#[async_trait]
pub trait Geolocator: Send + Sync {
    /// Looks up the city name.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails or yields no city.
    async fn locate(&self) -> Result<String, GeolocationError>;
}

/// Runs a single lookup bounded by `timeout`, falling back to `fallback` on
/// any error.
pub async fn resolve_city(geolocator: &dyn Geolocator, timeout: Duration, fallback: &str) -> String {
    let outcome = match tokio::time::timeout(timeout, geolocator.locate()).await {
        Ok(result) => result,
        Err(_) => Err(GeolocationError::Timeout(timeout)),
    };

    match outcome {
        Ok(city) => {
            tracing::debug!(%city, "geolocation resolved");
            city
        }
        Err(e) => {
            metrics::record_geolocation_fallback();
            tracing::info!(error = %e, fallback, "geolocation failed; using placeholder");
            fallback.to_string()
        }
    }
}

// ============================================================================
// HTTP lookup
// ============================================================================

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    city: Option<String>,
}

/// Looks up the city from a JSON endpoint exposing a `city` field.
#[derive(Debug, Clone)]
pub struct HttpGeolocator {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpGeolocator {
    /// Creates a geolocator for `endpoint`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Geolocator for HttpGeolocator {
    async fn locate(&self) -> Result<String, GeolocationError> {
        let body: LookupResponse = self
            .client
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        body.city
            .map(|city| city.trim().to_string())
            .filter(|city| !city.is_empty())
            .ok_or(GeolocationError::MissingCity)
    }
}

// ============================================================================
// Fixed lookup
// ============================================================================

/// Answers with a preset outcome. `None` behaves like a failed lookup.
#[derive(Debug, Clone, Default)]
pub struct FixedGeolocator {
    city: Option<String>,
}

impl FixedGeolocator {
    /// Always resolves to `city`.
    #[must_use]
    pub fn city(city: impl Into<String>) -> Self {
        Self {
            city: Some(city.into()),
        }
    }

    /// Always fails.
    #[must_use]
    pub const fn failing() -> Self {
        Self { city: None }
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn locate(&self) -> Result<String, GeolocationError> {
        self.city.clone().ok_or(GeolocationError::MissingCity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverAnswers;

    #[async_trait]
    impl Geolocator for NeverAnswers {
        async fn locate(&self) -> Result<String, GeolocationError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_success_returns_city() {
        let city = resolve_city(&FixedGeolocator::city("Lima"), Duration::from_secs(1), "x").await;
        assert_eq!(city, "Lima");
    }

    #[tokio::test]
    async fn test_failure_falls_back() {
        let city = resolve_city(
            &FixedGeolocator::failing(),
            Duration::from_secs(1),
            "su ciudad",
        )
        .await;
        assert_eq!(city, "su ciudad");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back() {
        let city = resolve_city(&NeverAnswers, Duration::from_secs(5), "su ciudad").await;
        assert_eq!(city, "su ciudad");
    }

    #[test]
    fn test_lookup_response_without_city() {
        let body: LookupResponse = serde_json::from_str(r#"{"ip":"203.0.113.9"}"#).unwrap();
        assert!(body.city.is_none());
    }
}
