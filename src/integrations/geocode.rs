use anyhow::{Context, Result};
use log::{debug, error};
use serde::Deserialize;
use std::time::Duration;

use crate::rate_limiter::RateLimiter;

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
const USER_AGENT: &str = "RefMatch/0.1";
const TIMEOUT_SECS: u64 = 10;
const RATE_LIMIT_MS: u64 = 1000;

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

/// Address lookup against the OpenStreetMap Nominatim API, paced to its
/// one-request-per-second usage policy.
pub struct GeocodeClient {
    client: reqwest::Client,
    rate_limiter: RateLimiter,
}

impl GeocodeClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .context("Failed to build geocoding HTTP client")?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::new(RATE_LIMIT_MS),
        })
    }

    /// Best-effort lookup; failures are logged and surface as `None` so game
    /// intake can proceed without coordinates.
    pub async fn coordinates_for(&self, address: &str) -> Option<(f64, f64)> {
        match self.lookup(address).await {
            Ok(coordinates) => coordinates,
            Err(err) => {
                error!("Geocoding failed for '{}': {err:#}", address);
                None
            }
        }
    }

    async fn lookup(&self, address: &str) -> Result<Option<(f64, f64)>> {
        self.rate_limiter.wait().await;

        let url = Self::build_search_url(address)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send geocoding request")?;

        if !response.status().is_success() {
            anyhow::bail!("geocoder returned status {}", response.status());
        }

        let places: Vec<Place> = response
            .json()
            .await
            .context("Failed to parse geocoding response")?;

        match places.first() {
            Some(place) => {
                let lat = place.lat.parse::<f64>().context("Failed to parse latitude")?;
                let lon = place.lon.parse::<f64>().context("Failed to parse longitude")?;
                debug!("Resolved '{}' to ({}, {})", address, lat, lon);
                Ok(Some((lat, lon)))
            }
            None => Ok(None),
        }
    }

    fn build_search_url(address: &str) -> Result<reqwest::Url> {
        reqwest::Url::parse_with_params(
            &format!("{NOMINATIM_URL}/search"),
            &[("q", address), ("format", "json"), ("limit", "1")],
        )
        .context("Failed to build geocoding URL")
    }
}
