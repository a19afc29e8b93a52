use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use tarrific::analyzers::flows::CoordinateLookup;
use tarrific::analyzers::types::LonLat;
use tarrific::fetch::HttpClient;

const DEFAULT_BASE_URL: &str = "https://restcountries.com/v3.1";

#[derive(Deserialize)]
struct CountryInfo {
    /// `[lat, lon]`
    latlng: Option<Vec<f64>>,
}

/// Resolves country positions through the REST Countries API.
pub struct RestCountriesClient<C> {
    http: C,
    base_url: String,
}

impl<C: HttpClient> RestCountriesClient<C> {
    pub fn new(http: C) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> CoordinateLookup for RestCountriesClient<C> {
    async fn coordinates(&self, iso: &str) -> Result<Option<LonLat>> {
        let url = format!("{}/alpha/{}", self.base_url, iso);
        let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

        let response = self
            .http
            .execute(req)
            .await
            .with_context(|| format!("REST Countries request failed for '{iso}'"))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "REST Countries returned status {} for '{}': {}",
                status,
                iso,
                body
            ));
        }

        let countries: Vec<CountryInfo> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse REST Countries response for '{iso}'"))?;

        let position = countries
            .into_iter()
            .next()
            .and_then(|c| c.latlng)
            .and_then(|latlng| match latlng.as_slice() {
                [lat, lon, ..] => Some([*lon, *lat]),
                _ => None,
            });

        Ok(position)
    }
}
