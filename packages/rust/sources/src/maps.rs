//! Maps/places listing adapter.
//!
//! Drives a Places-style JSON API: paginated text search, then a detail
//! lookup per place, then a concurrent email scan over each place's own
//! website. Places without a website, or whose site yields no contact
//! email, are dropped — a lead without a reachable address is not a lead.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use leadscout_shared::{LeadScoutError, MapsConfig, MapsRaw, RawRecord, Result};

use crate::emailscan;

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("LeadScout/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<PlaceSummary>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceSummary {
    place_id: String,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    #[serde(default)]
    result: Option<PlaceDetails>,
}

#[derive(Debug, Clone, Deserialize)]
struct PlaceDetails {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    website: Option<String>,
    #[serde(default)]
    formatted_phone_number: Option<String>,
    #[serde(default)]
    formatted_address: Option<String>,
    #[serde(default)]
    user_ratings_total: Option<u64>,
}

// ---------------------------------------------------------------------------
// MapsClient
// ---------------------------------------------------------------------------

/// Handle on the places API. Constructed once per process and injected into
/// the pipeline entry point.
#[derive(Debug, Clone)]
pub struct MapsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    page_delay: Duration,
}

impl MapsClient {
    /// Create a client from the `[maps]` config section and a resolved API key.
    pub fn new(config: &MapsConfig, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LeadScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            page_delay: Duration::from_millis(config.page_delay_ms),
        })
    }

    /// Search the listing service for a query and return raw records.
    ///
    /// Pagination is sequential: each next page is requested only after the
    /// previous page's places are fully processed, separated by the fixed
    /// configured delay. Never fails past this boundary — a total upstream
    /// failure logs the cause and returns what was collected so far.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn search(&self, query: &str) -> Vec<RawRecord> {
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = match self.fetch_page(query, page_token.as_deref()).await {
                Ok(page) => page,
                Err(e) => {
                    error!(error = %e, "place search failed");
                    break;
                }
            };

            if page.status != "OK" {
                if page.status != "ZERO_RESULTS" {
                    warn!(status = %page.status, "place search returned non-OK status");
                }
                break;
            }

            let page_records = self.process_page(&page.results).await;
            records.extend(page_records);

            match page.next_page_token {
                Some(token) => {
                    // Next-page tokens need a settling delay upstream.
                    tokio::time::sleep(self.page_delay).await;
                    page_token = Some(token);
                }
                None => break,
            }
        }

        info!(count = records.len(), "maps search complete");
        records
    }

    async fn fetch_page(&self, query: &str, page_token: Option<&str>) -> Result<SearchResponse> {
        let url = format!("{}/textsearch/json", self.base_url);
        let mut request = self.http.get(&url).query(&[
            ("query", query),
            ("type", "establishment"),
            ("language", "en"),
            ("key", self.api_key.as_str()),
        ]);
        if let Some(token) = page_token {
            request = request.query(&[("pagetoken", token)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LeadScoutError::Network(format!("text search: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LeadScoutError::Network(format!(
                "text search: HTTP {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| LeadScoutError::parse(format!("text search body: {e}")))
    }

    /// Resolve one page of place summaries into raw records.
    ///
    /// Detail lookups run sequentially; the per-website email scans are all
    /// issued before any is awaited, then joined as a batch. The fan-out is
    /// bounded only by the page size (no explicit cap).
    async fn process_page(&self, places: &[PlaceSummary]) -> Vec<RawRecord> {
        let mut scans = Vec::new();

        for place in places {
            let details = match self.fetch_details(&place.place_id).await {
                Ok(Some(details)) => details,
                Ok(None) => {
                    warn!(place_id = %place.place_id, "place details missing, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(place_id = %place.place_id, error = %e, "place details failed, skipping");
                    continue;
                }
            };

            let Some(website) = details.website.clone() else {
                debug!(name = ?details.name, "place has no website, dropping");
                continue;
            };

            let http = self.http.clone();
            let handle =
                tokio::spawn(async move { emailscan::scan_for_emails(&http, &website).await });
            scans.push((details, handle));
        }

        let mut records = Vec::new();
        for (details, handle) in scans {
            let emails = handle.await.unwrap_or_default();
            if emails.is_empty() {
                debug!(name = ?details.name, "no contact emails found, dropping");
                continue;
            }

            records.push(RawRecord::Maps(MapsRaw {
                name: details.name.unwrap_or_default(),
                website: details.website,
                emails,
                phone: details.formatted_phone_number,
                address: details.formatted_address,
                review_count: details.user_ratings_total.map(|n| n.to_string()),
            }));
        }

        records
    }

    async fn fetch_details(&self, place_id: &str) -> Result<Option<PlaceDetails>> {
        let url = format!("{}/details/json", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("place_id", place_id),
                (
                    "fields",
                    "name,website,formatted_phone_number,formatted_address,user_ratings_total",
                ),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| LeadScoutError::Network(format!("place details: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LeadScoutError::Network(format!(
                "place details: HTTP {status}"
            )));
        }

        let parsed: DetailsResponse = response
            .json()
            .await
            .map_err(|e| LeadScoutError::parse(format!("place details body: {e}")))?;

        if parsed.status != "OK" {
            return Ok(None);
        }
        Ok(parsed.result)
    }
}
