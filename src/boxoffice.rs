use std::{num::NonZeroU32, sync::Arc};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::StatusCode;
use serde::Deserialize;

pub struct BoxOfficeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl BoxOfficeClient {
    pub fn new(client: reqwest::Client, base_url: String, api_key: String, rps: u32) -> Self {
        if api_key.trim().is_empty() {
            tracing::warn!("no BOXOFFICE_API_KEY provided, upstream may reject requests");
        }

        let limiter =
            Arc::new(RateLimiter::direct(Quota::per_second(NonZeroU32::new(rps.max(1)).unwrap())));
        Self { client, base_url, api_key, limiter }
    }

    /// Looks up box office figures for a title. `Ok(None)` means the upstream
    /// has no record; any other non-success is an error for the caller to
    /// absorb.
    pub async fn fetch(&self, title: &str) -> Result<Option<BoxOfficeRecord>, reqwest::Error> {
        self.limiter.until_ready().await;

        let url = format!("{}/boxoffice", self.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .get(url)
            .header("X-API-Key", &self.api_key)
            .query(&[("title", title)])
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let record: BoxOfficeRecord = resp.error_for_status()?.json().await?;
        Ok(Some(record))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxOfficeRecord {
    pub title: String,
    pub distributor: String,
    pub release_date: String,
    pub budget: Option<i64>,
    #[serde(default)]
    pub revenue: RevenueRecord,
    pub mpa_rating: String,
    pub currency: String,
    pub source: String,
    pub last_updated: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RevenueRecord {
    pub worldwide: Option<i64>,
    #[serde(rename = "openingWeekendUSA")]
    pub opening_weekend_usa: Option<i64>,
}
