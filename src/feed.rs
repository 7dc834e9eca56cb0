//! Marketplace sales feed.

use std::{future::Future, time::Duration};

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use tracing::debug;
use url::Url;

use crate::{
    collection::Collection,
    error::{FeedError, NormalizeError},
    types::{EventsPage, RawSaleEvent},
};

pub const DEFAULT_EVENTS_URL: &str = "https://api.opensea.io/api/v1/events";

/// Upper bound the marketplace accepts for a page.
pub const MAX_PAGE_LIMIT: usize = 300;

/// Which sales to fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedQuery {
    /// Sales that occurred after the given unix timestamp.
    Since(i64),
    /// The most recent `n` sales, unfiltered.
    Recent(usize),
}

/// Decoded records of one fetch, in feed order. A record that failed to
/// decode is reported in place.
pub type FeedRecords = Vec<Result<RawSaleEvent, NormalizeError>>;

/// Source of completed sale events for a collection.
pub trait SalesFeed {
    fn fetch(
        &self,
        collection: &Collection,
        query: FeedQuery,
    ) -> impl Future<Output = Result<FeedRecords, FeedError>> + Send;
}

/// Decode an events page, record by record.
pub fn decode_page(body: &str) -> Result<FeedRecords, FeedError> {
    let page: EventsPage = serde_json::from_str(body)?;
    Ok(page
        .asset_events
        .into_iter()
        .map(|value| {
            serde_json::from_value(value)
                .map_err(|e| NormalizeError::MalformedEvent(e.to_string()))
        })
        .collect())
}

/// OpenSea events API client.
#[derive(Clone, Debug)]
pub struct OpenSeaClient {
    http: reqwest::Client,
    events_url: Url,
    page_limit: usize,
}

impl OpenSeaClient {
    pub fn try_new(
        events_url: Url,
        api_key: &str,
        page_limit: usize,
        timeout: Duration,
    ) -> Result<Self, FeedError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Ok(key) = HeaderValue::from_str(api_key) {
            headers.insert("x-api-key", key);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            events_url,
            page_limit: page_limit.clamp(1, MAX_PAGE_LIMIT),
        })
    }

    /// Query string for the given collection and mode.
    pub fn query_params(&self, collection: &Collection, query: FeedQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("asset_contract_address", collection.contract_hex()),
            ("event_type", "successful".to_string()),
            ("only_opensea", "false".to_string()),
        ];
        match query {
            FeedQuery::Since(ts) => {
                params.push(("occurred_after", ts.to_string()));
                params.push(("limit", self.page_limit.to_string()));
            }
            FeedQuery::Recent(n) => {
                params.push(("limit", n.clamp(1, MAX_PAGE_LIMIT).to_string()));
            }
        }
        params
    }
}

impl SalesFeed for OpenSeaClient {
    async fn fetch(&self, collection: &Collection, query: FeedQuery) -> Result<FeedRecords, FeedError> {
        let params = self.query_params(collection, query);
        debug!(collection = %collection.kind(), ?query, "Fetching sales");

        let response = self
            .http
            .get(self.events_url.clone())
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FeedError::Status { status, body });
        }

        decode_page(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_page_keeps_going_past_bad_records() {
        let body = r#"{"asset_events": [
            {"total_price": "1", "asset": {"name": "Kong #1", "token_id": "1"}},
            {"total_price": {"oops": true}},
            {"total_price": "2"}
        ]}"#;

        let records = decode_page(body).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records[0].is_ok());
        assert!(matches!(records[1], Err(NormalizeError::MalformedEvent(_))));
        assert!(records[2].is_ok());
    }

    #[test]
    fn test_decode_page_rejects_non_json() {
        assert!(matches!(decode_page("<html>"), Err(FeedError::Decode(_))));
        assert!(decode_page("{}").unwrap().is_empty());
    }

    #[test]
    fn test_query_params() {
        let client = OpenSeaClient::try_new(
            Url::parse(DEFAULT_EVENTS_URL).unwrap(),
            "key",
            1000,
            Duration::from_secs(5),
        )
        .unwrap();
        let kongs = Collection::kong();

        let params = client.query_params(&kongs, FeedQuery::Since(1_650_000_000));
        assert!(params.contains(&(
            "asset_contract_address",
            "0xef0182dc0574cd5874494a120750fd222fdb909a".to_string()
        )));
        assert!(params.contains(&("event_type", "successful".to_string())));
        assert!(params.contains(&("occurred_after", "1650000000".to_string())));
        assert!(params.contains(&("limit", MAX_PAGE_LIMIT.to_string())));

        let params = client.query_params(&kongs, FeedQuery::Recent(1));
        assert!(params.iter().all(|(k, _)| *k != "occurred_after"));
        assert!(params.contains(&("limit", "1".to_string())));
    }
}
