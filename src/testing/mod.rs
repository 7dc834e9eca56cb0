//! In-memory collaborators and builders for tests.
//!
//! [`StaticFeed`], [`RecordingChat`], [`RecordingSocial`] and
//! [`MemoryWatermarkStore`] stand in for the marketplace, the chat channel,
//! the social network and the watermark file, so full poll cycles can run
//! without network or disk.
//!
//! [`SaleEventBuilder`] builds raw marketplace events with sensible
//! defaults.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use alloy::primitives::U256;

use crate::{
    collection::Collection,
    error::{FeedError, NormalizeError, PublishError, WatermarkError},
    feed::{FeedQuery, FeedRecords, SalesFeed},
    format::Embed,
    publish::{ChatSink, SocialSink},
    types::{
        RawAccount, RawAsset, RawBundle, RawPaymentToken, RawSaleEvent, RawTransaction, RawUser,
    },
    watermark::{Watermark, WatermarkStore},
};

/// Feed replaying a fixed batch on every fetch.
#[derive(Clone, Debug, Default)]
pub struct StaticFeed {
    events: Arc<Mutex<Vec<Result<RawSaleEvent, String>>>>,
    queries: Arc<Mutex<Vec<FeedQuery>>>,
    failing: Arc<Mutex<bool>>,
}

impl StaticFeed {
    pub fn new(events: Vec<RawSaleEvent>) -> Self {
        let feed = Self::default();
        feed.set(events);
        feed
    }

    pub fn set(&self, events: Vec<RawSaleEvent>) {
        *self.events.lock().unwrap() = events.into_iter().map(Ok).collect();
    }

    /// Adds a record that fails to decode.
    pub fn push_undecodable(&self, reason: &str) {
        self.events.lock().unwrap().push(Err(reason.to_string()));
    }

    /// Makes every following fetch fail as if the response was unreadable.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn queries(&self) -> Vec<FeedQuery> {
        self.queries.lock().unwrap().clone()
    }
}

impl SalesFeed for StaticFeed {
    async fn fetch(&self, _collection: &Collection, query: FeedQuery) -> Result<FeedRecords, FeedError> {
        self.queries.lock().unwrap().push(query);
        if *self.failing.lock().unwrap() {
            return Err(FeedError::Decode(
                serde_json::from_str::<serde_json::Value>("<html>").unwrap_err(),
            ));
        }

        let events = self.events.lock().unwrap().clone();
        let records = events
            .into_iter()
            .map(|r| r.map_err(NormalizeError::MalformedEvent))
            .collect::<FeedRecords>();
        Ok(match query {
            FeedQuery::Since(_) => records,
            FeedQuery::Recent(n) => records.into_iter().take(n).collect(),
        })
    }
}

/// Chat channel remembering every delivered call.
#[derive(Clone, Debug, Default)]
pub struct RecordingChat {
    sent: Arc<Mutex<Vec<Vec<Embed>>>>,
    fail_after: Arc<Mutex<Option<usize>>>,
}

impl RecordingChat {
    /// Deliveries after the first `n` successful ones fail.
    pub fn fail_after(&self, n: Option<usize>) {
        *self.fail_after.lock().unwrap() = n;
    }

    pub fn sent(&self) -> Vec<Vec<Embed>> {
        self.sent.lock().unwrap().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .flatten()
            .map(|embed| embed.title)
            .collect()
    }
}

impl ChatSink for RecordingChat {
    async fn send(&self, embeds: &[Embed]) -> Result<(), PublishError> {
        let mut sent = self.sent.lock().unwrap();
        if self.fail_after.lock().unwrap().is_some_and(|n| sent.len() >= n) {
            return Err(PublishError::Status {
                status: reqwest::StatusCode::BAD_GATEWAY,
                body: "webhook unavailable".to_string(),
            });
        }
        sent.push(embeds.to_vec());
        Ok(())
    }
}

/// Social network remembering posts, optionally rejecting them.
#[derive(Clone, Debug, Default)]
pub struct RecordingSocial {
    posts: Arc<Mutex<Vec<String>>>,
    rejected: Arc<AtomicUsize>,
    reject_all: Arc<Mutex<bool>>,
    unauthorized: Arc<Mutex<bool>>,
}

impl RecordingSocial {
    /// Reject every post as forbidden, as for duplicate content.
    pub fn reject_all(&self, reject: bool) {
        *self.reject_all.lock().unwrap() = reject;
    }

    /// Refuse every post as if the credentials were revoked.
    pub fn refuse_credentials(&self, refuse: bool) {
        *self.unauthorized.lock().unwrap() = refuse;
    }

    pub fn posts(&self) -> Vec<String> {
        self.posts.lock().unwrap().clone()
    }

    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::Relaxed)
    }
}

impl SocialSink for RecordingSocial {
    async fn post(&self, text: &str) -> Result<(), PublishError> {
        if *self.unauthorized.lock().unwrap() {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(PublishError::Unauthorized("Unauthorized".to_string()));
        }
        if *self.reject_all.lock().unwrap() {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(PublishError::Forbidden("duplicate content".to_string()));
        }
        self.posts.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Watermark store kept in memory, counting writes.
#[derive(Clone, Debug, Default)]
pub struct MemoryWatermarkStore {
    watermark: Arc<Mutex<Option<Watermark>>>,
    saves: Arc<AtomicUsize>,
}

impl MemoryWatermarkStore {
    pub fn new(watermark: Option<Watermark>) -> Self {
        Self {
            watermark: Arc::new(Mutex::new(watermark)),
            saves: Arc::default(),
        }
    }

    pub fn get(&self) -> Option<Watermark> {
        *self.watermark.lock().unwrap()
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

impl WatermarkStore for MemoryWatermarkStore {
    async fn load(&self) -> Result<Option<Watermark>, WatermarkError> {
        Ok(self.get())
    }

    async fn save(&self, watermark: &Watermark) -> Result<(), WatermarkError> {
        *self.watermark.lock().unwrap() = Some(*watermark);
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Builder for raw sale events.
///
/// Defaults: a single `Kong #1`, 1.5 ETH at 2500 USD, buyer without a
/// username, at block 100 index 0.
#[derive(Clone, Debug)]
pub struct SaleEventBuilder {
    event: RawSaleEvent,
}

impl Default for SaleEventBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SaleEventBuilder {
    pub fn new() -> Self {
        Self {
            event: RawSaleEvent {
                asset: Some(asset("Kong #1", 1)),
                asset_bundle: None,
                total_price: Some(U256::from(1_500_000_000_000_000_000u128)),
                payment_token: Some(RawPaymentToken {
                    symbol: Some("ETH".to_string()),
                    decimals: Some(18),
                    usd_price: Some(2500.0),
                }),
                winner_account: Some(RawAccount {
                    address: Some("0xABCDEF1234567890abcdef1234567890abcdef12".to_string()),
                    user: None,
                }),
                seller: Some(RawAccount {
                    address: Some("0x1111111111111111111111111111111111111111".to_string()),
                    user: Some(RawUser {
                        username: Some("kongfan".to_string()),
                    }),
                }),
                transaction: Some(RawTransaction {
                    block_number: Some(100),
                    transaction_index: Some(0),
                }),
            },
        }
    }

    pub fn asset(mut self, name: &str, token_id: u64) -> Self {
        self.event.asset = Some(asset(name, token_id));
        self.event.asset_bundle = None;
        self
    }

    pub fn bundle(mut self, name: &str, link: &str, items: &[(&str, u64)]) -> Self {
        self.event.asset = None;
        self.event.asset_bundle = Some(RawBundle {
            name: Some(name.to_string()),
            permalink: Some(link.to_string()),
            assets: items.iter().map(|(n, id)| asset(n, *id)).collect(),
        });
        self
    }

    pub fn at(mut self, block_number: u64, tx_index: u64) -> Self {
        self.event.transaction = Some(RawTransaction {
            block_number: Some(block_number),
            transaction_index: Some(tx_index),
        });
        self
    }

    pub fn price(mut self, total_price: u128, decimals: u8, usd_rate: f64) -> Self {
        self.event.total_price = Some(U256::from(total_price));
        if let Some(token) = self.event.payment_token.as_mut() {
            token.decimals = Some(decimals);
            token.usd_price = Some(usd_rate);
        }
        self
    }

    pub fn without_transaction(mut self) -> Self {
        self.event.transaction = None;
        self
    }

    pub fn build(self) -> RawSaleEvent {
        self.event
    }
}

fn asset(name: &str, token_id: u64) -> RawAsset {
    RawAsset {
        name: Some(name.to_string()),
        image_url: Some(format!("https://img.example/{token_id}.png")),
        token_id: Some(token_id),
    }
}
