//! Per-collection poll loop.
//!
//! Each cycle fetches recent sales, normalizes them, drops the ones at or
//! before the watermark, publishes the rest oldest first and persists the
//! watermark once at the end. Cycles never overlap: the loop is idle
//! between cycles and polling during one.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::{
    boosts::BoostTable,
    collection::Collection,
    error::{PublishError, Result},
    feed::{FeedQuery, FeedRecords, SalesFeed},
    format::Formatter,
    normalize::Normalizer,
    publish::{ChatSink, SocialSink},
    types::{Sale, SaleInstant},
    watermark::{Watermark, WatermarkStore},
};

/// Loop timing and first-run seeding.
#[derive(Clone, Debug)]
pub struct PollConfig {
    /// Idle time between cycles.
    pub interval: Duration,

    /// How far before the last watermark update to query the feed, so
    /// sales indexed late by the marketplace are still seen.
    pub lookback: Duration,

    /// Watermark for the first run. When absent the most recent sale is
    /// used, so history is not announced.
    pub seed: Option<SaleInstant>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            lookback: Duration::from_secs(3600),
            seed: None,
        }
    }
}

/// Outcome of a single cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Records returned by the feed.
    pub fetched: usize,
    /// Records skipped as malformed.
    pub malformed: usize,
    /// Events at or before the watermark.
    pub stale: usize,
    /// Events announced.
    pub published: usize,
    /// Events whose social post was rejected or failed.
    pub social_skipped: usize,
    /// Of those, posts refused for bad credentials.
    pub social_unauthorized: usize,
}

pub struct Poller<F, C, S, W> {
    collection: Collection,
    boosts: Option<BoostTable>,
    feed: F,
    chat: C,
    social: S,
    store: W,
    config: PollConfig,
}

impl<F, C, S, W> Poller<F, C, S, W>
where
    F: SalesFeed,
    C: ChatSink,
    S: SocialSink,
    W: WatermarkStore,
{
    pub fn new(collection: Collection, feed: F, chat: C, social: S, store: W, config: PollConfig) -> Self {
        Self {
            collection,
            boosts: None,
            feed,
            chat,
            social,
            store,
            config,
        }
    }

    pub fn with_boosts(mut self, boosts: BoostTable) -> Self {
        self.boosts = Some(boosts);
        self
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    fn normalizer(&self) -> Normalizer<'_> {
        Normalizer::new(self.boosts.as_ref())
    }

    /// Loads the persisted watermark, seeding and persisting it on first run.
    pub async fn watermark(&self) -> Result<Watermark> {
        if let Some(watermark) = self.store.load().await? {
            info!(
                since = %watermark.instant(),
                updated_at = watermark.timestamp(),
                "Resuming from stored watermark"
            );
            return Ok(watermark);
        }

        let instant = match self.config.seed {
            Some(seed) => seed,
            None => self.latest_sale().await?,
        };
        let watermark = Watermark::seeded(instant);
        self.store.save(&watermark).await?;
        info!(since = %instant, "Seeded watermark");
        Ok(watermark)
    }

    async fn latest_sale(&self) -> Result<SaleInstant> {
        let records = self
            .feed
            .fetch(&self.collection, FeedQuery::Recent(1))
            .await?;
        let normalizer = self.normalizer();
        Ok(records
            .iter()
            .filter_map(|record| record.as_ref().ok())
            .filter_map(|event| normalizer.normalize(event).ok())
            .flatten()
            .map(|sale| sale.instant)
            .max()
            .unwrap_or_default())
    }

    /// Runs one fetch-normalize-filter-publish-persist cycle.
    ///
    /// The watermark is persisted whenever something was published, also
    /// when the cycle stops early on a publication failure.
    pub async fn poll_once(&self, watermark: &mut Watermark) -> Result<CycleReport> {
        let since = watermark.timestamp() - self.config.lookback.as_secs() as i64;
        let records = self
            .feed
            .fetch(&self.collection, FeedQuery::Since(since))
            .await?;

        let mut report = CycleReport {
            fetched: records.len(),
            ..Default::default()
        };
        let events = self.normalize_batch(records, &mut report);

        let outcome = self.publish_fresh(events, watermark, &mut report).await;
        if report.published > 0 {
            self.store.save(watermark).await?;
        }
        outcome?;

        Ok(report)
    }

    /// Normalized events, oldest first.
    fn normalize_batch(&self, records: FeedRecords, report: &mut CycleReport) -> Vec<Vec<Sale>> {
        let normalizer = self.normalizer();
        let mut events: Vec<Vec<Sale>> = records
            .into_iter()
            .filter_map(|record| match record.and_then(|event| normalizer.normalize(&event)) {
                Ok(sales) => Some(sales),
                Err(e) => {
                    warn!(%e, "Skipping sale event");
                    report.malformed += 1;
                    None
                }
            })
            .collect();
        events.sort_by_key(|sales| sales.first().map(|sale| sale.instant));
        events
    }

    async fn publish_fresh(
        &self,
        events: Vec<Vec<Sale>>,
        watermark: &mut Watermark,
        report: &mut CycleReport,
    ) -> Result<()> {
        let formatter = Formatter::new(&self.collection);

        for sales in events {
            let Some(first) = sales.first() else {
                continue;
            };
            if !watermark.is_fresh(first) {
                debug!(instant = %first.instant, item = %first.item_name, "Stale sale");
                report.stale += 1;
                continue;
            }

            let announcement = formatter.announce(&sales)?;
            self.chat.send(&announcement.embeds).await?;

            match self.social.post(&announcement.post).await {
                Ok(()) => {}
                Err(PublishError::Forbidden(reason)) => {
                    warn!(%reason, "Social post rejected, skipping");
                    report.social_skipped += 1;
                }
                Err(PublishError::Unauthorized(reason)) => {
                    error!(%reason, "Social credentials refused, post skipped");
                    report.social_skipped += 1;
                    report.social_unauthorized += 1;
                }
                Err(e) => {
                    warn!(%e, "Social post failed, skipping");
                    report.social_skipped += 1;
                }
            }

            watermark.advance(first);
            report.published += 1;
            info!(
                instant = %first.instant,
                item = %first.item_name,
                items = sales.len(),
                price = first.price_in_token(),
                symbol = %first.payment_symbol,
                "Sale announced"
            );
        }

        Ok(())
    }

    /// Polls forever. Returns only on errors the next cycle can not fix.
    pub async fn run(&self) -> Result<()> {
        let mut watermark = loop {
            match self.watermark().await {
                Ok(watermark) => break watermark,
                Err(e) if e.is_recoverable() => {
                    warn!(%e, "Failed to seed watermark, retrying after interval");
                    tokio::time::sleep(self.config.interval).await;
                }
                Err(e) => return Err(e),
            }
        };

        loop {
            match self.poll_once(&mut watermark).await {
                Ok(report) => info!(
                    fetched = report.fetched,
                    published = report.published,
                    stale = report.stale,
                    malformed = report.malformed,
                    social_skipped = report.social_skipped,
                    social_unauthorized = report.social_unauthorized,
                    since = %watermark.instant(),
                    "Poll cycle complete"
                ),
                Err(e) if e.is_recoverable() => {
                    warn!(%e, since = %watermark.instant(), "Poll cycle failed, retrying on next tick");
                }
                Err(e) => return Err(e),
            }

            debug!(interval = ?self.config.interval, "Sleeping");
            tokio::time::sleep(self.config.interval).await;
        }
    }
}
