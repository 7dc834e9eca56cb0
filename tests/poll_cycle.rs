use std::collections::HashMap;

use rkl_sales_bot::{
    Collection,
    boosts::BoostTable,
    error::Error,
    feed::FeedQuery,
    poll::{PollConfig, Poller},
    testing::{MemoryWatermarkStore, RecordingChat, RecordingSocial, SaleEventBuilder, StaticFeed},
    types::{AttributeSet, SaleInstant},
    watermark::Watermark,
};

type TestPoller = Poller<StaticFeed, RecordingChat, RecordingSocial, MemoryWatermarkStore>;

struct Harness {
    feed: StaticFeed,
    chat: RecordingChat,
    social: RecordingSocial,
    store: MemoryWatermarkStore,
}

impl Harness {
    fn new(watermark: Option<Watermark>) -> Self {
        Self {
            feed: StaticFeed::default(),
            chat: RecordingChat::default(),
            social: RecordingSocial::default(),
            store: MemoryWatermarkStore::new(watermark),
        }
    }

    fn poller(&self, config: PollConfig) -> TestPoller {
        let boosts = BoostTable::new(
            0..=9999,
            HashMap::from([
                (1, AttributeSet::new(40, 30, 20, 10)),
                (2, AttributeSet::new(1, 2, 3, 4)),
                (3, AttributeSet::new(5, 5, 5, 5)),
            ]),
        );
        Poller::new(
            Collection::kong(),
            self.feed.clone(),
            self.chat.clone(),
            self.social.clone(),
            self.store.clone(),
            config,
        )
        .with_boosts(boosts)
    }
}

fn kong_at(block: u64, index: u64) -> rkl_sales_bot::types::RawSaleEvent {
    SaleEventBuilder::new()
        .asset(&format!("Kong #{block}-{index}"), 1)
        .at(block, index)
        .build()
}

/// Only sales strictly after the watermark are announced, oldest first,
/// and the watermark ends at the newest one.
#[tokio::test]
async fn test_fresh_sales_are_announced_in_order() {
    let h = Harness::new(Some(Watermark::new(SaleInstant::new(100, 5), 1_650_000_000)));
    // Marketplace returns newest first
    h.feed.set(vec![
        kong_at(101, 0),
        kong_at(100, 6),
        kong_at(100, 5),
        kong_at(100, 3),
    ]);

    let poller = h.poller(PollConfig::default());
    let mut watermark = poller.watermark().await.unwrap();
    let report = poller.poll_once(&mut watermark).await.unwrap();

    assert_eq!(report.fetched, 4);
    assert_eq!(report.stale, 2);
    assert_eq!(report.published, 2);
    assert_eq!(
        h.chat.titles(),
        vec!["Kong #100-6 Sold".to_string(), "Kong #101-0 Sold".to_string()]
    );
    assert_eq!(h.social.posts().len(), 2);
    assert!(h.social.posts()[0].starts_with("Kong #100-6 bought for 1.5 ETH, ($3750.00)\n100 overall"));

    assert_eq!(watermark.instant(), SaleInstant::new(101, 0));
    assert_eq!(h.store.get().unwrap().instant(), SaleInstant::new(101, 0));
    assert_eq!(h.store.saves(), 1);

    // Query window starts an hour before the last watermark update
    assert_eq!(h.feed.queries(), vec![FeedQuery::Since(1_650_000_000 - 3600)]);
}

/// Re-running over the same batch, also after a restart, announces nothing.
#[tokio::test]
async fn test_resumed_run_does_not_repeat() {
    let h = Harness::new(Some(Watermark::new(SaleInstant::new(100, 5), 0)));
    h.feed.set(vec![kong_at(100, 6), kong_at(101, 0)]);

    let poller = h.poller(PollConfig::default());
    let mut watermark = poller.watermark().await.unwrap();
    poller.poll_once(&mut watermark).await.unwrap();
    assert_eq!(h.chat.sent().len(), 2);

    let report = poller.poll_once(&mut watermark).await.unwrap();
    assert_eq!(report.published, 0);
    assert_eq!(report.stale, 2);

    // Fresh process over the persisted watermark
    let restarted = h.poller(PollConfig::default());
    let mut watermark = restarted.watermark().await.unwrap();
    let report = restarted.poll_once(&mut watermark).await.unwrap();
    assert_eq!(report.published, 0);

    assert_eq!(h.chat.sent().len(), 2);
    assert_eq!(h.store.saves(), 1);
}

/// Separate events sharing one transaction are announced once.
#[tokio::test]
async fn test_same_transaction_events_announced_once() {
    let h = Harness::new(Some(Watermark::new(SaleInstant::new(1, 0), 0)));
    h.feed.set(vec![
        SaleEventBuilder::new().asset("Kong #2", 2).at(50, 3).build(),
        SaleEventBuilder::new().asset("Kong #3", 3).at(50, 3).build(),
    ]);

    let poller = h.poller(PollConfig::default());
    let mut watermark = poller.watermark().await.unwrap();
    let report = poller.poll_once(&mut watermark).await.unwrap();

    assert_eq!(report.published, 1);
    assert_eq!(report.stale, 1);
    assert_eq!(h.chat.titles(), vec!["Kong #2 Sold".to_string()]);
}

/// A bundle is one chat call with one embed per item and a single post.
#[tokio::test]
async fn test_bundle_sale() {
    let h = Harness::new(Some(Watermark::new(SaleInstant::new(1, 0), 0)));
    h.feed.set(vec![
        SaleEventBuilder::new()
            .bundle(
                "kong and kicks",
                "https://opensea.io/bundles/kong-and-kicks",
                &[("Kong #2", 2), ("RKL Sneakers #4", 4)],
            )
            .at(200, 1)
            .build(),
    ]);

    let poller = h.poller(PollConfig::default());
    let mut watermark = poller.watermark().await.unwrap();
    let report = poller.poll_once(&mut watermark).await.unwrap();
    assert_eq!(report.published, 1);

    let sent = h.chat.sent();
    assert_eq!(sent.len(), 1);
    let embeds = &sent[0];
    assert_eq!(embeds.len(), 2);
    assert!(embeds.iter().all(|e| e.title == "Bundle: 'kong and kicks' Sold"));
    assert_eq!(embeds[0].fields[0].name, "Boost Total");
    assert_eq!(embeds[0].fields[0].value, "10");
    assert_eq!(embeds[1].fields.len(), 2);

    assert_eq!(
        h.social.posts(),
        vec!["kong and kicks bought for 1.5 ETH, ($3750.00)\nhttps://opensea.io/bundles/kong-and-kicks".to_string()]
    );
    assert_eq!(watermark.instant(), SaleInstant::new(200, 1));
}

/// Bad records are skipped one by one, the rest of the batch goes out.
#[tokio::test]
async fn test_malformed_events_are_skipped() {
    let h = Harness::new(Some(Watermark::new(SaleInstant::new(1, 0), 0)));
    h.feed.set(vec![
        kong_at(10, 0),
        SaleEventBuilder::new().without_transaction().build(),
        kong_at(11, 0),
    ]);
    h.feed.push_undecodable("total_price: invalid digit");

    let poller = h.poller(PollConfig::default());
    let mut watermark = poller.watermark().await.unwrap();
    let report = poller.poll_once(&mut watermark).await.unwrap();

    assert_eq!(report.fetched, 4);
    assert_eq!(report.malformed, 2);
    assert_eq!(report.published, 2);
    assert_eq!(watermark.instant(), SaleInstant::new(11, 0));
}

/// Chat failure stops the cycle, keeping what was already published.
#[tokio::test]
async fn test_chat_failure_keeps_progress() {
    let h = Harness::new(Some(Watermark::new(SaleInstant::new(1, 0), 0)));
    h.feed.set(vec![kong_at(10, 0), kong_at(11, 0), kong_at(12, 0)]);
    h.chat.fail_after(Some(1));

    let poller = h.poller(PollConfig::default());
    let mut watermark = poller.watermark().await.unwrap();
    let err = poller.poll_once(&mut watermark).await.unwrap_err();
    assert!(matches!(err, Error::Publish(_)));
    assert!(err.is_recoverable());

    assert_eq!(h.chat.titles(), vec!["Kong #10-0 Sold".to_string()]);
    assert_eq!(h.store.get().unwrap().instant(), SaleInstant::new(10, 0));

    // Next tick picks up right after the last announced sale
    h.chat.fail_after(None);
    let report = poller.poll_once(&mut watermark).await.unwrap();
    assert_eq!(report.stale, 1);
    assert_eq!(report.published, 2);
    assert_eq!(
        h.chat.titles(),
        vec![
            "Kong #10-0 Sold".to_string(),
            "Kong #11-0 Sold".to_string(),
            "Kong #12-0 Sold".to_string(),
        ]
    );
    assert_eq!(h.store.get().unwrap().instant(), SaleInstant::new(12, 0));
}

/// Rejected posts do not block announcements or watermark progress.
#[tokio::test]
async fn test_social_rejection_is_skipped() {
    let h = Harness::new(Some(Watermark::new(SaleInstant::new(1, 0), 0)));
    h.feed.set(vec![kong_at(10, 0), kong_at(11, 0)]);
    h.social.reject_all(true);

    let poller = h.poller(PollConfig::default());
    let mut watermark = poller.watermark().await.unwrap();
    let report = poller.poll_once(&mut watermark).await.unwrap();

    assert_eq!(report.published, 2);
    assert_eq!(report.social_skipped, 2);
    assert_eq!(report.social_unauthorized, 0);
    assert_eq!(h.social.rejected(), 2);
    assert_eq!(h.chat.sent().len(), 2);
    assert_eq!(watermark.instant(), SaleInstant::new(11, 0));
}

/// Refused credentials are reported apart from duplicates, chat still goes out.
#[tokio::test]
async fn test_social_credentials_refused() {
    let h = Harness::new(Some(Watermark::new(SaleInstant::new(1, 0), 0)));
    h.feed.set(vec![kong_at(10, 0), kong_at(11, 0)]);
    h.social.refuse_credentials(true);

    let poller = h.poller(PollConfig::default());
    let mut watermark = poller.watermark().await.unwrap();
    let report = poller.poll_once(&mut watermark).await.unwrap();

    assert_eq!(report.published, 2);
    assert_eq!(report.social_skipped, 2);
    assert_eq!(report.social_unauthorized, 2);
    assert!(h.social.posts().is_empty());
    assert_eq!(h.chat.sent().len(), 2);
    assert_eq!(watermark.instant(), SaleInstant::new(11, 0));
}

/// Unreadable feed response aborts the cycle without touching the watermark.
#[tokio::test]
async fn test_feed_failure_leaves_watermark() {
    let initial = Watermark::new(SaleInstant::new(100, 5), 0);
    let h = Harness::new(Some(initial));
    h.feed.set(vec![kong_at(101, 0)]);
    h.feed.set_failing(true);

    let poller = h.poller(PollConfig::default());
    let mut watermark = poller.watermark().await.unwrap();
    let err = poller.poll_once(&mut watermark).await.unwrap_err();

    assert!(matches!(err, Error::Feed(_)));
    assert!(err.is_recoverable());
    assert_eq!(watermark, initial);
    assert_eq!(h.store.saves(), 0);
    assert!(h.chat.sent().is_empty());

    h.feed.set_failing(false);
    let report = poller.poll_once(&mut watermark).await.unwrap();
    assert_eq!(report.published, 1);
}

/// First run seeds at the latest sale, so history is not announced.
#[tokio::test]
async fn test_first_run_seeds_from_latest_sale() {
    let h = Harness::new(None);
    h.feed.set(vec![kong_at(300, 2), kong_at(299, 0)]);

    let poller = h.poller(PollConfig::default());
    let mut watermark = poller.watermark().await.unwrap();

    assert_eq!(watermark.instant(), SaleInstant::new(300, 2));
    assert_eq!(h.store.get().unwrap().instant(), SaleInstant::new(300, 2));
    assert_eq!(h.feed.queries()[0], FeedQuery::Recent(1));

    let report = poller.poll_once(&mut watermark).await.unwrap();
    assert_eq!(report.published, 0);
    assert!(h.chat.sent().is_empty());
}

/// Configured seed wins over the feed.
#[tokio::test]
async fn test_first_run_with_configured_seed() {
    let h = Harness::new(None);
    h.feed.set(vec![kong_at(300, 2), kong_at(299, 0)]);

    let poller = h.poller(PollConfig {
        seed: Some(SaleInstant::new(299, 0)),
        ..Default::default()
    });
    let mut watermark = poller.watermark().await.unwrap();
    assert_eq!(watermark.instant(), SaleInstant::new(299, 0));
    assert!(h.feed.queries().is_empty());

    let report = poller.poll_once(&mut watermark).await.unwrap();
    assert_eq!(report.published, 1);
    assert_eq!(h.chat.titles(), vec!["Kong #300-2 Sold".to_string()]);
}

/// Empty feed on first run seeds at the very beginning.
#[tokio::test]
async fn test_first_run_with_empty_feed() {
    let h = Harness::new(None);
    let poller = h.poller(PollConfig::default());

    let mut watermark = poller.watermark().await.unwrap();
    assert_eq!(watermark.instant(), SaleInstant::default());
    tokio_test::assert_ok!(poller.poll_once(&mut watermark).await);
}
