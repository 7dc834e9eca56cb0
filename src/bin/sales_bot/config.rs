//! Configuration for the sales bot.
//!
//! Configuration comes from two sources:
//! - Environment variables (via .env file or shell): endpoints, webhooks, keys
//! - CLI arguments: which collections to run and loop parameters

use std::{path::PathBuf, time::Duration};

use alloy::primitives::Address;
use clap::Parser;
use rkl_sales_bot::{
    CollectionKind,
    feed::{DEFAULT_EVENTS_URL, MAX_PAGE_LIMIT},
    oauth::OAuth1Credentials,
    poll::PollConfig,
    publish::DEFAULT_TWEETS_URL,
    types::SaleInstant,
};
use url::Url;

/// Environment configuration (endpoints, credentials).
///
/// Optional values left empty, as in `KEY=` lines of a `.env` file, count
/// as unset.
#[derive(Debug, serde::Deserialize)]
pub struct EnvConfig {
    /// Marketplace API key
    pub opensea_api_key: String,

    /// Marketplace events endpoint (default: OpenSea v1 events)
    #[serde(default, deserialize_with = "non_empty")]
    pub opensea_events_url: Option<String>,

    /// Discord webhook for Kong sales
    #[serde(default, deserialize_with = "non_empty")]
    pub discord_kong_webhook: Option<String>,

    /// Discord webhook for Sneaker sales
    #[serde(default, deserialize_with = "non_empty")]
    pub discord_sneaker_webhook: Option<String>,

    /// Discord webhook for Rookie sales
    #[serde(default, deserialize_with = "non_empty")]
    pub discord_rookie_webhook: Option<String>,

    /// Twitter app consumer key; social posting is disabled without the
    /// four OAuth 1.0a credentials
    #[serde(default, deserialize_with = "non_empty")]
    pub twitter_api_key: Option<String>,

    /// Twitter app consumer secret
    #[serde(default, deserialize_with = "non_empty")]
    pub twitter_api_secret: Option<String>,

    /// Access token of the posting account
    #[serde(default, deserialize_with = "non_empty")]
    pub twitter_access_token: Option<String>,

    /// Access token secret of the posting account
    #[serde(default, deserialize_with = "non_empty")]
    pub twitter_access_token_secret: Option<String>,

    /// Tweet creation endpoint (default: Twitter v2)
    #[serde(default, deserialize_with = "non_empty")]
    pub twitter_tweets_url: Option<String>,

    /// Rookie contract address
    #[serde(default, deserialize_with = "non_empty")]
    pub rookie_contract_address: Option<String>,

    /// Kong boost dataset (default: data/kong_boosts.json)
    #[serde(default, deserialize_with = "non_empty")]
    pub kong_boosts_path: Option<String>,

    /// Directory with one watermark file per collection (default: sales_since)
    #[serde(default, deserialize_with = "non_empty")]
    pub state_dir: Option<String>,

    /// Optional timeout for HTTP calls (default: 30s)
    pub timeout_seconds: Option<u64>,
}

fn non_empty<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    use serde::Deserialize;
    Ok(Option::<String>::deserialize(d)?.filter(|s| !s.trim().is_empty()))
}

impl EnvConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    pub fn events_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(
            self.opensea_events_url
                .as_deref()
                .unwrap_or(DEFAULT_EVENTS_URL),
        )
    }

    /// Posting account credentials, `None` when none are configured.
    pub fn twitter_credentials(&self) -> Result<Option<OAuth1Credentials>, ConfigError> {
        match (
            &self.twitter_api_key,
            &self.twitter_api_secret,
            &self.twitter_access_token,
            &self.twitter_access_token_secret,
        ) {
            (Some(key), Some(secret), Some(token), Some(token_secret)) => Ok(Some(
                OAuth1Credentials::new(key, secret, token, token_secret),
            )),
            (None, None, None, None) => Ok(None),
            _ => Err(ConfigError::IncompleteTwitterCredentials),
        }
    }

    pub fn tweets_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(self.twitter_tweets_url.as_deref().unwrap_or(DEFAULT_TWEETS_URL))
    }

    /// Webhook of the collection's chat channel.
    pub fn webhook(&self, kind: CollectionKind) -> Result<Url, ConfigError> {
        let raw = match kind {
            CollectionKind::Kong => &self.discord_kong_webhook,
            CollectionKind::Sneaker => &self.discord_sneaker_webhook,
            CollectionKind::Rookie => &self.discord_rookie_webhook,
        };
        let raw = raw.as_deref().ok_or(ConfigError::MissingWebhook(kind))?;
        Url::parse(raw).map_err(|_| ConfigError::InvalidWebhook(kind))
    }

    /// Contract override for the collection, if configured.
    pub fn contract(
        &self,
        kind: CollectionKind,
    ) -> Result<Option<Address>, alloy::primitives::hex::FromHexError> {
        match kind {
            CollectionKind::Rookie => self
                .rookie_contract_address
                .as_deref()
                .map(str::parse)
                .transpose(),
            _ => Ok(None),
        }
    }

    pub fn boosts_path(&self) -> PathBuf {
        PathBuf::from(
            self.kong_boosts_path
                .as_deref()
                .unwrap_or("data/kong_boosts.json"),
        )
    }

    pub fn state_dir(&self) -> PathBuf {
        PathBuf::from(self.state_dir.as_deref().unwrap_or("sales_since"))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(30))
    }
}

/// CLI arguments for the sales bot.
#[derive(Debug, Parser)]
#[command(name = "sales-bot")]
#[command(about = "Announces NFT collection sales to Discord and Twitter")]
pub struct CliConfig {
    /// Collections to announce (comma-separated names or codes, e.g. "kong,sneaker")
    #[arg(long, value_delimiter = ',', default_value = "kong")]
    pub collections: Vec<CollectionKind>,

    /// Seconds to wait between poll cycles
    #[arg(long, default_value = "300")]
    pub poll_interval: u64,

    /// Seconds before the last watermark update to query sales from
    #[arg(long, default_value = "3600")]
    pub lookback: u64,

    /// Sales requested per poll
    #[arg(long, default_value = "50")]
    pub limit: usize,

    /// Seconds to wait before exiting after an unrecoverable error
    #[arg(long, default_value = "3600")]
    pub cooldown: u64,

    /// Block to seed the watermark with on first run
    #[arg(long)]
    pub seed_block: Option<u64>,

    /// Transaction index to seed the watermark with on first run (requires --seed-block)
    #[arg(long)]
    pub seed_index: Option<u64>,

    /// Log announcements instead of publishing them
    #[arg(long)]
    pub dry_run: bool,
}

/// Validated run parameters.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub collections: Vec<CollectionKind>,
    pub poll: PollConfig,
    pub page_limit: usize,
    pub cooldown: Duration,
    pub dry_run: bool,
}

impl CliConfig {
    /// Convert CLI config to the run parameters.
    pub fn to_run_config(&self) -> Result<RunConfig, ConfigError> {
        let mut collections = Vec::with_capacity(self.collections.len());
        for kind in &self.collections {
            if !collections.contains(kind) {
                collections.push(*kind);
            }
        }
        if collections.is_empty() {
            return Err(ConfigError::NoCollections);
        }

        if self.poll_interval == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }

        if self.limit == 0 || self.limit > MAX_PAGE_LIMIT {
            return Err(ConfigError::InvalidLimit(self.limit));
        }

        let seed = match (self.seed_block, self.seed_index) {
            (Some(block), index) => Some(SaleInstant::new(block, index.unwrap_or(0))),
            (None, Some(_)) => return Err(ConfigError::SeedIndexWithoutBlock),
            (None, None) => None,
        };

        Ok(RunConfig {
            collections,
            poll: PollConfig {
                interval: Duration::from_secs(self.poll_interval),
                lookback: Duration::from_secs(self.lookback),
                seed,
            },
            page_limit: self.limit,
            cooldown: Duration::from_secs(self.cooldown),
            dry_run: self.dry_run,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one collection is required")]
    NoCollections,

    #[error("poll_interval cannot be zero")]
    ZeroPollInterval,

    #[error("limit must be between 1 and 300, got {0}")]
    InvalidLimit(usize),

    #[error("seed_index requires seed_block")]
    SeedIndexWithoutBlock,

    #[error("no webhook configured for {0}")]
    MissingWebhook(CollectionKind),

    #[error("invalid webhook URL for {0}")]
    InvalidWebhook(CollectionKind),

    #[error(
        "TWITTER_API_KEY, TWITTER_API_SECRET, TWITTER_ACCESS_TOKEN and \
         TWITTER_ACCESS_TOKEN_SECRET must be set together"
    )]
    IncompleteTwitterCredentials,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli() -> CliConfig {
        CliConfig {
            collections: vec![CollectionKind::Kong],
            poll_interval: 300,
            lookback: 3600,
            limit: 50,
            cooldown: 3600,
            seed_block: None,
            seed_index: None,
            dry_run: false,
        }
    }

    fn env() -> EnvConfig {
        EnvConfig {
            opensea_api_key: "key".to_string(),
            opensea_events_url: None,
            discord_kong_webhook: Some("https://discord.com/api/webhooks/1/abc".to_string()),
            discord_sneaker_webhook: Some("not a url".to_string()),
            discord_rookie_webhook: None,
            twitter_api_key: None,
            twitter_api_secret: None,
            twitter_access_token: None,
            twitter_access_token_secret: None,
            twitter_tweets_url: None,
            rookie_contract_address: Some("0x00000000000000000000000000000000000000aa".to_string()),
            kong_boosts_path: None,
            state_dir: None,
            timeout_seconds: None,
        }
    }

    #[test]
    fn test_cli_config_to_run_config() {
        let mut cli = cli();
        cli.collections = vec![CollectionKind::Kong, CollectionKind::Rookie, CollectionKind::Kong];
        cli.seed_block = Some(14_000_000);

        let config = cli.to_run_config().unwrap();
        assert_eq!(config.collections, vec![CollectionKind::Kong, CollectionKind::Rookie]);
        assert_eq!(config.poll.interval, Duration::from_secs(300));
        assert_eq!(config.poll.seed, Some(SaleInstant::new(14_000_000, 0)));
        assert_eq!(config.page_limit, 50);
    }

    #[test]
    fn test_parse_args() {
        let cli = CliConfig::try_parse_from([
            "sales-bot",
            "--collections",
            "kong,1",
            "--seed-block",
            "100",
            "--seed-index",
            "5",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.collections, vec![CollectionKind::Kong, CollectionKind::Sneaker]);

        let config = cli.to_run_config().unwrap();
        assert_eq!(config.poll.seed, Some(SaleInstant::new(100, 5)));
        assert!(config.dry_run);

        assert!(CliConfig::try_parse_from(["sales-bot", "--collections", "apes"]).is_err());
    }

    #[test]
    fn test_invalid_cli() {
        let mut bad = cli();
        bad.poll_interval = 0;
        assert!(matches!(bad.to_run_config(), Err(ConfigError::ZeroPollInterval)));

        let mut bad = cli();
        bad.limit = MAX_PAGE_LIMIT + 1;
        assert!(matches!(bad.to_run_config(), Err(ConfigError::InvalidLimit(_))));

        let mut bad = cli();
        bad.seed_index = Some(3);
        assert!(matches!(bad.to_run_config(), Err(ConfigError::SeedIndexWithoutBlock)));

        let mut bad = cli();
        bad.collections.clear();
        assert!(matches!(bad.to_run_config(), Err(ConfigError::NoCollections)));
    }

    #[test]
    fn test_env_lookups() {
        let env = env();
        assert!(env.webhook(CollectionKind::Kong).is_ok());
        assert!(matches!(
            env.webhook(CollectionKind::Sneaker),
            Err(ConfigError::InvalidWebhook(CollectionKind::Sneaker))
        ));
        assert!(matches!(
            env.webhook(CollectionKind::Rookie),
            Err(ConfigError::MissingWebhook(CollectionKind::Rookie))
        ));

        assert!(env.contract(CollectionKind::Rookie).unwrap().is_some());
        assert!(env.contract(CollectionKind::Kong).unwrap().is_none());
        assert_eq!(env.events_url().unwrap().as_str(), DEFAULT_EVENTS_URL);
        assert_eq!(env.timeout(), Duration::from_secs(30));
    }

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_env_values_are_unset() {
        let env: EnvConfig = envy::from_iter(vars(&[
            ("OPENSEA_API_KEY", "key"),
            ("DISCORD_KONG_WEBHOOK", "https://discord.com/api/webhooks/1/abc"),
            ("DISCORD_SNEAKER_WEBHOOK", ""),
            ("TWITTER_API_KEY", ""),
            ("TWITTER_API_SECRET", ""),
            ("TWITTER_ACCESS_TOKEN", ""),
            ("TWITTER_ACCESS_TOKEN_SECRET", " "),
            ("ROOKIE_CONTRACT_ADDRESS", ""),
            ("STATE_DIR", ""),
        ]))
        .unwrap();

        assert_eq!(env.twitter_api_key, None);
        assert!(env.twitter_credentials().unwrap().is_none());
        assert!(matches!(
            env.webhook(CollectionKind::Sneaker),
            Err(ConfigError::MissingWebhook(CollectionKind::Sneaker))
        ));
        assert_eq!(env.state_dir(), PathBuf::from("sales_since"));

        // Missing rather than unparsable
        let contract = env.contract(CollectionKind::Rookie).unwrap();
        assert!(contract.is_none());
        assert!(matches!(
            rkl_sales_bot::Collection::from_kind(CollectionKind::Rookie, contract),
            Err(rkl_sales_bot::error::Error::MissingContract(CollectionKind::Rookie))
        ));
    }

    #[test]
    fn test_twitter_credentials() {
        let env: EnvConfig = envy::from_iter(vars(&[
            ("OPENSEA_API_KEY", "key"),
            ("TWITTER_API_KEY", "ck"),
            ("TWITTER_API_SECRET", "cs"),
            ("TWITTER_ACCESS_TOKEN", "at"),
            ("TWITTER_ACCESS_TOKEN_SECRET", "ats"),
        ]))
        .unwrap();
        assert!(env.twitter_credentials().unwrap().is_some());

        let env: EnvConfig = envy::from_iter(vars(&[
            ("OPENSEA_API_KEY", "key"),
            ("TWITTER_API_KEY", "ck"),
            ("TWITTER_ACCESS_TOKEN", "at"),
        ]))
        .unwrap();
        assert!(matches!(
            env.twitter_credentials(),
            Err(ConfigError::IncompleteTwitterCredentials)
        ));
    }
}
