//! Sales bot orchestration.
//!
//! One poll task per configured collection. Tasks share nothing; the first
//! one to stop takes the process down.

use rkl_sales_bot::{
    Collection, CollectionKind,
    boosts::BoostTable,
    feed::OpenSeaClient,
    poll::Poller,
    publish::{ChatSink, DiscordWebhook, DryRun, SocialSink, TwitterClient},
    watermark::FileWatermarkStore,
};
use tokio::task::JoinSet;
use tracing::{Instrument, info, info_span, warn};

use crate::{
    config::{EnvConfig, RunConfig},
    error::{Error, Result},
};

type CollectionPoller<C, S> = Poller<OpenSeaClient, C, S, FileWatermarkStore>;

/// Sales bot.
#[derive(Debug)]
pub struct SalesBot {
    env: EnvConfig,
    config: RunConfig,
}

impl SalesBot {
    pub fn new(env: EnvConfig, config: RunConfig) -> Self {
        info!(
            collections = ?config.collections,
            poll_interval = ?config.poll.interval,
            dry_run = config.dry_run,
            "Initializing Sales Bot"
        );
        Self { env, config }
    }

    /// Builds every collection poller and spawns its loop.
    ///
    /// Fails before spawning anything if a collection is misconfigured.
    pub fn spawn(&self) -> Result<JoinSet<Result<()>>> {
        let mut tasks = JoinSet::new();

        if self.config.dry_run {
            let pollers = self
                .config
                .collections
                .iter()
                .map(|kind| self.poller(*kind, DryRun, DryRun))
                .collect::<Result<Vec<_>>>()?;
            for poller in pollers {
                spawn_poller(&mut tasks, poller);
            }
            return Ok(tasks);
        }

        let social = self.twitter()?;
        if social.is_none() {
            warn!("Twitter credentials are not set, social posting disabled");
        }

        let pollers = self
            .config
            .collections
            .iter()
            .map(|kind| {
                let chat = DiscordWebhook::try_new(self.env.webhook(*kind)?, self.env.timeout())?;
                self.poller(*kind, chat, social.clone())
            })
            .collect::<Result<Vec<_>>>()?;
        for poller in pollers {
            spawn_poller(&mut tasks, poller);
        }

        Ok(tasks)
    }

    fn twitter(&self) -> Result<Option<TwitterClient>> {
        let Some(credentials) = self.env.twitter_credentials()? else {
            return Ok(None);
        };
        let client = TwitterClient::try_new(self.env.tweets_url()?, credentials, self.env.timeout())?;
        Ok(Some(client))
    }

    fn poller<C, S>(&self, kind: CollectionKind, chat: C, social: S) -> Result<CollectionPoller<C, S>>
    where
        C: ChatSink,
        S: SocialSink,
    {
        let collection = Collection::from_kind(kind, self.env.contract(kind)?)?;

        let feed = OpenSeaClient::try_new(
            self.env.events_url()?,
            &self.env.opensea_api_key,
            self.config.page_limit,
            self.env.timeout(),
        )?;

        let store = FileWatermarkStore::in_dir(self.env.state_dir(), kind.name());

        let boosts = match collection.boosted_ids() {
            Some(ids) => {
                let path = self.env.boosts_path();
                let table = BoostTable::load(ids.clone(), &path)?;
                info!(%kind, path = %path.display(), items = table.len(), "Boost dataset loaded");
                Some(table)
            }
            None => None,
        };

        let poller = Poller::new(collection, feed, chat, social, store, self.config.poll.clone());
        Ok(match boosts {
            Some(table) => poller.with_boosts(table),
            None => poller,
        })
    }
}

fn spawn_poller<C, S>(tasks: &mut JoinSet<Result<()>>, poller: CollectionPoller<C, S>)
where
    C: ChatSink + Send + Sync + 'static,
    S: SocialSink + Send + Sync + 'static,
{
    let kind = poller.collection().kind();
    let span = info_span!("collection", %kind);
    tasks.spawn(
        async move {
            info!(
                contract = %poller.collection().contract(),
                "Starting collection poller"
            );
            poller.run().await.map_err(Error::from)
        }
        .instrument(span),
    );
}

/// Waits for the first collection task to stop and reports why.
pub async fn supervise(mut tasks: JoinSet<Result<()>>) -> Result<()> {
    match tasks.join_next().await {
        Some(Ok(Ok(()))) | None => Err(Error::AllTasksStopped),
        Some(Ok(Err(e))) => Err(e),
        Some(Err(e)) => Err(e.into()),
    }
}
