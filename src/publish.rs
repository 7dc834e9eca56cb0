//! Chat and social publication.

use std::{future::Future, time::Duration};

use reqwest::{StatusCode, header::AUTHORIZATION};
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::{error::PublishError, format::Embed, oauth::OAuth1Credentials};

/// Discord accepts at most this many embeds per webhook message.
pub const MAX_EMBEDS_PER_MESSAGE: usize = 10;

pub const DEFAULT_TWEETS_URL: &str = "https://api.twitter.com/2/tweets";

/// Chat channel accepting embeds.
pub trait ChatSink {
    fn send(&self, embeds: &[Embed]) -> impl Future<Output = Result<(), PublishError>> + Send;
}

/// Social network accepting plain-text posts.
pub trait SocialSink {
    fn post(&self, text: &str) -> impl Future<Output = Result<(), PublishError>> + Send;
}

/// Absent social account: posting is a no-op.
impl<S: SocialSink + Sync> SocialSink for Option<S> {
    async fn post(&self, text: &str) -> Result<(), PublishError> {
        match self {
            Some(sink) => sink.post(text).await,
            None => Ok(()),
        }
    }
}

async fn check(response: reqwest::Response) -> Result<(), PublishError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(rejection(status, body))
}

fn rejection(status: StatusCode, body: String) -> PublishError {
    match status {
        StatusCode::FORBIDDEN => PublishError::Forbidden(body),
        StatusCode::UNAUTHORIZED => PublishError::Unauthorized(body),
        status => PublishError::Status { status, body },
    }
}

#[derive(Serialize)]
struct WebhookMessage<'a> {
    embeds: &'a [Embed],
}

/// Webhook messages carrying `embeds`, in order.
fn webhook_messages(embeds: &[Embed]) -> impl Iterator<Item = WebhookMessage<'_>> {
    embeds
        .chunks(MAX_EMBEDS_PER_MESSAGE)
        .map(|chunk| WebhookMessage { embeds: chunk })
}

/// Discord channel webhook.
#[derive(Clone, Debug)]
pub struct DiscordWebhook {
    http: reqwest::Client,
    url: Url,
}

impl DiscordWebhook {
    pub fn try_new(url: Url, timeout: Duration) -> Result<Self, PublishError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, url })
    }
}

impl ChatSink for DiscordWebhook {
    async fn send(&self, embeds: &[Embed]) -> Result<(), PublishError> {
        for message in webhook_messages(embeds) {
            let response = self
                .http
                .post(self.url.clone())
                .json(&message)
                .send()
                .await?;
            check(response).await?;
            debug!(embeds = message.embeds.len(), "Webhook message delivered");
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct Tweet<'a> {
    text: &'a str,
}

/// Twitter v2 client signing every post with OAuth 1.0a user context.
#[derive(Clone, Debug)]
pub struct TwitterClient {
    http: reqwest::Client,
    url: Url,
    credentials: OAuth1Credentials,
}

impl TwitterClient {
    pub fn try_new(
        url: Url,
        credentials: OAuth1Credentials,
        timeout: Duration,
    ) -> Result<Self, PublishError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url,
            credentials,
        })
    }
}

impl SocialSink for TwitterClient {
    async fn post(&self, text: &str) -> Result<(), PublishError> {
        let authorization = self.credentials.authorization("POST", &self.url, &[])?;
        let response = self
            .http
            .post(self.url.clone())
            .header(AUTHORIZATION, authorization)
            .json(&Tweet { text })
            .send()
            .await?;
        check(response).await
    }
}

/// Logs instead of publishing.
#[derive(Clone, Copy, Debug, Default)]
pub struct DryRun;

impl ChatSink for DryRun {
    async fn send(&self, embeds: &[Embed]) -> Result<(), PublishError> {
        for embed in embeds {
            info!(title = %embed.title, description = %embed.description, url = %embed.url, "[dry-run] chat embed");
        }
        Ok(())
    }
}

impl SocialSink for DryRun {
    async fn post(&self, text: &str) -> Result<(), PublishError> {
        info!(%text, "[dry-run] social post");
        Ok(())
    }
}
