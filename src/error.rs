use crate::collection::CollectionKind;

/// Raw marketplace record that can not be turned into sales.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("malformed event: {0}")]
    MalformedEvent(String),
}

impl NormalizeError {
    pub(crate) fn missing(field: &str) -> Self {
        Self::MalformedEvent(format!("missing {field}"))
    }
}

/// Boost dataset lookup/load failure.
#[derive(Debug, thiserror::Error)]
pub enum BoostError {
    #[error("item id {0} is outside of the collection id range")]
    InvalidItemId(u64),

    #[error("no boost record for item id {0}")]
    MissingRecord(u64),

    #[error("invalid boost dataset: {0}")]
    InvalidDataset(String),

    #[error("failed to read boost dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse boost dataset: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("nothing to format, no sales given")]
    EmptyInput,
}

/// Marketplace sales feed failure. Always aborts the current poll cycle.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to decode events page: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Chat/social publication failure.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Rejected by the platform, e.g. duplicate content.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Credentials were refused; every following post fails the same way.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("failed to sign request: {0}")]
    Signing(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum WatermarkError {
    #[error("watermark io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("watermark record is corrupted: {0}")]
    Json(#[from] serde_json::Error),
}

/// Library-level error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("publish error: {0}")]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Watermark(#[from] WatermarkError),

    #[error("no contract address configured for {0}")]
    MissingContract(CollectionKind),
}

impl Error {
    /// Whether the poll loop may carry on with the next scheduled cycle.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Feed(_) | Self::Publish(_) | Self::Normalize(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
