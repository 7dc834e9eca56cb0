//! Last announced sale per collection.
//!
//! A sale is fresh iff its `(block, index)` is strictly greater than the
//! watermark. The watermark is only advanced after a sale was published,
//! in ascending order, so a restart never re-announces a sale.

use std::{
    future::Future,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::{
    error::WatermarkError,
    types::{Sale, SaleInstant},
};

/// Persisted freshness marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    block: u64,
    index: u64,
    /// Unix seconds of the last update.
    timestamp: i64,
}

impl Watermark {
    pub fn new(instant: SaleInstant, timestamp: i64) -> Self {
        Self {
            block: instant.block_number(),
            index: instant.tx_index(),
            timestamp,
        }
    }

    /// Watermark at `instant`, stamped now.
    pub fn seeded(instant: SaleInstant) -> Self {
        Self::new(instant, now())
    }

    pub fn instant(&self) -> SaleInstant {
        SaleInstant::new(self.block, self.index)
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn is_fresh(&self, sale: &Sale) -> bool {
        sale.instant > self.instant()
    }

    /// Moves the watermark to `sale`, unconditionally.
    pub fn advance(&mut self, sale: &Sale) {
        self.block = sale.instant.block_number();
        self.index = sale.instant.tx_index();
        self.timestamp = now();
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Durable watermark storage owned by a single poll loop.
pub trait WatermarkStore {
    fn load(&self) -> impl Future<Output = Result<Option<Watermark>, WatermarkError>> + Send;

    fn save(&self, watermark: &Watermark) -> impl Future<Output = Result<(), WatermarkError>> + Send;
}

/// JSON file store, `{"block": .., "index": .., "timestamp": ..}`.
///
/// Writes go to a sibling temporary file which is then renamed over the
/// record, so readers see either the old or the new watermark.
#[derive(Clone, Debug)]
pub struct FileWatermarkStore {
    path: PathBuf,
}

impl FileWatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<dir>/<name>.json`.
    pub fn in_dir(dir: impl AsRef<Path>, name: &str) -> Self {
        Self::new(dir.as_ref().join(format!("{name}.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl WatermarkStore for FileWatermarkStore {
    async fn load(&self) -> Result<Option<Watermark>, WatermarkError> {
        match fs::read_to_string(&self.path).await {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, watermark: &Watermark) -> Result<(), WatermarkError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await?;
        }
        let tmp = self.tmp_path();
        fs::write(&tmp, serde_json::to_vec(watermark)?).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
