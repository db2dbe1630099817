use super::ArchiveWriter;
use crate::{error::StoreError, event::TradeEvent};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Filesystem [`ArchiveWriter`]: newline-delimited JSON partitioned by
/// date and hour, one line per raw trade.
///
/// Layout mirrors an object-store audit bucket:
/// `<root>/raw-data/YYYY/MM/DD/HH/trades-YYYYMMDD-HH.ndjson`, keyed by
/// `trade_time` so replay tooling can address a partition by exchange
/// time. Appends are idempotent-safe: a redelivered event simply produces
/// a duplicate line.
#[derive(Debug, Clone)]
pub struct FsArchive {
    root: PathBuf,
}

impl FsArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Partition path for a given trade time.
    pub fn partition_path(&self, time: DateTime<Utc>) -> PathBuf {
        self.root
            .join("raw-data")
            .join(format!("{:04}", time.year()))
            .join(format!("{:02}", time.month()))
            .join(format!("{:02}", time.day()))
            .join(format!("{:02}", time.hour()))
            .join(format!(
                "trades-{:04}{:02}{:02}-{:02}.ndjson",
                time.year(),
                time.month(),
                time.day(),
                time.hour()
            ))
    }
}

#[async_trait]
impl ArchiveWriter for FsArchive {
    async fn append(&self, event: &TradeEvent) -> Result<(), StoreError> {
        let path = self.partition_path(event.trade_time);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        Ok(())
    }
}
