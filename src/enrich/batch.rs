//! Sequential, resumable batch enrichment
//!
//! Items are processed one at a time with a fixed delay between them. Every
//! attempt leaves a record: the fetched data on success, the error text on
//! failure. Only fatal errors (the token could not be re-established) stop a
//! batch, after saving what was done so far.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::store::{KeyedRecord, RecordSink};
use crate::{Result, config::BatchSettings, types::MedicineListing};

/// A unit of batch work with a stable key
pub trait WorkItem {
    fn key(&self) -> String;
}

impl WorkItem for MedicineListing {
    fn key(&self) -> String {
        self.url.clone()
    }
}

/// A SKU to look up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuItem {
    pub sku: String,
}

impl SkuItem {
    pub fn new(sku: impl Into<String>) -> Self {
        Self { sku: sku.into() }
    }
}

impl WorkItem for SkuItem {
    fn key(&self) -> String {
        self.sku.clone()
    }
}

/// Outcome of one attempt, stored alongside the item's own fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentRecord<I, T> {
    #[serde(flatten)]
    pub item: I,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl<I, T> EnrichmentRecord<I, T> {
    pub fn success(item: I, data: T) -> Self {
        Self {
            item,
            data: Some(data),
            error: None,
            last_updated: Utc::now(),
        }
    }

    pub fn failure(item: I, error: impl Into<String>) -> Self {
        Self {
            item,
            data: None,
            error: Some(error.into()),
            last_updated: Utc::now(),
        }
    }
}

impl<I: WorkItem, T> KeyedRecord for EnrichmentRecord<I, T> {
    fn key(&self) -> String {
        self.item.key()
    }

    fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Pacing and persistence options
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Fixed delay between consecutive items
    pub rate_limit: Duration,
    /// Save after this many processed items
    pub save_every: usize,
    /// Process at most this many pending items
    pub limit: Option<usize>,
}

impl BatchOptions {
    pub fn from_settings(settings: &BatchSettings) -> Self {
        Self {
            rate_limit: settings.rate_limit(),
            save_every: settings.save_every,
            limit: Some(settings.batch_size),
        }
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from_settings(&BatchSettings::default())
    }
}

/// Counts reported at the end of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    /// Skipped because their key was in the resume set
    pub resumed: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Pending items left for a later run because of the limit
    pub remaining: usize,
}

/// Process `items` sequentially, recording each outcome in `sink`.
///
/// Items whose key is in `resume` are skipped. Per-item errors become failure
/// records and the batch moves on; a fatal error saves progress and is
/// returned without recording the current item.
pub async fn enrich_batch<I, T, S, F, Fut>(
    items: Vec<I>,
    options: &BatchOptions,
    resume: &HashSet<String>,
    sink: &mut S,
    mut process: F,
) -> Result<BatchSummary>
where
    I: WorkItem + Clone + Send,
    T: Send,
    S: RecordSink<EnrichmentRecord<I, T>>,
    F: FnMut(I) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let total = items.len();
    let pending: Vec<I> = items
        .into_iter()
        .filter(|item| !resume.contains(&item.key()))
        .collect();
    let resumed = total - pending.len();
    let take = options.limit.unwrap_or(pending.len()).min(pending.len());

    let mut summary = BatchSummary {
        total,
        resumed,
        remaining: pending.len() - take,
        ..BatchSummary::default()
    };

    info!(
        "Total: {} | Done: {} | Processing: {} | Remaining after run: {}",
        total, resumed, take, summary.remaining
    );

    let save_every = options.save_every.max(1);

    for (index, item) in pending.into_iter().take(take).enumerate() {
        if index > 0 {
            tokio::time::sleep(options.rate_limit).await;
        }

        let key = item.key();
        info!("[{}/{}] {}", index + 1, take, key);

        match process(item.clone()).await {
            Ok(data) => {
                sink.upsert(EnrichmentRecord::success(item, data));
                summary.succeeded += 1;
            }
            Err(e) if e.is_fatal() => {
                error!("Aborting batch at {}: {}", key, e);
                sink.save().await?;
                return Err(e);
            }
            Err(e) => {
                warn!("Failed {}: {}", key, e);
                sink.upsert(EnrichmentRecord::failure(item, e.to_string()));
                summary.failed += 1;
            }
        }
        summary.processed += 1;

        if summary.processed % save_every == 0 {
            sink.save().await?;
        }
    }

    sink.save().await?;
    info!(
        "Batch complete: {} succeeded, {} failed",
        summary.succeeded, summary.failed
    );
    Ok(summary)
}
