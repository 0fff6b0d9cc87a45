//! Paginated ledger scanning
//!
//! [`LedgerScanner`] walks an account's history backward in time through a
//! [`HistorySource`], page by page, until it meets the first record older
//! than the cutoff or the history runs out. Each counted record is
//! attributed to a bucket by a caller-supplied classifier (category key for
//! inbound analysis, recipient for outbound) and summed per bucket and
//! per bucket × symbol.

pub mod native;
pub mod tokens;

pub use native::HiveHistorySource;
pub use tokens::EngineHistorySource;

use crate::aggregation::OrderedMap;
use crate::analyzer::progress::ProgressEvent;
use crate::apis::{HistoryPage, LedgerRecord};
use crate::errors::FlowError;
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::broadcast;

/// Which ledger a scan reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ledger {
    Native,
    Token,
}

impl Ledger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ledger::Native => "hive",
            Ledger::Token => "hive-engine",
        }
    }
}

impl std::fmt::Display for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A paged history API, normalized to newest-first pages
#[async_trait]
pub trait HistorySource: Send + Sync {
    fn ledger(&self) -> Ledger;

    /// Cursor of the newest page
    fn first_cursor(&self) -> i64;

    /// Fetch the page at `cursor`; `held` pins the endpoint across pages
    async fn fetch_page(
        &self,
        account: &str,
        cursor: i64,
        held: &mut Option<String>,
    ) -> Result<HistoryPage, FlowError>;
}

// =============================================================================
// ACCUMULATION
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolSums {
    pub amount: f64,
    pub count: u64,
}

/// Sums for one bucket; `amount` spans every symbol and is only meaningful
/// for single-asset ledgers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketSums {
    pub amount: f64,
    pub count: u64,
    pub symbols: OrderedMap<String, SymbolSums>,
}

/// Result of one scan: buckets in first-encounter order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccumulatedSums {
    pub buckets: OrderedMap<String, BucketSums>,
    pub pages: usize,
}

impl AccumulatedSums {
    pub fn add(&mut self, bucket: String, record: &LedgerRecord) {
        let sums = self.buckets.get_or_insert_with(bucket, BucketSums::default);
        sums.amount += record.amount;
        sums.count += 1;

        let symbol = sums
            .symbols
            .get_or_insert_with(record.symbol.clone(), SymbolSums::default);
        symbol.amount += record.amount;
        symbol.count += 1;
    }

    pub fn bucket(&self, key: &str) -> Option<&BucketSums> {
        self.buckets.get(&key.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn record_count(&self) -> u64 {
        self.buckets.values().map(|b| b.count).sum()
    }
}

// =============================================================================
// SCANNER
// =============================================================================

pub struct LedgerScanner {
    page_delay: Duration,
    progress: Option<broadcast::Sender<ProgressEvent>>,
}

impl LedgerScanner {
    pub fn new(page_delay: Duration) -> Self {
        Self {
            page_delay,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: broadcast::Sender<ProgressEvent>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Sum every classified record newer than or at `since`
    ///
    /// Self-transfers and records whose recipient is in `ignored` are always
    /// skipped, whatever `classify` says.
    pub async fn scan<S, F>(
        &self,
        source: &S,
        account: &str,
        since: DateTime<Utc>,
        ignored: &HashSet<String>,
        classify: F,
    ) -> Result<AccumulatedSums, FlowError>
    where
        S: HistorySource + ?Sized,
        F: Fn(&LedgerRecord) -> Option<String>,
    {
        let ledger = source.ledger();
        let mut sums = AccumulatedSums::default();
        let mut held: Option<String> = None;
        let mut cursor = Some(source.first_cursor());

        while let Some(current) = cursor {
            if sums.pages > 0 && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }

            let page = source.fetch_page(account, current, &mut held).await?;
            sums.pages += 1;

            logger::verbose(
                LogTag::Scanner,
                &format!(
                    "{} {} page {} (cursor {}): {} rows, {} records",
                    ledger,
                    account,
                    sums.pages,
                    current,
                    page.raw_len,
                    page.records.len()
                ),
            );
            self.emit(ProgressEvent::PageScanned {
                account: account.to_string(),
                ledger,
                page: sums.pages,
                records: page.records.len(),
            });

            if page.is_empty() {
                break;
            }

            let mut reached_cutoff = false;
            for record in &page.records {
                if record.timestamp < since {
                    reached_cutoff = true;
                    break;
                }
                if record.is_self_transfer() || ignored.contains(&record.to) {
                    continue;
                }
                if let Some(bucket) = classify(record) {
                    sums.add(bucket, record);
                }
            }

            if reached_cutoff || page.oldest_timestamp.map_or(false, |oldest| oldest < since) {
                break;
            }

            cursor = match page.next {
                Some(next) if next == current => {
                    logger::warning(
                        LogTag::Scanner,
                        &format!("{} {}: cursor stuck at {}, stopping", ledger, account, current),
                    );
                    None
                }
                next => next,
            };
        }

        logger::debug(
            LogTag::Scanner,
            &format!(
                "{} {}: {} pages, {} records in {} buckets",
                ledger,
                account,
                sums.pages,
                sums.record_count(),
                sums.buckets.len()
            ),
        );

        Ok(sums)
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(progress) = &self.progress {
            // No subscribers is fine
            let _ = progress.send(event);
        }
    }
}
