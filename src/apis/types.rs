use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of ledger operation a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Native ledger `transfer`
    Transfer,
    /// Token ledger `tokens_transfer`
    TokenTransfer,
    /// Token ledger `tokens_stake` to another account
    TokenStake,
}

/// One value movement read from a remote ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub timestamp: DateTime<Utc>,
    pub from: String,
    pub to: String,
    pub symbol: String,
    pub amount: f64,
    pub kind: RecordKind,
}

impl LedgerRecord {
    pub fn is_self_transfer(&self) -> bool {
        self.from == self.to
    }
}

/// One decoded history page, newest record first
///
/// `oldest_timestamp` covers every raw row on the page, including rows that
/// were not decoded into records, so the scanner can stop on the cutoff even
/// when a page carries nothing countable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryPage {
    pub records: Vec<LedgerRecord>,
    pub raw_len: usize,
    pub oldest_timestamp: Option<DateTime<Utc>>,
    /// Cursor of the next older page; None once history is exhausted
    pub next: Option<i64>,
}

impl HistoryPage {
    pub fn is_empty(&self) -> bool {
        self.raw_len == 0
    }
}
