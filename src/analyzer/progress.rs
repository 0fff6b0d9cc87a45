use crate::scanner::Ledger;

/// Progress of a running analysis, broadcast to any subscriber
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    AccountStarted {
        account: String,
        index: usize,
        total: usize,
    },
    PageScanned {
        account: String,
        ledger: Ledger,
        page: usize,
        records: usize,
    },
    AccountFinished {
        account: String,
    },
    AccountFailed {
        account: String,
        error: String,
    },
}

/// Capacity of the progress channel; slow subscribers skip old events
pub const PROGRESS_CHANNEL_CAPACITY: usize = 256;
