use super::ordered::OrderedMap;
use super::rounding;
use serde::Serialize;

/// One token symbol within a report line
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TokenLine {
    #[serde(serialize_with = "rounding::token_amount")]
    pub amount: f64,
    #[serde(serialize_with = "rounding::token_usd")]
    pub usd: f64,
    pub count: u64,
}

impl TokenLine {
    pub fn merge(&mut self, other: &TokenLine) {
        self.amount += other.amount;
        self.usd += other.usd;
        self.count += other.count;
    }
}

/// Value moved to or from one counterparty (a category or a recipient)
///
/// Values are stored unrounded; rounding happens on serialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowLine {
    /// Native-ledger account behind an inbound category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hive_account: Option<String>,
    /// Token-ledger account behind an inbound category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_account: Option<String>,
    #[serde(serialize_with = "rounding::native_amount")]
    pub hive: f64,
    #[serde(serialize_with = "rounding::usd")]
    pub hive_usd: f64,
    pub hive_count: u64,
    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    pub tokens: OrderedMap<String, TokenLine>,
    #[serde(serialize_with = "rounding::token_usd")]
    pub token_usd: f64,
    pub token_count: u64,
    #[serde(serialize_with = "rounding::usd")]
    pub total_usd: f64,
}

impl FlowLine {
    pub fn transactions(&self) -> u64 {
        self.hive_count + self.token_count
    }

    pub fn is_empty(&self) -> bool {
        self.transactions() == 0
    }

    /// Combined native and token USD value, the report sort key
    pub fn combined_usd(&self) -> f64 {
        self.hive_usd + self.token_usd
    }

    pub fn add_token(&mut self, symbol: &str, token: TokenLine) {
        self.token_usd += token.usd;
        self.token_count += token.count;
        self.tokens
            .get_or_insert_with(symbol.to_string(), TokenLine::default)
            .merge(&token);
        self.total_usd = self.combined_usd();
    }

    /// Add another line's values; account labels are left untouched
    pub fn merge(&mut self, other: &FlowLine) {
        self.hive += other.hive;
        self.hive_usd += other.hive_usd;
        self.hive_count += other.hive_count;
        for (symbol, token) in other.tokens.iter() {
            self.add_token(symbol, token.clone());
        }
        self.total_usd = self.combined_usd();
    }
}

/// Inbound analysis of one receiving account
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InboundReport {
    /// Per category key, in mapping order; categories without activity are omitted
    pub categories: OrderedMap<String, FlowLine>,
    pub totals: FlowLine,
}

/// Outbound analysis of one sending account
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutboundReport {
    /// Per recipient, descending by combined USD value
    pub recipients: OrderedMap<String, FlowLine>,
    pub totals: FlowLine,
}

/// Slot for one account in a batch response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AccountOutcome<R> {
    Report(R),
    NoTransfers {
        recipients: OrderedMap<String, FlowLine>,
        message: String,
    },
    Failed {
        error: String,
    },
}

impl<R> AccountOutcome<R> {
    pub fn is_failed(&self) -> bool {
        matches!(self, AccountOutcome::Failed { .. })
    }

    pub fn report(&self) -> Option<&R> {
        match self {
            AccountOutcome::Report(report) => Some(report),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InboundsResponse {
    /// Successful reports sorted by value, then failures in request order
    pub recipients: OrderedMap<String, AccountOutcome<InboundReport>>,
    /// Per category totals across every successful recipient
    pub senders: OrderedMap<String, FlowLine>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutboundsResponse {
    /// In request order
    pub senders: OrderedMap<String, AccountOutcome<OutboundReport>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}
