/// Request types, normalization and validation
///
/// Everything here runs before any remote I/O: a request that fails
/// validation never reaches the network.
use crate::aggregation::Category;
use crate::apis::LedgerRecord;
use crate::constants::MAX_WINDOW_HOURS;
use crate::errors::FlowError;
use crate::logger::{self, LogTag};
use std::collections::HashSet;

const ACCOUNT_MIN_LEN: usize = 3;
const ACCOUNT_MAX_LEN: usize = 16;

// =============================================================================
// ACCOUNT NAMES
// =============================================================================

/// Trim, drop one leading `@`, lowercase
pub fn normalize_account(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('@')
        .unwrap_or(trimmed)
        .trim()
        .to_lowercase()
}

pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Hive account naming rules
///
/// 3 to 16 characters; dot-separated segments of at least 3 characters,
/// each starting with a letter, ending with a letter or digit, containing
/// only lowercase letters, digits and single hyphens.
pub fn is_valid_account_name(name: &str) -> bool {
    if name.len() < ACCOUNT_MIN_LEN || name.len() > ACCOUNT_MAX_LEN {
        return false;
    }

    name.split('.').all(|segment| {
        let bytes = segment.as_bytes();
        if bytes.len() < ACCOUNT_MIN_LEN {
            return false;
        }
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        first.is_ascii_lowercase()
            && (last.is_ascii_lowercase() || last.is_ascii_digit())
            && bytes
                .iter()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
            && !segment.contains("--")
    })
}

// =============================================================================
// CATEGORY MAPPING
// =============================================================================

/// Ordered category key → source account mapping
///
/// Keys and accounts are normalized on insertion. Both must be unique
/// within one mapping, so every record attributes to at most one category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryMapping {
    entries: Vec<(String, String)>,
}

impl CategoryMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, account: &str) -> Result<(), FlowError> {
        let key = normalize_key(key);
        let account = normalize_account(account);

        if key.is_empty() {
            return Err(FlowError::validation("category key cannot be empty"));
        }
        if account.is_empty() {
            return Err(FlowError::validation(format!(
                "category '{}' has no source account",
                key
            )));
        }
        if self.account_for(&key).is_some() {
            return Err(FlowError::validation(format!(
                "duplicate category key '{}'",
                key
            )));
        }
        if let Some(existing) = self.key_for_account(&account) {
            return Err(FlowError::validation(format!(
                "account '{}' is mapped to both '{}' and '{}'",
                account, existing, key
            )));
        }

        self.entries.push((key, account));
        Ok(())
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, FlowError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut mapping = Self::new();
        for (key, account) in pairs {
            mapping.insert(key, account)?;
        }
        Ok(mapping)
    }

    /// Parse `key=account` assignments
    pub fn parse_assignments(items: &[String]) -> Result<Self, FlowError> {
        let mut mapping = Self::new();
        for item in items {
            let (key, account) = item.split_once('=').ok_or_else(|| {
                FlowError::validation(format!("expected key=account, got '{}'", item))
            })?;
            mapping.insert(key, account)?;
        }
        Ok(mapping)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, a)| (k.as_str(), a.as_str()))
    }

    pub fn account_for(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, a)| a.as_str())
    }

    pub fn key_for_account(&self, account: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, a)| a == account)
            .map(|(k, _)| k.as_str())
    }

    /// Category of a record received by `receiver`, if its sender is mapped
    pub fn classify_inbound(&self, receiver: &str, record: &LedgerRecord) -> Option<String> {
        if record.to != receiver {
            return None;
        }
        self.key_for_account(&record.from).map(|k| k.to_string())
    }
}

/// Merge two mappings into categories: native keys first, then token-only keys
pub fn merge_categories(hive: &CategoryMapping, tokens: &CategoryMapping) -> Vec<Category> {
    let mut categories: Vec<Category> = hive
        .iter()
        .map(|(key, account)| Category {
            key: key.to_string(),
            hive_account: Some(account.to_string()),
            token_account: tokens.account_for(key).map(|a| a.to_string()),
        })
        .collect();

    for (key, account) in tokens.iter() {
        if hive.account_for(key).is_none() {
            categories.push(Category {
                key: key.to_string(),
                hive_account: None,
                token_account: Some(account.to_string()),
            });
        }
    }

    categories
}

// =============================================================================
// TIME WINDOW
// =============================================================================

pub fn validate_window(hours: Option<u64>, days: Option<u64>) -> Result<(), FlowError> {
    match (hours, days) {
        (Some(_), Some(_)) => Err(FlowError::validation(
            "hours and days are mutually exclusive",
        )),
        (Some(0), None) => Err(FlowError::validation("hours must be greater than 0")),
        (None, Some(0)) => Err(FlowError::validation("days must be greater than 0")),
        (Some(h), None) if h > MAX_WINDOW_HOURS => Err(FlowError::validation(format!(
            "hours must be at most {}",
            MAX_WINDOW_HOURS
        ))),
        (None, Some(d)) if d > MAX_WINDOW_HOURS / 24 => Err(FlowError::validation(format!(
            "days must be at most {}",
            MAX_WINDOW_HOURS / 24
        ))),
        _ => Ok(()),
    }
}

/// Effective window: hours, else days × 24, else the configured default
pub fn resolve_window_hours(hours: Option<u64>, days: Option<u64>, default_hours: u64) -> u64 {
    hours
        .or_else(|| days.map(|d| d.saturating_mul(24)))
        .unwrap_or(default_hours)
}

// =============================================================================
// REQUESTS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InboundsRequest {
    pub receivers: Vec<String>,
    pub hive_senders: CategoryMapping,
    pub token_senders: CategoryMapping,
    pub hours: Option<u64>,
    pub days: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutboundsRequest {
    pub senders: Vec<String>,
    pub ignored_receivers: Vec<String>,
    pub hours: Option<u64>,
    pub days: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInbound {
    pub receivers: Vec<String>,
    pub hive_senders: CategoryMapping,
    pub token_senders: CategoryMapping,
    pub categories: Vec<Category>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOutbound {
    pub senders: Vec<String>,
    pub ignored: HashSet<String>,
    pub warnings: Vec<String>,
}

/// Normalize and de-duplicate, keeping first occurrences in order
fn normalize_accounts(raw: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .map(|a| normalize_account(a))
        .filter(|a| !a.is_empty() && seen.insert(a.clone()))
        .collect()
}

/// Malformed names only warn: the ledger rejects them or returns nothing
fn check_names<'a>(accounts: impl Iterator<Item = &'a str>, warnings: &mut Vec<String>) {
    for account in accounts {
        if !is_valid_account_name(account) {
            let message = format!("'{}' is not a valid Hive account name", account);
            logger::warning(LogTag::Analyzer, &message);
            if !warnings.contains(&message) {
                warnings.push(message);
            }
        }
    }
}

impl InboundsRequest {
    pub fn validate(&self) -> Result<ValidatedInbound, FlowError> {
        validate_window(self.hours, self.days)?;

        let receivers = normalize_accounts(&self.receivers);
        if receivers.is_empty() {
            return Err(FlowError::validation("at least one receiver is required"));
        }
        if self.hive_senders.is_empty() && self.token_senders.is_empty() {
            return Err(FlowError::validation(
                "at least one sender mapping is required",
            ));
        }

        let mut warnings = Vec::new();
        check_names(receivers.iter().map(|a| a.as_str()), &mut warnings);
        check_names(self.hive_senders.iter().map(|(_, a)| a), &mut warnings);
        check_names(self.token_senders.iter().map(|(_, a)| a), &mut warnings);

        Ok(ValidatedInbound {
            categories: merge_categories(&self.hive_senders, &self.token_senders),
            receivers,
            hive_senders: self.hive_senders.clone(),
            token_senders: self.token_senders.clone(),
            warnings,
        })
    }
}

impl OutboundsRequest {
    pub fn validate(&self) -> Result<ValidatedOutbound, FlowError> {
        validate_window(self.hours, self.days)?;

        let senders = normalize_accounts(&self.senders);
        if senders.is_empty() {
            return Err(FlowError::validation("at least one sender is required"));
        }
        let ignored: Vec<String> = normalize_accounts(&self.ignored_receivers);

        let mut warnings = Vec::new();
        check_names(senders.iter().map(|a| a.as_str()), &mut warnings);
        check_names(ignored.iter().map(|a| a.as_str()), &mut warnings);

        Ok(ValidatedOutbound {
            senders,
            ignored: ignored.into_iter().collect(),
            warnings,
        })
    }
}
