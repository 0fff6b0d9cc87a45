/// Global constants used across hive-flows
///
/// This module contains system-wide constants that are not configurable
/// and are used across multiple modules.

// ============================================================================
// NATIVE LEDGER CONSTANTS
// ============================================================================

/// Native asset symbol counted as native units
pub const NATIVE_SYMBOL: &str = "HIVE";

/// Number of decimal places for the native asset
pub const NATIVE_DECIMALS: u32 = 3;

/// Operation name for native transfers
pub const TRANSFER_OP: &str = "transfer";

/// Bit position of the transfer operation in the history filter mask
pub const TRANSFER_OP_ID: u32 = 2;

/// NAI identifier of the native asset (used by non-condenser amount formats)
pub const NATIVE_NAI: &str = "@@000000021";

// ============================================================================
// TOKEN LEDGER CONSTANTS
// ============================================================================

/// Token-ledger operations counted as token flows
pub const TOKEN_TRANSFER_OP: &str = "tokens_transfer";
pub const TOKEN_STAKE_OP: &str = "tokens_stake";

/// Wrapped native token, priced 1:1 with the native asset
pub const SWAP_NATIVE_SYMBOL: &str = "SWAP.HIVE";

// ============================================================================
// TIME WINDOW
// ============================================================================

/// Longest accepted scan window (ten years)
pub const MAX_WINDOW_HOURS: u64 = 24 * 365 * 10;

// ============================================================================
// ROUNDING
// ============================================================================

/// Decimal places for native and token USD totals
pub const USD_DECIMALS: u32 = 2;

/// Decimal places for per-symbol token USD values (keeps dust-value tokens visible)
pub const TOKEN_USD_DECIMALS: u32 = 8;

/// Decimal places for per-symbol token amounts
pub const TOKEN_AMOUNT_DECIMALS: u32 = 2;

// ============================================================================
// REPORT MESSAGES
// ============================================================================

pub const NO_TRANSFERS_MESSAGE: &str = "no transfers found";

// ============================================================================
// DEFAULT ENDPOINTS
// ============================================================================

pub const DEFAULT_HIVE_NODES: &[&str] = &[
    "https://api.hive.blog",
    "https://api.deathwing.me",
    "https://api.openhive.network",
    "https://hive-api.arcange.eu",
    "https://techcoderx.com",
];

pub const DEFAULT_ENGINE_RPC_NODES: &[&str] = &[
    "https://api.hive-engine.com/rpc",
    "https://engine.rishipanthee.com",
    "https://herpc.dtools.dev",
    "https://api.primersion.com",
];

pub const DEFAULT_ENGINE_HISTORY_NODES: &[&str] = &[
    "https://history.hive-engine.com",
    "https://engine.hive.pizza",
];

pub const HIVE_DISCOVERY_URL: &str = "https://beacon.peakd.com/api/nodes";
pub const ENGINE_RPC_DISCOVERY_URL: &str = "https://beacon.peakd.com/api/he/nodes";
pub const ENGINE_HISTORY_DISCOVERY_URL: &str = "https://beacon.peakd.com/api/heh/nodes";

pub const NATIVE_PRICE_URL: &str = "https://api.coingecko.com/api/v3/simple/price";

/// Discovery score of a fully healthy node
pub const FULL_HEALTH_SCORE: u32 = 100;

/// Convert a static endpoint list into owned strings for config defaults
pub fn to_owned_list(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
