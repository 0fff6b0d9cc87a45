/// Structured error handling for hive-flows
///
/// Every fallible library operation returns `Result<T, FlowError>`. Whole-call
/// validation failures surface to the caller; per-account failures are caught
/// by the analyzer and rendered into the report as data.
use thiserror::Error;

// =============================================================================
// MAIN ERROR TYPE
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    #[error("Validation error: {0}")] Validation(String),

    #[error("Network error on {endpoint}: {message}")] Network {
        endpoint: String,
        message: String,
    },

    #[error("Request to {endpoint} timed out after {timeout_ms}ms")] Timeout {
        endpoint: String,
        timeout_ms: u64,
    },

    #[error("HTTP {status} from {endpoint}")] HttpStatus {
        endpoint: String,
        status: u16,
    },

    #[error("Invalid response: {0}")] InvalidResponse(String),

    #[error("Service unavailable: {service} failed after {attempts} attempts: {last_error}")]
    ServiceUnavailable {
        service: String,
        attempts: u32,
        last_error: String,
    },

    #[error("No healthy endpoints for {class}")] NoHealthyEndpoint {
        class: String,
    },

    #[error("No connectivity to {class} after {attempts} endpoint probes")] NoConnectivity {
        class: String,
        attempts: u32,
    },

    #[error("Configuration error: {0}")] Config(String),
}

impl FlowError {
    /// Errors worth another attempt against the same or a rotated endpoint
    pub fn is_transient(&self) -> bool {
        match self {
            FlowError::Network { .. } => true,
            FlowError::Timeout { .. } => true,
            FlowError::HttpStatus { .. } => true,
            FlowError::InvalidResponse(_) => true,
            _ => false,
        }
    }

    /// Errors that fail the whole call before any remote I/O
    pub fn is_validation(&self) -> bool {
        matches!(self, FlowError::Validation(_))
    }

    // =========================================================================
    // BUILDERS
    // =========================================================================

    pub fn validation(message: impl Into<String>) -> Self {
        FlowError::Validation(message.into())
    }

    pub fn network(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        FlowError::Network {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        FlowError::InvalidResponse(message.into())
    }
}

// =============================================================================
// CONVERSIONS
// =============================================================================

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        FlowError::InvalidResponse(format!("JSON parse failed: {}", err))
    }
}

impl From<reqwest::Error> for FlowError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        if err.is_timeout() {
            return FlowError::Timeout {
                endpoint,
                timeout_ms: 0,
            };
        }

        if let Some(status) = err.status() {
            return FlowError::HttpStatus {
                endpoint,
                status: status.as_u16(),
            };
        }

        if err.is_decode() {
            return FlowError::InvalidResponse(format!("Failed to decode body: {}", err));
        }

        FlowError::Network {
            endpoint,
            message: err.to_string(),
        }
    }
}

pub type FlowResult<T> = Result<T, FlowError>;
