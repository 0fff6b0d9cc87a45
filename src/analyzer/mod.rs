//! Flow analysis orchestration
//!
//! [`FlowAnalyzer`] owns the process-wide services (endpoint registry,
//! resilient client, native price cache) and runs one analysis per call:
//!
//! Validate → ResolveWindow → scan each account (ledgers in parallel,
//! accounts one at a time) → Aggregate → restore the window override.
//!
//! Per-account failures become `{error}` slots in the response; only
//! validation failures fail the whole call.

pub mod progress;
pub mod request;


pub use progress::ProgressEvent;
pub use request::{
    is_valid_account_name, normalize_account, CategoryMapping, InboundsRequest, OutboundsRequest,
};

use crate::aggregation::{
    assemble_inbounds, assemble_outbounds, build_inbound_report, build_outbound_report,
    has_activity, no_transfers, AccountOutcome, InboundReport, InboundsResponse, OutboundReport,
    OutboundsResponse,
};
use crate::apis::LedgerRecord;
use crate::config::{ConfigStore, ScanConfig, WindowOverride};
use crate::errors::FlowError;
use crate::logger::{self, LogTag};
use crate::pricing::{NativePriceCache, TokenPriceBook};
use crate::rpc::{EndpointHealthRegistry, HttpTransport, ResilientClient, RetryPolicy, Transport};
use crate::scanner::{AccumulatedSums, EngineHistorySource, HiveHistorySource, LedgerScanner};
use chrono::{DateTime, Utc};
use progress::PROGRESS_CHANNEL_CAPACITY;
use request::{resolve_window_hours, ValidatedInbound, ValidatedOutbound};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, Notify};
use tokio::task::JoinHandle;

/// Per-call scanning context: both ledger sources and a scanner
struct ScanContext {
    scanner: LedgerScanner,
    native: HiveHistorySource,
    tokens: EngineHistorySource,
    since: DateTime<Utc>,
}

pub struct FlowAnalyzer {
    config: Arc<ConfigStore>,
    transport: Arc<dyn Transport>,
    registry: Arc<EndpointHealthRegistry>,
    client: Arc<ResilientClient>,
    prices: Arc<NativePriceCache>,
    progress: broadcast::Sender<ProgressEvent>,
    /// Serializes calls so one call's window override is never seen by another
    call_lock: Mutex<()>,
    shutdown: Arc<Notify>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl FlowAnalyzer {
    pub fn new(config: ConfigStore, transport: Arc<dyn Transport>) -> Self {
        let cfg = config.get_config_clone();
        let policy = RetryPolicy::from_config(&cfg.retry);

        let registry = Arc::new(EndpointHealthRegistry::new(
            transport.clone(),
            cfg.endpoints.clone(),
        ));
        let client = Arc::new(ResilientClient::new(registry.clone(), policy));
        let prices = Arc::new(NativePriceCache::new(transport.clone(), &cfg.price, policy));
        let (progress, _) = broadcast::channel(PROGRESS_CHANNEL_CAPACITY);

        Self {
            config: Arc::new(config),
            transport,
            registry,
            client,
            prices,
            progress,
            call_lock: Mutex::new(()),
            shutdown: Arc::new(Notify::new()),
            refresh_task: Mutex::new(None),
        }
    }

    /// Analyzer talking to the live services over HTTP
    pub fn with_http(config: ConfigStore) -> Result<Self, FlowError> {
        Ok(Self::new(config, Arc::new(HttpTransport::new()?)))
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn registry(&self) -> &Arc<EndpointHealthRegistry> {
        &self.registry
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.progress.subscribe()
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Start the background endpoint refresh; idempotent
    pub async fn start(&self) {
        let mut task = self.refresh_task.lock().await;
        if task.is_some() {
            return;
        }
        *task = Some(self.registry.start_background_refresh(self.shutdown.clone()));
        logger::debug(LogTag::Analyzer, "Background endpoint refresh started");
    }

    /// Stop the background refresh and wait for it to finish
    pub async fn shutdown(&self) {
        let handle = self.refresh_task.lock().await.take();
        if let Some(handle) = handle {
            self.shutdown.notify_one();
            if let Err(e) = handle.await {
                logger::warning(
                    LogTag::Analyzer,
                    &format!("Background refresh ended abnormally: {}", e),
                );
            }
            logger::debug(LogTag::Analyzer, "Background endpoint refresh stopped");
        }
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// Inbound value per receiver, attributed to sender categories
    pub async fn inbounds(&self, request: InboundsRequest) -> Result<InboundsResponse, FlowError> {
        let validated = request.validate()?;
        let _call = self.call_lock.lock().await;

        let window = self.override_window(request.hours, request.days);
        let context = self.scan_context()?;
        let mut book = TokenPriceBook::new(self.client.clone(), self.transport.clone());

        logger::info(
            LogTag::Analyzer,
            &format!(
                "Inbound analysis of {} receivers over {}h ({} categories)",
                validated.receivers.len(),
                window_hours(&self.config),
                validated.categories.len()
            ),
        );

        let total = validated.receivers.len();
        let mut outcomes: Vec<(String, Result<InboundReport, FlowError>)> = Vec::with_capacity(total);
        for (index, receiver) in validated.receivers.iter().enumerate() {
            self.emit(ProgressEvent::AccountStarted {
                account: receiver.clone(),
                index,
                total,
            });
            let result = self
                .inbound_account(&context, &validated, receiver, &mut book)
                .await;
            self.finish_account(receiver, result.as_ref().err());
            outcomes.push((receiver.clone(), result));
        }

        drop(window);
        Ok(assemble_inbounds(
            &validated.categories,
            outcomes,
            validated.warnings,
        ))
    }

    /// Outbound value per sender, broken down by recipient
    pub async fn outbounds(&self, request: OutboundsRequest) -> Result<OutboundsResponse, FlowError> {
        let validated = request.validate()?;
        let _call = self.call_lock.lock().await;

        let window = self.override_window(request.hours, request.days);
        let context = self.scan_context()?;
        let mut book = TokenPriceBook::new(self.client.clone(), self.transport.clone());

        logger::info(
            LogTag::Analyzer,
            &format!(
                "Outbound analysis of {} senders over {}h ({} ignored receivers)",
                validated.senders.len(),
                window_hours(&self.config),
                validated.ignored.len()
            ),
        );

        let total = validated.senders.len();
        let mut outcomes: Vec<(String, Result<AccountOutcome<OutboundReport>, FlowError>)> =
            Vec::with_capacity(total);
        for (index, sender) in validated.senders.iter().enumerate() {
            self.emit(ProgressEvent::AccountStarted {
                account: sender.clone(),
                index,
                total,
            });
            let result = self
                .outbound_account(&context, &validated, sender, &mut book)
                .await;
            self.finish_account(sender, result.as_ref().err());
            outcomes.push((sender.clone(), result));
        }

        drop(window);
        Ok(assemble_outbounds(outcomes, validated.warnings))
    }

    // =========================================================================
    // PER ACCOUNT
    // =========================================================================

    async fn inbound_account(
        &self,
        context: &ScanContext,
        validated: &ValidatedInbound,
        receiver: &str,
        book: &mut TokenPriceBook,
    ) -> Result<InboundReport, FlowError> {
        let nobody = HashSet::new();

        let native_scan = async {
            if validated.hive_senders.is_empty() {
                return Ok::<_, FlowError>(AccumulatedSums::default());
            }
            context
                .scanner
                .scan(&context.native, receiver, context.since, &nobody, |record| {
                    validated.hive_senders.classify_inbound(receiver, record)
                })
                .await
        };
        let token_scan = async {
            if validated.token_senders.is_empty() {
                return Ok::<_, FlowError>(AccumulatedSums::default());
            }
            context
                .scanner
                .scan(&context.tokens, receiver, context.since, &nobody, |record| {
                    validated.token_senders.classify_inbound(receiver, record)
                })
                .await
        };

        let (native, tokens, native_usd) =
            tokio::join!(native_scan, token_scan, self.prices.get_native_usd());
        let (native, tokens) = (native?, tokens?);

        build_inbound_report(&validated.categories, &native, &tokens, native_usd, book).await
    }

    async fn outbound_account(
        &self,
        context: &ScanContext,
        validated: &ValidatedOutbound,
        sender: &str,
        book: &mut TokenPriceBook,
    ) -> Result<AccountOutcome<OutboundReport>, FlowError> {
        let sent_by = |record: &LedgerRecord| {
            if record.from == sender {
                Some(record.to.clone())
            } else {
                None
            }
        };

        let (native, tokens) = tokio::join!(
            context
                .scanner
                .scan(&context.native, sender, context.since, &validated.ignored, sent_by),
            context
                .scanner
                .scan(&context.tokens, sender, context.since, &validated.ignored, sent_by),
        );
        let (native, tokens) = (native?, tokens?);

        if !has_activity(&native, &tokens) {
            return Ok(no_transfers());
        }

        let native_usd = self.prices.get_native_usd().await;
        build_outbound_report(&native, &tokens, native_usd, book)
            .await
            .map(AccountOutcome::Report)
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    /// Apply the effective window to the shared config until the guard drops
    fn override_window(
        &self,
        hours: Option<u64>,
        days: Option<u64>,
    ) -> WindowOverride<'_> {
        let default_hours = window_hours(&self.config);
        self.config
            .override_window_hours(resolve_window_hours(hours, days, default_hours))
    }

    fn scan_context(&self) -> Result<ScanContext, FlowError> {
        let scan: ScanConfig = self.config.with_config(|cfg| cfg.scan.clone());
        let since = window_start(Utc::now(), scan.window_hours)?;

        Ok(ScanContext {
            scanner: LedgerScanner::new(Duration::from_millis(scan.page_delay_ms))
                .with_progress(self.progress.clone()),
            native: HiveHistorySource::new(
                self.client.clone(),
                self.transport.clone(),
                scan.hive_page_size,
                scan.use_operation_filter,
            ),
            tokens: EngineHistorySource::new(
                self.client.clone(),
                self.transport.clone(),
                scan.engine_page_size,
            ),
            since,
        })
    }

    fn finish_account(&self, account: &str, error: Option<&FlowError>) {
        match error {
            None => self.emit(ProgressEvent::AccountFinished {
                account: account.to_string(),
            }),
            Some(e) => {
                logger::error(LogTag::Analyzer, &format!("{} failed: {}", account, e));
                self.emit(ProgressEvent::AccountFailed {
                    account: account.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    fn emit(&self, event: ProgressEvent) {
        let _ = self.progress.send(event);
    }
}

fn window_hours(config: &ConfigStore) -> u64 {
    config.with_config(|cfg| cfg.scan.window_hours)
}

/// Cutoff `hours` before `now`; a window reaching past the calendar range is rejected
fn window_start(now: DateTime<Utc>, hours: u64) -> Result<DateTime<Utc>, FlowError> {
    i64::try_from(hours)
        .ok()
        .and_then(chrono::Duration::try_hours)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| FlowError::validation(format!("a {}h window is out of range", hours)))
}
