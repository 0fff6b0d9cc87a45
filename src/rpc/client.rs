//! Retrying, endpoint-rotating call wrapper
//!
//! `ResilientClient::call` runs an operation against an endpoint of one
//! service class. Failures back off exponentially and rotate to a different
//! endpoint (the failed one is reported bad to the registry). Every attempt
//! runs under a per-call timeout; a timeout is a failure like any other.

use crate::config::RetryConfig;
use crate::errors::FlowError;
use crate::logger::{self, LogTag};
use crate::rpc::registry::EndpointHealthRegistry;
use crate::rpc::types::ServiceClass;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// Retry schedule shared by every remote call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Additional attempts after the first
    pub retries: u32,
    pub base_delay: Duration,
    pub call_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            retries: config.retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            call_timeout: Duration::from_secs(config.call_timeout_secs),
        }
    }

    pub fn total_attempts(&self) -> u32 {
        self.retries + 1
    }

    /// Delay before attempt `attempt` (0-based): `2^(attempt-1) * base`
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

pub struct ResilientClient {
    registry: Arc<EndpointHealthRegistry>,
    policy: RetryPolicy,
}

impl ResilientClient {
    pub fn new(registry: Arc<EndpointHealthRegistry>, policy: RetryPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn registry(&self) -> &Arc<EndpointHealthRegistry> {
        &self.registry
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run `op(endpoint, attempt)` with retries and endpoint rotation
    ///
    /// `held` is the endpoint the caller is pinned to across a multi-page
    /// scan. It is used for the first attempt when present, cleared when
    /// that endpoint fails, and set to the endpoint that finally succeeded.
    ///
    /// Registry connectivity errors end the call immediately. Non-transient
    /// errors from `op` are returned as-is; transient ones are retried until
    /// the budget is spent, then surface as `ServiceUnavailable`.
    pub async fn call<T, F, Fut>(
        &self,
        class: ServiceClass,
        held: &mut Option<String>,
        mut op: F,
    ) -> Result<T, FlowError>
    where
        F: FnMut(String, u32) -> Fut,
        Fut: Future<Output = Result<T, FlowError>>,
    {
        let mut endpoint = match held.clone() {
            Some(url) => url,
            None => self.registry.get_endpoint(class).await?,
        };

        let mut attempt: u32 = 0;
        loop {
            let outcome = match timeout(self.policy.call_timeout, op(endpoint.clone(), attempt)).await {
                Ok(result) => result,
                Err(_) => Err(FlowError::Timeout {
                    endpoint: endpoint.clone(),
                    timeout_ms: self.policy.call_timeout.as_millis() as u64,
                }),
            };

            let error = match outcome {
                Ok(value) => {
                    *held = Some(endpoint);
                    return Ok(value);
                }
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => e,
            };

            logger::warning(
                LogTag::Client,
                &format!(
                    "{} attempt {}/{} on {} failed: {}",
                    class,
                    attempt + 1,
                    self.policy.total_attempts(),
                    endpoint,
                    error
                ),
            );
            *held = None;

            if attempt >= self.policy.retries {
                logger::error(
                    LogTag::Client,
                    &format!(
                        "{}: all {} attempts failed",
                        class,
                        self.policy.total_attempts()
                    ),
                );
                return Err(FlowError::ServiceUnavailable {
                    service: class.to_string(),
                    attempts: attempt + 1,
                    last_error: error.to_string(),
                });
            }

            attempt += 1;
            let delay = self.policy.delay_before(attempt);
            logger::debug(
                LogTag::Client,
                &format!("{}: backing off {}ms before attempt {}", class, delay.as_millis(), attempt + 1),
            );
            sleep(delay).await;

            endpoint = match self.registry.get_endpoint_excluding(class, &endpoint).await {
                Ok(next) => next,
                // Nothing left to rotate to: report the failure that forced the rotation
                Err(rotation) => {
                    logger::error(
                        LogTag::Client,
                        &format!("{}: no endpoint to rotate to ({})", class, rotation),
                    );
                    return Err(FlowError::ServiceUnavailable {
                        service: class.to_string(),
                        attempts: attempt,
                        last_error: error.to_string(),
                    });
                }
            };
        }
    }
}

/// Retry a single-source operation with the same backoff schedule
///
/// Used where there is no endpoint pool to rotate through.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    service: &str,
    mut op: F,
) -> Result<T, FlowError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FlowError>>,
{
    let mut attempt: u32 = 0;
    loop {
        let outcome = match timeout(policy.call_timeout, op(attempt)).await {
            Ok(result) => result,
            Err(_) => Err(FlowError::Timeout {
                endpoint: service.to_string(),
                timeout_ms: policy.call_timeout.as_millis() as u64,
            }),
        };

        let error = match outcome {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => e,
        };

        logger::warning(
            LogTag::Client,
            &format!(
                "{} attempt {}/{} failed: {}",
                service,
                attempt + 1,
                policy.total_attempts(),
                error
            ),
        );

        if attempt >= policy.retries {
            return Err(FlowError::ServiceUnavailable {
                service: service.to_string(),
                attempts: attempt + 1,
                last_error: error.to_string(),
            });
        }

        attempt += 1;
        sleep(policy.delay_before(attempt)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointsConfig;
    use crate::rpc::mock::MockTransport;
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn endpoints(urls: &[&str]) -> EndpointsConfig {
        EndpointsConfig {
            hive_defaults: urls.iter().map(|u| u.to_string()).collect(),
            ..EndpointsConfig::default()
        }
    }

    fn client(urls: &[&str], retries: u32) -> ResilientClient {
        let mock = Arc::new(MockTransport::new());
        let registry = Arc::new(EndpointHealthRegistry::new(mock, endpoints(urls)));
        ResilientClient::new(
            registry,
            RetryPolicy {
                retries,
                base_delay: Duration::from_millis(100),
                call_timeout: Duration::from_secs(5),
            },
        )
    }

    type Seen = Arc<Mutex<Vec<(String, u32, Instant)>>>;

    #[test]
    fn test_delay_schedule() {
        let policy = RetryPolicy {
            retries: 3,
            base_delay: Duration::from_millis(300),
            call_timeout: Duration::from_secs(10),
        };
        assert_eq!(policy.delay_before(0), Duration::ZERO);
        assert_eq!(policy.delay_before(1), Duration::from_millis(300));
        assert_eq!(policy.delay_before(2), Duration::from_millis(600));
        assert_eq!(policy.delay_before(3), Duration::from_millis(1200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delays_between_attempts() {
        let client = client(&["https://a", "https://b", "https://c", "https://d"], 3);
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let mut held = None;

        let result: Result<(), FlowError> = client
            .call(ServiceClass::Hive, &mut held, {
                let seen = seen.clone();
                move |endpoint, attempt| {
                    let seen = seen.clone();
                    async move {
                        seen.lock().unwrap().push((endpoint.clone(), attempt, Instant::now()));
                        Err(FlowError::network(endpoint, "reset"))
                    }
                }
            })
            .await;

        match result {
            Err(FlowError::ServiceUnavailable { attempts, .. }) => assert_eq!(attempts, 4),
            other => panic!("expected ServiceUnavailable, got {:?}", other),
        }
        assert!(held.is_none());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        let gaps: Vec<Duration> = seen.windows(2).map(|w| w[1].2 - w[0].2).collect();
        assert_eq!(
            gaps,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotation_never_repeats_previous_endpoint() {
        let client = client(&["https://a", "https://b", "https://c", "https://d"], 3);
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let mut held = None;

        let _: Result<(), FlowError> = client
            .call(ServiceClass::Hive, &mut held, {
                let seen = seen.clone();
                move |endpoint, attempt| {
                    let seen = seen.clone();
                    async move {
                        seen.lock().unwrap().push((endpoint.clone(), attempt, Instant::now()));
                        Err(FlowError::network(endpoint, "reset"))
                    }
                }
            })
            .await;

        let seen = seen.lock().unwrap();
        for pair in seen.windows(2) {
            assert_ne!(pair[0].0, pair[1].0);
        }
        let attempts: Vec<u32> = seen.iter().map(|s| s.1).collect();
        assert_eq!(attempts, vec![0, 1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_failure_updates_held_endpoint() {
        let client = client(&["https://a", "https://b"], 3);
        let mut held = Some("https://a".to_string());

        let value = client
            .call(ServiceClass::Hive, &mut held, |endpoint, _| async move {
                if endpoint == "https://a" {
                    Err(FlowError::network(endpoint, "reset"))
                } else {
                    Ok(42)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(held.as_deref(), Some("https://b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_held_endpoint_is_reused_first() {
        let client = client(&["https://a", "https://b"], 3);
        let mut held = Some("https://b".to_string());

        let used = client
            .call(ServiceClass::Hive, &mut held, |endpoint, _| async move { Ok(endpoint) })
            .await
            .unwrap();
        assert_eq!(used, "https://b");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let mock = Arc::new(MockTransport::new());
        let registry = Arc::new(EndpointHealthRegistry::new(
            mock,
            endpoints(&["https://slow", "https://fast"]),
        ));
        let client = ResilientClient::new(
            registry,
            RetryPolicy {
                retries: 1,
                base_delay: Duration::from_millis(10),
                call_timeout: Duration::from_secs(1),
            },
        );
        let mut held = Some("https://slow".to_string());

        let value = client
            .call(ServiceClass::Hive, &mut held, |endpoint, _| async move {
                if endpoint == "https://slow" {
                    sleep(Duration::from_secs(60)).await;
                }
                Ok(endpoint)
            })
            .await
            .unwrap();
        assert_eq!(value, "https://fast");
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_endpoint_failure_keeps_last_error() {
        let client = client(&["https://only"], 3);
        let mut held = None;

        let result: Result<(), FlowError> = client
            .call(ServiceClass::Hive, &mut held, |endpoint, _| async move {
                Err(FlowError::network(endpoint, "connection reset"))
            })
            .await;

        match result {
            Err(FlowError::ServiceUnavailable {
                service,
                attempts,
                last_error,
            }) => {
                assert_eq!(service, "hive");
                assert_eq!(attempts, 1);
                assert!(last_error.contains("connection reset"), "{}", last_error);
            }
            other => panic!("expected ServiceUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_transient_error_is_not_retried() {
        let client = client(&["https://a", "https://b"], 3);
        let calls = Arc::new(Mutex::new(0u32));
        let mut held = None;

        let result: Result<(), FlowError> = client
            .call(ServiceClass::Hive, &mut held, {
                let calls = calls.clone();
                move |_, _| {
                    let calls = calls.clone();
                    async move {
                        *calls.lock().unwrap() += 1;
                        Err(FlowError::validation("bad account"))
                    }
                }
            })
            .await;

        assert!(matches!(result, Err(FlowError::Validation(_))));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_with_backoff_single_source() {
        let policy = RetryPolicy {
            retries: 2,
            base_delay: Duration::from_millis(50),
            call_timeout: Duration::from_secs(1),
        };
        let value = retry_with_backoff(policy, "price", |attempt| async move {
            if attempt < 2 {
                Err(FlowError::network("price", "503"))
            } else {
                Ok(attempt)
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 2);

        let exhausted: Result<(), FlowError> = retry_with_backoff(policy, "price", |_| async {
            Err(FlowError::network("price", "503"))
        })
        .await;
        assert!(matches!(
            exhausted,
            Err(FlowError::ServiceUnavailable { attempts: 3, .. })
        ));
    }
}
