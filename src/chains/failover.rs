use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::models::{Chain, FetchError, Result};

use super::client::ChainRpcClient;
use super::registry::ChainProviderRegistry;

/// Executes chain-scoped operations against the first provider of that
/// chain that succeeds. Providers are tried strictly in configuration
/// order, one attempt each; retrying a provider is the caller's decision.
pub struct FailoverExecutor {
    registry: Arc<ChainProviderRegistry>,
    per_call_timeout: Duration,
}

impl FailoverExecutor {
    pub fn new(registry: Arc<ChainProviderRegistry>, per_call_timeout: Duration) -> Self {
        Self {
            registry,
            per_call_timeout,
        }
    }

    pub fn registry(&self) -> &ChainProviderRegistry {
        &self.registry
    }

    /// Runs `operation` against the providers of `chain` until one
    /// succeeds. The operation may be invoked once per provider, so it must
    /// be safe to retry.
    ///
    /// Before each attempt the provider's chain is re-derived from its
    /// endpoint URL; on disagreement the provider is skipped without
    /// counting an attempt. A provider that fails the check never serves
    /// the call, even if it would have produced data: isolation takes
    /// priority over availability. Each attempt races the per-call timeout.
    pub async fn execute_with_failover<T, F>(
        &self,
        chain: Chain,
        operation_name: &str,
        operation: F,
    ) -> Result<T>
    where
        F: Fn(Arc<dyn ChainRpcClient>) -> BoxFuture<'static, Result<T>>,
    {
        let providers = self.registry.providers_for(chain)?;
        let mut last_attempt_error: Option<String> = None;
        let mut skipped = 0usize;

        for provider in providers {
            if let Some(detected) = Chain::detect_from_url(provider.url()) {
                if detected != chain {
                    let mismatch = FetchError::ChainMismatch {
                        provider: provider.name().to_string(),
                        declared: chain.as_str().to_string(),
                        detected: detected.as_str().to_string(),
                    };
                    warn!("Skipping provider for {}: {}", operation_name, mismatch);
                    skipped += 1;
                    continue;
                }
            }

            let attempt = timeout(self.per_call_timeout, operation(provider.client())).await;
            let outcome: Result<T> = match attempt {
                Ok(result) => result,
                Err(_) => Err(FetchError::ProviderTimeout {
                    chain: chain.as_str().to_string(),
                    provider: provider.name().to_string(),
                }),
            };

            match outcome {
                Ok(value) => {
                    self.registry.record_outcome(provider, true, None);
                    debug!(
                        "{} on {} served by {}",
                        operation_name,
                        chain.as_str(),
                        provider.name()
                    );
                    return Ok(value);
                }
                Err(error) => {
                    let message = error.to_string();
                    warn!(
                        "{} on {} failed via {}: {}",
                        operation_name,
                        chain.as_str(),
                        provider.name(),
                        message
                    );
                    self.registry
                        .record_outcome(provider, false, Some(message.clone()));
                    last_attempt_error = Some(message);
                }
            }
        }

        Err(FetchError::AllProvidersFailed {
            chain: chain.as_str().to_string(),
            operation: operation_name.to_string(),
            last_error: last_attempt_error.unwrap_or_else(|| {
                format!("{} providers skipped by chain-isolation check", skipped)
            }),
        })
    }
}
