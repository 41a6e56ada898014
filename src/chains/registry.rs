use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::info;

use crate::config::RpcConfig;
use crate::models::{Chain, FetchError, Result};

use super::client::ChainRpcClient;
use super::evm::EvmRpcClient;
use super::starknet::StarknetRpcClient;

/// One configured RPC endpoint plus its usage counters. Created at startup,
/// mutated for the lifetime of the process, never evicted: a permanently
/// failing provider stays in the pool and is retried on the next call.
pub struct ProviderDescriptor {
    name: String,
    chain: Chain,
    url: String,
    client: Arc<dyn ChainRpcClient>,
    request_count: AtomicU64,
    success_count: AtomicU64,
    failure_count: AtomicU64,
    is_healthy: AtomicBool,
    last_error: RwLock<Option<String>>,
}

impl ProviderDescriptor {
    pub fn new(name: String, chain: Chain, url: String, client: Arc<dyn ChainRpcClient>) -> Self {
        Self {
            name,
            chain,
            url,
            client,
            request_count: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            is_healthy: AtomicBool::new(true),
            last_error: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn client(&self) -> Arc<dyn ChainRpcClient> {
        Arc::clone(&self.client)
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn success_count(&self) -> u64 {
        self.success_count.load(Ordering::SeqCst)
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::SeqCst)
    }

    /// Outcome of the most recent attempt, not a decaying health score.
    pub fn is_healthy(&self) -> bool {
        self.is_healthy.load(Ordering::SeqCst)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().unwrap().clone()
    }

    pub(crate) fn record_outcome(&self, success: bool, error: Option<String>) {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        if success {
            self.success_count.fetch_add(1, Ordering::SeqCst);
            self.is_healthy.store(true, Ordering::SeqCst);
            *self.last_error.write().unwrap() = None;
        } else {
            self.failure_count.fetch_add(1, Ordering::SeqCst);
            self.is_healthy.store(false, Ordering::SeqCst);
            *self.last_error.write().unwrap() = error;
        }
    }
}

/// Owns the per-chain ordered provider lists, built once from
/// configuration. Ordering is declaration order; failover already tries
/// every entry, so there is no reordering or scoring here.
pub struct ChainProviderRegistry {
    providers: HashMap<Chain, Vec<Arc<ProviderDescriptor>>>,
}

impl ChainProviderRegistry {
    pub fn from_config(config: &RpcConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.failover_timeout_ms);
        let mut providers: HashMap<Chain, Vec<Arc<ProviderDescriptor>>> = HashMap::new();

        for (chain_name, endpoints) in &config.endpoints {
            let chain = Chain::from_str(chain_name).ok_or_else(|| {
                FetchError::Configuration(format!("Unknown chain in config: {}", chain_name))
            })?;

            let mut list = Vec::with_capacity(endpoints.len());
            for endpoint in endpoints {
                let client: Arc<dyn ChainRpcClient> = if chain.is_evm() {
                    Arc::new(EvmRpcClient::new(&endpoint.url, chain, timeout)?)
                } else {
                    Arc::new(StarknetRpcClient::new(&endpoint.url, chain, timeout)?)
                };
                list.push(Arc::new(ProviderDescriptor::new(
                    endpoint.name.clone(),
                    chain,
                    endpoint.url.clone(),
                    client,
                )));
            }

            info!(
                "Registered {} RPC providers for {}",
                list.len(),
                chain.as_str()
            );
            providers.insert(chain, list);
        }

        Ok(Self { providers })
    }

    /// Builds a registry from pre-constructed descriptors, preserving
    /// declaration order per chain. Lets tests wire in their own clients.
    pub fn with_providers(descriptors: Vec<Arc<ProviderDescriptor>>) -> Self {
        let mut providers: HashMap<Chain, Vec<Arc<ProviderDescriptor>>> = HashMap::new();
        for descriptor in descriptors {
            providers
                .entry(descriptor.chain())
                .or_default()
                .push(descriptor);
        }
        Self { providers }
    }

    pub fn providers_for(&self, chain: Chain) -> Result<&[Arc<ProviderDescriptor>]> {
        match self.providers.get(&chain) {
            Some(list) if !list.is_empty() => Ok(list),
            _ => Err(FetchError::Configuration(format!(
                "No RPC providers configured for chain {}",
                chain.as_str()
            ))),
        }
    }

    pub fn chains(&self) -> Vec<Chain> {
        let mut chains: Vec<Chain> = self.providers.keys().copied().collect();
        chains.sort_by_key(|chain| chain.as_str());
        chains
    }

    pub fn record_outcome(&self, provider: &ProviderDescriptor, success: bool, error: Option<String>) {
        provider.record_outcome(success, error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::client::MockChainRpcClient;

    fn descriptor(name: &str, chain: Chain, url: &str) -> Arc<ProviderDescriptor> {
        Arc::new(ProviderDescriptor::new(
            name.to_string(),
            chain,
            url.to_string(),
            Arc::new(MockChainRpcClient::new()),
        ))
    }

    #[test]
    fn test_providers_for_unknown_chain_is_a_configuration_error() {
        let registry = ChainProviderRegistry::with_providers(vec![descriptor(
            "eth-1",
            Chain::Ethereum,
            "http://localhost:8545",
        )]);

        assert!(registry.providers_for(Chain::Ethereum).is_ok());
        assert!(matches!(
            registry.providers_for(Chain::Lisk),
            Err(FetchError::Configuration(_))
        ));
    }

    #[test]
    fn test_record_outcome_counters_stay_consistent() {
        let provider = descriptor("eth-1", Chain::Ethereum, "http://localhost:8545");
        let registry = ChainProviderRegistry::with_providers(vec![Arc::clone(&provider)]);

        registry.record_outcome(&provider, false, Some("boom".to_string()));
        assert_eq!(provider.request_count(), 1);
        assert_eq!(provider.failure_count(), 1);
        assert!(!provider.is_healthy());
        assert_eq!(provider.last_error(), Some("boom".to_string()));

        registry.record_outcome(&provider, true, None);
        assert_eq!(provider.request_count(), 2);
        assert_eq!(provider.success_count(), 1);
        assert!(provider.is_healthy());
        assert_eq!(provider.last_error(), None);

        assert_eq!(
            provider.request_count(),
            provider.success_count() + provider.failure_count()
        );
    }

    #[test]
    fn test_from_config_builds_every_configured_chain() {
        let config = RpcConfig::default();
        let registry = ChainProviderRegistry::from_config(&config).unwrap();

        for chain in Chain::all() {
            let providers = registry.providers_for(*chain).unwrap();
            assert!(!providers.is_empty());
            for provider in providers {
                assert_eq!(provider.chain(), *chain);
            }
        }
    }

    #[test]
    fn test_declaration_order_is_preserved() {
        let registry = ChainProviderRegistry::with_providers(vec![
            descriptor("eth-1", Chain::Ethereum, "http://one.example"),
            descriptor("eth-2", Chain::Ethereum, "http://two.example"),
            descriptor("eth-3", Chain::Ethereum, "http://three.example"),
        ]);

        let names: Vec<&str> = registry
            .providers_for(Chain::Ethereum)
            .unwrap()
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(names, vec!["eth-1", "eth-2", "eth-3"]);
    }
}
