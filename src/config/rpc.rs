use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::Chain;

/// RPC layer configuration: per-chain ordered endpoint lists plus the
/// global tunables of the fetch pipeline. Endpoint order is failover
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    pub endpoints: HashMap<String, Vec<RpcEndpoint>>,
    pub failover_timeout_ms: u64,
    pub max_chunk_size: u64,
    pub max_concurrent_ranges: usize,
    pub max_requests_per_second: f64,
    pub max_retries: u32,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcEndpoint {
    pub name: String,
    pub url: String,
}

impl RpcEndpoint {
    fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        let mut endpoints = HashMap::new();

        endpoints.insert(
            Chain::Ethereum.as_str().to_string(),
            vec![
                RpcEndpoint::new("ethereum-publicnode", "https://ethereum.publicnode.com"),
                RpcEndpoint::new("ethereum-1rpc", "https://1rpc.io/eth"),
                RpcEndpoint::new("ethereum-llamarpc", "https://eth.llamarpc.com"),
            ],
        );

        endpoints.insert(
            Chain::Lisk.as_str().to_string(),
            vec![
                RpcEndpoint::new("lisk-official", "https://rpc.api.lisk.com"),
                RpcEndpoint::new("lisk-drpc", "https://lisk.drpc.org"),
            ],
        );

        endpoints.insert(
            Chain::Starknet.as_str().to_string(),
            vec![
                RpcEndpoint::new(
                    "starknet-blastapi",
                    "https://starknet-mainnet.public.blastapi.io",
                ),
                RpcEndpoint::new(
                    "starknet-nethermind",
                    "https://free-rpc.nethermind.io/mainnet-juno",
                ),
            ],
        );

        endpoints.insert(
            Chain::Optimism.as_str().to_string(),
            vec![
                RpcEndpoint::new("optimism-publicnode", "https://optimism.publicnode.com"),
                RpcEndpoint::new("optimism-official", "https://mainnet.optimism.io"),
            ],
        );

        endpoints.insert(
            Chain::Base.as_str().to_string(),
            vec![
                RpcEndpoint::new("base-publicnode", "https://base.publicnode.com"),
                RpcEndpoint::new("base-official", "https://mainnet.base.org"),
            ],
        );

        Self {
            endpoints,
            failover_timeout_ms: 30_000,
            // Public endpoints commonly cap eth_getLogs ranges in the low
            // thousands of blocks.
            max_chunk_size: 2_000,
            max_concurrent_ranges: 4,
            max_requests_per_second: 5.0,
            max_retries: 3,
            poll_interval_ms: 15_000,
        }
    }
}

impl RpcConfig {
    pub fn endpoints_for(&self, chain: Chain) -> Option<&[RpcEndpoint]> {
        self.endpoints.get(chain.as_str()).map(|list| list.as_slice())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_chunk_size == 0 {
            return Err("max_chunk_size must be positive".to_string());
        }
        if self.max_concurrent_ranges == 0 {
            return Err("max_concurrent_ranges must be positive".to_string());
        }
        for (name, list) in &self.endpoints {
            if Chain::from_str(name).is_none() {
                return Err(format!("Unknown chain in endpoint config: {}", name));
            }
            if list.is_empty() {
                return Err(format!("Chain {} has no RPC endpoints configured", name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RpcConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.endpoints_for(Chain::Ethereum).unwrap().len() >= 2);
        assert!(config.endpoints_for(Chain::Starknet).unwrap().len() >= 2);
    }

    #[test]
    fn test_validate_rejects_unknown_chain() {
        let mut config = RpcConfig::default();
        config.endpoints.insert(
            "dogecoin".to_string(),
            vec![RpcEndpoint::new("doge", "https://doge.example.com")],
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_endpoint_list() {
        let mut config = RpcConfig::default();
        config
            .endpoints
            .insert(Chain::Lisk.as_str().to_string(), vec![]);
        assert!(config.validate().is_err());
    }
}
