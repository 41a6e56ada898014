use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ethers::{
    providers::{Http, Middleware, Provider},
    types::{Address, Filter, Log, H256, U64},
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::models::{BlockRange, Chain, EventRecord, FetchError, Result, TransactionRecord};

use super::client::ChainRpcClient;

/// JSON-RPC client for EVM-compatible chains, one instance per endpoint.
pub struct EvmRpcClient {
    provider: Arc<Provider<Http>>,
    chain: Chain,
    url: String,
}

impl EvmRpcClient {
    pub fn new(url: &str, chain: Chain, timeout: Duration) -> Result<Self> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| FetchError::Configuration(format!("Invalid RPC URL {}: {}", url, e)))?;

        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        let provider = Provider::new(Http::new_with_client(parsed, http_client));

        Ok(Self {
            provider: Arc::new(provider),
            chain,
            url: url.to_string(),
        })
    }

    fn rpc_error(&self, message: String) -> FetchError {
        FetchError::ProviderCall {
            chain: self.chain.as_str().to_string(),
            provider: self.url.clone(),
            message,
        }
    }

    fn normalize_log(&self, log: Log) -> Option<EventRecord> {
        // Pending logs carry no hash/block yet; the fetcher only works on
        // mined ranges, so drop them.
        let transaction_hash = log.transaction_hash?;
        let block_number = log.block_number?;

        Some(EventRecord {
            chain: self.chain,
            address: format!("{:?}", log.address),
            transaction_hash: format!("{:?}", transaction_hash),
            log_index: log.log_index.unwrap_or_default().as_u64(),
            block_number: block_number.as_u64(),
            topics: log.topics.iter().map(|t| format!("{:?}", t)).collect(),
            data: format!("0x{}", hex::encode(log.data.as_ref())),
            timestamp: None,
        })
    }
}

#[async_trait]
impl ChainRpcClient for EvmRpcClient {
    async fn block_number(&self) -> Result<u64> {
        let number = self
            .provider
            .get_block_number()
            .await
            .map_err(|e| self.rpc_error(format!("Failed to get block number: {}", e)))?;

        Ok(number.as_u64())
    }

    async fn get_logs(
        &self,
        address: &str,
        range: BlockRange,
        topics: &[String],
    ) -> Result<Vec<EventRecord>> {
        let contract = Address::from_str(address)
            .map_err(|_| FetchError::InvalidAddress(address.to_string()))?;

        let mut filter = Filter::new()
            .from_block(U64::from(range.from))
            .to_block(U64::from(range.to))
            .address(contract);

        for (position, topic) in topics.iter().take(4).enumerate() {
            let parsed = H256::from_str(topic).map_err(|_| {
                FetchError::Configuration(format!("Invalid event topic: {}", topic))
            })?;
            filter = match position {
                0 => filter.topic0(parsed),
                1 => filter.topic1(parsed),
                2 => filter.topic2(parsed),
                _ => filter.topic3(parsed),
            };
        }

        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .map_err(|e| self.rpc_error(format!("Failed to get logs: {}", e)))?;

        debug!(
            "Fetched {} logs for {} in blocks {}..={} via {}",
            logs.len(),
            address,
            range.from,
            range.to,
            self.url
        );

        Ok(logs
            .into_iter()
            .filter_map(|log| self.normalize_log(log))
            .collect())
    }

    async fn get_transaction(&self, hash: &str) -> Result<Option<TransactionRecord>> {
        let tx_hash = H256::from_str(hash)
            .map_err(|_| FetchError::Configuration(format!("Invalid transaction hash: {}", hash)))?;

        let tx = self
            .provider
            .get_transaction(tx_hash)
            .await
            .map_err(|e| self.rpc_error(format!("Failed to get transaction: {}", e)))?;

        let Some(tx) = tx else {
            return Ok(None);
        };

        // The receipt carries the actual gas spent; tolerate it being
        // unavailable rather than failing the whole hydration.
        let gas_used = match self.provider.get_transaction_receipt(tx_hash).await {
            Ok(Some(receipt)) => receipt.gas_used.map(|g| g.as_u64()),
            _ => None,
        };

        Ok(Some(TransactionRecord {
            chain: self.chain,
            hash: format!("{:?}", tx.hash),
            block_number: tx.block_number.unwrap_or_default().as_u64(),
            from: format!("{:?}", tx.from),
            to: tx.to.map(|t| format!("{:?}", t)),
            value: tx.value,
            gas_used,
            timestamp: None,
        }))
    }

    async fn block_timestamp(&self, number: u64) -> Result<Option<DateTime<Utc>>> {
        let block = self
            .provider
            .get_block(number)
            .await
            .map_err(|e| self.rpc_error(format!("Failed to get block {}: {}", number, e)))?;

        Ok(block.and_then(|b| DateTime::from_timestamp(b.timestamp.as_u64() as i64, 0)))
    }
}
