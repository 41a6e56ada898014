use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ethers::types::U256;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::models::{BlockRange, Chain, EventRecord, FetchError, Result, TransactionRecord};

use super::client::ChainRpcClient;

// Events per starknet_getEvents page; the node paginates past this.
const EVENT_PAGE_SIZE: u64 = 1000;
const MAX_EVENT_PAGES: usize = 32;

/// Starknet RPC client using direct JSON-RPC calls; the Starknet surface
/// differs enough from the EVM one that sharing a client is not worth it.
pub struct StarknetRpcClient {
    http_client: reqwest::Client,
    url: String,
    chain: Chain,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct GetEventsResult {
    events: Vec<StarknetEvent>,
    continuation_token: Option<String>,
}

#[derive(Deserialize)]
struct StarknetEvent {
    from_address: String,
    keys: Vec<String>,
    data: Vec<String>,
    block_number: Option<u64>,
    transaction_hash: String,
}

#[derive(Deserialize)]
struct TransactionBody {
    #[serde(default)]
    sender_address: Option<String>,
}

#[derive(Deserialize)]
struct TransactionReceipt {
    #[serde(default)]
    block_number: Option<u64>,
    #[serde(default)]
    actual_fee: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct BlockHeader {
    timestamp: i64,
}

impl StarknetRpcClient {
    pub fn new(url: &str, chain: Chain, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            url: url.to_string(),
            chain,
        })
    }

    fn rpc_error(&self, message: String) -> FetchError {
        FetchError::ProviderCall {
            chain: self.chain.as_str().to_string(),
            provider: self.url.clone(),
            message,
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> Result<T> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        let response = self
            .http_client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.rpc_error(format!("{} failed: {}", method, e)))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(self.rpc_error(format!("{} rate limited (HTTP 429)", method)));
        }

        let body: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| self.rpc_error(format!("{} returned malformed body: {}", method, e)))?;

        if let Some(error) = body.error {
            return Err(self.rpc_error(format!(
                "{} RPC error {}: {}",
                method, error.code, error.message
            )));
        }

        body.result
            .ok_or_else(|| self.rpc_error(format!("{} returned no result", method)))
    }

    /// Parses a felt (`0x...` hex) into U256, zero on anything unparseable.
    fn felt_to_u256(value: &serde_json::Value) -> U256 {
        let parse = |s: &str| U256::from_str_radix(s.trim_start_matches("0x"), 16).ok();
        match value {
            serde_json::Value::String(s) => parse(s).unwrap_or_default(),
            serde_json::Value::Object(map) => map
                .get("amount")
                .and_then(|v| v.as_str())
                .and_then(parse)
                .unwrap_or_default(),
            _ => U256::zero(),
        }
    }
}

#[async_trait]
impl ChainRpcClient for StarknetRpcClient {
    async fn block_number(&self) -> Result<u64> {
        self.call("starknet_blockNumber", json!([])).await
    }

    async fn get_logs(
        &self,
        address: &str,
        range: BlockRange,
        topics: &[String],
    ) -> Result<Vec<EventRecord>> {
        let mut filter = json!({
            "from_block": { "block_number": range.from },
            "to_block": { "block_number": range.to },
            "address": address,
            "chunk_size": EVENT_PAGE_SIZE,
        });
        if !topics.is_empty() {
            filter["keys"] = json!([topics]);
        }

        let mut records = Vec::new();
        // Starknet events carry no log index; number them per transaction
        // so the cross-chain dedup key stays unique.
        let mut per_tx_index: HashMap<String, u64> = HashMap::new();
        let mut continuation: Option<String> = None;

        for _ in 0..MAX_EVENT_PAGES {
            let mut params = filter.clone();
            if let Some(token) = &continuation {
                params["continuation_token"] = json!(token);
            }

            let page: GetEventsResult = self.call("starknet_getEvents", json!([params])).await?;

            for event in page.events {
                let index = per_tx_index
                    .entry(event.transaction_hash.clone())
                    .or_insert(0);
                records.push(EventRecord {
                    chain: self.chain,
                    address: event.from_address,
                    transaction_hash: event.transaction_hash,
                    log_index: *index,
                    block_number: event.block_number.unwrap_or(range.from),
                    topics: event.keys,
                    data: event.data.join(","),
                    timestamp: None,
                });
                *index += 1;
            }

            match page.continuation_token {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        debug!(
            "Fetched {} events for {} in blocks {}..={} via {}",
            records.len(),
            address,
            range.from,
            range.to,
            self.url
        );

        Ok(records)
    }

    async fn get_transaction(&self, hash: &str) -> Result<Option<TransactionRecord>> {
        let tx: TransactionBody = match self
            .call("starknet_getTransactionByHash", json!([hash]))
            .await
        {
            Ok(tx) => tx,
            Err(FetchError::ProviderCall { message, .. })
                if message.contains("TXN_HASH_NOT_FOUND") =>
            {
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let receipt: TransactionReceipt = self
            .call("starknet_getTransactionReceipt", json!([hash]))
            .await?;

        Ok(Some(TransactionRecord {
            chain: self.chain,
            hash: hash.to_string(),
            block_number: receipt.block_number.unwrap_or_default(),
            from: tx.sender_address.unwrap_or_else(|| "0x0".to_string()),
            to: None,
            value: receipt
                .actual_fee
                .as_ref()
                .map(Self::felt_to_u256)
                .unwrap_or_default(),
            gas_used: None,
            timestamp: None,
        }))
    }

    async fn block_timestamp(&self, number: u64) -> Result<Option<DateTime<Utc>>> {
        let header: BlockHeader = self
            .call(
                "starknet_getBlockWithTxHashes",
                json!([{ "block_number": number }]),
            )
            .await?;

        Ok(DateTime::from_timestamp(header.timestamp, 0))
    }
}
