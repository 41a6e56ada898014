use chrono::{DateTime, Utc};
use ethers::types::Address;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chains::FailoverExecutor;
use crate::models::{
    Chain, EventRecord, FetchError, FetchResult, FetchSummary, Result, TransactionRecord,
};

use super::chunks::split_range;

// Block-timestamp lookups are separate RPC calls; cap them so a large
// fetch does not quietly multiply its request count.
const TIMESTAMP_LOOKUP_CAP: usize = 25;

#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Largest sub-range requested from a provider in one call.
    pub max_chunk_size: u64,
    /// Fan-out for concurrent sub-range fetches. Bounded to stay inside
    /// public-endpoint rate limits.
    pub max_concurrent_ranges: usize,
    /// Topic filter applied to every log request; empty means all events.
    pub topics: Vec<String>,
    /// Resolve each distinct transaction hash into a full record.
    pub hydrate_transactions: bool,
    /// Fill record timestamps from block headers, up to a capped number of
    /// distinct blocks.
    pub fill_timestamps: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_chunk_size: 2_000,
            max_concurrent_ranges: 4,
            topics: Vec::new(),
            hydrate_transactions: false,
            fill_timestamps: false,
        }
    }
}

/// Retrieves every log/transaction for a contract over a wide block range
/// by splitting it into provider-sized chunks, fetching each through the
/// failover executor, and merging the results.
///
/// Sub-range requests always carry explicit `from`/`to` bounds. Persistent
/// server-side filters are deliberately not used: public endpoints expire
/// them and then answer "filter not found".
pub struct InteractionFetcher {
    executor: Arc<FailoverExecutor>,
    options: FetchOptions,
}

impl InteractionFetcher {
    pub fn new(executor: Arc<FailoverExecutor>) -> Self {
        Self {
            executor,
            options: FetchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Latest block number of `chain`, through failover.
    pub async fn current_head(&self, chain: Chain) -> Result<u64> {
        self.executor
            .execute_with_failover(chain, "block_number", |client| {
                async move { client.block_number().await }.boxed()
            })
            .await
    }

    /// Fetches all interactions of `address` in `[from_block, to_block]`
    /// using the configured topic filter.
    pub async fn fetch_interactions(
        &self,
        address: &str,
        chain: Chain,
        from_block: u64,
        to_block: u64,
    ) -> Result<FetchResult> {
        let topics = self.options.topics.clone();
        self.fetch_interactions_filtered(address, chain, from_block, to_block, &topics)
            .await
    }

    /// Same as [`fetch_interactions`](Self::fetch_interactions) with an
    /// explicit topic filter, used by the polling listener.
    pub async fn fetch_interactions_filtered(
        &self,
        address: &str,
        chain: Chain,
        from_block: u64,
        to_block: u64,
        topics: &[String],
    ) -> Result<FetchResult> {
        if from_block > to_block {
            return Err(FetchError::InvalidRange {
                from: from_block,
                to: to_block,
            });
        }
        if self.options.max_chunk_size == 0 {
            return Err(FetchError::Configuration(
                "max_chunk_size must be positive".to_string(),
            ));
        }
        validate_address(chain, address)?;
        // Missing configuration is fatal up front, not a failure per chunk.
        self.executor.registry().providers_for(chain)?;

        let ranges = split_range(from_block, to_block, self.options.max_chunk_size);
        let total_ranges = ranges.len();
        info!(
            "Fetching interactions for {} on {}: {} blocks in {} ranges",
            address,
            chain.as_str(),
            to_block - from_block + 1,
            total_ranges
        );

        // Completion order is whatever the network gives us; indices let
        // the merge below be deterministic regardless.
        let mut outcomes: Vec<(usize, Result<Vec<EventRecord>>)> =
            stream::iter(ranges.into_iter().enumerate())
                .map(|(index, range)| {
                    let executor = Arc::clone(&self.executor);
                    let address = address.to_string();
                    let topics = topics.to_vec();
                    async move {
                        let outcome = executor
                            .execute_with_failover(chain, "get_logs", move |client| {
                                let address = address.clone();
                                let topics = topics.clone();
                                async move { client.get_logs(&address, range, &topics).await }
                                    .boxed()
                            })
                            .await;
                        (index, outcome)
                    }
                })
                .buffer_unordered(self.options.max_concurrent_ranges)
                .collect()
                .await;
        outcomes.sort_by_key(|(index, _)| *index);

        let mut events: Vec<EventRecord> = Vec::new();
        let mut seen_events: HashSet<(String, u64)> = HashSet::new();
        let mut skipped_ranges = 0usize;

        for (index, outcome) in outcomes {
            match outcome {
                Ok(batch) => {
                    for event in batch {
                        if seen_events.insert(event.dedup_key()) {
                            events.push(event);
                        }
                    }
                }
                Err(error) => {
                    skipped_ranges += 1;
                    warn!(
                        "Skipping range {}/{} for {} on {}: {}",
                        index + 1,
                        total_ranges,
                        address,
                        chain.as_str(),
                        error
                    );
                }
            }
        }

        // "Nothing found" and "nothing reachable" must stay distinct.
        if skipped_ranges == total_ranges {
            return Err(FetchError::TotalRangeFailure {
                chain: chain.as_str().to_string(),
                address: address.to_string(),
                failed: skipped_ranges,
                total: total_ranges,
            });
        }

        let mut transactions = if self.options.hydrate_transactions {
            self.hydrate_transactions(chain, &events).await
        } else {
            Vec::new()
        };

        if self.options.fill_timestamps {
            self.fill_timestamps(chain, &mut events, &mut transactions)
                .await;
        }

        let summary = FetchSummary {
            total_transactions: transactions.len(),
            total_events: events.len(),
            blocks_scanned: to_block - from_block + 1,
            total_ranges,
            skipped_ranges,
        };
        info!(
            "Fetched {} events / {} transactions for {} on {} ({}/{} ranges skipped)",
            summary.total_events,
            summary.total_transactions,
            address,
            chain.as_str(),
            summary.skipped_ranges,
            summary.total_ranges
        );

        Ok(FetchResult {
            transactions,
            events,
            summary,
        })
    }

    /// Resolves every distinct transaction hash seen in `events` into a
    /// full record, earliest-seen order, tolerating per-hash failures.
    async fn hydrate_transactions(
        &self,
        chain: Chain,
        events: &[EventRecord],
    ) -> Vec<TransactionRecord> {
        let mut hashes: Vec<String> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for event in events {
            if seen.insert(event.transaction_hash.as_str()) {
                hashes.push(event.transaction_hash.clone());
            }
        }

        let mut transactions = Vec::with_capacity(hashes.len());
        for hash in hashes {
            let request_hash = hash.clone();
            let outcome = self
                .executor
                .execute_with_failover(chain, "get_transaction", move |client| {
                    let hash = request_hash.clone();
                    async move { client.get_transaction(&hash).await }.boxed()
                })
                .await;

            match outcome {
                Ok(Some(transaction)) => transactions.push(transaction),
                Ok(None) => debug!("Transaction {} not found during hydration", hash),
                Err(error) => warn!("Failed to hydrate transaction {}: {}", hash, error),
            }
        }
        transactions
    }

    async fn fill_timestamps(
        &self,
        chain: Chain,
        events: &mut [EventRecord],
        transactions: &mut [TransactionRecord],
    ) {
        let mut blocks: Vec<u64> = Vec::new();
        let mut seen: HashSet<u64> = HashSet::new();
        let numbers = events
            .iter()
            .map(|e| e.block_number)
            .chain(transactions.iter().map(|t| t.block_number));
        for number in numbers {
            if seen.insert(number) {
                blocks.push(number);
            }
        }

        if blocks.len() > TIMESTAMP_LOOKUP_CAP {
            debug!(
                "Capping timestamp lookups to {} of {} distinct blocks",
                TIMESTAMP_LOOKUP_CAP,
                blocks.len()
            );
            blocks.truncate(TIMESTAMP_LOOKUP_CAP);
        }

        let mut stamps: HashMap<u64, DateTime<Utc>> = HashMap::new();
        for number in blocks {
            let outcome = self
                .executor
                .execute_with_failover(chain, "block_timestamp", move |client| {
                    async move { client.block_timestamp(number).await }.boxed()
                })
                .await;

            match outcome {
                Ok(Some(timestamp)) => {
                    stamps.insert(number, timestamp);
                }
                Ok(None) => {}
                Err(error) => warn!("Failed to fetch timestamp of block {}: {}", number, error),
            }
        }

        for event in events.iter_mut() {
            if event.timestamp.is_none() {
                event.timestamp = stamps.get(&event.block_number).copied();
            }
        }
        for transaction in transactions.iter_mut() {
            if transaction.timestamp.is_none() {
                transaction.timestamp = stamps.get(&transaction.block_number).copied();
            }
        }
    }
}

fn validate_address(chain: Chain, address: &str) -> Result<()> {
    if chain.is_evm() {
        Address::from_str(address)
            .map_err(|_| FetchError::InvalidAddress(address.to_string()))?;
        return Ok(());
    }

    // Starknet: a felt, 0x-prefixed hex up to 64 digits.
    let body = address.strip_prefix("0x").unwrap_or("");
    if body.is_empty() || body.len() > 64 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(FetchError::InvalidAddress(address.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_evm_address() {
        assert!(validate_address(
            Chain::Ethereum,
            "0x742d35Cc6634C0532925a3b844Bc9e7595f6e842"
        )
        .is_ok());
        assert!(validate_address(Chain::Ethereum, "not_an_address").is_err());
        assert!(validate_address(Chain::Lisk, "0x1234").is_err());
    }

    #[test]
    fn test_validate_starknet_address() {
        assert!(validate_address(
            Chain::Starknet,
            "0x049d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7"
        )
        .is_ok());
        assert!(validate_address(Chain::Starknet, "0x1234").is_ok());
        assert!(validate_address(Chain::Starknet, "0x").is_err());
        assert!(validate_address(Chain::Starknet, "banana").is_err());
    }
}
