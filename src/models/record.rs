use chrono::{DateTime, Utc};
use ethers::types::U256;
use serde::{Deserialize, Serialize};

use super::Chain;

/// Inclusive block range, `from <= to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    pub from: u64,
    pub to: u64,
}

impl BlockRange {
    pub fn new(from: u64, to: u64) -> Self {
        Self { from, to }
    }

    pub fn block_count(&self) -> u64 {
        self.to - self.from + 1
    }
}

/// One log emitted by the target contract, normalized across chains.
///
/// For EVM chains `topics`/`data` are 0x-hex strings; for Starknet the
/// event keys land in `topics` and `data` holds the comma-joined felts.
/// `timestamp` is filled lazily and only when the caller asks for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub chain: Chain,
    pub address: String,
    pub transaction_hash: String,
    pub log_index: u64,
    pub block_number: u64,
    pub topics: Vec<String>,
    pub data: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl EventRecord {
    /// One transaction can emit several logs, so the hash alone is not
    /// unique.
    pub fn dedup_key(&self) -> (String, u64) {
        (self.transaction_hash.clone(), self.log_index)
    }
}

/// A transaction touching the target contract. Only materialized when
/// hydration is requested; unique by hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub chain: Chain,
    pub hash: String,
    pub block_number: u64,
    pub from: String,
    pub to: Option<String>,
    pub value: U256,
    pub gas_used: Option<u64>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Aggregate over one completed chunked fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchSummary {
    pub total_transactions: usize,
    pub total_events: usize,
    pub blocks_scanned: u64,
    pub total_ranges: usize,
    pub skipped_ranges: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    pub transactions: Vec<TransactionRecord>,
    pub events: Vec<EventRecord>,
    pub summary: FetchSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_range_count() {
        assert_eq!(BlockRange::new(0, 0).block_count(), 1);
        assert_eq!(BlockRange::new(100, 199).block_count(), 100);
    }

    #[test]
    fn test_dedup_key_distinguishes_logs_of_one_transaction() {
        let event = EventRecord {
            chain: Chain::Ethereum,
            address: "0xcontract".to_string(),
            transaction_hash: "0xabc".to_string(),
            log_index: 0,
            block_number: 1,
            topics: vec![],
            data: String::new(),
            timestamp: None,
        };
        let mut sibling = event.clone();
        sibling.log_index = 1;
        assert_ne!(event.dedup_key(), sibling.dedup_key());
    }
}
