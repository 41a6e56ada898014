use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{BlockRange, EventRecord, Result, TransactionRecord};

/// Low-level RPC surface of one endpoint. One instance is bound to one URL
/// for the lifetime of the process; failover across endpoints lives a layer
/// above this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainRpcClient: Send + Sync {
    /// Latest block number known to the endpoint.
    async fn block_number(&self) -> Result<u64>;

    /// Logs emitted by `address` within `range`, restricted to `topics`
    /// when non-empty. Always an explicit bounded range, never a
    /// server-side filter handle.
    async fn get_logs(
        &self,
        address: &str,
        range: BlockRange,
        topics: &[String],
    ) -> Result<Vec<EventRecord>>;

    /// Full transaction by hash; `None` when the node does not know it.
    async fn get_transaction(&self, hash: &str) -> Result<Option<TransactionRecord>>;

    /// Timestamp of a block; `None` for blocks the node cannot resolve.
    async fn block_timestamp(&self, number: u64) -> Result<Option<DateTime<Utc>>>;
}
