pub mod chains;
pub mod config;
pub mod fetcher;
pub mod models;

pub use chains::{ChainProviderRegistry, ChainRpcClient, FailoverExecutor, ProviderDescriptor};
pub use config::{RpcConfig, Settings};
pub use fetcher::{EventListener, FetchOptions, InteractionFetcher, ListenerHandle};
pub use models::{Chain, FetchError, FetchResult, FetchSummary, Result};
