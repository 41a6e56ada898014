use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    #[error("Invalid block range: {from} > {to}")]
    InvalidRange { from: u64, to: u64 },

    /// A provider's endpoint URL disagrees with the chain it was declared
    /// under. Absorbed by the failover loop (the provider is skipped); only
    /// its message can surface, inside `AllProvidersFailed`.
    #[error("Provider {provider} declared for {declared} but endpoint matches {detected}")]
    ChainMismatch {
        provider: String,
        declared: String,
        detected: String,
    },

    #[error("Operation timeout")]
    ProviderTimeout { chain: String, provider: String },

    #[error("RPC error on {chain} via {provider}: {message}")]
    ProviderCall {
        chain: String,
        provider: String,
        message: String,
    },

    #[error("All providers failed for {operation} on {chain}: {last_error}")]
    AllProvidersFailed {
        chain: String,
        operation: String,
        last_error: String,
    },

    #[error("All {total} block ranges failed for {address} on {chain}")]
    TotalRangeFailure {
        chain: String,
        address: String,
        failed: usize,
        total: usize,
    },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FetchError>;
