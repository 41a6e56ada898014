pub mod client;
pub mod evm;
pub mod failover;
pub mod registry;
pub mod starknet;

pub use client::ChainRpcClient;
pub use evm::EvmRpcClient;
pub use failover::FailoverExecutor;
pub use registry::{ChainProviderRegistry, ProviderDescriptor};
pub use starknet::StarknetRpcClient;
