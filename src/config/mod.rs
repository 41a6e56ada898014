pub mod rpc;
pub mod settings;

pub use rpc::{RpcConfig, RpcEndpoint};
pub use settings::Settings;
