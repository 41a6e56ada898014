use serde::{Deserialize, Serialize};

/// Chains the fetcher can be pointed at. Lisk, Optimism and Base are
/// EVM-compatible L2s and share the EVM client; Starknet speaks its own
/// JSON-RPC surface.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Lisk,
    Starknet,
    Optimism,
    Base,
}

/// Keyword signatures used to re-derive a provider's chain from its endpoint
/// URL. Most specific names first: "nethermind" style hostnames contain
/// "eth", so bare "eth" is never matched on its own.
const URL_SIGNATURES: &[(Chain, &[&str])] = &[
    (Chain::Starknet, &["starknet", "juno"]),
    (Chain::Lisk, &["lisk"]),
    (Chain::Optimism, &["optimism", "1rpc.io/op"]),
    (Chain::Base, &["base.", "/base"]),
    (Chain::Ethereum, &["ethereum", "eth.", "/eth"]),
];

impl Chain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Lisk => "lisk",
            Chain::Starknet => "starknet",
            Chain::Optimism => "optimism",
            Chain::Base => "base",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ethereum" | "eth" => Some(Chain::Ethereum),
            "lisk" => Some(Chain::Lisk),
            "starknet" | "stark" => Some(Chain::Starknet),
            "optimism" | "op" => Some(Chain::Optimism),
            "base" => Some(Chain::Base),
            _ => None,
        }
    }

    pub fn all() -> &'static [Chain] {
        &[
            Chain::Ethereum,
            Chain::Lisk,
            Chain::Starknet,
            Chain::Optimism,
            Chain::Base,
        ]
    }

    pub fn is_evm(&self) -> bool {
        !matches!(self, Chain::Starknet)
    }

    /// Best-effort guess of the chain an endpoint actually serves, from
    /// keywords in its URL. Structural placement in the registry is the
    /// source of truth; this is a safety net against mislabeled entries,
    /// so `None` means "no opinion", not "unknown chain".
    pub fn detect_from_url(url: &str) -> Option<Chain> {
        let lowered = url.to_lowercase();
        for (chain, keywords) in URL_SIGNATURES {
            if keywords.iter().any(|keyword| lowered.contains(keyword)) {
                return Some(*chain);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_parsing() {
        assert_eq!(Chain::from_str("ethereum"), Some(Chain::Ethereum));
        assert_eq!(Chain::from_str("ETH"), Some(Chain::Ethereum));
        assert_eq!(Chain::from_str("lisk"), Some(Chain::Lisk));
        assert_eq!(Chain::from_str("starknet"), Some(Chain::Starknet));
        assert_eq!(Chain::from_str("op"), Some(Chain::Optimism));
        assert_eq!(Chain::from_str("base"), Some(Chain::Base));
        assert_eq!(Chain::from_str("invalid"), None);
    }

    #[test]
    fn test_detect_from_url() {
        assert_eq!(
            Chain::detect_from_url("https://rpc.api.lisk.com"),
            Some(Chain::Lisk)
        );
        assert_eq!(
            Chain::detect_from_url("https://starknet-mainnet.public.blastapi.io"),
            Some(Chain::Starknet)
        );
        assert_eq!(
            Chain::detect_from_url("https://free-rpc.nethermind.io/mainnet-juno"),
            Some(Chain::Starknet)
        );
        assert_eq!(
            Chain::detect_from_url("https://ethereum.publicnode.com"),
            Some(Chain::Ethereum)
        );
        assert_eq!(
            Chain::detect_from_url("https://eth.llamarpc.com"),
            Some(Chain::Ethereum)
        );
        assert_eq!(
            Chain::detect_from_url("https://mainnet.optimism.io"),
            Some(Chain::Optimism)
        );
    }

    #[test]
    fn test_detect_from_url_has_no_opinion_on_neutral_hosts() {
        assert_eq!(Chain::detect_from_url("http://localhost:8545"), None);
        assert_eq!(Chain::detect_from_url("https://rpc.example.com"), None);
    }
}
