//! Static table of the EVM networks the bridge knows how to describe, add and switch to.

use std::collections::BTreeMap;

use crate::domain::{ChainDescriptor, ChainId, NativeCurrency};
use crate::error::BridgeError;

pub const UNKNOWN_NETWORK: &str = "unknown";

#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: BTreeMap<ChainId, ChainDescriptor>,
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ChainRegistry {
    pub fn empty() -> Self {
        Self {
            chains: BTreeMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for desc in builtin_descriptors() {
            registry = registry.with_descriptor(desc);
        }
        registry
    }

    pub fn with_descriptor(mut self, descriptor: ChainDescriptor) -> Self {
        self.chains.insert(descriptor.chain_id, descriptor);
        self
    }

    /// Puts `url` ahead of the built-in endpoints for `chain_id`. Unknown chains are left alone.
    pub fn with_rpc_override(mut self, chain_id: ChainId, url: impl Into<String>) -> Self {
        let url = url.into();
        if let Some(desc) = self.chains.get_mut(&chain_id) {
            desc.rpc_urls.retain(|existing| existing != &url);
            desc.rpc_urls.insert(0, url);
        }
        self
    }

    pub fn contains(&self, chain_id: ChainId) -> bool {
        self.chains.contains_key(&chain_id)
    }

    /// Display lookup. Never fails: unregistered ids resolve to the unknown sentinel.
    pub fn describe(&self, chain_id: ChainId) -> ChainDescriptor {
        self.chains
            .get(&chain_id)
            .cloned()
            .unwrap_or_else(|| unknown_descriptor(chain_id))
    }

    pub fn network_slug(&self, chain_id: ChainId) -> String {
        self.chains
            .get(&chain_id)
            .map(|d| d.slug.clone())
            .unwrap_or_else(|| UNKNOWN_NETWORK.to_owned())
    }

    /// Descriptor for a provider-facing add/switch. Unregistered ids are an error here.
    pub fn add_config(&self, chain_id: ChainId) -> Result<ChainDescriptor, BridgeError> {
        self.chains
            .get(&chain_id)
            .cloned()
            .ok_or(BridgeError::UnsupportedChain { chain_id })
    }

    pub fn chain_ids(&self) -> Vec<ChainId> {
        self.chains.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainDescriptor> {
        self.chains.values()
    }
}

fn unknown_descriptor(chain_id: ChainId) -> ChainDescriptor {
    ChainDescriptor {
        chain_id,
        slug: UNKNOWN_NETWORK.to_owned(),
        name: "Unknown Network".to_owned(),
        native_currency: NativeCurrency {
            name: "Ether".to_owned(),
            symbol: "ETH".to_owned(),
            decimals: 18,
        },
        rpc_urls: Vec::new(),
        block_explorer_url: String::new(),
    }
}

fn chain(
    id: u64,
    slug: &str,
    name: &str,
    currency: (&str, &str),
    rpc_urls: &[&str],
    explorer: &str,
) -> ChainDescriptor {
    ChainDescriptor {
        chain_id: ChainId(id),
        slug: slug.to_owned(),
        name: name.to_owned(),
        native_currency: NativeCurrency {
            name: currency.0.to_owned(),
            symbol: currency.1.to_owned(),
            decimals: 18,
        },
        rpc_urls: rpc_urls.iter().map(|u| (*u).to_owned()).collect(),
        block_explorer_url: explorer.to_owned(),
    }
}

fn builtin_descriptors() -> Vec<ChainDescriptor> {
    vec![
        chain(
            1,
            "ethereum",
            "Ethereum Mainnet",
            ("Ether", "ETH"),
            &["https://eth.llamarpc.com", "https://rpc.ankr.com/eth"],
            "https://etherscan.io",
        ),
        chain(
            56,
            "bsc",
            "BNB Smart Chain",
            ("BNB", "BNB"),
            &[
                "https://bsc-dataseed.binance.org",
                "https://bsc-dataseed1.defibit.io",
            ],
            "https://bscscan.com",
        ),
        chain(
            42161,
            "arbitrum",
            "Arbitrum One",
            ("Ether", "ETH"),
            &["https://arb1.arbitrum.io/rpc", "https://rpc.ankr.com/arbitrum"],
            "https://arbiscan.io",
        ),
        chain(
            10,
            "optimism",
            "OP Mainnet",
            ("Ether", "ETH"),
            &["https://mainnet.optimism.io", "https://rpc.ankr.com/optimism"],
            "https://optimistic.etherscan.io",
        ),
        chain(
            8453,
            "base",
            "Base",
            ("Ether", "ETH"),
            &["https://mainnet.base.org", "https://base.llamarpc.com"],
            "https://basescan.org",
        ),
        chain(
            43114,
            "avalanche",
            "Avalanche C-Chain",
            ("Avalanche", "AVAX"),
            &[
                "https://api.avax.network/ext/bc/C/rpc",
                "https://rpc.ankr.com/avalanche",
            ],
            "https://snowtrace.io",
        ),
        chain(
            245022934,
            "neon",
            "Neon EVM Mainnet",
            ("Neon", "NEON"),
            &[
                "https://neon-proxy-mainnet.solana.p2p.org",
                "https://mainnet.neonlabs.org",
            ],
            "https://neonscan.org",
        ),
        chain(
            137,
            "polygon",
            "Polygon PoS",
            ("POL", "POL"),
            &["https://polygon-rpc.com", "https://rpc.ankr.com/polygon"],
            "https://polygonscan.com",
        ),
        chain(
            250,
            "fantom",
            "Fantom Opera",
            ("Fantom", "FTM"),
            &["https://rpc.ftm.tools", "https://rpc.ankr.com/fantom"],
            "https://ftmscan.com",
        ),
        chain(
            1313161554,
            "aurora",
            "Aurora Mainnet",
            ("Ether", "ETH"),
            &["https://mainnet.aurora.dev"],
            "https://explorer.aurora.dev",
        ),
        chain(
            25,
            "cronos",
            "Cronos Mainnet",
            ("Cronos", "CRO"),
            &["https://evm.cronos.org"],
            "https://cronoscan.com",
        ),
    ]
}
