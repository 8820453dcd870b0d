use std::collections::BTreeMap;
use std::str::FromStr;

use wallet_bridge_core::dispatcher::{DEFAULT_BALANCE_PRECISION, MAX_BALANCE_PRECISION};
use wallet_bridge_core::{ChainId, ChainRegistry, OrchestratorConfig};

/// Per-chain RPC endpoint overrides read from the environment.
pub const RPC_OVERRIDE_VARS: [(&str, u64); 7] = [
    ("ETH_RPC_URL", 1),
    ("BSC_RPC_URL", 56),
    ("ARBITRUM_RPC_URL", 42161),
    ("OPTIMISM_RPC_URL", 10),
    ("BASE_RPC_URL", 8453),
    ("AVALANCHE_RPC_URL", 43114),
    ("NEON_RPC_URL", 245022934),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeProfile {
    /// Missing runtimes fall back to the deterministic in-memory wallet.
    #[default]
    Development,
    /// Missing runtimes disable the adapter; every call fails with a policy error.
    Production,
}

impl FromStr for RuntimeProfile {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Self::Development),
            "prod" | "production" => Ok(Self::Production),
            other => Err(format!("unknown runtime profile '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub runtime_profile: RuntimeProfile,
    /// JSON-RPC endpoint that forwards EIP-1193 requests to a wallet (native builds).
    pub eip1193_proxy_url: Option<String>,
    pub relay_bridge_url: Option<String>,
    pub relay_project_id: Option<String>,
    /// `postMessage` target. Native hosts receive every message regardless, so the
    /// default is `"*"`; the browser build replaces it with the page's own origin
    /// unless an explicit origin is configured.
    pub target_origin: String,
    pub message_type_prefix: String,
    pub balance_precision: u8,
    pub provider_timeout_ms: u64,
    pub rpc_overrides: BTreeMap<ChainId, String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            runtime_profile: RuntimeProfile::Development,
            eip1193_proxy_url: None,
            relay_bridge_url: None,
            relay_project_id: None,
            target_origin: "*".to_owned(),
            message_type_prefix: String::new(),
            balance_precision: DEFAULT_BALANCE_PRECISION,
            provider_timeout_ms: 30_000,
            rpc_overrides: BTreeMap::new(),
        }
    }
}

impl BridgeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Unset or blank keys keep their defaults;
    /// unparseable values are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };
        let mut cfg = Self::default();

        if let Some(raw) = get("WALLET_BRIDGE_PROFILE") {
            match raw.parse() {
                Ok(profile) => cfg.runtime_profile = profile,
                Err(e) => tracing::warn!(error = %e, "ignoring WALLET_BRIDGE_PROFILE"),
            }
        }
        cfg.eip1193_proxy_url = get("WALLET_BRIDGE_EIP1193_PROXY_URL");
        cfg.relay_bridge_url = get("WALLET_BRIDGE_RELAY_URL");
        cfg.relay_project_id = get("WALLET_BRIDGE_RELAY_PROJECT_ID");
        if let Some(origin) = get("WALLET_BRIDGE_TARGET_ORIGIN") {
            cfg.target_origin = origin;
        }
        if let Some(prefix) = get("WALLET_BRIDGE_MESSAGE_PREFIX") {
            cfg.message_type_prefix = prefix;
        }
        if let Some(raw) = get("WALLET_BRIDGE_BALANCE_PRECISION") {
            match raw.parse::<u8>() {
                Ok(p) if p <= MAX_BALANCE_PRECISION => cfg.balance_precision = p,
                _ => tracing::warn!(value = %raw, "ignoring WALLET_BRIDGE_BALANCE_PRECISION"),
            }
        }
        if let Some(raw) = get("WALLET_BRIDGE_PROVIDER_TIMEOUT_MS") {
            match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => cfg.provider_timeout_ms = ms,
                _ => tracing::warn!(value = %raw, "ignoring WALLET_BRIDGE_PROVIDER_TIMEOUT_MS"),
            }
        }
        for (key, chain) in RPC_OVERRIDE_VARS {
            if let Some(url) = get(key) {
                cfg.rpc_overrides.insert(ChainId(chain), url);
            }
        }
        cfg
    }

    pub fn strict_runtime_required(&self) -> bool {
        self.runtime_profile == RuntimeProfile::Production
    }

    pub fn chain_registry(&self) -> ChainRegistry {
        self.rpc_overrides
            .iter()
            .fold(ChainRegistry::builtin(), |registry, (chain, url)| {
                registry.with_rpc_override(*chain, url.clone())
            })
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            balance_precision: self.balance_precision,
            ..OrchestratorConfig::default()
        }
    }
}
