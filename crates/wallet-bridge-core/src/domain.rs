use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// EIP-155 chain identifier. Rendered in canonical `0x`-prefixed lower-case hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid chain id '{raw}': {reason}")]
pub struct ChainIdParseError {
    pub raw: String,
    pub reason: String,
}

impl ChainId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    pub fn to_hex(self) -> String {
        format!("{:#x}", self.0)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl FromStr for ChainId {
    type Err = ChainIdParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let err = |reason: String| ChainIdParseError {
            raw: raw.to_owned(),
            reason,
        };
        let trimmed = raw.trim();
        let parsed = if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            u64::from_str_radix(hex, 16).map_err(|e| err(format!("bad hex: {e}")))?
        } else {
            trimmed
                .parse::<u64>()
                .map_err(|e| err(format!("bad decimal: {e}")))?
        };
        if parsed == 0 {
            return Err(err("chain id must be non-zero".to_owned()));
        }
        Ok(Self(parsed))
    }
}

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(u64),
            Str(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Num(0) => Err(serde::de::Error::custom("chain id must be non-zero")),
            Raw::Num(n) => Ok(Self(n)),
            Raw::Str(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDescriptor {
    pub chain_id: ChainId,
    /// Short network key reported to the host (`"ethereum"`, `"base"`, ...).
    pub slug: String,
    pub name: String,
    pub native_currency: NativeCurrency,
    /// First entry is preferred, the rest are fallbacks.
    pub rpc_urls: Vec<String>,
    pub block_explorer_url: String,
}

impl ChainDescriptor {
    pub fn explorer_tx_url(&self, tx_hash: &str) -> Option<String> {
        if self.block_explorer_url.is_empty() {
            return None;
        }
        Some(format!(
            "{}/tx/{tx_hash}",
            self.block_explorer_url.trim_end_matches('/')
        ))
    }

    /// Parameter object for `wallet_addEthereumChain` (EIP-3085).
    pub fn add_chain_params(&self) -> Value {
        let explorers: Vec<&str> = if self.block_explorer_url.is_empty() {
            Vec::new()
        } else {
            vec![self.block_explorer_url.as_str()]
        };
        serde_json::json!({
            "chainId": self.chain_id,
            "chainName": self.name,
            "nativeCurrency": {
                "name": self.native_currency.name,
                "symbol": self.native_currency.symbol,
                "decimals": self.native_currency.decimals,
            },
            "rpcUrls": self.rpc_urls,
            "blockExplorerUrls": explorers,
        })
    }
}

/// A contract call or transfer the host wants submitted from the connected account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub chain_id: ChainId,
    pub to: Address,
    #[serde(default)]
    pub data: Bytes,
    #[serde(default)]
    pub value: U256,
    #[serde(default, alias = "gasLimit", skip_serializing_if = "Option::is_none")]
    pub gas: Option<U256>,
}

impl TransactionRequest {
    pub fn new(chain_id: ChainId, to: Address, data: Bytes) -> Self {
        Self {
            chain_id,
            to,
            data,
            value: U256::ZERO,
            gas: None,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_gas(mut self, gas: U256) -> Self {
        self.gas = Some(gas);
        self
    }

    /// `eth_sendTransaction` parameter object. Quantities are hex-encoded base units.
    pub fn to_provider_params(&self, from: Address) -> Value {
        let mut params = serde_json::json!({
            "from": from,
            "to": self.to,
            "data": self.data,
            "value": hex_quantity(self.value),
        });
        if let (Some(gas), Some(obj)) = (self.gas, params.as_object_mut()) {
            obj.insert("gas".to_owned(), Value::String(hex_quantity(gas)));
        }
        params
    }
}

pub fn hex_quantity(value: U256) -> String {
    format!("0x{value:x}")
}

/// Which provider the session is currently bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderHandle {
    Injected,
    Relay { topic: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderEventKind {
    AccountsChanged,
    ChainChanged,
}

impl ProviderEventKind {
    /// EIP-1193 event name.
    pub fn event_name(self) -> &'static str {
        match self {
            Self::AccountsChanged => "accountsChanged",
            Self::ChainChanged => "chainChanged",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(ChainId),
}

impl ProviderEvent {
    pub fn kind(&self) -> ProviderEventKind {
        match self {
            Self::AccountsChanged(_) => ProviderEventKind::AccountsChanged,
            Self::ChainChanged(_) => ProviderEventKind::ChainChanged,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Host-visible operations, used to classify failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Connect,
    Disconnect,
    SwitchNetwork,
    SignMessage,
    GetBalance,
    PerformAction,
}

/// Result of a successful connect, either injected or relay-paired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectInfo {
    pub account: Address,
    pub chain_id: ChainId,
    pub network: String,
}

/// What a relay pairing resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelaySession {
    pub topic: String,
    pub accounts: Vec<Address>,
    pub chain_id: ChainId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_id_parses_hex_and_decimal() {
        assert_eq!("0x1".parse::<ChainId>().expect("hex"), ChainId(1));
        assert_eq!("0XA4B1".parse::<ChainId>().expect("upper hex"), ChainId(42161));
        assert_eq!("8453".parse::<ChainId>().expect("decimal"), ChainId(8453));
        assert!("0x".parse::<ChainId>().is_err());
        assert!("0x0".parse::<ChainId>().is_err());
        assert!("mainnet".parse::<ChainId>().is_err());
    }

    #[test]
    fn chain_id_canonical_form_has_no_leading_zeros() {
        let id: ChainId = "0x0000a".parse().expect("padded");
        assert_eq!(id.to_string(), "0xa");
        assert_eq!(serde_json::to_value(id).expect("ser"), Value::from("0xa"));
        let from_num: ChainId = serde_json::from_value(Value::from(56)).expect("num");
        assert_eq!(from_num.to_hex(), "0x38");
    }

    #[test]
    fn transaction_request_defaults_value_and_encodes_hex() {
        let req: TransactionRequest = serde_json::from_value(serde_json::json!({
            "chainId": "0x1",
            "to": "0x00000000000000000000000000000000000000aa",
            "data": "0xdeadbeef",
            "gasLimit": "0x30d40"
        }))
        .expect("parse request");
        assert_eq!(req.value, U256::ZERO);
        let params = req.to_provider_params(Address::ZERO);
        assert_eq!(params["value"], "0x0");
        assert_eq!(params["gas"], "0x30d40");
        assert_eq!(params["data"], "0xdeadbeef");
    }
}
