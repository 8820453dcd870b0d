//! Outbound wire protocol to the host page.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use alloy::primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{ChainId, ConnectInfo};
use crate::error::{BridgeError, ErrorCode};
use crate::ports::HostPort;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundMessage {
    #[serde(rename_all = "camelCase")]
    WalletConnected {
        account: Address,
        chain_id: ChainId,
        network: String,
    },
    #[serde(rename_all = "camelCase")]
    WalletError {
        error: String,
        code: ErrorCode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        action: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider_code: Option<i64>,
    },
    #[serde(rename_all = "camelCase")]
    AccountsChanged {
        account: Option<Address>,
        chain_id: Option<ChainId>,
        network: String,
    },
    #[serde(rename_all = "camelCase")]
    ChainChanged { chain_id: ChainId, network: String },
    #[serde(rename_all = "camelCase")]
    NetworkSwitched { chain_id: ChainId, network: String },
    Disconnected,
    Signature { signature: Bytes },
    Balance { balance: String },
    #[serde(rename_all = "camelCase")]
    TxSuccess { action: String, tx_hash: B256 },
}

impl OutboundMessage {
    pub fn error(err: &BridgeError, action: Option<&str>) -> Self {
        Self::WalletError {
            error: err.to_string(),
            code: err.code(),
            action: action.map(str::to_owned),
            provider_code: err.provider_code(),
        }
    }

    pub fn connected(info: &ConnectInfo) -> Self {
        Self::WalletConnected {
            account: info.account,
            chain_id: info.chain_id,
            network: info.network.clone(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::WalletConnected { .. } => "walletConnected",
            Self::WalletError { .. } => "walletError",
            Self::AccountsChanged { .. } => "accountsChanged",
            Self::ChainChanged { .. } => "chainChanged",
            Self::NetworkSwitched { .. } => "networkSwitched",
            Self::Disconnected => "disconnected",
            Self::Signature { .. } => "signature",
            Self::Balance { .. } => "balance",
            Self::TxSuccess { .. } => "txSuccess",
        }
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::WalletError { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Delivers every emission to the host and keeps the most recent one readable.
///
/// The last-message slot is a best-effort snapshot, not a queue: a host that polls
/// less often than the bridge emits will miss intermediate messages.
pub struct MessageBridge<H> {
    host: Arc<H>,
    target_origin: String,
    type_prefix: String,
    last: Arc<Mutex<Option<OutboundMessage>>>,
    emitted: Arc<AtomicU64>,
}

impl<H> Clone for MessageBridge<H> {
    fn clone(&self) -> Self {
        Self {
            host: Arc::clone(&self.host),
            target_origin: self.target_origin.clone(),
            type_prefix: self.type_prefix.clone(),
            last: Arc::clone(&self.last),
            emitted: Arc::clone(&self.emitted),
        }
    }
}

impl<H: HostPort> MessageBridge<H> {
    pub fn new(host: H, target_origin: impl Into<String>) -> Self {
        Self {
            host: Arc::new(host),
            target_origin: target_origin.into(),
            type_prefix: String::new(),
            last: Arc::new(Mutex::new(None)),
            emitted: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Namespaces the wire `type`, e.g. `"streamlit:"` gives `"streamlit:walletConnected"`.
    pub fn with_type_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.type_prefix = prefix.into();
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn target_origin(&self) -> &str {
        &self.target_origin
    }

    pub fn emit(&self, message: OutboundMessage) {
        let wire = self.to_wire(&message);
        {
            let mut g = self.last.lock().unwrap_or_else(PoisonError::into_inner);
            *g = Some(message);
        }
        self.emitted.fetch_add(1, Ordering::SeqCst);

        let Some(wire) = wire else {
            return;
        };
        if let Err(e) = self.host.post_message(&self.target_origin, &wire) {
            tracing::warn!(error = %e, origin = %self.target_origin, "host message delivery failed");
        }
    }

    pub fn last_message(&self) -> Option<OutboundMessage> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn emitted_count(&self) -> u64 {
        self.emitted.load(Ordering::SeqCst)
    }

    pub fn to_wire(&self, message: &OutboundMessage) -> Option<Value> {
        let mut wire = match serde_json::to_value(message) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, kind = message.type_name(), "message serialization failed");
                return None;
            }
        };
        if !self.type_prefix.is_empty() {
            if let Some(obj) = wire.as_object_mut() {
                obj.insert(
                    "type".to_owned(),
                    Value::String(format!("{}{}", self.type_prefix, message.type_name())),
                );
            }
        }
        Some(wire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Operation;
    use crate::ports::PortError;

    struct NullHost;

    impl HostPort for NullHost {
        fn post_message(&self, _target_origin: &str, _message: &Value) -> Result<(), PortError> {
            Err(PortError::Transport("no host".to_owned()))
        }
    }

    #[test]
    fn wire_shape_matches_host_protocol() {
        let bridge = MessageBridge::new(NullHost, "https://host.example");
        let wire = bridge
            .to_wire(&OutboundMessage::ChainChanged {
                chain_id: ChainId(10),
                network: "optimism".to_owned(),
            })
            .expect("wire");
        assert_eq!(
            wire,
            serde_json::json!({"type": "chainChanged", "chainId": "0xa", "network": "optimism"})
        );

        let wire = bridge
            .to_wire(&OutboundMessage::Disconnected)
            .expect("wire");
        assert_eq!(wire, serde_json::json!({"type": "disconnected"}));
    }

    #[test]
    fn error_payload_carries_code_action_and_provider_code() {
        let err = BridgeError::from_port(
            Operation::PerformAction,
            PortError::Rpc {
                code: 4001,
                message: "User denied transaction signature".to_owned(),
            },
        );
        let bridge =
            MessageBridge::new(NullHost, "https://host.example").with_type_prefix("streamlit:");
        let wire = bridge
            .to_wire(&OutboundMessage::error(&err, Some("supply")))
            .expect("wire");
        assert_eq!(wire["type"], "streamlit:walletError");
        assert_eq!(wire["code"], "TX_FAILED");
        assert_eq!(wire["action"], "supply");
        assert_eq!(wire["providerCode"], 4001);
    }

    #[test]
    fn failed_delivery_still_updates_last_message() {
        let bridge = MessageBridge::new(NullHost, "https://host.example");
        bridge.emit(OutboundMessage::Balance {
            balance: "1.5000".to_owned(),
        });
        bridge.emit(OutboundMessage::Disconnected);
        assert_eq!(bridge.last_message(), Some(OutboundMessage::Disconnected));
        assert_eq!(bridge.emitted_count(), 2);
    }
}
