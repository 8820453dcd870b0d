use std::sync::Arc;

use alloy::primitives::{Address, Bytes, B256, U256};
use serde_json::Value;
use thiserror::Error;

use crate::domain::{ChainId, ProviderEvent, ProviderEventKind, RelaySession, SubscriptionId};

/// EIP-1193 "user rejected the request".
pub const USER_REJECTED_CODE: i64 = 4001;
/// EIP-1193 "unauthorized".
pub const UNAUTHORIZED_CODE: i64 = 4100;
/// MetaMask "unrecognized chain id", returned by `wallet_switchEthereumChain`.
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("port not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("policy error: {0}")]
    Policy(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("provider error {code}: {message}")]
    Rpc { code: i64, message: String },
}

impl PortError {
    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            Self::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The wallet capability itself is missing (no injected provider, no relay runtime).
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::NotImplemented(_) | Self::Policy(_))
    }

    pub fn is_user_rejection(&self) -> bool {
        matches!(
            self.rpc_code(),
            Some(USER_REJECTED_CODE) | Some(UNAUTHORIZED_CODE)
        )
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        match self {
            Self::Rpc { code, message } => {
                *code == UNRECOGNIZED_CHAIN_CODE
                    || message.to_ascii_lowercase().contains("unrecognized chain")
            }
            _ => false,
        }
    }
}

pub type EventHandler = Arc<dyn Fn(ProviderEvent)>;

/// An EIP-1193 provider. Every async method is one provider round-trip and the
/// only place a bridge operation suspends.
#[allow(async_fn_in_trait)]
pub trait ProviderPort {
    async fn is_available(&self) -> Result<(), PortError>;
    async fn request_accounts(&self) -> Result<Vec<Address>, PortError>;
    async fn chain_id(&self) -> Result<ChainId, PortError>;
    async fn get_balance(&self, account: Address) -> Result<U256, PortError>;
    async fn personal_sign(&self, message: &[u8], account: Address) -> Result<Bytes, PortError>;
    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), PortError>;
    async fn add_chain(&self, params: &Value) -> Result<(), PortError>;
    async fn send_transaction(&self, tx: &Value) -> Result<B256, PortError>;

    fn on(&self, kind: ProviderEventKind, handler: EventHandler)
        -> Result<SubscriptionId, PortError>;
    fn remove_listener(&self, id: SubscriptionId) -> Result<(), PortError>;
}

/// Pairing-based provider used when no wallet is injected into the page.
#[allow(async_fn_in_trait)]
pub trait RelayPort: ProviderPort {
    async fn pair(&self, project_id: &str, chains: &[ChainId]) -> Result<RelaySession, PortError>;
    async fn close(&self) -> Result<(), PortError>;
}

/// Cross-context channel to the embedding host page.
pub trait HostPort {
    fn post_message(&self, target_origin: &str, message: &Value) -> Result<(), PortError>;
}
