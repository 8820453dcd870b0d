use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ChainId, ChainIdParseError, Operation};
use crate::ports::PortError;

/// Codes surfaced to the host in `walletError.code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    UnknownError,
    ConnectFailed,
    SwitchFailed,
    InvalidChainId,
    SignFailed,
    BalanceFailed,
    TxFailed,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnknownError => "UNKNOWN_ERROR",
            Self::ConnectFailed => "CONNECT_FAILED",
            Self::SwitchFailed => "SWITCH_FAILED",
            Self::InvalidChainId => "INVALID_CHAIN_ID",
            Self::SignFailed => "SIGN_FAILED",
            Self::BalanceFailed => "BALANCE_FAILED",
            Self::TxFailed => "TX_FAILED",
        }
    }
}

impl Operation {
    pub fn failure_code(self) -> ErrorCode {
        match self {
            Self::Connect => ErrorCode::ConnectFailed,
            Self::Disconnect => ErrorCode::UnknownError,
            Self::SwitchNetwork => ErrorCode::SwitchFailed,
            Self::SignMessage => ErrorCode::SignFailed,
            Self::GetBalance => ErrorCode::BalanceFailed,
            Self::PerformAction => ErrorCode::TxFailed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("wallet not connected")]
    NotConnected { operation: Operation },
    #[error("unsupported chain: {chain_id}")]
    UnsupportedChain { chain_id: ChainId },
    #[error("invalid chain id: {0}")]
    InvalidChainId(String),
    #[error("wallet unavailable: {source}")]
    Unavailable {
        operation: Operation,
        #[source]
        source: PortError,
    },
    #[error("user rejected request: {source}")]
    Rejected {
        operation: Operation,
        #[source]
        source: PortError,
    },
    #[error("{operation:?} failed: {source}")]
    Provider {
        operation: Operation,
        #[source]
        source: PortError,
    },
    #[error("{operation:?} superseded: {reason}")]
    Superseded {
        operation: Operation,
        reason: String,
    },
    #[error("illegal session transition: {0}")]
    IllegalTransition(String),
    #[error("malformed command: {0}")]
    MalformedCommand(String),
}

impl From<ChainIdParseError> for BridgeError {
    fn from(err: ChainIdParseError) -> Self {
        Self::InvalidChainId(err.to_string())
    }
}

impl BridgeError {
    /// Classifies a provider failure for `operation`.
    pub fn from_port(operation: Operation, source: PortError) -> Self {
        if source.is_unavailable() {
            Self::Unavailable { operation, source }
        } else if source.is_user_rejection() {
            Self::Rejected { operation, source }
        } else {
            Self::Provider { operation, source }
        }
    }

    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::NotConnected { operation }
            | Self::Unavailable { operation, .. }
            | Self::Rejected { operation, .. }
            | Self::Provider { operation, .. }
            | Self::Superseded { operation, .. } => Some(*operation),
            Self::UnsupportedChain { .. } | Self::InvalidChainId(_) => {
                Some(Operation::SwitchNetwork)
            }
            Self::IllegalTransition(_) | Self::MalformedCommand(_) => None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedChain { .. } | Self::InvalidChainId(_) => ErrorCode::InvalidChainId,
            Self::IllegalTransition(_) | Self::MalformedCommand(_) => ErrorCode::UnknownError,
            other => other
                .operation()
                .map(Operation::failure_code)
                .unwrap_or(ErrorCode::UnknownError),
        }
    }

    /// Code the wallet itself attached to the failure, if any.
    pub fn provider_code(&self) -> Option<i64> {
        match self {
            Self::Unavailable { source, .. }
            | Self::Rejected { source, .. }
            | Self::Provider { source, .. } => source.rpc_code(),
            _ => None,
        }
    }
}
