//! Embeddable wallet bridge: an injected or relay-paired EIP-1193 wallet on one
//! side, a host page speaking a typed `postMessage` protocol on the other.

pub mod bridge;
#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use bridge::{BridgeOrchestrator, WalletBridge};
pub use wallet_bridge_adapters::{BridgeConfig, RecordingHost, RuntimeProfile};
pub use wallet_bridge_core::{
    BridgeCommand, BridgeError, ChainId, CommandOutcome, ConnectInfo, ErrorCode, OutboundMessage,
};
