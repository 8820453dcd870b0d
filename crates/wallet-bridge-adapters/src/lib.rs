pub mod config;
pub mod eip1193;
pub mod host;
pub mod relay;
pub mod rpc;
pub mod subscriptions;
pub mod wallet;

pub use config::{BridgeConfig, RuntimeProfile};
pub use eip1193::Eip1193Adapter;
#[cfg(target_arch = "wasm32")]
pub use host::ParentWindowHost;
pub use host::{PostedMessage, RecordingHost};
pub use relay::RelayAdapter;
pub use wallet::DeterministicWallet;
