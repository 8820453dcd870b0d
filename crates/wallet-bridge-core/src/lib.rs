pub mod calldata;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod listener;
pub mod message;
pub mod orchestrator;
pub mod ports;
pub mod registry;
pub mod session;
pub mod state_machine;

pub use dispatcher::{format_units_rounded, ActionReport, NetworkSwitch, TransactionDispatcher};
pub use domain::{
    ChainDescriptor, ChainId, ConnectInfo, Operation, ProviderEvent, ProviderEventKind,
    ProviderHandle, TransactionRequest,
};
pub use error::{BridgeError, ErrorCode};
pub use listener::EventListenerManager;
pub use message::{MessageBridge, OutboundMessage};
pub use orchestrator::{BridgeCommand, CommandOutcome, Orchestrator, OrchestratorConfig};
pub use ports::{EventHandler, HostPort, PortError, ProviderPort, RelayPort};
pub use registry::ChainRegistry;
pub use session::{SessionSnapshot, SessionUpdate, WalletSession};
pub use state_machine::{SessionState, StateTransition};
