//! Host-facing boundary. The embedding page talks to the wallet only through
//! [`WalletBridge`]; every call ends with exactly one message posted to the host.

use std::rc::Rc;

use alloy::primitives::{Bytes, B256};
use serde_json::Value;

use wallet_bridge_adapters::{BridgeConfig, Eip1193Adapter, RelayAdapter};
use wallet_bridge_core::{
    BridgeCommand, BridgeError, ChainId, CommandOutcome, ConnectInfo, HostPort, MessageBridge,
    Operation, Orchestrator, OutboundMessage, PortError, SessionSnapshot, TransactionRequest,
};

pub type BridgeOrchestrator<H> = Orchestrator<Eip1193Adapter, RelayAdapter, H>;

pub struct WalletBridge<H: HostPort + 'static> {
    orchestrator: Rc<BridgeOrchestrator<H>>,
    relay_project_id: Option<String>,
}

impl<H: HostPort + 'static> Clone for WalletBridge<H> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: Rc::clone(&self.orchestrator),
            relay_project_id: self.relay_project_id.clone(),
        }
    }
}

impl<H: HostPort + 'static> WalletBridge<H> {
    /// Adapters are chosen from `config`: a configured runtime when present,
    /// otherwise the deterministic wallet or a disabled adapter per the runtime profile.
    pub fn new(config: &BridgeConfig, host: H) -> Self {
        Self::with_adapters(
            Eip1193Adapter::with_config(config),
            RelayAdapter::with_config(config),
            host,
            config,
        )
    }

    pub fn with_adapters(
        injected: Eip1193Adapter,
        relay: RelayAdapter,
        host: H,
        config: &BridgeConfig,
    ) -> Self {
        let bridge = MessageBridge::new(host, config.target_origin.clone())
            .with_type_prefix(config.message_type_prefix.clone());
        let orchestrator = Orchestrator::new(
            injected,
            relay,
            bridge,
            config.chain_registry(),
            config.orchestrator_config(),
        );
        tracing::debug!(
            origin = %config.target_origin,
            profile = ?config.runtime_profile,
            "wallet bridge initialized"
        );
        Self {
            orchestrator: Rc::new(orchestrator),
            relay_project_id: config.relay_project_id.clone(),
        }
    }

    pub fn orchestrator(&self) -> &BridgeOrchestrator<H> {
        &self.orchestrator
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.orchestrator.snapshot()
    }

    pub async fn connect(&self) -> Result<ConnectInfo, BridgeError> {
        self.orchestrator.connect().await
    }

    /// Falls back to the configured project id when `project_id` is `None` or blank.
    pub async fn connect_via_relay(
        &self,
        project_id: Option<&str>,
    ) -> Result<ConnectInfo, BridgeError> {
        let project_id = project_id
            .filter(|id| !id.trim().is_empty())
            .or(self.relay_project_id.as_deref())
            .unwrap_or_default();
        self.orchestrator.connect_via_relay(project_id).await
    }

    pub async fn disconnect(&self) {
        self.orchestrator.disconnect().await;
    }

    /// Accepts hex (`"0xa"`) or decimal (`"10"`) ids. Returns whether the wallet
    /// ended up on the requested chain.
    pub async fn switch_network(&self, chain_id: &str) -> bool {
        let target = match chain_id.parse::<ChainId>() {
            Ok(target) => target,
            Err(e) => {
                let err = BridgeError::from(e);
                tracing::warn!(error = %err, "rejected switch request");
                self.report(&err, None);
                return false;
            }
        };
        self.orchestrator.switch_network(target).await.is_ok()
    }

    pub async fn sign_message(&self, text: &str) -> Result<Bytes, BridgeError> {
        self.orchestrator.sign_message(text).await
    }

    /// `Ok(None)` when the wallet could not report a balance; the host has been
    /// told why. Fails with `NotConnected` outside a session.
    pub async fn get_balance(&self) -> Result<Option<String>, BridgeError> {
        self.orchestrator.get_balance().await
    }

    /// `request` is the host's JSON transaction object
    /// (`{chainId, to, data?, value?, gas?}`).
    pub async fn perform_action(&self, action: &str, request: &Value) -> Result<B256, BridgeError> {
        let request: TransactionRequest = match serde_json::from_value(request.clone()) {
            Ok(request) => request,
            Err(e) => {
                let err = BridgeError::Provider {
                    operation: Operation::PerformAction,
                    source: PortError::Validation(format!("invalid transaction request: {e}")),
                };
                self.report(&err, Some(action));
                return Err(err);
            }
        };
        self.orchestrator.perform_action(action, &request).await
    }

    pub fn get_last_message(&self) -> Option<OutboundMessage> {
        self.orchestrator.last_message()
    }

    /// Decodes and runs one `{"method": ...}` command from the host.
    pub async fn handle_command(&self, command: &Value) -> Result<CommandOutcome, BridgeError> {
        let command: BridgeCommand = match serde_json::from_value(command.clone()) {
            Ok(command) => command,
            Err(e) => {
                let err = BridgeError::MalformedCommand(e.to_string());
                self.report(&err, None);
                return Err(err);
            }
        };
        match command {
            BridgeCommand::ConnectViaRelay { project_id } => self
                .connect_via_relay(Some(&project_id))
                .await
                .map(CommandOutcome::Connected),
            other => self.orchestrator.execute(other).await,
        }
    }

    fn report(&self, err: &BridgeError, action: Option<&str>) {
        self.orchestrator
            .bridge()
            .emit(OutboundMessage::error(err, action));
    }
}
