use std::sync::Arc;

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dispatcher::{NetworkSwitch, TransactionDispatcher, DEFAULT_BALANCE_PRECISION};
use crate::domain::{
    ChainId, ConnectInfo, Operation, ProviderEventKind, ProviderHandle, SubscriptionId,
    TransactionRequest,
};
use crate::error::BridgeError;
use crate::listener::EventListenerManager;
use crate::message::{MessageBridge, OutboundMessage};
use crate::ports::{EventHandler, HostPort, PortError, ProviderPort, RelayPort};
use crate::registry::ChainRegistry;
use crate::session::{SessionSnapshot, SessionUpdate, WalletSession};

/// Host requests, as they arrive over the command channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum BridgeCommand {
    Connect,
    #[serde(rename_all = "camelCase")]
    ConnectViaRelay {
        project_id: String,
    },
    Disconnect,
    #[serde(rename_all = "camelCase")]
    SwitchNetwork {
        chain_id: ChainId,
    },
    SignMessage {
        text: String,
    },
    GetBalance,
    PerformAction {
        action: String,
        request: TransactionRequest,
    },
    GetLastMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum CommandOutcome {
    Connected(ConnectInfo),
    Disconnected,
    Switched(bool),
    Signature(Bytes),
    Balance(Option<String>),
    TxHash(B256),
    LastMessage(Option<OutboundMessage>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub balance_precision: u8,
    /// Chains requested from the wallet when pairing over the relay. Empty means
    /// every registered chain.
    pub relay_chains: Vec<ChainId>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            balance_precision: DEFAULT_BALANCE_PRECISION,
            relay_chains: Vec::new(),
        }
    }
}

/// Owns the session and every component around it. All host-visible effects
/// leave through [`Orchestrator::execute`] or the typed methods it wraps; each
/// computes its result first and emits exactly one message for it afterwards.
pub struct Orchestrator<P, R, H> {
    injected: P,
    relay: R,
    session: WalletSession,
    registry: Arc<ChainRegistry>,
    listeners: EventListenerManager<H>,
    dispatcher: TransactionDispatcher,
    bridge: MessageBridge<H>,
    relay_chains: Vec<ChainId>,
}

impl<P, R, H> Orchestrator<P, R, H>
where
    P: ProviderPort,
    R: RelayPort,
    H: HostPort + 'static,
{
    pub fn new(
        injected: P,
        relay: R,
        bridge: MessageBridge<H>,
        registry: ChainRegistry,
        config: OrchestratorConfig,
    ) -> Self {
        let session = WalletSession::new();
        let registry = Arc::new(registry);
        let listeners =
            EventListenerManager::new(session.clone(), bridge.clone(), Arc::clone(&registry));
        let dispatcher = TransactionDispatcher::new(session.clone(), Arc::clone(&registry))
            .with_balance_precision(config.balance_precision);
        Self {
            injected,
            relay,
            session,
            registry,
            listeners,
            dispatcher,
            bridge,
            relay_chains: config.relay_chains,
        }
    }

    pub fn injected(&self) -> &P {
        &self.injected
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn bridge(&self) -> &MessageBridge<H> {
        &self.bridge
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    pub fn session(&self) -> &WalletSession {
        &self.session
    }

    pub fn listeners_attached(&self) -> bool {
        self.listeners.is_attached()
    }

    pub async fn execute(&self, command: BridgeCommand) -> Result<CommandOutcome, BridgeError> {
        match command {
            BridgeCommand::Connect => self.connect().await.map(CommandOutcome::Connected),
            BridgeCommand::ConnectViaRelay { project_id } => self
                .connect_via_relay(&project_id)
                .await
                .map(CommandOutcome::Connected),
            BridgeCommand::Disconnect => {
                self.disconnect().await;
                Ok(CommandOutcome::Disconnected)
            }
            BridgeCommand::SwitchNetwork { chain_id } => self
                .switch_network(chain_id)
                .await
                .map(|_| CommandOutcome::Switched(true)),
            BridgeCommand::SignMessage { text } => self
                .sign_message(&text)
                .await
                .map(CommandOutcome::Signature),
            BridgeCommand::GetBalance => self.get_balance().await.map(CommandOutcome::Balance),
            BridgeCommand::PerformAction { action, request } => self
                .perform_action(&action, &request)
                .await
                .map(CommandOutcome::TxHash),
            BridgeCommand::GetLastMessage => Ok(CommandOutcome::LastMessage(self.last_message())),
        }
    }

    pub async fn connect(&self) -> Result<ConnectInfo, BridgeError> {
        let result = self.connect_injected().await;
        self.finish(result, None, OutboundMessage::connected)
    }

    pub async fn connect_via_relay(&self, project_id: &str) -> Result<ConnectInfo, BridgeError> {
        let result = self.connect_relay(project_id).await;
        self.finish(result, None, OutboundMessage::connected)
    }

    /// Always succeeds. Detaches listeners, closes a relay pairing and clears the session.
    pub async fn disconnect(&self) {
        let bound = self.session.snapshot().provider;
        self.release_provider(bound).await;
        match self.session.apply(SessionUpdate::Disconnect) {
            Ok(_) => tracing::info!("wallet disconnected"),
            Err(e) => tracing::warn!(error = %e, "disconnect transition rejected"),
        }
        self.bridge.emit(OutboundMessage::Disconnected);
    }

    pub async fn switch_network(&self, chain_id: ChainId) -> Result<NetworkSwitch, BridgeError> {
        let provider = self.active_provider();
        let result = self.dispatcher.switch_network(&provider, chain_id).await;
        self.finish(result, None, network_switched)
    }

    pub async fn sign_message(&self, text: &str) -> Result<Bytes, BridgeError> {
        let provider = self.active_provider();
        let result = self.dispatcher.sign_message(&provider, text).await;
        self.finish(result, None, |signature| OutboundMessage::Signature {
            signature: signature.clone(),
        })
    }

    /// Provider failures yield `Ok(None)` and a `BALANCE_FAILED` error message.
    pub async fn get_balance(&self) -> Result<Option<String>, BridgeError> {
        let provider = self.active_provider();
        match self.dispatcher.get_balance(&provider).await {
            Ok(balance) => {
                self.bridge.emit(OutboundMessage::Balance {
                    balance: balance.clone(),
                });
                Ok(Some(balance))
            }
            Err(e @ BridgeError::NotConnected { .. }) => {
                self.bridge.emit(OutboundMessage::error(&e, None));
                Err(e)
            }
            Err(e) => {
                tracing::warn!(error = %e, "balance query failed");
                self.bridge.emit(OutboundMessage::error(&e, None));
                Ok(None)
            }
        }
    }

    pub async fn perform_action(
        &self,
        action: &str,
        request: &TransactionRequest,
    ) -> Result<B256, BridgeError> {
        let provider = self.active_provider();
        let report = self
            .dispatcher
            .perform_action(&provider, action, request)
            .await;
        if let Some(switch) = &report.switched {
            self.bridge.emit(network_switched(switch));
        }
        self.finish(report.result, Some(action), |tx_hash| {
            OutboundMessage::TxSuccess {
                action: report.action.clone(),
                tx_hash: *tx_hash,
            }
        })
    }

    pub fn last_message(&self) -> Option<OutboundMessage> {
        self.bridge.last_message()
    }

    fn finish<T>(
        &self,
        result: Result<T, BridgeError>,
        action: Option<&str>,
        success: impl FnOnce(&T) -> OutboundMessage,
    ) -> Result<T, BridgeError> {
        let message = match &result {
            Ok(value) => success(value),
            Err(e) => OutboundMessage::error(e, action),
        };
        self.bridge.emit(message);
        result
    }

    async fn connect_injected(&self) -> Result<ConnectInfo, BridgeError> {
        let op = Operation::Connect;
        let bound = self.session.snapshot().provider;
        self.session.apply(SessionUpdate::BeginConnect)?;
        self.release_provider(bound).await;

        let provider = ActiveProvider::<P, R>::Injected(&self.injected);
        let probed = async {
            provider.is_available().await?;
            let accounts = provider.request_accounts().await?;
            let chain_id = provider.chain_id().await?;
            Ok::<_, PortError>((accounts, chain_id))
        }
        .await;

        let (accounts, chain_id) = match probed {
            Ok(found) => found,
            Err(e) => return Err(self.abort_connect(BridgeError::from_port(op, e))),
        };
        self.complete_connect(&provider, ProviderHandle::Injected, &accounts, chain_id)
    }

    async fn connect_relay(&self, project_id: &str) -> Result<ConnectInfo, BridgeError> {
        let op = Operation::Connect;
        if project_id.trim().is_empty() {
            return Err(BridgeError::Provider {
                operation: op,
                source: PortError::Validation("relay project id is required".to_owned()),
            });
        }
        let bound = self.session.snapshot().provider;
        self.session.apply(SessionUpdate::BeginConnect)?;
        self.release_provider(bound).await;

        let chains = if self.relay_chains.is_empty() {
            self.registry.chain_ids()
        } else {
            self.relay_chains.clone()
        };
        let paired = match self.relay.pair(project_id, &chains).await {
            Ok(paired) => paired,
            Err(e) => return Err(self.abort_connect(BridgeError::from_port(op, e))),
        };
        tracing::debug!(topic = %paired.topic, "relay pairing approved");

        let provider = ActiveProvider::<P, R>::Relay(&self.relay);
        let result = self.complete_connect(
            &provider,
            ProviderHandle::Relay {
                topic: paired.topic.clone(),
            },
            &paired.accounts,
            paired.chain_id,
        );
        // Close a pairing the session did not adopt.
        let adopted = matches!(
            self.session.snapshot().provider,
            Some(ProviderHandle::Relay { .. })
        );
        if result.is_err() && !adopted {
            self.close_relay(&paired.topic).await;
        }
        result
    }

    fn complete_connect(
        &self,
        provider: &ActiveProvider<'_, P, R>,
        handle: ProviderHandle,
        accounts: &[Address],
        chain_id: ChainId,
    ) -> Result<ConnectInfo, BridgeError> {
        let op = Operation::Connect;
        let Some(account) = accounts.first().copied() else {
            return Err(self.abort_connect(BridgeError::Provider {
                operation: op,
                source: PortError::Validation("wallet returned no accounts".to_owned()),
            }));
        };

        self.session.apply(SessionUpdate::Connected {
            account,
            chain_id,
            provider: handle.clone(),
        })?;

        if let Err(e) = self.listeners.attach(provider, handle) {
            if let Err(reset) = self.session.apply(SessionUpdate::Disconnect) {
                tracing::debug!(error = %reset, "listener failure after session moved on");
            }
            return Err(BridgeError::from_port(op, e));
        }

        let network = self.registry.network_slug(chain_id);
        tracing::info!(%account, %chain_id, %network, "wallet connected");
        Ok(ConnectInfo {
            account,
            chain_id,
            network,
        })
    }

    fn abort_connect(&self, err: BridgeError) -> BridgeError {
        tracing::warn!(error = %err, "wallet connect failed");
        if let Err(e) = self.session.apply(SessionUpdate::ConnectFailed) {
            tracing::debug!(error = %e, "connect failure after session moved on");
        }
        err
    }

    /// Detaches listeners from the previously bound provider and closes its
    /// relay pairing, if any.
    async fn release_provider(&self, bound: Option<ProviderHandle>) {
        let listened = self.listeners.bound_provider();
        self.detach_listeners();
        let relay_topic = [bound, listened].into_iter().flatten().find_map(|h| match h {
            ProviderHandle::Relay { topic } => Some(topic),
            ProviderHandle::Injected => None,
        });
        if let Some(topic) = relay_topic {
            self.close_relay(&topic).await;
        }
    }

    async fn close_relay(&self, topic: &str) {
        if let Err(e) = self.relay.close().await {
            tracing::warn!(error = %e, %topic, "relay close failed");
        }
    }

    fn detach_listeners(&self) {
        if let Some(handle) = self.listeners.bound_provider() {
            let provider = self.provider_for(Some(&handle));
            self.listeners.detach(&provider);
        }
    }

    fn active_provider(&self) -> ActiveProvider<'_, P, R> {
        self.provider_for(self.session.snapshot().provider.as_ref())
    }

    fn provider_for(&self, handle: Option<&ProviderHandle>) -> ActiveProvider<'_, P, R> {
        match handle {
            Some(ProviderHandle::Relay { .. }) => ActiveProvider::Relay(&self.relay),
            Some(ProviderHandle::Injected) | None => ActiveProvider::Injected(&self.injected),
        }
    }
}

fn network_switched(switch: &NetworkSwitch) -> OutboundMessage {
    OutboundMessage::NetworkSwitched {
        chain_id: switch.chain_id,
        network: switch.network.clone(),
    }
}

/// The provider the session is bound to, either injected or relay-paired.
enum ActiveProvider<'a, P, R> {
    Injected(&'a P),
    Relay(&'a R),
}

impl<P: ProviderPort, R: ProviderPort> ProviderPort for ActiveProvider<'_, P, R> {
    async fn is_available(&self) -> Result<(), PortError> {
        match self {
            Self::Injected(p) => p.is_available().await,
            Self::Relay(r) => r.is_available().await,
        }
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, PortError> {
        match self {
            Self::Injected(p) => p.request_accounts().await,
            Self::Relay(r) => r.request_accounts().await,
        }
    }

    async fn chain_id(&self) -> Result<ChainId, PortError> {
        match self {
            Self::Injected(p) => p.chain_id().await,
            Self::Relay(r) => r.chain_id().await,
        }
    }

    async fn get_balance(&self, account: Address) -> Result<U256, PortError> {
        match self {
            Self::Injected(p) => p.get_balance(account).await,
            Self::Relay(r) => r.get_balance(account).await,
        }
    }

    async fn personal_sign(&self, message: &[u8], account: Address) -> Result<Bytes, PortError> {
        match self {
            Self::Injected(p) => p.personal_sign(message, account).await,
            Self::Relay(r) => r.personal_sign(message, account).await,
        }
    }

    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), PortError> {
        match self {
            Self::Injected(p) => p.switch_chain(chain_id).await,
            Self::Relay(r) => r.switch_chain(chain_id).await,
        }
    }

    async fn add_chain(&self, params: &Value) -> Result<(), PortError> {
        match self {
            Self::Injected(p) => p.add_chain(params).await,
            Self::Relay(r) => r.add_chain(params).await,
        }
    }

    async fn send_transaction(&self, tx: &Value) -> Result<B256, PortError> {
        match self {
            Self::Injected(p) => p.send_transaction(tx).await,
            Self::Relay(r) => r.send_transaction(tx).await,
        }
    }

    fn on(
        &self,
        kind: ProviderEventKind,
        handler: EventHandler,
    ) -> Result<SubscriptionId, PortError> {
        match self {
            Self::Injected(p) => p.on(kind, handler),
            Self::Relay(r) => r.on(kind, handler),
        }
    }

    fn remove_listener(&self, id: SubscriptionId) -> Result<(), PortError> {
        match self {
            Self::Injected(p) => p.remove_listener(id),
            Self::Relay(r) => r.remove_listener(id),
        }
    }
}
