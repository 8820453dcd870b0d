use std::sync::{Arc, Mutex, MutexGuard};

use alloy::primitives::{address, Address, Bytes, B256, U256};
use serde_json::{json, Value};

use wallet_bridge_core::domain::{RelaySession, SubscriptionId};
use wallet_bridge_core::{
    ChainId, EventHandler, PortError, ProviderEvent, ProviderEventKind, ProviderPort, RelayPort,
};

use crate::config::BridgeConfig;
use crate::rpc;
use crate::subscriptions::SubscriptionTable;
use crate::wallet::DeterministicWallet;

/// Account the in-memory relay wallet approves pairings with.
pub const RELAY_ACCOUNT: Address = address!("2000000000000000000000000000000000000002");

/// Pairing-based wallet connection. Requests are forwarded to the paired wallet
/// through an HTTP relay bridge, or answered by an in-memory wallet in development.
#[derive(Debug, Clone)]
pub struct RelayAdapter {
    mode: RelayMode,
    inner: Arc<Mutex<RelayState>>,
    wallet: DeterministicWallet,
    subscriptions: SubscriptionTable,
}

#[derive(Debug, Clone)]
enum RelayMode {
    Disabled(String),
    Deterministic,
    #[cfg(not(target_arch = "wasm32"))]
    Bridge(BridgeRuntime),
}

#[derive(Debug, Clone)]
#[cfg(not(target_arch = "wasm32"))]
struct BridgeRuntime {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Default)]
struct RelayState {
    session: Option<RelaySession>,
    pairings: u64,
}

impl Default for RelayAdapter {
    fn default() -> Self {
        Self::with_config(&BridgeConfig::from_env())
    }
}

impl RelayAdapter {
    pub fn with_config(config: &BridgeConfig) -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        let mode = if let Some(ref base_url) = config.relay_bridge_url {
            let timeout = std::time::Duration::from_millis(config.provider_timeout_ms);
            match reqwest::Client::builder().timeout(timeout).build() {
                Ok(client) => RelayMode::Bridge(BridgeRuntime {
                    base_url: base_url.trim_end_matches('/').to_owned(),
                    client,
                }),
                Err(e) => RelayMode::Disabled(format!("failed to initialize relay client: {e}")),
            }
        } else if config.strict_runtime_required() {
            RelayMode::Disabled("relay bridge URL not configured in production runtime profile".to_owned())
        } else {
            RelayMode::Deterministic
        };

        #[cfg(target_arch = "wasm32")]
        let mode = if config.strict_runtime_required() {
            RelayMode::Disabled("relay bridge is not available in the browser runtime".to_owned())
        } else {
            RelayMode::Deterministic
        };

        Self::from_mode(mode)
    }

    pub fn deterministic() -> Self {
        Self::from_mode(RelayMode::Deterministic)
    }

    pub fn disabled(reason: impl Into<String>) -> Self {
        Self::from_mode(RelayMode::Disabled(reason.into()))
    }

    fn from_mode(mode: RelayMode) -> Self {
        Self {
            mode,
            inner: Arc::new(Mutex::new(RelayState::default())),
            wallet: DeterministicWallet::with_account(RELAY_ACCOUNT, ChainId(1)),
            subscriptions: SubscriptionTable::default(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, RelayState>, PortError> {
        self.inner
            .lock()
            .map_err(|e| PortError::Transport(format!("relay lock poisoned: {e}")))
    }

    fn check_mode(&self) -> Result<(), PortError> {
        if let RelayMode::Disabled(reason) = &self.mode {
            return Err(PortError::Policy(reason.clone()));
        }
        Ok(())
    }

    /// Backing state of the deterministic runtime.
    pub fn wallet(&self) -> &DeterministicWallet {
        &self.wallet
    }

    pub fn active_session(&self) -> Option<RelaySession> {
        self.lock().ok().and_then(|g| g.session.clone())
    }

    pub fn listener_count(&self, kind: ProviderEventKind) -> usize {
        self.subscriptions.count(kind)
    }

    pub fn debug_inject_accounts_changed(&self, accounts: Vec<Address>) -> Result<usize, PortError> {
        self.wallet.set_accounts(accounts.clone())?;
        self.subscriptions
            .dispatch(ProviderEvent::AccountsChanged(accounts))
    }

    fn topic(&self) -> Result<String, PortError> {
        self.lock()?
            .session
            .as_ref()
            .map(|s| s.topic.clone())
            .ok_or_else(|| PortError::NotFound("no relay session; pair a wallet first".to_owned()))
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, PortError> {
        self.check_mode()?;
        let topic = self.topic()?;
        match &self.mode {
            RelayMode::Disabled(reason) => Err(PortError::Policy(reason.clone())),
            RelayMode::Deterministic => self.wallet.request(method, &params).await,
            #[cfg(not(target_arch = "wasm32"))]
            RelayMode::Bridge(bridge) => {
                let body = bridge
                    .post(
                        &format!("/session/{topic}/request"),
                        &json!({ "method": method, "params": params }),
                    )
                    .await?;
                rpc::decode_response(body)
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl BridgeRuntime {
    async fn post(&self, path: &str, body: &Value) -> Result<Value, PortError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| PortError::Transport(format!("relay request failed: {e}")))?;
        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| PortError::Transport(format!("relay json decode failed: {e}")))?;
        if !status.is_success() {
            if let Some(err) = payload.get("error").filter(|e| e.is_object()) {
                return Err(rpc::error_from_value(err));
            }
            return Err(PortError::Transport(format!(
                "relay status {status}: {payload}"
            )));
        }
        tracing::debug!(path, %status, "relay bridge call");
        Ok(payload)
    }
}

impl ProviderPort for RelayAdapter {
    async fn is_available(&self) -> Result<(), PortError> {
        self.check_mode()?;
        self.topic().map(|_| ())
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, PortError> {
        let result = self.request("eth_requestAccounts", json!([])).await?;
        rpc::parse_accounts(&result)
    }

    async fn chain_id(&self) -> Result<ChainId, PortError> {
        let result = self.request("eth_chainId", json!([])).await?;
        rpc::parse_chain_id(&result)
    }

    async fn get_balance(&self, account: Address) -> Result<U256, PortError> {
        let result = self
            .request("eth_getBalance", json!([account, "latest"]))
            .await?;
        rpc::parse_quantity(&result)
    }

    async fn personal_sign(&self, message: &[u8], account: Address) -> Result<Bytes, PortError> {
        let payload_hex = format!("0x{}", alloy::hex::encode(message));
        let result = self
            .request("personal_sign", json!([payload_hex, account]))
            .await?;
        rpc::parse_bytes(&result)
    }

    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), PortError> {
        self.request("wallet_switchEthereumChain", json!([{ "chainId": chain_id }]))
            .await?;
        if matches!(self.mode, RelayMode::Deterministic) {
            self.subscriptions
                .dispatch(ProviderEvent::ChainChanged(chain_id))?;
        }
        Ok(())
    }

    async fn add_chain(&self, params: &Value) -> Result<(), PortError> {
        self.request("wallet_addEthereumChain", json!([params]))
            .await?;
        Ok(())
    }

    async fn send_transaction(&self, tx: &Value) -> Result<B256, PortError> {
        let result = self.request("eth_sendTransaction", json!([tx])).await?;
        rpc::parse_tx_hash(&result)
    }

    fn on(
        &self,
        kind: ProviderEventKind,
        handler: EventHandler,
    ) -> Result<SubscriptionId, PortError> {
        self.check_mode()?;
        self.subscriptions.insert(kind, handler)
    }

    fn remove_listener(&self, id: SubscriptionId) -> Result<(), PortError> {
        self.subscriptions.remove(id).map(|_| ())
    }
}

impl RelayPort for RelayAdapter {
    async fn pair(&self, project_id: &str, chains: &[ChainId]) -> Result<RelaySession, PortError> {
        self.check_mode()?;
        if project_id.trim().is_empty() {
            return Err(PortError::Validation("relay project id is required".to_owned()));
        }

        let session = match &self.mode {
            RelayMode::Disabled(reason) => return Err(PortError::Policy(reason.clone())),
            RelayMode::Deterministic => {
                let accounts = self.wallet.accounts()?;
                let current = self.wallet.current_chain()?;
                let chain_id = if chains.is_empty() || chains.contains(&current) {
                    current
                } else {
                    chains[0]
                };
                for chain in chains {
                    self.wallet.add_known_chain(*chain)?;
                }
                self.wallet.set_chain(chain_id)?;
                let n = {
                    let mut g = self.lock()?;
                    g.pairings = g.pairings.saturating_add(1);
                    g.pairings
                };
                RelaySession {
                    topic: format!("relay-topic-{n}"),
                    accounts,
                    chain_id,
                }
            }
            #[cfg(not(target_arch = "wasm32"))]
            RelayMode::Bridge(bridge) => {
                let body = bridge
                    .post(
                        "/pair",
                        &json!({ "projectId": project_id, "chains": chains }),
                    )
                    .await?;
                serde_json::from_value(body)
                    .map_err(|e| PortError::Validation(format!("invalid pairing response: {e}")))?
            }
        };

        tracing::info!(topic = %session.topic, accounts = session.accounts.len(), "relay paired");
        self.lock()?.session = Some(session.clone());
        Ok(session)
    }

    async fn close(&self) -> Result<(), PortError> {
        let Some(session) = self.lock()?.session.take() else {
            return Ok(());
        };
        #[cfg(not(target_arch = "wasm32"))]
        if let RelayMode::Bridge(bridge) = &self.mode {
            bridge
                .post(&format!("/session/{}/close", session.topic), &json!({}))
                .await?;
        }
        tracing::debug!(topic = %session.topic, "relay session closed");
        Ok(())
    }
}
