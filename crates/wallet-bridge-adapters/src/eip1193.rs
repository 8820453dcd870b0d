use std::fmt;
#[cfg(target_arch = "wasm32")]
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, Bytes, B256, U256};
use serde_json::{json, Value};

use wallet_bridge_core::domain::SubscriptionId;
use wallet_bridge_core::{
    ChainId, EventHandler, PortError, ProviderEvent, ProviderEventKind, ProviderPort,
};

use crate::config::BridgeConfig;
use crate::rpc;
use crate::subscriptions::SubscriptionTable;
use crate::wallet::DeterministicWallet;

/// EIP-1193 provider: `window.ethereum` in the browser, a JSON-RPC proxy on
/// native builds, or the in-memory [`DeterministicWallet`] when neither is set up.
#[derive(Clone)]
pub struct Eip1193Adapter {
    mode: ProviderMode,
    wallet: DeterministicWallet,
    subscriptions: SubscriptionTable,
    #[cfg(target_arch = "wasm32")]
    hooks: Arc<Mutex<BrowserHooks>>,
}

#[derive(Debug, Clone)]
enum ProviderMode {
    Disabled(String),
    Deterministic,
    #[cfg(not(target_arch = "wasm32"))]
    Proxy(ProxyRuntime),
    #[cfg(target_arch = "wasm32")]
    Browser,
}

#[derive(Debug, Clone)]
#[cfg(not(target_arch = "wasm32"))]
struct ProxyRuntime {
    base_url: String,
    client: reqwest::Client,
}

#[cfg(target_arch = "wasm32")]
type BrowserHooks = std::collections::BTreeMap<
    SubscriptionId,
    (
        ProviderEventKind,
        wasm_bindgen::closure::Closure<dyn FnMut(wasm_bindgen::JsValue)>,
    ),
>;

impl fmt::Debug for Eip1193Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Eip1193Adapter")
            .field("mode", &self.mode)
            .field("subscriptions", &self.subscriptions)
            .finish()
    }
}

impl Default for Eip1193Adapter {
    fn default() -> Self {
        Self::with_config(&BridgeConfig::from_env())
    }
}

impl Eip1193Adapter {
    pub fn with_config(config: &BridgeConfig) -> Self {
        #[cfg(target_arch = "wasm32")]
        let mode = if browser_provider().is_ok() {
            ProviderMode::Browser
        } else if config.strict_runtime_required() {
            ProviderMode::Disabled(
                "EIP-1193 browser provider not found in production runtime profile".to_owned(),
            )
        } else {
            ProviderMode::Deterministic
        };

        #[cfg(not(target_arch = "wasm32"))]
        let mode = if let Some(ref base_url) = config.eip1193_proxy_url {
            let timeout = std::time::Duration::from_millis(config.provider_timeout_ms);
            match reqwest::Client::builder().timeout(timeout).build() {
                Ok(client) => ProviderMode::Proxy(ProxyRuntime {
                    base_url: base_url.clone(),
                    client,
                }),
                Err(e) if config.strict_runtime_required() => ProviderMode::Disabled(format!(
                    "failed to initialize EIP-1193 proxy client in production profile: {e}"
                )),
                Err(e) => {
                    tracing::warn!(error = %e, "EIP-1193 proxy client unavailable, using deterministic wallet");
                    ProviderMode::Deterministic
                }
            }
        } else if config.strict_runtime_required() {
            ProviderMode::Disabled(
                "EIP-1193 proxy URL not configured in production runtime profile".to_owned(),
            )
        } else {
            ProviderMode::Deterministic
        };

        tracing::debug!(mode = ?mode, "EIP-1193 adapter initialized");
        Self::from_mode(mode, DeterministicWallet::default())
    }

    /// In-memory wallet, independent of the environment.
    pub fn deterministic() -> Self {
        Self::with_wallet(DeterministicWallet::default())
    }

    pub fn with_wallet(wallet: DeterministicWallet) -> Self {
        Self::from_mode(ProviderMode::Deterministic, wallet)
    }

    /// Reports no provider at all, as a page without an injected wallet does.
    pub fn missing() -> Self {
        Self::from_mode(
            ProviderMode::Disabled("no EIP-1193 provider injected".to_owned()),
            DeterministicWallet::default(),
        )
    }

    fn from_mode(mode: ProviderMode, wallet: DeterministicWallet) -> Self {
        Self {
            mode,
            wallet,
            subscriptions: SubscriptionTable::default(),
            #[cfg(target_arch = "wasm32")]
            hooks: Arc::new(Mutex::new(BrowserHooks::new())),
        }
    }

    pub fn is_deterministic(&self) -> bool {
        matches!(self.mode, ProviderMode::Deterministic)
    }

    /// Backing state of the deterministic runtime.
    pub fn wallet(&self) -> &DeterministicWallet {
        &self.wallet
    }

    pub fn listener_count(&self, kind: ProviderEventKind) -> usize {
        self.subscriptions.count(kind)
    }

    fn check_mode(&self) -> Result<(), PortError> {
        if let ProviderMode::Disabled(reason) = &self.mode {
            return Err(PortError::Policy(reason.clone()));
        }
        Ok(())
    }

    /// Simulates the wallet switching accounts, then notifies subscribers.
    pub fn debug_inject_accounts_changed(&self, accounts: Vec<Address>) -> Result<usize, PortError> {
        self.wallet.set_accounts(accounts.clone())?;
        self.subscriptions
            .dispatch(ProviderEvent::AccountsChanged(accounts))
    }

    /// Simulates the user changing network in the wallet UI, then notifies subscribers.
    pub fn debug_inject_chain_changed(&self, chain_id: ChainId) -> Result<usize, PortError> {
        self.wallet.set_chain(chain_id)?;
        self.subscriptions
            .dispatch(ProviderEvent::ChainChanged(chain_id))
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, PortError> {
        match &self.mode {
            ProviderMode::Disabled(reason) => Err(PortError::Policy(reason.clone())),
            ProviderMode::Deterministic => self.wallet.request(method, &params).await,
            #[cfg(not(target_arch = "wasm32"))]
            ProviderMode::Proxy(proxy) => proxy.call(method, params).await,
            #[cfg(target_arch = "wasm32")]
            ProviderMode::Browser => browser_request(method, params).await,
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl ProxyRuntime {
    async fn call(&self, method: &str, params: Value) -> Result<Value, PortError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response = self
            .client
            .post(&self.base_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PortError::Transport(format!("eip1193 proxy request failed: {e}")))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| PortError::Transport(format!("eip1193 proxy json decode failed: {e}")))?;
        if !status.is_success() && body.get("error").is_none() {
            return Err(PortError::Transport(format!(
                "eip1193 proxy status {status}: {body}"
            )));
        }
        tracing::debug!(method, %status, "eip1193 proxy call");
        rpc::decode_response(body)
    }
}

impl ProviderPort for Eip1193Adapter {
    async fn is_available(&self) -> Result<(), PortError> {
        self.check_mode()?;
        #[cfg(target_arch = "wasm32")]
        if matches!(self.mode, ProviderMode::Browser) {
            browser_provider()?;
        }
        Ok(())
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
        // Real wallets announce the new chain themselves; the in-memory one has to.
        if self.is_deterministic() {
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
        #[cfg(target_arch = "wasm32")]
        if matches!(self.mode, ProviderMode::Browser) {
            return self.browser_on(kind, handler);
        }
        if matches!(self.mode, ProviderMode::Deterministic) {
            self.wallet.take_failure("on")?;
        }
        self.subscriptions.insert(kind, handler)
    }

    fn remove_listener(&self, id: SubscriptionId) -> Result<(), PortError> {
        let kind = self.subscriptions.remove(id)?;
        #[cfg(target_arch = "wasm32")]
        if matches!(self.mode, ProviderMode::Browser) {
            return self.browser_remove(id, kind);
        }
        tracing::trace!(?id, event = kind.event_name(), "listener removed");
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
impl Eip1193Adapter {
    fn browser_on(
        &self,
        kind: ProviderEventKind,
        handler: EventHandler,
    ) -> Result<SubscriptionId, PortError> {
        use wasm_bindgen::{closure::Closure, JsCast, JsValue};

        let provider = browser_provider()?;
        let on_fn = provider_fn(&provider, &["on", "addListener"])?;

        let forward = Arc::clone(&handler);
        let closure = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
            match decode_js_event(kind, value) {
                Ok(event) => forward(event),
                Err(e) => tracing::warn!(error = %e, event = kind.event_name(), "undecodable provider event"),
            }
        });
        on_fn
            .call2(
                &provider,
                &JsValue::from_str(kind.event_name()),
                closure.as_ref().unchecked_ref(),
            )
            .map_err(|e| {
                PortError::Transport(format!("register {} failed: {e:?}", kind.event_name()))
            })?;

        let id = self.subscriptions.insert(kind, handler)?;
        self.hooks
            .lock()
            .map_err(|e| PortError::Transport(format!("provider hooks lock poisoned: {e}")))?
            .insert(id, (kind, closure));
        Ok(id)
    }

    fn browser_remove(&self, id: SubscriptionId, kind: ProviderEventKind) -> Result<(), PortError> {
        use wasm_bindgen::{JsCast, JsValue};

        let hook = self
            .hooks
            .lock()
            .map_err(|e| PortError::Transport(format!("provider hooks lock poisoned: {e}")))?
            .remove(&id);
        let Some((_, closure)) = hook else {
            return Ok(());
        };
        let provider = browser_provider()?;
        let remove_fn = provider_fn(&provider, &["removeListener", "off"])?;
        remove_fn
            .call2(
                &provider,
                &JsValue::from_str(kind.event_name()),
                closure.as_ref().unchecked_ref(),
            )
            .map_err(|e| {
                PortError::Transport(format!("remove {} failed: {e:?}", kind.event_name()))
            })?;
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
async fn browser_request(method: &str, params: Value) -> Result<Value, PortError> {
    use serde::Serialize;
    use wasm_bindgen::JsCast;

    let provider = browser_provider()?;
    let request_fn = provider_fn(&provider, &["request"])?;
    let request = json!({ "method": method, "params": params });
    let request_js = request
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| PortError::Transport(format!("failed to encode wasm request: {e}")))?;
    let promise = request_fn
        .call1(&provider, &request_js)
        .map_err(|e| PortError::Transport(format!("provider request dispatch failed: {e:?}")))?
        .dyn_into::<js_sys::Promise>()
        .map_err(|_| PortError::Transport("provider request did not return Promise".to_owned()))?;
    let result_js = wasm_bindgen_futures::JsFuture::from(promise)
        .await
        .map_err(js_error)?;
    if result_js.is_undefined() || result_js.is_null() {
        return Ok(Value::Null);
    }
    serde_wasm_bindgen::from_value(result_js)
        .map_err(|e| PortError::Transport(format!("failed to decode wasm response: {e}")))
}

/// Provider rejections are `{code, message}` objects; anything else is transport noise.
#[cfg(target_arch = "wasm32")]
fn js_error(err: wasm_bindgen::JsValue) -> PortError {
    match serde_wasm_bindgen::from_value::<Value>(err.clone()) {
        Ok(value) if value.get("code").is_some() => rpc::error_from_value(&value),
        _ => {
            let message = get_prop(&err, "message")
                .ok()
                .and_then(|m| m.as_string())
                .unwrap_or_else(|| format!("{err:?}"));
            match get_prop(&err, "code").ok().and_then(|c| c.as_f64()) {
                Some(code) => PortError::Rpc {
                    code: code as i64,
                    message,
                },
                None => PortError::Transport(format!("provider request rejected: {message}")),
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn decode_js_event(
    kind: ProviderEventKind,
    value: wasm_bindgen::JsValue,
) -> Result<ProviderEvent, PortError> {
    let value: Value = serde_wasm_bindgen::from_value(value)
        .map_err(|e| PortError::Transport(format!("failed to decode provider event: {e}")))?;
    Ok(match kind {
        ProviderEventKind::AccountsChanged => {
            ProviderEvent::AccountsChanged(rpc::parse_accounts(&value)?)
        }
        ProviderEventKind::ChainChanged => ProviderEvent::ChainChanged(rpc::parse_chain_id(&value)?),
    })
}

#[cfg(target_arch = "wasm32")]
fn browser_provider() -> Result<wasm_bindgen::JsValue, PortError> {
    let window =
        web_sys::window().ok_or_else(|| PortError::Transport("missing window".to_owned()))?;
    let provider = get_prop(&window.into(), "ethereum")?;
    if provider.is_null() || provider.is_undefined() {
        return Err(PortError::NotFound("window.ethereum missing".to_owned()));
    }
    Ok(provider)
}

#[cfg(target_arch = "wasm32")]
fn provider_fn(
    provider: &wasm_bindgen::JsValue,
    names: &[&'static str],
) -> Result<js_sys::Function, PortError> {
    use wasm_bindgen::JsCast;

    names
        .iter()
        .find_map(|name| {
            get_prop(provider, name)
                .ok()
                .and_then(|v| v.dyn_into::<js_sys::Function>().ok())
        })
        .ok_or_else(|| {
            PortError::NotImplemented("window.ethereum is missing a required method")
        })
}

#[cfg(target_arch = "wasm32")]
fn get_prop(target: &wasm_bindgen::JsValue, key: &str) -> Result<wasm_bindgen::JsValue, PortError> {
    js_sys::Reflect::get(target, &wasm_bindgen::JsValue::from_str(key))
        .map_err(|e| PortError::Transport(format!("read provider property {key} failed: {e:?}")))
}
