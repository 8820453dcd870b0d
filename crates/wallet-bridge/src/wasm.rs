//! JavaScript surface for the browser build. Every async method returns a
//! `Promise`; rejections carry the same `walletError` object posted to the host.

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use wallet_bridge_adapters::{BridgeConfig, ParentWindowHost, RuntimeProfile};
use wallet_bridge_core::{BridgeError, OutboundMessage};

use crate::bridge::WalletBridge;

#[wasm_bindgen(start)]
pub fn start() {
    // A host page may load the module twice; the first subscriber wins.
    let _ = tracing_wasm::try_set_as_global_default();
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct BridgeOptions {
    target_origin: Option<String>,
    message_prefix: Option<String>,
    relay_project_id: Option<String>,
    balance_precision: Option<u8>,
    production: bool,
}

impl BridgeOptions {
    /// Messages go to `targetOrigin` when given, otherwise to the page's own origin.
    fn into_config(self) -> Result<BridgeConfig, JsValue> {
        let mut cfg = BridgeConfig::default();
        if self.production {
            cfg.runtime_profile = RuntimeProfile::Production;
        }
        cfg.target_origin = match self.target_origin {
            Some(origin) if !origin.trim().is_empty() => origin,
            _ => page_origin()?,
        };
        if let Some(prefix) = self.message_prefix {
            cfg.message_type_prefix = prefix;
        }
        if let Some(precision) = self.balance_precision {
            cfg.balance_precision = precision;
        }
        cfg.relay_project_id = self.relay_project_id;
        Ok(cfg)
    }
}

fn page_origin() -> Result<String, JsValue> {
    let origin = web_sys::window()
        .ok_or_else(|| JsValue::from_str("no window to read the page origin from"))?
        .location()
        .origin()?;
    // Opaque origins (file://, sandboxed frames) cannot be addressed.
    if origin == "null" {
        return Err(JsValue::from_str(
            "page origin is opaque; pass targetOrigin explicitly",
        ));
    }
    Ok(origin)
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

fn from_js<T: for<'de> Deserialize<'de>>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn rejection(err: &BridgeError, action: Option<&str>) -> JsValue {
    to_js(&OutboundMessage::error(err, action)).unwrap_or_else(|e| e)
}

#[wasm_bindgen(js_name = WalletBridge)]
pub struct JsWalletBridge {
    inner: WalletBridge<ParentWindowHost>,
}

#[wasm_bindgen(js_class = WalletBridge)]
impl JsWalletBridge {
    /// `options`: `{ targetOrigin?, messagePrefix?, relayProjectId?, balancePrecision?, production? }`.
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<JsWalletBridge, JsValue> {
        let options: BridgeOptions = if options.is_undefined() || options.is_null() {
            BridgeOptions::default()
        } else {
            from_js(options)?
        };
        Ok(Self {
            inner: WalletBridge::new(&options.into_config()?, ParentWindowHost),
        })
    }

    pub fn connect(&self) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            match inner.connect().await {
                Ok(info) => to_js(&info),
                Err(e) => Err(rejection(&e, None)),
            }
        })
    }

    #[wasm_bindgen(js_name = connectViaRelay)]
    pub fn connect_via_relay(&self, project_id: Option<String>) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            match inner.connect_via_relay(project_id.as_deref()).await {
                Ok(info) => to_js(&info),
                Err(e) => Err(rejection(&e, None)),
            }
        })
    }

    pub fn disconnect(&self) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            inner.disconnect().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = switchNetwork)]
    pub fn switch_network(&self, chain_id: String) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move { Ok(JsValue::from_bool(inner.switch_network(&chain_id).await)) })
    }

    #[wasm_bindgen(js_name = signMessage)]
    pub fn sign_message(&self, text: String) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            match inner.sign_message(&text).await {
                Ok(signature) => to_js(&signature),
                Err(e) => Err(rejection(&e, None)),
            }
        })
    }

    #[wasm_bindgen(js_name = getBalance)]
    pub fn get_balance(&self) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            match inner.get_balance().await {
                Ok(balance) => to_js(&balance),
                Err(e) => Err(rejection(&e, None)),
            }
        })
    }

    #[wasm_bindgen(js_name = performAction)]
    pub fn perform_action(&self, action: String, request: JsValue) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let request: serde_json::Value = from_js(request)?;
            match inner.perform_action(&action, &request).await {
                Ok(tx_hash) => to_js(&tx_hash),
                Err(e) => Err(rejection(&e, Some(&action))),
            }
        })
    }

    #[wasm_bindgen(js_name = getLastMessage)]
    pub fn get_last_message(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.get_last_message())
    }

    /// Runs a `{ method, ...params }` command object, as posted by the host.
    #[wasm_bindgen(js_name = handleCommand)]
    pub fn handle_command(&self, command: JsValue) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let command: serde_json::Value = from_js(command)?;
            match inner.handle_command(&command).await {
                Ok(outcome) => to_js(&outcome),
                Err(e) => Err(rejection(&e, None)),
            }
        })
    }
}
