//! In-memory EIP-1193 wallet used when no real provider runtime is configured.
//!
//! It answers the JSON-RPC methods the bridge issues, remembers every call, and
//! can be scripted to fail or to hold a method until released.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use alloy::primitives::{address, keccak256, Address, Bytes, U256};
use serde_json::{json, Value};
use tokio::sync::Notify;

use wallet_bridge_core::domain::hex_quantity;
use wallet_bridge_core::ports::UNRECOGNIZED_CHAIN_CODE;
use wallet_bridge_core::{ChainId, PortError};

use crate::rpc::{self, METHOD_NOT_FOUND_CODE};

pub const DEFAULT_ACCOUNT: Address = address!("1000000000000000000000000000000000000001");

#[derive(Debug, Clone)]
pub struct DeterministicWallet {
    state: Arc<Mutex<WalletState>>,
}

#[derive(Debug)]
struct WalletState {
    accounts: Vec<Address>,
    chain_id: ChainId,
    known_chains: BTreeSet<ChainId>,
    balances: HashMap<Address, U256>,
    failures: HashMap<String, VecDeque<PortError>>,
    holds: HashMap<String, Arc<Notify>>,
    calls: Vec<String>,
    sent: Vec<Value>,
}

impl Default for DeterministicWallet {
    fn default() -> Self {
        Self::with_account(DEFAULT_ACCOUNT, ChainId(1))
    }
}

impl DeterministicWallet {
    /// One account holding 1.5 native units on `chain_id`, which is the only chain it knows.
    pub fn with_account(account: Address, chain_id: ChainId) -> Self {
        let mut balances = HashMap::new();
        balances.insert(account, U256::from(1_500_000_000_000_000_000u128));
        Self {
            state: Arc::new(Mutex::new(WalletState {
                accounts: vec![account],
                chain_id,
                known_chains: BTreeSet::from([chain_id]),
                balances,
                failures: HashMap::new(),
                holds: HashMap::new(),
                calls: Vec::new(),
                sent: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, WalletState>, PortError> {
        self.state
            .lock()
            .map_err(|e| PortError::Transport(format!("wallet lock poisoned: {e}")))
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) -> Result<(), PortError> {
        self.lock()?.accounts = accounts;
        Ok(())
    }

    pub fn set_chain(&self, chain_id: ChainId) -> Result<(), PortError> {
        let mut g = self.lock()?;
        g.known_chains.insert(chain_id);
        g.chain_id = chain_id;
        Ok(())
    }

    pub fn add_known_chain(&self, chain_id: ChainId) -> Result<(), PortError> {
        self.lock()?.known_chains.insert(chain_id);
        Ok(())
    }

    pub fn set_balance(&self, account: Address, balance: U256) -> Result<(), PortError> {
        self.lock()?.balances.insert(account, balance);
        Ok(())
    }

    pub fn current_chain(&self) -> Result<ChainId, PortError> {
        Ok(self.lock()?.chain_id)
    }

    pub fn accounts(&self) -> Result<Vec<Address>, PortError> {
        Ok(self.lock()?.accounts.clone())
    }

    /// The next call to `method` fails with `err`. Queued failures are consumed in order.
    pub fn fail_next(&self, method: &str, err: PortError) -> Result<(), PortError> {
        self.lock()?
            .failures
            .entry(method.to_owned())
            .or_default()
            .push_back(err);
        Ok(())
    }

    /// Parks the next call to `method` until the returned handle is notified.
    pub fn hold(&self, method: &str) -> Result<Arc<Notify>, PortError> {
        let notify = Arc::new(Notify::new());
        self.lock()?
            .holds
            .insert(method.to_owned(), Arc::clone(&notify));
        Ok(notify)
    }

    /// Method names in call order, including failed calls.
    pub fn calls(&self) -> Result<Vec<String>, PortError> {
        Ok(self.lock()?.calls.clone())
    }

    pub fn sent_transactions(&self) -> Result<Vec<Value>, PortError> {
        Ok(self.lock()?.sent.clone())
    }

    /// Pops a failure queued for a non-request call such as `on`.
    pub fn take_failure(&self, method: &str) -> Result<(), PortError> {
        match self.lock()?.failures.get_mut(method).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub async fn request(&self, method: &str, params: &Value) -> Result<Value, PortError> {
        let hold = {
            let mut g = self.lock()?;
            g.calls.push(method.to_owned());
            g.holds.remove(method)
        };
        if let Some(notify) = hold {
            notify.notified().await;
        }

        let mut g = self.lock()?;
        if let Some(err) = g.failures.get_mut(method).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        g.handle(method, params)
    }
}

impl WalletState {
    fn handle(&mut self, method: &str, params: &Value) -> Result<Value, PortError> {
        match method {
            "eth_requestAccounts" | "eth_accounts" => Ok(json!(self.accounts)),
            "eth_chainId" => Ok(json!(self.chain_id)),
            "eth_getBalance" => {
                let account = params
                    .get(0)
                    .map(rpc::parse_address)
                    .transpose()?
                    .ok_or_else(|| PortError::Validation("eth_getBalance: account missing".to_owned()))?;
                let balance = self.balances.get(&account).copied().unwrap_or_default();
                Ok(Value::String(hex_quantity(balance)))
            }
            "personal_sign" => {
                let message = params.get(0).and_then(Value::as_str).unwrap_or_default();
                let signer = params
                    .get(1)
                    .map(rpc::parse_address)
                    .transpose()?
                    .ok_or_else(|| PortError::Validation("personal_sign: signer missing".to_owned()))?;
                self.require_authorized(signer)?;
                let mut seed = Vec::with_capacity(message.len() + 20);
                seed.extend_from_slice(signer.as_slice());
                seed.extend_from_slice(message.as_bytes());
                let hash = keccak256(seed);
                let mut sig = Vec::with_capacity(65);
                sig.extend_from_slice(hash.as_slice());
                sig.extend_from_slice(hash.as_slice());
                sig.push(27);
                Ok(json!(Bytes::from(sig)))
            }
            "wallet_switchEthereumChain" => {
                let chain_id = params
                    .get(0)
                    .and_then(|p| p.get("chainId"))
                    .ok_or_else(|| PortError::Validation("switch: chainId missing".to_owned()))
                    .and_then(rpc::parse_chain_id)?;
                if !self.known_chains.contains(&chain_id) {
                    return Err(PortError::Rpc {
                        code: UNRECOGNIZED_CHAIN_CODE,
                        message: format!(
                            "Unrecognized chain ID \"{chain_id}\". Try adding the chain using wallet_addEthereumChain first."
                        ),
                    });
                }
                self.chain_id = chain_id;
                Ok(Value::Null)
            }
            "wallet_addEthereumChain" => {
                let chain_id = params
                    .get(0)
                    .and_then(|p| p.get("chainId"))
                    .ok_or_else(|| PortError::Validation("add chain: chainId missing".to_owned()))
                    .and_then(rpc::parse_chain_id)?;
                self.known_chains.insert(chain_id);
                Ok(Value::Null)
            }
            "eth_sendTransaction" => {
                let tx = params
                    .get(0)
                    .ok_or_else(|| PortError::Validation("transaction missing".to_owned()))?;
                let from = tx
                    .get("from")
                    .map(rpc::parse_address)
                    .transpose()?
                    .ok_or_else(|| PortError::Validation("transaction: from missing".to_owned()))?;
                self.require_authorized(from)?;
                let canonical = serde_json::to_vec(&json!([self.chain_id, tx]))
                    .map_err(|e| PortError::Validation(format!("tx serialization failed: {e}")))?;
                let hash = keccak256(canonical);
                self.sent.push(tx.clone());
                Ok(json!(hash))
            }
            other => Err(PortError::Rpc {
                code: METHOD_NOT_FOUND_CODE,
                message: format!("method {other} not supported"),
            }),
        }
    }

    fn require_authorized(&self, account: Address) -> Result<(), PortError> {
        if self.accounts.contains(&account) {
            Ok(())
        } else {
            Err(PortError::Rpc {
                code: wallet_bridge_core::ports::UNAUTHORIZED_CODE,
                message: format!("account {account} has not been authorized"),
            })
        }
    }
}
