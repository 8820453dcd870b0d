//! Balance, signing, network switching and transaction submission against the
//! active provider. Operations return plain results; emitting the matching host
//! message is left to the caller.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, B256, U256};

use crate::domain::{ChainId, Operation, TransactionRequest};
use crate::error::BridgeError;
use crate::ports::ProviderPort;
use crate::registry::ChainRegistry;
use crate::session::{SessionSnapshot, SessionUpdate, WalletSession};

pub const DEFAULT_BALANCE_PRECISION: u8 = 4;
/// Native currencies carry 18 decimals; more display places add nothing.
pub const MAX_BALANCE_PRECISION: u8 = 18;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSwitch {
    pub chain_id: ChainId,
    pub network: String,
    pub previous: Option<ChainId>,
    /// The wallet did not know the chain and it was added before the retried switch.
    pub added: bool,
}

/// Outcome of `perform_action`. A switch that happened before a failed send is
/// still reported so the host learns about the new chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub action: String,
    pub switched: Option<NetworkSwitch>,
    pub result: Result<B256, BridgeError>,
}

#[derive(Debug, Clone)]
pub struct TransactionDispatcher {
    session: WalletSession,
    registry: Arc<ChainRegistry>,
    balance_precision: u8,
}

impl TransactionDispatcher {
    pub fn new(session: WalletSession, registry: Arc<ChainRegistry>) -> Self {
        Self {
            session,
            registry,
            balance_precision: DEFAULT_BALANCE_PRECISION,
        }
    }

    /// Precision above [`MAX_BALANCE_PRECISION`] is clamped.
    pub fn with_balance_precision(mut self, precision: u8) -> Self {
        if precision > MAX_BALANCE_PRECISION {
            tracing::warn!(precision, max = MAX_BALANCE_PRECISION, "clamping balance precision");
        }
        self.balance_precision = precision.min(MAX_BALANCE_PRECISION);
        self
    }

    fn require_connected(&self, operation: Operation) -> Result<Connected, BridgeError> {
        let snapshot = self.session.snapshot();
        match (snapshot.is_connected(), snapshot.account, snapshot.chain_id) {
            (true, Some(account), Some(chain_id)) => Ok(Connected {
                account,
                chain_id,
                snapshot,
            }),
            _ => Err(BridgeError::NotConnected { operation }),
        }
    }

    pub async fn get_balance<P: ProviderPort>(&self, provider: &P) -> Result<String, BridgeError> {
        let op = Operation::GetBalance;
        let current = self.require_connected(op)?;
        let raw = provider
            .get_balance(current.account)
            .await
            .map_err(|e| BridgeError::from_port(op, e))?;
        let decimals = self
            .registry
            .describe(current.chain_id)
            .native_currency
            .decimals;
        Ok(format_units_rounded(raw, decimals, self.balance_precision))
    }

    pub async fn sign_message<P: ProviderPort>(
        &self,
        provider: &P,
        text: &str,
    ) -> Result<Bytes, BridgeError> {
        let op = Operation::SignMessage;
        let current = self.require_connected(op)?;
        provider
            .personal_sign(text.as_bytes(), current.account)
            .await
            .map_err(|e| BridgeError::from_port(op, e))
    }

    pub async fn switch_network<P: ProviderPort>(
        &self,
        provider: &P,
        target: ChainId,
    ) -> Result<NetworkSwitch, BridgeError> {
        let op = Operation::SwitchNetwork;
        let current = self.require_connected(op)?;
        let descriptor = self.registry.add_config(target)?;
        let previous = Some(current.chain_id);

        if current.chain_id == target {
            tracing::debug!(chain_id = %target, "already on requested chain");
            return Ok(NetworkSwitch {
                chain_id: target,
                network: descriptor.slug,
                previous,
                added: false,
            });
        }

        self.session.apply(SessionUpdate::BeginSwitch)?;
        let mut added = false;
        let attempt = match provider.switch_chain(target).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_unrecognized_chain() => {
                tracing::info!(chain_id = %target, "wallet does not know chain, adding it");
                added = true;
                match provider.add_chain(&descriptor.add_chain_params()).await {
                    Ok(()) => provider.switch_chain(target).await,
                    Err(add_err) => Err(add_err),
                }
            }
            Err(e) => Err(e),
        };

        match attempt {
            Ok(()) => {
                self.session.apply(SessionUpdate::Switched { chain_id: target })?;
                tracing::info!(chain_id = %target, network = %descriptor.slug, "network switched");
                Ok(NetworkSwitch {
                    chain_id: target,
                    network: descriptor.slug,
                    previous,
                    added,
                })
            }
            Err(e) => {
                tracing::warn!(chain_id = %target, error = %e, "network switch failed");
                self.session.apply(SessionUpdate::SwitchFailed)?;
                Err(BridgeError::from_port(op, e))
            }
        }
    }

    pub async fn perform_action<P: ProviderPort>(
        &self,
        provider: &P,
        action: &str,
        request: &TransactionRequest,
    ) -> ActionReport {
        let mut report = ActionReport {
            action: action.to_owned(),
            switched: None,
            result: Err(BridgeError::NotConnected {
                operation: Operation::PerformAction,
            }),
        };

        let current = match self.require_connected(Operation::PerformAction) {
            Ok(current) => current,
            Err(e) => {
                report.result = Err(e);
                return report;
            }
        };

        if current.chain_id != request.chain_id {
            match self.switch_network(provider, request.chain_id).await {
                Ok(switch) => report.switched = Some(switch),
                Err(e) => {
                    report.result = Err(e);
                    return report;
                }
            }
        }

        report.result = self.send(provider, action, request).await;
        report
    }

    async fn send<P: ProviderPort>(
        &self,
        provider: &P,
        action: &str,
        request: &TransactionRequest,
    ) -> Result<B256, BridgeError> {
        let op = Operation::PerformAction;
        let current = self.require_connected(op)?;
        if current.snapshot.state != crate::state_machine::SessionState::Connected
            || current.chain_id != request.chain_id
        {
            return Err(BridgeError::Superseded {
                operation: op,
                reason: format!(
                    "session is on {} instead of {}",
                    current.chain_id, request.chain_id
                ),
            });
        }

        let params = request.to_provider_params(current.account);
        let tx_hash = provider
            .send_transaction(&params)
            .await
            .map_err(|e| BridgeError::from_port(op, e))?;
        tracing::info!(action, %tx_hash, chain_id = %request.chain_id, "transaction submitted");
        Ok(tx_hash)
    }
}

struct Connected {
    account: Address,
    chain_id: ChainId,
    snapshot: SessionSnapshot,
}

/// Renders a base-unit amount with `decimals` places, rounded half-up to `precision`
/// (at most [`MAX_BALANCE_PRECISION`]).
pub fn format_units_rounded(value: U256, decimals: u8, precision: u8) -> String {
    let precision = precision.min(MAX_BALANCE_PRECISION);
    let ten = U256::from(10u8);
    let scaled = if precision >= decimals {
        value.saturating_mul(ten.pow(U256::from(precision - decimals)))
    } else {
        let divisor = ten.pow(U256::from(decimals - precision));
        value.saturating_add(divisor / U256::from(2u8)) / divisor
    };

    if precision == 0 {
        return scaled.to_string();
    }
    let unit = ten.pow(U256::from(precision));
    let whole = scaled / unit;
    let frac = scaled % unit;
    format!(
        "{whole}.{frac:0>width$}",
        frac = frac.to_string(),
        width = usize::from(precision)
    )
}
