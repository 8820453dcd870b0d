//! Single source of truth for "connected? which account? which chain?".
//!
//! Direct calls and provider notifications both go through [`WalletSession::apply`],
//! which holds the session lock for the whole transition. That gives every change a
//! place in one total order, recorded in [`WalletSession::history`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy::primitives::Address;
use serde::Serialize;

use crate::domain::{ChainId, Operation, ProviderHandle};
use crate::error::BridgeError;
use crate::state_machine::{session_transition, SessionAction, SessionState, StateTransition};

const HISTORY_LIMIT: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub account: Option<Address>,
    pub chain_id: Option<ChainId>,
    pub provider: Option<ProviderHandle>,
    pub revision: u64,
}

impl SessionSnapshot {
    pub fn is_connected(&self) -> bool {
        self.state.has_account()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    BeginConnect,
    Connected {
        account: Address,
        chain_id: ChainId,
        provider: ProviderHandle,
    },
    ConnectFailed,
    BeginSwitch,
    Switched {
        chain_id: ChainId,
    },
    SwitchFailed,
    AccountsChanged(Vec<Address>),
    ChainChanged(ChainId),
    Disconnect,
}

impl SessionUpdate {
    fn action(&self) -> SessionAction {
        match self {
            Self::BeginConnect => SessionAction::Connect,
            Self::Connected { .. } => SessionAction::ConnectSucceeded,
            Self::ConnectFailed => SessionAction::ConnectFailed,
            Self::BeginSwitch => SessionAction::SwitchStart,
            Self::Switched { .. } => SessionAction::SwitchSucceeded,
            Self::SwitchFailed => SessionAction::SwitchFailed,
            Self::AccountsChanged(accounts) => SessionAction::AccountsChanged {
                empty: accounts.is_empty(),
            },
            Self::ChainChanged(_) => SessionAction::ChainChanged,
            Self::Disconnect => SessionAction::Disconnect,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRecord {
    pub seq: u64,
    pub from: SessionState,
    pub to: SessionState,
    pub reason: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub transition: StateTransition,
    pub snapshot: SessionSnapshot,
}

#[derive(Debug)]
struct SessionInner {
    state: SessionState,
    account: Option<Address>,
    chain_id: Option<ChainId>,
    provider: Option<ProviderHandle>,
    revision: u64,
    history: VecDeque<TransitionRecord>,
}

impl Default for SessionInner {
    fn default() -> Self {
        Self {
            state: SessionState::Disconnected,
            account: None,
            chain_id: None,
            provider: None,
            revision: 0,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
        }
    }
}

impl SessionInner {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            account: self.account,
            chain_id: self.chain_id,
            provider: self.provider.clone(),
            revision: self.revision,
        }
    }

    fn clear(&mut self) {
        self.account = None;
        self.chain_id = None;
        self.provider = None;
    }
}

#[derive(Debug, Clone, Default)]
pub struct WalletSession {
    inner: Arc<Mutex<SessionInner>>,
}

impl WalletSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    pub fn history(&self) -> Vec<TransitionRecord> {
        self.lock().history.iter().cloned().collect()
    }

    pub fn apply(&self, update: SessionUpdate) -> Result<Applied, BridgeError> {
        let mut g = self.lock();
        let from = g.state;

        match (&update, from) {
            // A disconnect won the race against an in-flight connect; it stays authoritative.
            (SessionUpdate::Connected { .. }, SessionState::Disconnected) => {
                return Err(BridgeError::Superseded {
                    operation: Operation::Connect,
                    reason: "session was disconnected while connecting".to_owned(),
                });
            }
            (SessionUpdate::ConnectFailed, SessionState::Disconnected) => {
                return Ok(Applied {
                    transition: StateTransition {
                        from,
                        to: from,
                        reason: "stale_connect_failure",
                    },
                    snapshot: g.snapshot(),
                });
            }
            (
                SessionUpdate::Switched { .. } | SessionUpdate::SwitchFailed,
                SessionState::Disconnected | SessionState::Connecting,
            ) => {
                tracing::debug!(state = ?from, "switch result arrived after session reset");
                return Ok(Applied {
                    transition: StateTransition {
                        from,
                        to: from,
                        reason: "stale_switch_result",
                    },
                    snapshot: g.snapshot(),
                });
            }
            _ => {}
        }

        let (to, transition) = session_transition(from, update.action())?;

        match update {
            SessionUpdate::BeginConnect => {
                g.account = None;
                g.provider = None;
            }
            SessionUpdate::Connected {
                account,
                chain_id,
                provider,
            } => {
                g.account = Some(account);
                g.chain_id = Some(chain_id);
                g.provider = Some(provider);
            }
            SessionUpdate::ConnectFailed | SessionUpdate::Disconnect => g.clear(),
            SessionUpdate::BeginSwitch | SessionUpdate::SwitchFailed => {}
            SessionUpdate::Switched { chain_id } | SessionUpdate::ChainChanged(chain_id) => {
                g.chain_id = Some(chain_id);
            }
            SessionUpdate::AccountsChanged(accounts) => match accounts.first() {
                Some(first) => g.account = Some(*first),
                None => g.clear(),
            },
        }

        g.state = to;
        debug_assert_eq!(g.account.is_some(), to.has_account());
        g.revision = g.revision.saturating_add(1);
        let seq = g.revision;
        if g.history.len() == HISTORY_LIMIT {
            g.history.pop_front();
        }
        g.history.push_back(TransitionRecord {
            seq,
            from: transition.from,
            to: transition.to,
            reason: transition.reason,
        });
        tracing::debug!(seq, from = ?transition.from, to = ?transition.to, reason = transition.reason, "session transition");

        Ok(Applied {
            transition,
            snapshot: g.snapshot(),
        })
    }
}
