use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Switching,
}

impl SessionState {
    /// Account is known and the provider handle is bound.
    pub fn has_account(self) -> bool {
        matches!(self, Self::Connected | Self::Switching)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Connect,
    ConnectSucceeded,
    ConnectFailed,
    SwitchStart,
    SwitchSucceeded,
    SwitchFailed,
    AccountsChanged { empty: bool },
    ChainChanged,
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: SessionState,
    pub to: SessionState,
    pub reason: &'static str,
}

pub fn session_transition(
    from: SessionState,
    action: SessionAction,
) -> Result<(SessionState, StateTransition), BridgeError> {
    use SessionAction as A;
    use SessionState as S;

    let (to, reason) = match (from, action) {
        (_, A::Disconnect) => (S::Disconnected, "disconnect"),

        (S::Disconnected, A::Connect) => (S::Connecting, "connect_requested"),
        (S::Connected, A::Connect) => (S::Connecting, "reconnect_requested"),
        (S::Connecting, A::ConnectSucceeded) => (S::Connected, "accounts_received"),
        (S::Connecting, A::ConnectFailed) => (S::Disconnected, "connect_failed"),

        (S::Connected | S::Switching, A::SwitchStart) => (S::Switching, "switch_requested"),
        (S::Switching, A::SwitchSucceeded) => (S::Connected, "switch_succeeded"),
        (S::Switching, A::SwitchFailed) => (S::Connected, "switch_failed"),
        // A notification already moved the session back to Connected; the switch
        // result still lands, last write wins.
        (S::Connected, A::SwitchSucceeded) => (S::Connected, "late_switch_succeeded"),
        (S::Connected, A::SwitchFailed) => (S::Connected, "late_switch_failed"),

        (S::Connected | S::Switching, A::AccountsChanged { empty: true }) => {
            (S::Disconnected, "accounts_revoked")
        }
        (S::Connected | S::Switching, A::AccountsChanged { empty: false }) => {
            (S::Connected, "account_substituted")
        }
        (S::Connected | S::Switching, A::ChainChanged) => (S::Connected, "chain_substituted"),
        // A provider may report its chain before any account is authorized.
        (S::Disconnected | S::Connecting, A::ChainChanged) => (from, "chain_observed"),

        _ => {
            return Err(BridgeError::IllegalTransition(format!(
                "{from:?} --{action:?}-->"
            )))
        }
    };

    Ok((to, StateTransition { from, to, reason }))
}
