use alloy::primitives::Address;
use wallet_bridge_core::{
    BridgeError, ChainId, ProviderHandle, SessionState, SessionUpdate, WalletSession,
};

fn connected_session(account: Address, chain_id: ChainId) -> WalletSession {
    let session = WalletSession::new();
    session
        .apply(SessionUpdate::BeginConnect)
        .expect("begin connect");
    session
        .apply(SessionUpdate::Connected {
            account,
            chain_id,
            provider: ProviderHandle::Injected,
        })
        .expect("connected");
    session
}

#[test]
fn connect_populates_account_chain_and_provider() {
    let account = Address::repeat_byte(0xab);
    let session = connected_session(account, ChainId(1));
    let snap = session.snapshot();
    assert_eq!(snap.state, SessionState::Connected);
    assert_eq!(snap.account, Some(account));
    assert_eq!(snap.chain_id, Some(ChainId(1)));
    assert_eq!(snap.provider, Some(ProviderHandle::Injected));
    assert_eq!(snap.revision, 2);
}

#[test]
fn empty_accounts_clears_everything() {
    let session = connected_session(Address::repeat_byte(0x01), ChainId(10));
    let applied = session
        .apply(SessionUpdate::AccountsChanged(Vec::new()))
        .expect("revocation");
    assert_eq!(applied.snapshot.state, SessionState::Disconnected);
    assert_eq!(applied.snapshot.account, None);
    assert_eq!(applied.snapshot.chain_id, None);
    assert_eq!(applied.snapshot.provider, None);
}

#[test]
fn failed_switch_keeps_prior_chain() {
    let session = connected_session(Address::repeat_byte(0x01), ChainId(1));
    session.apply(SessionUpdate::BeginSwitch).expect("switching");
    assert_eq!(session.snapshot().state, SessionState::Switching);
    session.apply(SessionUpdate::SwitchFailed).expect("switch failed");
    let snap = session.snapshot();
    assert_eq!(snap.state, SessionState::Connected);
    assert_eq!(snap.chain_id, Some(ChainId(1)));
}

#[test]
fn late_connect_completion_cannot_undo_disconnect() {
    let session = WalletSession::new();
    session.apply(SessionUpdate::BeginConnect).expect("begin");
    session.apply(SessionUpdate::Disconnect).expect("disconnect");
    let err = session
        .apply(SessionUpdate::Connected {
            account: Address::repeat_byte(0x02),
            chain_id: ChainId(1),
            provider: ProviderHandle::Injected,
        })
        .expect_err("superseded");
    assert!(matches!(err, BridgeError::Superseded { .. }));
    assert_eq!(session.snapshot().state, SessionState::Disconnected);
    assert_eq!(session.snapshot().account, None);
}

#[test]
fn switch_result_after_disconnect_is_ignored() {
    let session = connected_session(Address::repeat_byte(0x01), ChainId(1));
    session.apply(SessionUpdate::BeginSwitch).expect("switching");
    session.apply(SessionUpdate::Disconnect).expect("disconnect");
    let applied = session
        .apply(SessionUpdate::Switched {
            chain_id: ChainId(10),
        })
        .expect("stale result tolerated");
    assert_eq!(applied.transition.reason, "stale_switch_result");
    assert_eq!(session.snapshot().chain_id, None);
}

#[test]
fn history_records_transitions_in_order() {
    let session = connected_session(Address::repeat_byte(0x01), ChainId(1));
    session
        .apply(SessionUpdate::ChainChanged(ChainId(56)))
        .expect("chain change");
    session.apply(SessionUpdate::Disconnect).expect("disconnect");

    let history = session.history();
    let reasons: Vec<_> = history.iter().map(|r| r.reason).collect();
    assert_eq!(
        reasons,
        vec![
            "connect_requested",
            "accounts_received",
            "chain_substituted",
            "disconnect"
        ]
    );
    assert!(history.windows(2).all(|w| w[0].seq < w[1].seq));
}

#[test]
fn clones_share_one_session() {
    let session = WalletSession::new();
    let handle = session.clone();
    handle.apply(SessionUpdate::BeginConnect).expect("begin");
    assert_eq!(session.snapshot().state, SessionState::Connecting);
}
