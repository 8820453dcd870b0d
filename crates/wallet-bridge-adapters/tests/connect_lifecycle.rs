mod common;

use alloy::primitives::address;

use common::{connected, harness, harness_with, rejected, DASHBOARD_ORIGIN};
use wallet_bridge_adapters::wallet::DEFAULT_ACCOUNT;
use wallet_bridge_adapters::{Eip1193Adapter, RelayAdapter};
use wallet_bridge_core::{
    BridgeError, ChainId, ErrorCode, OutboundMessage, PortError, ProviderEventKind,
    ProviderHandle, SessionState,
};

#[tokio::test]
async fn connect_reports_account_chain_and_network() {
    let h = harness();
    let info = h.orch.connect().await.expect("connect");

    assert_eq!(info.account, DEFAULT_ACCOUNT);
    assert_eq!(info.chain_id, ChainId(1));
    assert_eq!(info.network, "ethereum");

    let snap = h.orch.snapshot();
    assert_eq!(snap.state, SessionState::Connected);
    assert_eq!(snap.provider, Some(ProviderHandle::Injected));

    let posted = h.host.messages();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].target_origin, DASHBOARD_ORIGIN);
    assert_eq!(posted[0].message["type"], "walletConnected");
    assert_eq!(posted[0].message["chainId"], "0x1");
    assert_eq!(posted[0].message["network"], "ethereum");

    assert_eq!(h.injected.listener_count(ProviderEventKind::AccountsChanged), 1);
    assert_eq!(h.injected.listener_count(ProviderEventKind::ChainChanged), 1);
}

#[tokio::test]
async fn rejected_connect_ends_disconnected_with_one_error() {
    let h = harness();
    h.wallet()
        .fail_next("eth_requestAccounts", rejected("User rejected the request."))
        .expect("script failure");

    let err = h.orch.connect().await.expect_err("user rejected");
    assert!(matches!(err, BridgeError::Rejected { .. }));
    assert_eq!(err.code(), ErrorCode::ConnectFailed);

    let snap = h.orch.snapshot();
    assert_eq!(snap.state, SessionState::Disconnected);
    assert_eq!(snap.account, None);
    assert_eq!(h.host.types(), vec!["walletError"]);
    match h.orch.last_message() {
        Some(OutboundMessage::WalletError {
            code,
            provider_code,
            action,
            ..
        }) => {
            assert_eq!(code, ErrorCode::ConnectFailed);
            assert_eq!(provider_code, Some(4001));
            assert_eq!(action, None);
        }
        other => panic!("expected walletError, got {other:?}"),
    }
    assert_eq!(h.injected.listener_count(ProviderEventKind::AccountsChanged), 0);
}

#[tokio::test]
async fn missing_provider_is_reported_as_connect_failure() {
    let h = harness_with(Eip1193Adapter::missing(), RelayAdapter::deterministic());

    let err = h.orch.connect().await.expect_err("no wallet injected");
    assert!(matches!(err, BridgeError::Unavailable { .. }));
    assert_eq!(err.code(), ErrorCode::ConnectFailed);
    assert_eq!(h.orch.snapshot().state, SessionState::Disconnected);
    assert_eq!(h.host.count_of("walletError"), 1);
}

#[tokio::test]
async fn wallet_without_accounts_cannot_connect() {
    let h = harness();
    h.wallet().set_accounts(vec![]).expect("clear accounts");

    let err = h.orch.connect().await.expect_err("no accounts");
    assert_eq!(err.code(), ErrorCode::ConnectFailed);
    assert_eq!(h.orch.snapshot().state, SessionState::Disconnected);
    assert!(!h.orch.listeners_attached());
}

#[tokio::test]
async fn refused_subscription_resets_the_session() {
    let h = harness();
    h.wallet()
        .fail_next("on", PortError::Transport("subscription refused".to_owned()))
        .expect("queue failure");

    let err = h.orch.connect().await.expect_err("listener attach failed");
    assert_eq!(err.code(), ErrorCode::ConnectFailed);

    let snap = h.orch.snapshot();
    assert_eq!(snap.state, SessionState::Disconnected);
    assert_eq!(snap.account, None);
    assert!(!h.orch.listeners_attached());
    assert_eq!(h.injected.listener_count(ProviderEventKind::AccountsChanged), 0);
    assert_eq!(h.host.types(), vec!["walletError"]);

    h.orch.connect().await.expect("next connect succeeds");
    assert_eq!(h.injected.listener_count(ProviderEventKind::AccountsChanged), 1);
}

#[tokio::test]
async fn reconnect_never_duplicates_listeners() {
    let h = connected().await;

    h.orch.disconnect().await;
    assert_eq!(h.injected.listener_count(ProviderEventKind::AccountsChanged), 0);
    assert_eq!(h.injected.listener_count(ProviderEventKind::ChainChanged), 0);

    h.orch.connect().await.expect("reconnect");
    h.orch.connect().await.expect("connect while connected");
    assert_eq!(h.injected.listener_count(ProviderEventKind::AccountsChanged), 1);
    assert_eq!(h.injected.listener_count(ProviderEventKind::ChainChanged), 1);

    let delivered = h
        .injected
        .debug_inject_chain_changed(ChainId(56))
        .expect("inject chain");
    assert_eq!(delivered, 1);
    assert_eq!(h.host.count_of("chainChanged"), 1);
}

#[tokio::test]
async fn disconnect_clears_session_and_emits_once() {
    let h = connected().await;
    h.orch.disconnect().await;

    let snap = h.orch.snapshot();
    assert_eq!(snap.state, SessionState::Disconnected);
    assert_eq!(snap.account, None);
    assert_eq!(snap.chain_id, None);
    assert_eq!(snap.provider, None);
    assert_eq!(h.host.types(), vec!["disconnected"]);

    h.orch.disconnect().await;
    assert_eq!(h.host.count_of("disconnected"), 2);
}

#[tokio::test]
async fn revoked_accounts_disconnect_the_session() {
    let h = connected().await;
    h.injected
        .debug_inject_accounts_changed(vec![])
        .expect("revoke");

    assert_eq!(h.orch.snapshot().state, SessionState::Disconnected);
    assert_eq!(h.orch.snapshot().account, None);
    assert_eq!(h.host.types(), vec!["disconnected"]);
    assert_eq!(h.last(), OutboundMessage::Disconnected);

    // A new connect replaces the stale binding instead of adding to it.
    h.wallet()
        .set_accounts(vec![DEFAULT_ACCOUNT])
        .expect("re-authorize");
    h.orch.connect().await.expect("reconnect");
    assert_eq!(h.injected.listener_count(ProviderEventKind::AccountsChanged), 1);
}

#[tokio::test]
async fn account_substitution_keeps_chain() {
    let h = connected().await;
    let next = address!("3000000000000000000000000000000000000003");
    h.injected
        .debug_inject_accounts_changed(vec![next])
        .expect("switch account");

    let snap = h.orch.snapshot();
    assert_eq!(snap.state, SessionState::Connected);
    assert_eq!(snap.account, Some(next));
    assert_eq!(snap.chain_id, Some(ChainId(1)));
    assert_eq!(
        h.last(),
        OutboundMessage::AccountsChanged {
            account: Some(next),
            chain_id: Some(ChainId(1)),
            network: "ethereum".to_owned(),
        }
    );
}

#[tokio::test]
async fn wallet_side_network_change_is_tracked() {
    let h = connected().await;
    h.injected
        .debug_inject_chain_changed(ChainId(8453))
        .expect("change chain");

    assert_eq!(h.orch.snapshot().chain_id, Some(ChainId(8453)));
    assert_eq!(
        h.last(),
        OutboundMessage::ChainChanged {
            chain_id: ChainId(8453),
            network: "base".to_owned(),
        }
    );
}

#[tokio::test]
async fn disconnect_during_connect_stays_authoritative() {
    let h = harness();
    let gate = h.wallet().hold("eth_requestAccounts").expect("hold accounts");

    let (result, ()) = tokio::join!(h.orch.connect(), async {
        while h.orch.snapshot().state != SessionState::Connecting {
            tokio::task::yield_now().await;
        }
        h.orch.disconnect().await;
        gate.notify_one();
    });

    let err = result.expect_err("connect superseded by disconnect");
    assert!(matches!(err, BridgeError::Superseded { .. }));
    assert_eq!(err.code(), ErrorCode::ConnectFailed);

    let snap = h.orch.snapshot();
    assert_eq!(snap.state, SessionState::Disconnected);
    assert_eq!(snap.account, None);
    assert!(!h.orch.listeners_attached());
    assert_eq!(h.host.types(), vec!["disconnected", "walletError"]);
}

#[tokio::test]
async fn connect_always_settles() {
    for fail in [false, true] {
        let h = harness();
        if fail {
            h.wallet()
                .fail_next("eth_chainId", rejected("chain lookup failed"))
                .expect("script failure");
        }
        let _ = h.orch.connect().await;
        let state = h.orch.snapshot().state;
        assert!(
            matches!(state, SessionState::Connected | SessionState::Disconnected),
            "connect left session in {state:?}"
        );
        assert_eq!(h.host.messages().len(), 1);
    }
}
