mod common;

use common::{harness, harness_with};
use wallet_bridge_adapters::relay::RELAY_ACCOUNT;
use wallet_bridge_adapters::wallet::DEFAULT_ACCOUNT;
use wallet_bridge_adapters::{Eip1193Adapter, RelayAdapter};
use wallet_bridge_core::{
    BridgeCommand, ChainId, CommandOutcome, ErrorCode, ProviderEventKind, ProviderHandle,
    SessionState,
};

const PROJECT: &str = "demo-project";

#[tokio::test]
async fn relay_pairing_connects_the_session() {
    let h = harness();

    let info = h
        .orch
        .connect_via_relay(PROJECT)
        .await
        .expect("relay connect");
    assert_eq!(info.account, RELAY_ACCOUNT);
    assert_eq!(info.chain_id, ChainId(1));

    let snap = h.orch.snapshot();
    assert_eq!(snap.state, SessionState::Connected);
    assert_eq!(
        snap.provider,
        Some(ProviderHandle::Relay {
            topic: "relay-topic-1".to_owned()
        })
    );
    assert_eq!(h.relay.listener_count(ProviderEventKind::AccountsChanged), 1);
    assert_eq!(h.relay.listener_count(ProviderEventKind::ChainChanged), 1);
    assert_eq!(h.injected.listener_count(ProviderEventKind::AccountsChanged), 0);
    assert_eq!(h.host.types(), vec!["walletConnected"]);
}

#[tokio::test]
async fn requests_follow_the_relay_binding() {
    let h = harness();
    h.orch
        .connect_via_relay(PROJECT)
        .await
        .expect("relay connect");

    h.orch.sign_message("via relay").await.expect("sign");
    assert_eq!(
        h.orch.get_balance().await.expect("balance").as_deref(),
        Some("1.5000")
    );

    let relay_calls = h.relay.wallet().calls().expect("relay calls");
    assert!(relay_calls.iter().any(|m| m == "personal_sign"));
    assert!(relay_calls.iter().any(|m| m == "eth_getBalance"));
    assert!(h.calls().is_empty());
}

#[tokio::test]
async fn relay_requires_a_project_id() {
    let h = harness();

    let err = h
        .orch
        .connect_via_relay("  ")
        .await
        .expect_err("missing project id");
    assert_eq!(err.code(), ErrorCode::ConnectFailed);
    assert_eq!(h.orch.snapshot().state, SessionState::Disconnected);
    assert!(h.relay.active_session().is_none());
    assert_eq!(h.host.types(), vec!["walletError"]);
}

#[tokio::test]
async fn disabled_relay_fails_to_connect() {
    let h = harness_with(
        Eip1193Adapter::deterministic(),
        RelayAdapter::disabled("relay bridge URL not configured"),
    );

    let err = h
        .orch
        .connect_via_relay(PROJECT)
        .await
        .expect_err("relay disabled");
    assert_eq!(err.code(), ErrorCode::ConnectFailed);
    assert_eq!(h.orch.snapshot().state, SessionState::Disconnected);
    assert!(!h.orch.listeners_attached());
}

#[tokio::test]
async fn disconnect_closes_the_pairing() {
    let h = harness();
    h.orch
        .connect_via_relay(PROJECT)
        .await
        .expect("relay connect");
    assert!(h.relay.active_session().is_some());

    h.orch.disconnect().await;
    assert!(h.relay.active_session().is_none());
    assert_eq!(h.relay.listener_count(ProviderEventKind::AccountsChanged), 0);
    assert_eq!(h.relay.listener_count(ProviderEventKind::ChainChanged), 0);
    assert_eq!(h.orch.snapshot().state, SessionState::Disconnected);
}

#[tokio::test]
async fn injected_connect_after_relay_moves_the_listeners() {
    let h = harness();
    h.orch
        .connect_via_relay(PROJECT)
        .await
        .expect("relay connect");

    let info = h.orch.connect().await.expect("injected connect");
    assert_eq!(info.account, DEFAULT_ACCOUNT);
    assert_eq!(h.orch.snapshot().provider, Some(ProviderHandle::Injected));
    assert_eq!(h.relay.listener_count(ProviderEventKind::AccountsChanged), 0);
    assert_eq!(h.relay.listener_count(ProviderEventKind::ChainChanged), 0);
    assert_eq!(h.injected.listener_count(ProviderEventKind::AccountsChanged), 1);
    assert_eq!(h.injected.listener_count(ProviderEventKind::ChainChanged), 1);
    assert!(h.relay.active_session().is_none());
}

#[tokio::test]
async fn relay_repairing_closes_the_previous_pairing() {
    let h = harness();
    h.orch
        .connect_via_relay(PROJECT)
        .await
        .expect("first pairing");
    h.orch
        .connect_via_relay(PROJECT)
        .await
        .expect("second pairing");

    let expected = ProviderHandle::Relay {
        topic: "relay-topic-2".to_owned(),
    };
    assert_eq!(h.orch.snapshot().provider, Some(expected));
    assert_eq!(
        h.relay.active_session().map(|s| s.topic).as_deref(),
        Some("relay-topic-2")
    );
    assert_eq!(h.relay.listener_count(ProviderEventKind::AccountsChanged), 1);
}

#[tokio::test]
async fn failed_injected_reconnect_still_closes_the_pairing() {
    let h = harness();
    h.orch
        .connect_via_relay(PROJECT)
        .await
        .expect("relay connect");
    h.injected.wallet().set_accounts(vec![]).expect("clear accounts");

    h.orch.connect().await.expect_err("no injected accounts");
    assert!(h.relay.active_session().is_none());
    assert_eq!(h.orch.snapshot().state, SessionState::Disconnected);
}

#[tokio::test]
async fn unadopted_pairing_is_closed() {
    let h = harness();
    h.relay.wallet().set_accounts(vec![]).expect("clear relay accounts");

    let err = h
        .orch
        .connect_via_relay(PROJECT)
        .await
        .expect_err("pairing without accounts");
    assert_eq!(err.code(), ErrorCode::ConnectFailed);
    assert!(h.relay.active_session().is_none());
}

#[tokio::test]
async fn relay_wallet_revocation_disconnects() {
    let h = harness();
    h.orch
        .connect_via_relay(PROJECT)
        .await
        .expect("relay connect");
    h.host.clear();

    h.relay
        .debug_inject_accounts_changed(vec![])
        .expect("revoke");
    assert_eq!(h.orch.snapshot().state, SessionState::Disconnected);
    assert_eq!(h.host.types(), vec!["disconnected"]);
}

#[tokio::test]
async fn relay_command_decodes_from_host_json() {
    let h = harness();
    let command: BridgeCommand = serde_json::from_value(serde_json::json!({
        "method": "connectViaRelay",
        "projectId": PROJECT,
    }))
    .expect("decode command");

    match h.orch.execute(command).await.expect("execute") {
        CommandOutcome::Connected(info) => assert_eq!(info.account, RELAY_ACCOUNT),
        other => panic!("unexpected outcome {other:?}"),
    }
}
