mod common;

use common::{connected, harness, rejected, unrecognized};
use wallet_bridge_core::{BridgeError, ChainId, ErrorCode, OutboundMessage, SessionState};

const SWITCH: &str = "wallet_switchEthereumChain";
const ADD: &str = "wallet_addEthereumChain";

fn wallet_calls(h: &common::Harness) -> Vec<String> {
    h.calls()
        .into_iter()
        .filter(|m| m == SWITCH || m == ADD)
        .collect()
}

#[tokio::test]
async fn switch_to_known_chain_issues_one_request() {
    let h = connected().await;
    h.wallet().add_known_chain(ChainId(10)).expect("known chain");

    let switch = h.orch.switch_network(ChainId(10)).await.expect("switch");
    assert_eq!(switch.chain_id, ChainId(10));
    assert_eq!(switch.network, "optimism");
    assert_eq!(switch.previous, Some(ChainId(1)));
    assert!(!switch.added);

    assert_eq!(wallet_calls(&h), vec![SWITCH]);
    assert_eq!(h.orch.snapshot().state, SessionState::Connected);
    assert_eq!(h.orch.snapshot().chain_id, Some(ChainId(10)));
    assert_eq!(h.host.count_of("networkSwitched"), 1);
    assert_eq!(h.host.count_of("walletError"), 0);
    assert_eq!(
        h.last(),
        OutboundMessage::NetworkSwitched {
            chain_id: ChainId(10),
            network: "optimism".to_owned(),
        }
    );
}

#[tokio::test]
async fn unknown_chain_is_added_then_switched_once() {
    let h = connected().await;

    let switch = h.orch.switch_network(ChainId(56)).await.expect("switch");
    assert!(switch.added);
    assert_eq!(switch.network, "bsc");
    assert_eq!(wallet_calls(&h), vec![SWITCH, ADD, SWITCH]);
    assert_eq!(h.wallet().current_chain().expect("chain"), ChainId(56));
    assert_eq!(h.host.count_of("networkSwitched"), 1);
}

#[tokio::test]
async fn failed_retry_leaves_chain_unchanged() {
    let h = connected().await;
    h.wallet()
        .fail_next(SWITCH, unrecognized(ChainId(8453)))
        .expect("first failure");
    h.wallet()
        .fail_next(SWITCH, rejected("User rejected the request."))
        .expect("second failure");

    let err = h
        .orch
        .switch_network(ChainId(8453))
        .await
        .expect_err("retry rejected");
    assert_eq!(err.code(), ErrorCode::SwitchFailed);
    assert_eq!(err.provider_code(), Some(4001));

    assert_eq!(wallet_calls(&h), vec![SWITCH, ADD, SWITCH]);
    let snap = h.orch.snapshot();
    assert_eq!(snap.state, SessionState::Connected);
    assert_eq!(snap.chain_id, Some(ChainId(1)));
    assert_eq!(h.host.types(), vec!["walletError"]);
}

#[tokio::test]
async fn failed_add_is_not_retried() {
    let h = connected().await;
    h.wallet()
        .fail_next(ADD, rejected("User rejected adding the network."))
        .expect("add failure");

    let err = h
        .orch
        .switch_network(ChainId(42161))
        .await
        .expect_err("add rejected");
    assert_eq!(err.code(), ErrorCode::SwitchFailed);
    assert_eq!(wallet_calls(&h), vec![SWITCH, ADD]);
    assert_eq!(h.orch.snapshot().chain_id, Some(ChainId(1)));
}

#[tokio::test]
async fn rejected_switch_without_unrecognized_code_does_not_add() {
    let h = connected().await;
    h.wallet().add_known_chain(ChainId(10)).expect("known chain");
    h.wallet()
        .fail_next(SWITCH, rejected("User rejected the request."))
        .expect("script failure");

    let err = h
        .orch
        .switch_network(ChainId(10))
        .await
        .expect_err("rejected");
    assert!(matches!(err, BridgeError::Rejected { .. }));
    assert_eq!(wallet_calls(&h), vec![SWITCH]);
}

#[tokio::test]
async fn chain_outside_registry_is_refused_before_the_wallet() {
    let h = connected().await;

    let err = h
        .orch
        .switch_network(ChainId(999_999))
        .await
        .expect_err("unsupported");
    assert_eq!(
        err,
        BridgeError::UnsupportedChain {
            chain_id: ChainId(999_999)
        }
    );
    assert_eq!(err.code(), ErrorCode::InvalidChainId);
    assert!(wallet_calls(&h).is_empty());
    assert_eq!(h.orch.snapshot().state, SessionState::Connected);
    assert_eq!(h.last().error_code(), Some(ErrorCode::InvalidChainId));
}

#[tokio::test]
async fn switch_to_current_chain_skips_the_wallet() {
    let h = connected().await;

    let switch = h.orch.switch_network(ChainId(1)).await.expect("no-op switch");
    assert_eq!(switch.previous, Some(ChainId(1)));
    assert!(wallet_calls(&h).is_empty());
    assert_eq!(h.host.types(), vec!["networkSwitched"]);
}

#[tokio::test]
async fn switch_requires_a_connected_wallet() {
    let h = harness();

    let err = h
        .orch
        .switch_network(ChainId(10))
        .await
        .expect_err("not connected");
    assert!(matches!(err, BridgeError::NotConnected { .. }));
    assert_eq!(err.code(), ErrorCode::SwitchFailed);
    assert!(h.calls().is_empty());
    assert_eq!(h.host.types(), vec!["walletError"]);
}

#[tokio::test]
async fn session_history_records_the_switch() {
    let h = connected().await;
    h.wallet().add_known_chain(ChainId(43114)).expect("known chain");
    h.orch
        .switch_network(ChainId(43114))
        .await
        .expect("switch");

    let reasons: Vec<&str> = h
        .orch
        .session()
        .history()
        .iter()
        .map(|r| r.reason)
        .collect();
    assert!(reasons.contains(&"switch_requested"));
    assert_eq!(h.orch.snapshot().state, SessionState::Connected);
}
