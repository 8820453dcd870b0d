#![allow(dead_code)]

use alloy::primitives::{address, Address};

use wallet_bridge_adapters::wallet::DEFAULT_ACCOUNT;
use wallet_bridge_adapters::{DeterministicWallet, Eip1193Adapter, RecordingHost, RelayAdapter};
use wallet_bridge_core::{
    ChainId, ChainRegistry, MessageBridge, Orchestrator, OrchestratorConfig, OutboundMessage,
    PortError,
};

pub const DASHBOARD_ORIGIN: &str = "https://dashboard.example";
pub const POOL: Address = address!("794a61358d6845594f94dc1db02a252b5b4814ad");

pub type TestOrchestrator = Orchestrator<Eip1193Adapter, RelayAdapter, RecordingHost>;

pub struct Harness {
    pub orch: TestOrchestrator,
    pub injected: Eip1193Adapter,
    pub relay: RelayAdapter,
    pub host: RecordingHost,
}

impl Harness {
    pub fn wallet(&self) -> &DeterministicWallet {
        self.injected.wallet()
    }

    pub fn calls(&self) -> Vec<String> {
        self.wallet().calls().expect("wallet calls")
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.calls().iter().filter(|m| *m == method).count()
    }

    pub fn last(&self) -> OutboundMessage {
        self.orch.last_message().expect("a message was emitted")
    }
}

pub fn harness_with(injected: Eip1193Adapter, relay: RelayAdapter) -> Harness {
    let host = RecordingHost::default();
    let bridge = MessageBridge::new(host.clone(), DASHBOARD_ORIGIN);
    let orch = Orchestrator::new(
        injected.clone(),
        relay.clone(),
        bridge,
        ChainRegistry::builtin(),
        OrchestratorConfig::default(),
    );
    Harness {
        orch,
        injected,
        relay,
        host,
    }
}

pub fn harness() -> Harness {
    harness_with(Eip1193Adapter::deterministic(), RelayAdapter::deterministic())
}

/// Connected to chain 0x1 with [`DEFAULT_ACCOUNT`]; the host inbox starts empty.
pub async fn connected() -> Harness {
    let h = harness();
    let info = h.orch.connect().await.expect("connect");
    assert_eq!(info.account, DEFAULT_ACCOUNT);
    assert_eq!(info.chain_id, ChainId(1));
    h.host.clear();
    h
}

pub fn rejected(message: &str) -> PortError {
    PortError::Rpc {
        code: 4001,
        message: message.to_owned(),
    }
}

pub fn unrecognized(chain_id: ChainId) -> PortError {
    PortError::Rpc {
        code: 4902,
        message: format!("Unrecognized chain ID \"{chain_id}\"."),
    }
}
