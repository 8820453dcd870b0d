use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::{ProviderEvent, ProviderEventKind, ProviderHandle, SubscriptionId};
use crate::message::{MessageBridge, OutboundMessage};
use crate::ports::{EventHandler, HostPort, PortError, ProviderPort};
use crate::registry::ChainRegistry;
use crate::session::{SessionUpdate, WalletSession};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Binding {
    handle: ProviderHandle,
    accounts: SubscriptionId,
    chain: SubscriptionId,
}

/// Keeps at most one `accountsChanged` and one `chainChanged` subscription alive.
pub struct EventListenerManager<H> {
    session: WalletSession,
    bridge: MessageBridge<H>,
    registry: Arc<ChainRegistry>,
    binding: Mutex<Option<Binding>>,
}

impl<H: HostPort + 'static> EventListenerManager<H> {
    pub fn new(session: WalletSession, bridge: MessageBridge<H>, registry: Arc<ChainRegistry>) -> Self {
        Self {
            session,
            bridge,
            registry,
            binding: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Binding>> {
        self.binding.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_attached(&self) -> bool {
        self.lock().is_some()
    }

    pub fn bound_provider(&self) -> Option<ProviderHandle> {
        self.lock().as_ref().map(|b| b.handle.clone())
    }

    /// Subscribes both handlers on `provider`. An existing binding on the same
    /// provider is removed first; a binding on another provider must be detached
    /// through that provider beforehand.
    pub fn attach<P: ProviderPort>(
        &self,
        provider: &P,
        handle: ProviderHandle,
    ) -> Result<(), PortError> {
        let mut g = self.lock();
        if let Some(stale) = g.take() {
            if stale.handle == handle {
                remove_binding(provider, &stale);
            } else {
                tracing::warn!(stale = ?stale.handle, "dropping listener binding owned by another provider");
            }
        }

        let accounts = provider.on(ProviderEventKind::AccountsChanged, self.handler())?;
        let chain = match provider.on(ProviderEventKind::ChainChanged, self.handler()) {
            Ok(id) => id,
            Err(e) => {
                if let Err(undo) = provider.remove_listener(accounts) {
                    tracing::debug!(error = %undo, "could not undo accountsChanged subscription");
                }
                return Err(e);
            }
        };
        tracing::debug!(provider = ?handle, ?accounts, ?chain, "provider listeners attached");
        *g = Some(Binding {
            handle,
            accounts,
            chain,
        });
        Ok(())
    }

    /// Removes both handlers. No-op when nothing is attached.
    pub fn detach<P: ProviderPort>(&self, provider: &P) {
        if let Some(binding) = self.lock().take() {
            remove_binding(provider, &binding);
            tracing::debug!(provider = ?binding.handle, "provider listeners detached");
        }
    }

    fn handler(&self) -> EventHandler {
        let session = self.session.clone();
        let bridge = self.bridge.clone();
        let registry = Arc::clone(&self.registry);
        Arc::new(move |event| route_event(&session, &bridge, &registry, event))
    }
}

fn remove_binding<P: ProviderPort>(provider: &P, binding: &Binding) {
    for id in [binding.accounts, binding.chain] {
        if let Err(e) = provider.remove_listener(id) {
            tracing::warn!(error = %e, ?id, "failed to remove provider listener");
        }
    }
}

/// Applies one provider notification to the session and reports it to the host.
pub fn route_event<H: HostPort>(
    session: &WalletSession,
    bridge: &MessageBridge<H>,
    registry: &ChainRegistry,
    event: ProviderEvent,
) {
    let kind = event.kind();
    let (update, revoked) = match event {
        ProviderEvent::AccountsChanged(accounts) => {
            let revoked = accounts.is_empty();
            (SessionUpdate::AccountsChanged(accounts), revoked)
        }
        ProviderEvent::ChainChanged(chain_id) => (SessionUpdate::ChainChanged(chain_id), false),
    };

    let applied = match session.apply(update) {
        Ok(applied) => applied,
        Err(e) => {
            tracing::debug!(event = kind.event_name(), error = %e, "ignoring provider notification");
            return;
        }
    };

    let snapshot = applied.snapshot;
    let message = match kind {
        ProviderEventKind::AccountsChanged if revoked => {
            tracing::info!("wallet revoked account access");
            OutboundMessage::Disconnected
        }
        ProviderEventKind::AccountsChanged => OutboundMessage::AccountsChanged {
            account: snapshot.account,
            chain_id: snapshot.chain_id,
            network: snapshot
                .chain_id
                .map(|id| registry.network_slug(id))
                .unwrap_or_else(|| crate::registry::UNKNOWN_NETWORK.to_owned()),
        },
        ProviderEventKind::ChainChanged => match snapshot.chain_id {
            Some(chain_id) => OutboundMessage::ChainChanged {
                chain_id,
                network: registry.network_slug(chain_id),
            },
            None => return,
        },
    };
    bridge.emit(message);
}
