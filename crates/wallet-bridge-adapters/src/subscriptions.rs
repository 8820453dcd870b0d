use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use wallet_bridge_core::domain::SubscriptionId;
use wallet_bridge_core::{EventHandler, PortError, ProviderEvent, ProviderEventKind};

/// Registered `on(...)` handlers of one provider.
#[derive(Clone, Default)]
pub struct SubscriptionTable {
    inner: Arc<Mutex<Subscriptions>>,
}

#[derive(Default)]
struct Subscriptions {
    next_id: u64,
    handlers: BTreeMap<SubscriptionId, (ProviderEventKind, EventHandler)>,
}

impl fmt::Debug for SubscriptionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.inner.lock().map(|g| g.handlers.len()).unwrap_or(0);
        f.debug_struct("SubscriptionTable")
            .field("handlers", &count)
            .finish()
    }
}

impl SubscriptionTable {
    pub fn insert(
        &self,
        kind: ProviderEventKind,
        handler: EventHandler,
    ) -> Result<SubscriptionId, PortError> {
        let mut g = self
            .inner
            .lock()
            .map_err(|e| PortError::Transport(format!("subscription lock poisoned: {e}")))?;
        g.next_id = g.next_id.saturating_add(1);
        let id = SubscriptionId(g.next_id);
        g.handlers.insert(id, (kind, handler));
        Ok(id)
    }

    pub fn remove(&self, id: SubscriptionId) -> Result<ProviderEventKind, PortError> {
        let mut g = self
            .inner
            .lock()
            .map_err(|e| PortError::Transport(format!("subscription lock poisoned: {e}")))?;
        g.handlers
            .remove(&id)
            .map(|(kind, _)| kind)
            .ok_or_else(|| PortError::NotFound(format!("subscription {} not registered", id.0)))
    }

    pub fn count(&self, kind: ProviderEventKind) -> usize {
        self.inner
            .lock()
            .map(|g| g.handlers.values().filter(|(k, _)| *k == kind).count())
            .unwrap_or(0)
    }

    /// Calls every handler registered for the event's kind. Handlers run outside
    /// the table lock so they may subscribe or unsubscribe.
    pub fn dispatch(&self, event: ProviderEvent) -> Result<usize, PortError> {
        let kind = event.kind();
        let handlers: Vec<EventHandler> = {
            let g = self
                .inner
                .lock()
                .map_err(|e| PortError::Transport(format!("subscription lock poisoned: {e}")))?;
            g.handlers
                .values()
                .filter(|(k, _)| *k == kind)
                .map(|(_, h)| Arc::clone(h))
                .collect()
        };
        for handler in &handlers {
            handler(event.clone());
        }
        Ok(handlers.len())
    }
}
