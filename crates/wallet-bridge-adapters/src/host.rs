use std::sync::{Arc, Mutex};

use serde_json::Value;

use wallet_bridge_core::{HostPort, PortError};

#[derive(Debug, Clone, PartialEq)]
pub struct PostedMessage {
    pub target_origin: String,
    pub message: Value,
}

/// Keeps every posted message in memory. Used by the CLI and by tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    posted: Arc<Mutex<Vec<PostedMessage>>>,
}

impl RecordingHost {
    pub fn messages(&self) -> Vec<PostedMessage> {
        self.posted.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Wire `type` of every posted message, in order.
    pub fn types(&self) -> Vec<String> {
        self.messages()
            .iter()
            .filter_map(|m| m.message.get("type").and_then(Value::as_str))
            .map(str::to_owned)
            .collect()
    }

    pub fn count_of(&self, message_type: &str) -> usize {
        self.types().iter().filter(|t| *t == message_type).count()
    }

    pub fn clear(&self) {
        if let Ok(mut g) = self.posted.lock() {
            g.clear();
        }
    }
}

impl HostPort for RecordingHost {
    fn post_message(&self, target_origin: &str, message: &Value) -> Result<(), PortError> {
        let mut g = self
            .posted
            .lock()
            .map_err(|e| PortError::Transport(format!("host lock poisoned: {e}")))?;
        g.push(PostedMessage {
            target_origin: target_origin.to_owned(),
            message: message.clone(),
        });
        Ok(())
    }
}

/// Posts to the embedding page through `window.parent.postMessage`.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct ParentWindowHost;

#[cfg(target_arch = "wasm32")]
impl HostPort for ParentWindowHost {
    fn post_message(&self, target_origin: &str, message: &Value) -> Result<(), PortError> {
        use serde::Serialize;

        let window =
            web_sys::window().ok_or_else(|| PortError::Transport("missing window".to_owned()))?;
        let parent = window
            .parent()
            .map_err(|e| PortError::Transport(format!("window.parent unavailable: {e:?}")))?
            .unwrap_or(window);
        let payload = message
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| PortError::Transport(format!("failed to encode host message: {e}")))?;
        parent
            .post_message(&payload, target_origin)
            .map_err(|e| PortError::Transport(format!("postMessage failed: {e:?}")))
    }
}
