//! Checkbox controls shared between toggle entities and the file loader.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

/// State of one checkbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ControlState {
    pub checked: bool,
    /// Locked controls refuse user input.
    pub locked: bool,
    /// Locked by a protocol exception. No later unlock clears it.
    pub restricted: bool,
}

/// Shared handle to one checkbox. Clones observe the same state.
#[derive(Debug, Clone)]
pub struct ToggleControl {
    name: &'static str,
    state: Arc<RwLock<ControlState>>,
}

impl ToggleControl {
    pub fn new(name: &'static str) -> Self {
        Self::with_state(name, ControlState::default())
    }

    pub fn with_state(name: &'static str, state: ControlState) -> Self {
        Self {
            name,
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub async fn snapshot(&self) -> ControlState {
        *self.state.read().await
    }

    pub async fn is_checked(&self) -> bool {
        self.state.read().await.checked
    }

    pub async fn is_locked(&self) -> bool {
        self.state.read().await.locked
    }

    pub async fn set_checked(&self, checked: bool) {
        let mut state = self.state.write().await;
        if state.checked != checked {
            state.checked = checked;
            debug!(control = self.name, checked, "Control updated");
        }
    }

    /// Refuse user input until [`ToggleControl::unlock`].
    pub async fn lock(&self) {
        self.state.write().await.locked = true;
    }

    /// Unlock unless the control is restricted.
    pub async fn unlock(&self) {
        let mut state = self.state.write().await;
        if state.restricted {
            debug!(control = self.name, "Restricted control stays locked");
            return;
        }
        state.locked = false;
    }

    /// Lock for the rest of the popup lifetime.
    pub async fn restrict(&self) {
        let mut state = self.state.write().await;
        state.restricted = true;
        state.locked = true;
        debug!(control = self.name, "Control restricted");
    }
}
