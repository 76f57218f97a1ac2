//! Session and allow-list toggles.
//!
//! Cascade rules, applied in one direction only (allow-list → session →
//! loader):
//! - allow-list membership turns the session on first, then locks it;
//! - leaving the allow-list unlocks the session;
//! - session on expands the loader, session off collapses it.
//!
//! Checkbox state changes run under one cascade lock and finish before any
//! loader animation is awaited, so a click landing mid-animation sees the
//! settled state.
//!
//! Cascades never talk to the background. Only the `user_*` entry points
//! send a message, next to the same local update.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use sitegate_proto::Envelope;

use crate::animation::RegionSurface;
use crate::controls::{ControlState, ToggleControl};
use crate::loader::FileLoader;
use crate::transport::Transport;

/// Result of a user toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserToggle {
    Applied,
    /// The control is locked; nothing was sent or changed.
    Ignored,
}

/// The session and allow-list checkboxes, and the loader they open.
pub struct Toggles<T, S> {
    transport: Arc<T>,
    session: ToggleControl,
    allow_list: ToggleControl,
    loader: FileLoader<S>,
    /// Held while checkbox states change, never across an animation.
    cascade: Mutex<()>,
}

impl<T: Transport, S: RegionSurface> Toggles<T, S> {
    /// Both toggles start unchecked. The allow-list checkbox sits inside the
    /// collapsed loader, so it starts locked.
    pub fn new(transport: Arc<T>, loader_surface: S) -> Self {
        let session = ToggleControl::new("session");
        let allow_list = ToggleControl::with_state(
            "allow_list",
            ControlState {
                locked: true,
                ..ControlState::default()
            },
        );
        let loader = FileLoader::new(loader_surface, allow_list.clone());
        Self {
            transport,
            session,
            allow_list,
            loader,
            cascade: Mutex::new(()),
        }
    }

    pub const fn session(&self) -> &ToggleControl {
        &self.session
    }

    pub const fn allow_list(&self) -> &ToggleControl {
        &self.allow_list
    }

    pub const fn loader(&self) -> &FileLoader<S> {
        &self.loader
    }

    /// Check the session and open the loader.
    pub async fn session_on(&self) {
        self.session.set_checked(true).await;
        let outcome = self.loader.expand().await;
        debug!(?outcome, "Session on");
    }

    /// Turn the session off. No-op while the site is on the allow-list.
    pub async fn session_off(&self) {
        {
            let _cascade = self.cascade.lock().await;
            if self.allow_list.is_checked().await {
                debug!("Session stays on for an allow-listed site");
                return;
            }
            self.session.set_checked(false).await;
        }
        let outcome = self.loader.collapse().await;
        debug!(?outcome, "Session off");
    }

    /// Put the site on the allow-list. The session is checked and locked
    /// before the loader starts to open.
    pub async fn allow_list_on(&self) {
        let was_on = {
            let _cascade = self.cascade.lock().await;
            let was_on = self.session.is_checked().await;
            self.session.set_checked(true).await;
            self.allow_list.set_checked(true).await;
            self.session.lock().await;
            was_on
        };
        debug!("Site on allow-list, session locked");
        if !was_on {
            let outcome = self.loader.expand().await;
            debug!(?outcome, "Session on");
        }
    }

    /// Take the site off the allow-list. The session stays as it is but
    /// accepts user input again.
    pub async fn allow_list_off(&self) {
        let _cascade = self.cascade.lock().await;
        self.allow_list.set_checked(false).await;
        self.session.unlock().await;
        debug!("Site off allow-list, session unlocked");
    }

    /// The user flipped the session checkbox.
    pub async fn user_set_session(&self, on: bool) -> UserToggle {
        if self.session.is_locked().await {
            debug!(on, "Session toggle is locked");
            return UserToggle::Ignored;
        }
        let Envelope { data, kind } = Envelope::session_toggle(on);
        let apply = async {
            if on {
                self.session_on().await;
            } else {
                self.session_off().await;
            }
        };
        tokio::join!(self.transport.send(data, kind), apply);
        info!(on, "Session toggled");
        UserToggle::Applied
    }

    /// The user flipped the allow-list checkbox. Only an addition is
    /// reported to the background.
    pub async fn user_set_allow_list(&self, on: bool) -> UserToggle {
        if self.allow_list.is_locked().await {
            debug!(on, "Allow-list toggle is locked");
            return UserToggle::Ignored;
        }
        if on {
            let Envelope { data, kind } = Envelope::allow_list_add();
            tokio::join!(self.transport.send(data, kind), self.allow_list_on());
        } else {
            self.allow_list_off().await;
        }
        info!(on, "Allow-list toggled");
        UserToggle::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ManualSurface, RecordingTransport};
    use serde_json::json;
    use sitegate_proto::MessageType;

    type TestToggles = Toggles<RecordingTransport, Arc<ManualSurface>>;

    fn toggles() -> (Arc<RecordingTransport>, Arc<ManualSurface>, TestToggles) {
        toggles_on(ManualSurface::immediate(96))
    }

    fn toggles_on(
        surface: ManualSurface,
    ) -> (Arc<RecordingTransport>, Arc<ManualSurface>, TestToggles) {
        let transport = Arc::new(RecordingTransport::new());
        let surface = Arc::new(surface);
        let toggles = Toggles::new(transport.clone(), surface.clone());
        (transport, surface, toggles)
    }

    #[tokio::test]
    async fn allow_list_on_cascades_to_session_and_loader() {
        let (transport, surface, toggles) = toggles();
        toggles.allow_list_on().await;

        let session = toggles.session().snapshot().await;
        assert!(session.checked && session.locked);
        assert!(toggles.allow_list().is_checked().await);
        assert_eq!(surface.applied(), vec![96]);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn allow_list_off_unlocks_session_only() {
        let (_, surface, toggles) = toggles();
        toggles.allow_list_on().await;
        toggles.allow_list_off().await;

        let session = toggles.session().snapshot().await;
        assert!(session.checked);
        assert!(!session.locked);
        assert_eq!(surface.applied(), vec![96]);
    }

    #[tokio::test]
    async fn session_off_is_refused_while_allow_listed() {
        let (_, surface, toggles) = toggles();
        toggles.allow_list_on().await;
        toggles.session_off().await;

        assert!(toggles.session().is_checked().await);
        assert_eq!(surface.applied(), vec![96]);
    }

    #[tokio::test]
    async fn user_session_toggle_sends_and_applies() {
        let (transport, surface, toggles) = toggles();

        assert_eq!(toggles.user_set_session(true).await, UserToggle::Applied);
        assert_eq!(toggles.user_set_session(false).await, UserToggle::Applied);

        let sent = transport.sent_of(MessageType::Allow);
        let data: Vec<_> = sent.into_iter().map(|e| e.data).collect();
        assert_eq!(data, vec![json!("on"), json!("off")]);
        assert_eq!(surface.applied(), vec![96, 0]);
        assert!(toggles.allow_list().is_locked().await);
    }

    #[tokio::test]
    async fn locked_session_ignores_user() {
        let (transport, _, toggles) = toggles();
        toggles.allow_list_on().await;

        assert_eq!(toggles.user_set_session(false).await, UserToggle::Ignored);
        assert!(transport.sent().is_empty());
        assert!(toggles.session().is_checked().await);
    }

    #[tokio::test]
    async fn allow_list_checkbox_is_locked_until_loader_opens() {
        let (transport, _, toggles) = toggles();
        assert_eq!(toggles.user_set_allow_list(true).await, UserToggle::Ignored);

        toggles.session_on().await;
        assert_eq!(toggles.user_set_allow_list(true).await, UserToggle::Applied);
        assert_eq!(transport.sent(), vec![Envelope::allow_list_add()]);
    }

    #[tokio::test]
    async fn allow_list_removal_sends_nothing() {
        let (transport, _, toggles) = toggles();
        toggles.allow_list_on().await;

        assert_eq!(toggles.user_set_allow_list(false).await, UserToggle::Applied);
        assert!(transport.sent().is_empty());
        assert!(!toggles.session().is_locked().await);
    }

    #[tokio::test]
    async fn session_click_during_allow_list_expansion_is_ignored() {
        let (transport, surface, toggles) = toggles_on(ManualSurface::manual(96));

        let joining = toggles.allow_list_on();
        tokio::pin!(joining);
        tokio::select! {
            biased;
            () = &mut joining => panic!("loader opened without a transition end"),
            () = tokio::task::yield_now() => {}
        }
        assert_eq!(surface.pending(), 1);

        // The loader is still opening; the session is already locked.
        assert_eq!(toggles.user_set_session(false).await, UserToggle::Ignored);
        assert!(transport.sent().is_empty());

        assert!(surface.fire_next());
        joining.await;

        let session = toggles.session().snapshot().await;
        assert!(session.checked && session.locked);
        assert!(toggles.allow_list().is_checked().await);
        assert_eq!(surface.applied(), vec![96]);
        assert!(toggles.loader().region().is_expanded().await);
    }

    #[tokio::test]
    async fn session_off_waiting_on_cascade_sees_allow_list() {
        let (_, surface, toggles) = toggles_on(ManualSurface::manual(96));

        tokio::join!(toggles.allow_list_on(), async {
            tokio::task::yield_now().await;
            toggles.session_off().await;
            assert!(surface.fire_next());
        });

        assert!(toggles.session().is_checked().await);
        assert!(toggles.allow_list().is_checked().await);
        assert_eq!(surface.applied(), vec![96]);
    }
}
