//! Startup reconciliation of the toggles with the background state.
//!
//! Two `background-wake` queries run strictly in order. The first asks for
//! allow-list membership and may report an exception; the second asks for
//! the session permission. A missing first reply means no content script is
//! listening, which ends reconciliation before the second query.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use sitegate_proto::{Envelope, PermissionState, classify_allow_list, classify_session};

use crate::animation::RegionSurface;
use crate::toggles::Toggles;
use crate::transport::Transport;
use crate::warning::{Warning, WarningDisplay};

/// What the background reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub allow_list: PermissionState,
    /// `None` when the second query was never sent.
    pub session: Option<PermissionState>,
}

/// One startup reconciliation over borrowed popup parts.
pub struct Reconciler<'a, T, S> {
    transport: &'a T,
    toggles: &'a Toggles<T, S>,
    warnings: &'a WarningDisplay,
}

impl<'a, T: Transport, S: RegionSurface> Reconciler<'a, T, S> {
    pub const fn new(
        transport: &'a T,
        toggles: &'a Toggles<T, S>,
        warnings: &'a WarningDisplay,
    ) -> Self {
        Self {
            transport,
            toggles,
            warnings,
        }
    }

    pub async fn run(&self) -> ReconcileReport {
        let first = self.query(Envelope::allow_list_query()).await;
        let allow_list = classify_allow_list(first.as_ref());
        info!(reply = ?first, state = ?allow_list, "Allow-list status received");

        if !self.handle_allow_list(allow_list, first.as_ref()).await {
            return ReconcileReport {
                allow_list,
                session: None,
            };
        }

        let second = self.query(Envelope::session_query()).await;
        let session = classify_session(second.as_ref());
        info!(reply = ?second, state = ?session, "Session status received");
        self.handle_session(session).await;

        ReconcileReport {
            allow_list,
            session: Some(session),
        }
    }

    async fn query(&self, envelope: Envelope) -> Option<Value> {
        self.transport.send(envelope.data, envelope.kind).await
    }

    /// Apply the first reply. Returns whether to continue with the second
    /// query.
    async fn handle_allow_list(&self, state: PermissionState, reply: Option<&Value>) -> bool {
        match state {
            PermissionState::OnAllowList => self.toggles.allow_list_on().await,
            PermissionState::NotOnAllowList => self.toggles.allow_list_off().await,
            PermissionState::UnsupportedScheme => {
                self.restrict(state).await;
                return false;
            }
            PermissionState::LocalFileRestricted
            | PermissionState::UnsupportedProtocol
            | PermissionState::InvalidOrigin => self.restrict(state).await,
            _ => warn!(?reply, "Unrecognised allow-list reply, leaving toggles as they are"),
        }
        true
    }

    async fn handle_session(&self, state: PermissionState) {
        match state {
            PermissionState::Granted => self.toggles.session_on().await,
            PermissionState::Denied => {
                if self.toggles.allow_list().is_checked().await {
                    warn!("Session reported off for an allow-listed site, ignoring");
                } else {
                    self.toggles.session_off().await;
                }
            }
            _ => self.warnings.show(Warning::unknown_error()).await,
        }
    }

    async fn restrict(&self, state: PermissionState) {
        let Some(warning) = Warning::for_state(state) else {
            return;
        };
        let kind = warning.kind;
        self.warnings.show(warning).await;
        if let Some(kind) = kind {
            self.toggles.loader().apply_restriction(kind).await;
        }
    }
}
