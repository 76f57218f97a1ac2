//! Transport to the content script of the active tab.
//!
//! Every send resolves with the tab's reply, or with `None` when there is no
//! active tab or the tab does not answer. The two cases are indistinguishable
//! to the caller. There are no retries and no timeout: a tab that keeps the
//! reply channel open without answering leaves the send pending.

use std::future::Future;

use serde_json::Value;
use tokio::sync::{RwLock, mpsc, oneshot};
use tracing::debug;

use sitegate_proto::{Envelope, MessageType};

/// Browser tab identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(pub u32);

/// Sends typed messages to the single active foreground surface.
pub trait Transport: Send + Sync {
    fn send(&self, data: Value, kind: MessageType) -> impl Future<Output = Option<Value>> + Send;
}

/// Access to the hosting browser's tabs.
pub trait TabHost: Send + Sync {
    /// The active tab of the current window, if any.
    fn active_tab(&self) -> impl Future<Output = Option<TabId>> + Send;

    /// Deliver `envelope` to `tab` and wait for its reply.
    fn deliver(
        &self,
        tab: TabId,
        envelope: Envelope,
    ) -> impl Future<Output = Option<Value>> + Send;
}

/// [`Transport`] that resolves the active tab on every send.
#[derive(Debug)]
pub struct TabTransport<H> {
    host: H,
}

impl<H: TabHost> TabTransport<H> {
    pub const fn new(host: H) -> Self {
        Self { host }
    }
}

impl<H: TabHost> Transport for TabTransport<H> {
    async fn send(&self, data: Value, kind: MessageType) -> Option<Value> {
        let Some(tab) = self.host.active_tab().await else {
            debug!(%kind, "No active tab, message dropped");
            return None;
        };
        let reply = self.host.deliver(tab, Envelope::new(data, kind)).await;
        debug!(%kind, tab = tab.0, replied = reply.is_some(), "Message delivered");
        reply
    }
}

/// A message waiting on the content-script side of a [`ChannelTabHost`].
#[derive(Debug)]
pub struct TabRequest {
    pub tab: TabId,
    pub envelope: Envelope,
    reply: oneshot::Sender<Value>,
}

impl TabRequest {
    /// Answer the popup.
    pub fn reply(self, value: Value) {
        // The popup may already be gone; nothing to do then.
        let _ = self.reply.send(value);
    }

    /// Close the request without an answer. The popup sees `None`.
    pub fn ignore(self) {
        drop(self.reply);
    }
}

/// In-process [`TabHost`]: each delivered message becomes a [`TabRequest`]
/// on an mpsc channel, answered through a oneshot.
#[derive(Debug)]
pub struct ChannelTabHost {
    active: RwLock<Option<TabId>>,
    tx: mpsc::Sender<TabRequest>,
}

impl ChannelTabHost {
    /// Create a host and the receiver the content-script side listens on.
    pub fn new(active: Option<TabId>, capacity: usize) -> (Self, mpsc::Receiver<TabRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        let host = Self {
            active: RwLock::new(active),
            tx,
        };
        (host, rx)
    }

    /// Switch the active tab (or clear it).
    pub async fn set_active(&self, tab: Option<TabId>) {
        *self.active.write().await = tab;
    }
}

impl TabHost for ChannelTabHost {
    async fn active_tab(&self) -> Option<TabId> {
        *self.active.read().await
    }

    async fn deliver(&self, tab: TabId, envelope: Envelope) -> Option<Value> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = TabRequest {
            tab,
            envelope,
            reply: reply_tx,
        };
        if self.tx.send(request).await.is_err() {
            debug!(tab = tab.0, "No content script listening");
            return None;
        }
        reply_rx.await.ok()
    }
}
