#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

//! End-to-end popup flows over the in-process tab channel.
//!
//! A spawned task plays the content script: it answers the startup queries
//! from a script and records every message it receives.

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use sitegate_popup::testing::{ManualSurface, RecordingTransport, StaticFile};
use sitegate_popup::toggles::UserToggle;
use sitegate_popup::transport::{ChannelTabHost, TabId, TabRequest, TabTransport};
use sitegate_popup::warning::INVALID_ORIGIN_MESSAGE;
use sitegate_popup::{Popup, Transport};
use sitegate_proto::{Envelope, MessageType, PermissionState};

type ChannelPopup =
    Popup<TabTransport<ChannelTabHost>, Arc<ManualSurface>, Arc<ManualSurface>>;

/// Content script that answers wake queries in order and ignores the rest.
fn content_script(
    mut rx: mpsc::Receiver<TabRequest>,
    replies: Vec<Option<Value>>,
) -> JoinHandle<Vec<Envelope>> {
    tokio::spawn(async move {
        let mut replies = replies.into_iter();
        let mut seen = Vec::new();
        while let Some(request) = rx.recv().await {
            seen.push(request.envelope.clone());
            let reply = if request.envelope.kind == MessageType::BackgroundWake {
                replies.next().flatten()
            } else {
                None
            };
            match reply {
                Some(value) => request.reply(value),
                None => request.ignore(),
            }
        }
        seen
    })
}

fn channel_popup(
    replies: Vec<Option<Value>>,
) -> (ChannelPopup, Arc<ManualSurface>, JoinHandle<Vec<Envelope>>) {
    let (host, rx) = ChannelTabHost::new(Some(TabId(4)), 8);
    let script = content_script(rx, replies);
    let loader = Arc::new(ManualSurface::immediate(96));
    let popup = Popup::new(
        Arc::new(TabTransport::new(host)),
        loader.clone(),
        Arc::new(ManualSurface::text_immediate()),
        Vec::new(),
    );
    (popup, loader, script)
}

#[tokio::test]
async fn invalid_origin_restricts_checkbox_and_still_asks_for_session() {
    let (popup, loader, script) =
        channel_popup(vec![Some(json!("invalid_origin")), Some(json!(true))]);

    let report = popup.open().await;
    assert_eq!(report.allow_list, PermissionState::InvalidOrigin);
    assert_eq!(report.session, Some(PermissionState::Granted));

    let snapshot = popup.snapshot().await;
    let warning = snapshot.warning.unwrap();
    assert_eq!(warning.message, INVALID_ORIGIN_MESSAGE);
    assert!(warning.visible);
    assert!(snapshot.allow_list.locked);
    assert!(!snapshot.allow_list.checked);
    // The second reply drives the session on its own.
    assert!(snapshot.session.checked);
    assert!(!snapshot.session.locked);
    assert_eq!(loader.applied(), vec![96]);

    drop(popup);
    let seen = script.await.unwrap();
    assert_eq!(
        seen,
        vec![Envelope::allow_list_query(), Envelope::session_query()]
    );
}

#[tokio::test]
async fn silent_tab_ends_reconciliation_after_one_query() {
    let (popup, loader, script) = channel_popup(vec![None, Some(json!(true))]);

    let report = popup.open().await;
    assert_eq!(report.allow_list, PermissionState::UnsupportedScheme);
    assert_eq!(report.session, None);
    assert!(loader.is_detached());
    assert!(popup.snapshot().await.loader.region.detached);

    drop(popup);
    assert_eq!(script.await.unwrap().len(), 1);
}

#[tokio::test]
async fn user_allow_list_add_sends_one_message() {
    let transport = Arc::new(RecordingTransport::with_wake_replies([
        Some(json!(false)),
        Some(json!(true)),
    ]));
    let popup = Popup::new(
        transport.clone(),
        Arc::new(ManualSurface::immediate(96)),
        Arc::new(ManualSurface::text_immediate()),
        Vec::new(),
    );
    popup.open().await;

    assert_eq!(
        popup.toggles().user_set_allow_list(true).await,
        UserToggle::Applied
    );
    assert_eq!(
        transport.sent_of(MessageType::Whitelist),
        vec![Envelope::allow_list_add()]
    );
    // The cascade onto the session toggle sends nothing.
    assert!(transport.sent_of(MessageType::Allow).is_empty());
}

#[tokio::test]
async fn cascade_invariant_holds_across_toggle_sequences() {
    let transport = Arc::new(RecordingTransport::new());
    let popup = Popup::new(
        transport,
        Arc::new(ManualSurface::immediate(96)),
        Arc::new(ManualSurface::text_immediate()),
        Vec::new(),
    );
    let toggles = popup.toggles();

    let steps: [(&str, bool); 10] = [
        ("session", true),
        ("allow_list", true),
        ("session", false),
        ("allow_list", false),
        ("session", false),
        ("allow_list", true),
        ("session", true),
        ("allow_list", true),
        ("allow_list", false),
        ("session", true),
    ];
    for (control, on) in steps {
        match control {
            "session" => toggles.user_set_session(on).await,
            _ => toggles.user_set_allow_list(on).await,
        };
        if toggles.allow_list().is_checked().await {
            let session = toggles.session().snapshot().await;
            assert!(session.checked, "after {control}={on}");
            assert!(session.locked, "after {control}={on}");
        }
    }
}

#[tokio::test]
async fn import_forwards_file_text_under_json() {
    let transport = Arc::new(RecordingTransport::with_wake_replies([
        Some(json!(true)),
        Some(json!(true)),
    ]));
    let popup = Popup::new(
        transport.clone(),
        Arc::new(ManualSurface::immediate(96)),
        Arc::new(ManualSurface::text_immediate()),
        Vec::new(),
    );
    popup.open().await;

    popup
        .import_file(&StaticFile::plain("steps.txt", "[\"click\"]"))
        .await
        .unwrap();
    assert!(popup
        .import_file(&StaticFile::unreadable("broken.json"))
        .await
        .is_err());

    assert_eq!(
        transport.sent_of(MessageType::Json),
        vec![Envelope::import("[\"click\"]")]
    );
    let alert = popup.snapshot().await.import_alert.unwrap();
    assert_eq!(alert.text, "Error. Cannot load file.");
}

#[tokio::test]
async fn no_active_tab_answers_none() {
    let (host, _rx) = ChannelTabHost::new(None, 1);
    let transport = TabTransport::new(host);
    assert_eq!(
        transport.send(json!(true), MessageType::BackgroundWake).await,
        None
    );
}
