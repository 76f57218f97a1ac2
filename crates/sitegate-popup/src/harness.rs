//! Headless harness: runs the popup against a scripted background.
//!
//! The background side answers the two startup queries from the command
//! line and records every message the popup sends. The popup is opened,
//! the requested user actions are applied in order (session toggle,
//! allow-list toggle, file import, info clicks), and the final state is
//! reported as JSON.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use sitegate_core::Config;
use sitegate_proto::{Envelope, MessageType};

use crate::import::{DiskFile, ImportOutcome};
use crate::info_panel::{Click, ClickOutcome, InfoTarget};
use crate::popup::{OptionsPage, Popup, PopupSnapshot};
use crate::simulated::SimulatedSurface;
use crate::toggles::UserToggle;
use crate::transport::{ChannelTabHost, TabId, TabRequest, TabTransport};

/// Info click target that stands for a click outside every title.
pub const OUTSIDE: &str = "outside";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "sitegate-popup")]
#[command(version, about = "Drive the SiteGate popup against a scripted background", long_about = None)]
pub struct Args {
    /// Reply to the allow-list query: JSON text, a bare code, or `none`
    #[arg(long, env = "SITEGATE_ALLOW_LIST_REPLY", default_value = "false")]
    pub allow_list_reply: String,

    /// Reply to the session query: JSON text, a bare code, or `none`
    #[arg(long, env = "SITEGATE_SESSION_REPLY", default_value = "false")]
    pub session_reply: String,

    /// Flip the session checkbox after opening
    #[arg(long, value_enum)]
    pub toggle_session: Option<Switch>,

    /// Flip the allow-list checkbox after opening
    #[arg(long, value_enum)]
    pub toggle_allow_list: Option<Switch>,

    /// Import this file through the file loader
    #[arg(long)]
    pub import: Option<PathBuf>,

    /// Click an info title by id (`outside` clicks elsewhere). Repeatable.
    #[arg(long = "info")]
    pub info: Vec<String>,

    /// Open the options page
    #[arg(long)]
    pub options: bool,

    /// Run without an active tab
    #[arg(long)]
    pub no_tab: bool,

    /// Config file layered over the global one
    #[arg(long, env = "SITEGATE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Background task failed: {0}")]
    Background(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Core(#[from] sitegate_core::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum ImportReport {
    Imported(ImportOutcome),
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarnessReport {
    pub snapshot: PopupSnapshot,
    pub session_toggle: Option<UserToggle>,
    pub allow_list_toggle: Option<UserToggle>,
    pub import: Option<ImportReport>,
    pub clicks: Vec<ClickOutcome>,
    pub options_opened: bool,
    /// Every message the popup sent, in order.
    pub messages: Vec<Envelope>,
}

impl HarnessReport {
    pub fn to_json(&self) -> sitegate_core::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Parse a scripted reply. Text that is not JSON is taken as a string code.
pub fn parse_reply(raw: &str) -> Option<Value> {
    if raw.eq_ignore_ascii_case("none") {
        return None;
    }
    Some(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
}

/// Information titles shown in the popup.
pub fn default_info_targets() -> Vec<InfoTarget> {
    vec![
        InfoTarget::new(
            "session",
            "Allow the extension to run on this page until the browser closes.",
        ),
        InfoTarget::new(
            "allow_list",
            "Always allow the extension on this site. Implies the session permission.",
        ),
        InfoTarget::new(
            "loader",
            "Load a JSON file with the steps to run on this page.",
        ),
    ]
}

struct LoggedOptionsPage;

impl OptionsPage for LoggedOptionsPage {
    fn open(&self) {
        info!("Options page opened");
    }
}

/// Answer `background-wake` queries from the script and record everything.
async fn scripted_background(
    mut rx: mpsc::Receiver<TabRequest>,
    mut wake_replies: VecDeque<Option<Value>>,
) -> Vec<Envelope> {
    let mut log = Vec::new();
    while let Some(request) = rx.recv().await {
        debug!(kind = %request.envelope.kind, data = %request.envelope.data, "Tab received message");
        log.push(request.envelope.clone());
        let reply = if request.envelope.kind == MessageType::BackgroundWake {
            wake_replies.pop_front().flatten()
        } else {
            None
        };
        match reply {
            Some(value) => request.reply(value),
            None => request.ignore(),
        }
    }
    log
}

pub async fn run(args: &Args, config: &Config) -> Result<HarnessReport, HarnessError> {
    let active = (!args.no_tab).then_some(TabId(1));
    let (host, rx) = ChannelTabHost::new(active, 16);
    let replies = [&args.allow_list_reply, &args.session_reply]
        .into_iter()
        .map(|raw| parse_reply(raw))
        .collect();
    let background = tokio::spawn(scripted_background(rx, replies));

    let mut report = {
        let popup = Popup::new(
            Arc::new(TabTransport::new(host)),
            SimulatedSurface::loader(&config.animation),
            SimulatedSurface::info(&config.animation),
            default_info_targets(),
        )
        .with_options_page(Arc::new(LoggedOptionsPage));

        popup.open().await;

        let session_toggle = match args.toggle_session {
            Some(switch) => Some(popup.toggles().user_set_session(switch.is_on()).await),
            None => None,
        };
        let allow_list_toggle = match args.toggle_allow_list {
            Some(switch) => Some(popup.toggles().user_set_allow_list(switch.is_on()).await),
            None => None,
        };
        let import = match &args.import {
            Some(path) => Some(match popup.import_file(&DiskFile::new(path)).await {
                Ok(outcome) => ImportReport::Imported(outcome),
                Err(e) => ImportReport::Failed {
                    error: e.to_string(),
                },
            }),
            None => None,
        };

        let mut clicks = Vec::with_capacity(args.info.len());
        for id in &args.info {
            let click = if id == OUTSIDE {
                Click::Outside
            } else {
                Click::Target(id)
            };
            clicks.push(popup.info().click(click).await);
        }

        let options_opened = args.options && popup.open_options();

        HarnessReport {
            snapshot: popup.snapshot().await,
            session_toggle,
            allow_list_toggle,
            import,
            clicks,
            options_opened,
            messages: Vec::new(),
        }
    };

    // The popup and its transport are gone, so the background sees the
    // channel close.
    report.messages = background.await?;
    Ok(report)
}
