//! Warning banner shown when the page cannot be handled normally.

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::warn;

use sitegate_proto::PermissionState;

pub const LOCAL_FILE_MESSAGE: &str = "Chrome doesn't support loading local files automatically";
pub const UNKNOWN_PROTOCOL_MESSAGE: &str =
    "Unsupported protocol. Supported protocols are: http, https and (local) file";
pub const INVALID_ORIGIN_MESSAGE: &str =
    "The linked JSON page isn't at the same origin and directory as the document";
pub const UNSUPPORTED_SCHEME_MESSAGE: &str =
    "Unsupported URL scheme. Supported URL schemes are: http://, https://, or file://";
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown Error";

/// What the file-input restriction does to the control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileInputRestriction {
    Remove,
    Disable,
}

/// Restriction that accompanies a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum WarningKind {
    /// Remove the whole file loader.
    DisableLoader,
    /// Lock the allow-list checkbox unless `enable_checkbox`, then set it.
    CheckboxRestriction { enable_checkbox: bool, checked: bool },
    FileInputRestriction { action: FileInputRestriction },
}

impl WarningKind {
    /// Locked and unchecked allow-list checkbox.
    pub const LOCKED_CHECKBOX: Self = Self::CheckboxRestriction {
        enable_checkbox: false,
        checked: false,
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub message: String,
    /// `None` for the generic warning, which restricts nothing.
    pub kind: Option<WarningKind>,
    pub visible: bool,
}

impl Warning {
    /// Warning for an exception reply, if `state` is one.
    pub fn for_state(state: PermissionState) -> Option<Self> {
        let (message, kind) = match state {
            PermissionState::LocalFileRestricted => {
                (LOCAL_FILE_MESSAGE, Some(WarningKind::LOCKED_CHECKBOX))
            }
            PermissionState::UnsupportedProtocol => {
                (UNKNOWN_PROTOCOL_MESSAGE, Some(WarningKind::LOCKED_CHECKBOX))
            }
            PermissionState::InvalidOrigin => {
                (INVALID_ORIGIN_MESSAGE, Some(WarningKind::LOCKED_CHECKBOX))
            }
            PermissionState::UnsupportedScheme => {
                (UNSUPPORTED_SCHEME_MESSAGE, Some(WarningKind::DisableLoader))
            }
            _ => return None,
        };
        Some(Self {
            message: message.to_string(),
            kind,
            visible: true,
        })
    }

    pub fn unknown_error() -> Self {
        Self {
            message: UNKNOWN_ERROR_MESSAGE.to_string(),
            kind: None,
            visible: true,
        }
    }
}

/// The single warning slot of the popup. Empty until the first warning and
/// never cleared afterwards; a later warning replaces the text and kind.
#[derive(Debug, Default)]
pub struct WarningDisplay {
    slot: RwLock<Option<Warning>>,
}

impl WarningDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn show(&self, warning: Warning) {
        warn!(message = %warning.message, kind = ?warning.kind, "Warning shown");
        *self.slot.write().await = Some(warning);
    }

    pub async fn current(&self) -> Option<Warning> {
        self.slot.read().await.clone()
    }
}
