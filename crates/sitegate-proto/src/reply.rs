//! Status query replies.
//!
//! The content script answers `background-wake` queries with either a JSON
//! boolean or one of a few exception codes. A missing reply means no content
//! script is listening on the tab.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reply code: local files cannot be loaded automatically.
pub const LOCAL_FILE_EXCEPTION: &str = "chrome_local_exception";
/// Reply code: the page protocol is not supported.
pub const UNKNOWN_PROTOCOL: &str = "unknown_protocol";
/// Reply code: the linked JSON is not next to the document.
pub const INVALID_ORIGIN: &str = "invalid_origin";

/// Authoritative permission state as reported by the background process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Granted,
    Denied,
    OnAllowList,
    NotOnAllowList,
    /// No content script answered (unsupported URL scheme).
    UnsupportedScheme,
    UnsupportedProtocol,
    InvalidOrigin,
    LocalFileRestricted,
    Unknown,
}

/// Classify the reply to the first (allow-list) query.
pub fn classify_allow_list(reply: Option<&Value>) -> PermissionState {
    let Some(value) = reply else {
        return PermissionState::UnsupportedScheme;
    };
    match value {
        Value::Bool(true) => PermissionState::OnAllowList,
        Value::Bool(false) => PermissionState::NotOnAllowList,
        Value::String(code) => match code.as_str() {
            LOCAL_FILE_EXCEPTION => PermissionState::LocalFileRestricted,
            UNKNOWN_PROTOCOL => PermissionState::UnsupportedProtocol,
            INVALID_ORIGIN => PermissionState::InvalidOrigin,
            _ => PermissionState::Unknown,
        },
        _ => PermissionState::Unknown,
    }
}

/// Classify the reply to the second (session permission) query.
///
/// Only a boolean is meaningful here; a missing reply is `Unknown` too.
pub fn classify_session(reply: Option<&Value>) -> PermissionState {
    match reply {
        Some(Value::Bool(true)) => PermissionState::Granted,
        Some(Value::Bool(false)) => PermissionState::Denied,
        _ => PermissionState::Unknown,
    }
}
