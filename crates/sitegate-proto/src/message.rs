//! Outbound message envelope.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message types understood by the content script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    /// Session permission toggled (`"on"` / `"off"`).
    Allow,
    /// Allow-list change (`"add"`).
    Whitelist,
    /// Raw contents of an imported file.
    Json,
    /// Status query. The two startup queries share this type and are told
    /// apart by send order only.
    BackgroundWake,
}

impl MessageType {
    /// Wire name of the type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Whitelist => "whitelist",
            Self::Json => "json",
            Self::BackgroundWake => "background-wake",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{"data": ..., "type": ...}` as delivered to the tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub data: Value,
    #[serde(rename = "type")]
    pub kind: MessageType,
}

impl Envelope {
    pub const fn new(data: Value, kind: MessageType) -> Self {
        Self { data, kind }
    }

    /// Session permission toggle notification.
    pub fn session_toggle(on: bool) -> Self {
        let data = if on { "on" } else { "off" };
        Self::new(Value::from(data), MessageType::Allow)
    }

    /// Allow-list addition notification.
    pub fn allow_list_add() -> Self {
        Self::new(Value::from("add"), MessageType::Whitelist)
    }

    /// Imported file contents, forwarded verbatim.
    pub fn import(contents: impl Into<String>) -> Self {
        Self::new(Value::String(contents.into()), MessageType::Json)
    }

    /// First startup query: allow-list membership.
    pub const fn allow_list_query() -> Self {
        Self::new(Value::Bool(true), MessageType::BackgroundWake)
    }

    /// Second startup query: session permission.
    pub const fn session_query() -> Self {
        Self::new(Value::Null, MessageType::BackgroundWake)
    }
}
