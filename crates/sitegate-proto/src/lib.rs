//! SiteGate Protocol
//!
//! Message shapes exchanged between the popup and the content script of the
//! active tab:
//! - `Envelope` / `MessageType` for outbound messages
//! - `PermissionState` and the reply classifiers for status queries

pub mod message;
pub mod reply;

pub use message::{Envelope, MessageType};
pub use reply::{PermissionState, classify_allow_list, classify_session};
