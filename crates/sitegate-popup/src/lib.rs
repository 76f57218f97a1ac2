//! `SiteGate` Popup Library
//!
//! Control logic of the extension popup:
//! - Transport to the content script of the active tab
//! - Height animation of panel regions, one transition at a time
//! - Session / allow-list toggles and their cascade rules
//! - Startup status reconciliation with the background process
//! - Info disclosure panel and file import

pub mod animation;
pub mod controls;
pub mod harness;
pub mod import;
pub mod info_panel;
pub mod loader;
pub mod popup;
pub mod reconciler;
pub mod simulated;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod toggles;
pub mod transport;
pub mod warning;

pub use animation::{AnimatableRegion, RegionSurface, TransitionOutcome};
pub use popup::{Popup, PopupSnapshot};
pub use reconciler::{ReconcileReport, Reconciler};
pub use toggles::Toggles;
pub use transport::{ChannelTabHost, TabHost, TabTransport, Transport};
