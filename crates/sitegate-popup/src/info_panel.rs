//! Info disclosure panel.
//!
//! Clicking an info title shows its text in a shared region below the
//! titles. Clicking it again, or anywhere else, hides the text. Switching
//! titles while one is shown collapses the region, swaps the text, and
//! expands again. Clicks that arrive while the region is animating are
//! dropped.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::animation::{AnimatableRegion, RegionSnapshot, RegionSurface, TransitionOutcome};

/// A surface whose content is text.
pub trait TextContent {
    fn set_text(&self, text: &str);
}

impl<T: TextContent + ?Sized> TextContent for Arc<T> {
    fn set_text(&self, text: &str) {
        (**self).set_text(text);
    }
}

/// A clickable info title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfoTarget {
    pub id: String,
    pub title: String,
}

impl InfoTarget {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Click<'a> {
    /// A click on the info title with this id.
    Target(&'a str),
    /// A click anywhere else in the popup.
    Outside,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ClickOutcome {
    /// The region was animating; the click was dropped.
    Suppressed,
    /// Nothing was shown and nothing changed.
    Ignored,
    Expanded { target: String },
    /// Another title's text replaced the shown one.
    Swapped { target: String },
    Collapsed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfoSnapshot {
    pub region: RegionSnapshot,
    pub expanded_target: Option<String>,
    pub text: String,
}

#[derive(Debug, Default)]
struct InfoState {
    expanded_target: Option<String>,
    text: String,
}

pub struct InfoPanel<S> {
    region: AnimatableRegion<S>,
    targets: Vec<InfoTarget>,
    state: RwLock<InfoState>,
}

impl<S: RegionSurface + TextContent> InfoPanel<S> {
    pub fn new(surface: S, targets: Vec<InfoTarget>) -> Self {
        Self {
            region: AnimatableRegion::new("info", surface),
            targets,
            state: RwLock::new(InfoState::default()),
        }
    }

    pub const fn region(&self) -> &AnimatableRegion<S> {
        &self.region
    }

    pub fn targets(&self) -> &[InfoTarget] {
        &self.targets
    }

    pub async fn click(&self, click: Click<'_>) -> ClickOutcome {
        let Some(guard) = self.region.try_begin() else {
            debug!(?click, "Info panel busy, click dropped");
            return ClickOutcome::Suppressed;
        };

        let target = match click {
            Click::Target(id) => self.targets.iter().find(|t| t.id == id),
            Click::Outside => None,
        };

        let next = {
            let mut state = self.state.write().await;
            match target {
                Some(target) if state.expanded_target.as_deref() == Some(target.id.as_str()) => {
                    state.expanded_target = None;
                    None
                }
                Some(target) if !target.title.is_empty() => {
                    state.expanded_target = Some(target.id.clone());
                    Some(target)
                }
                Some(_) => {
                    state.expanded_target = None;
                    None
                }
                None if state.text.is_empty() => return ClickOutcome::Ignored,
                None => {
                    state.expanded_target = None;
                    None
                }
            }
        };

        let surface = self.region.surface();
        let Some(target) = next else {
            guard.collapse().await;
            surface.set_text("");
            self.state.write().await.text.clear();
            debug!("Info collapsed");
            return ClickOutcome::Collapsed;
        };

        let was_expanded = self.region.is_expanded().await;
        let outcome = guard.swap_content(|| surface.set_text(&target.title)).await;
        self.state.write().await.text.clone_from(&target.title);
        debug!(target = %target.id, ?outcome, "Info shown");

        if was_expanded && outcome != TransitionOutcome::Detached {
            ClickOutcome::Swapped {
                target: target.id.clone(),
            }
        } else {
            ClickOutcome::Expanded {
                target: target.id.clone(),
            }
        }
    }

    pub async fn snapshot(&self) -> InfoSnapshot {
        let state = self.state.read().await;
        InfoSnapshot {
            region: self.region.snapshot().await,
            expanded_target: state.expanded_target.clone(),
            text: state.text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ManualSurface;

    fn panel(surface: Arc<ManualSurface>) -> InfoPanel<Arc<ManualSurface>> {
        InfoPanel::new(
            surface,
            vec![
                InfoTarget::new("session", "Allow this page for the session"),
                InfoTarget::new("allow_list", "Always allow this site"),
                InfoTarget::new("blank", ""),
            ],
        )
    }

    #[tokio::test]
    async fn click_expands_then_second_click_collapses() {
        let surface = Arc::new(ManualSurface::text_immediate());
        let panel = panel(surface.clone());

        assert_eq!(
            panel.click(Click::Target("session")).await,
            ClickOutcome::Expanded {
                target: "session".into()
            }
        );
        assert_eq!(panel.snapshot().await.text, "Allow this page for the session");

        assert_eq!(panel.click(Click::Target("session")).await, ClickOutcome::Collapsed);
        let snapshot = panel.snapshot().await;
        assert!(snapshot.text.is_empty());
        assert_eq!(snapshot.expanded_target, None);
        assert_eq!(surface.applied(), vec![31, 0]);
        assert_eq!(surface.current_text(), "");
    }

    #[tokio::test]
    async fn switching_targets_passes_through_zero() {
        let surface = Arc::new(ManualSurface::text_immediate());
        let panel = panel(surface.clone());

        panel.click(Click::Target("session")).await;
        assert_eq!(
            panel.click(Click::Target("allow_list")).await,
            ClickOutcome::Swapped {
                target: "allow_list".into()
            }
        );
        assert_eq!(surface.applied(), vec![31, 0, 22]);
        assert_eq!(
            panel.snapshot().await.expanded_target.as_deref(),
            Some("allow_list")
        );
    }

    #[tokio::test]
    async fn outside_click_only_acts_when_shown() {
        let surface = Arc::new(ManualSurface::text_immediate());
        let panel = panel(surface.clone());

        assert_eq!(panel.click(Click::Outside).await, ClickOutcome::Ignored);
        panel.click(Click::Target("allow_list")).await;
        assert_eq!(panel.click(Click::Outside).await, ClickOutcome::Collapsed);
        // Unknown ids count as outside clicks.
        assert_eq!(panel.click(Click::Target("nope")).await, ClickOutcome::Ignored);
        assert_eq!(surface.applied(), vec![22, 0]);
    }

    #[tokio::test]
    async fn empty_title_collapses() {
        let surface = Arc::new(ManualSurface::text_immediate());
        let panel = panel(surface.clone());

        panel.click(Click::Target("session")).await;
        assert_eq!(panel.click(Click::Target("blank")).await, ClickOutcome::Collapsed);
        assert_eq!(panel.snapshot().await.expanded_target, None);
    }

    #[tokio::test]
    async fn clicks_during_animation_are_dropped() {
        let surface = Arc::new(ManualSurface::text_manual());
        let panel = panel(surface.clone());

        let first = panel.click(Click::Target("session"));
        tokio::pin!(first);
        tokio::select! {
            biased;
            _ = &mut first => panic!("transition ended without a signal"),
            () = tokio::task::yield_now() => {}
        }

        assert_eq!(
            panel.click(Click::Target("allow_list")).await,
            ClickOutcome::Suppressed
        );
        assert_eq!(panel.click(Click::Outside).await, ClickOutcome::Suppressed);

        assert!(surface.fire_next());
        assert_eq!(
            first.await,
            ClickOutcome::Expanded {
                target: "session".into()
            }
        );
        assert_eq!(surface.applied(), vec![31]);
    }
}
