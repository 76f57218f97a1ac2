//! The collapsible file-loader section.
//!
//! The loader owns an animated region and the controls inside it: the file
//! input and the allow-list checkbox. Its inner controls are usable only
//! while the region is open, so they unlock when an expansion starts and
//! lock when a collapse starts.

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::animation::{
    AnimatableRegion, RegionSnapshot, RegionSurface, RegionTarget, TransitionOutcome,
};
use crate::controls::ToggleControl;
use crate::warning::{FileInputRestriction, WarningKind};

/// State of the file input inside the loader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileInputState {
    /// Locked while the loader is collapsed.
    pub locked: bool,
    /// Disabled by a restriction. No later unlock clears it.
    pub disabled: bool,
    /// Removed from the popup, either with the loader or by a restriction.
    pub removed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoaderSnapshot {
    pub region: RegionSnapshot,
    pub file_input: FileInputState,
}

pub struct FileLoader<S> {
    region: AnimatableRegion<S>,
    file_input: RwLock<FileInputState>,
    allow_list: ToggleControl,
}

impl<S: RegionSurface> FileLoader<S> {
    /// Create a collapsed loader with its inner controls locked.
    pub fn new(surface: S, allow_list: ToggleControl) -> Self {
        Self {
            region: AnimatableRegion::new("loader", surface),
            file_input: RwLock::new(FileInputState {
                locked: true,
                ..FileInputState::default()
            }),
            allow_list,
        }
    }

    pub const fn region(&self) -> &AnimatableRegion<S> {
        &self.region
    }

    pub async fn file_input(&self) -> FileInputState {
        *self.file_input.read().await
    }

    /// Whether a file can be picked right now.
    pub async fn accepts_files(&self) -> bool {
        let input = self.file_input.read().await;
        !(input.locked || input.disabled || input.removed)
    }

    pub async fn expand(&self) -> TransitionOutcome {
        self.region
            .transition_with(RegionTarget::Expanded, move || self.unlock_inner())
            .await
    }

    pub async fn collapse(&self) -> TransitionOutcome {
        self.region
            .transition_with(RegionTarget::Collapsed, move || self.lock_inner())
            .await
    }

    /// Remove the loader from the panel.
    pub async fn remove(&self) {
        self.region.detach().await;
        self.file_input.write().await.removed = true;
        info!("File loader removed");
    }

    /// Apply the restriction carried by a warning.
    pub async fn apply_restriction(&self, kind: WarningKind) {
        match kind {
            WarningKind::DisableLoader => self.remove().await,
            WarningKind::CheckboxRestriction {
                enable_checkbox,
                checked,
            } => {
                if !enable_checkbox {
                    self.allow_list.restrict().await;
                }
                self.allow_list.set_checked(checked).await;
            }
            WarningKind::FileInputRestriction { action } => {
                let mut input = self.file_input.write().await;
                match action {
                    FileInputRestriction::Remove => input.removed = true,
                    FileInputRestriction::Disable => {
                        input.disabled = true;
                        input.locked = true;
                    }
                }
                debug!(?action, "File input restricted");
            }
        }
    }

    pub async fn snapshot(&self) -> LoaderSnapshot {
        LoaderSnapshot {
            region: self.region.snapshot().await,
            file_input: self.file_input().await,
        }
    }

    async fn unlock_inner(&self) {
        {
            let mut input = self.file_input.write().await;
            if !input.disabled {
                input.locked = false;
            }
        }
        self.allow_list.unlock().await;
    }

    async fn lock_inner(&self) {
        self.file_input.write().await.locked = true;
        self.allow_list.lock().await;
    }
}
