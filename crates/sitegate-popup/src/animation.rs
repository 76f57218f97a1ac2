//! Height animation for collapsible panel regions.
//!
//! A region animates its height between 0 and the natural height of its
//! inner content. One transition runs per region at a time: the running
//! transition holds the region gate. [`AnimatableRegion::transition_to`]
//! keeps at most one queued target, and a newer request supersedes the queued
//! one instead of appending. [`AnimatableRegion::try_begin`] refuses to wait
//! at all, for callers that drop input while a region is busy.
//!
//! Completion is a fresh single-use [`TransitionSignal`] per applied height.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard, RwLock, oneshot};
use tracing::debug;

/// The rendered element behind a region.
pub trait RegionSurface: Send + Sync {
    /// Natural height of the designated inner content element.
    fn inner_height(&self) -> u32;

    /// Write a new height. The returned signal resolves when the resulting
    /// transition ends.
    fn apply_height(&self, px: u32) -> TransitionSignal;

    /// Remove the element from the panel.
    fn detach(&self) {}
}

impl<T: RegionSurface + ?Sized> RegionSurface for Arc<T> {
    fn inner_height(&self) -> u32 {
        (**self).inner_height()
    }

    fn apply_height(&self, px: u32) -> TransitionSignal {
        (**self).apply_height(px)
    }

    fn detach(&self) {
        (**self).detach();
    }
}

/// Sending half of a transition-end signal. Firing consumes it.
#[derive(Debug)]
pub struct TransitionEnd(oneshot::Sender<()>);

impl TransitionEnd {
    /// Report the end of the transition to the waiting region. A region that
    /// is already gone is not an error.
    pub fn fire(self) {
        // The waiting region may have been dropped with the popup.
        let _ = self.0.send(());
    }
}

/// Resolves once when a transition ends. A dropped [`TransitionEnd`] counts
/// as ended.
#[derive(Debug)]
pub struct TransitionSignal(oneshot::Receiver<()>);

impl TransitionSignal {
    pub fn channel() -> (TransitionEnd, Self) {
        let (tx, rx) = oneshot::channel();
        (TransitionEnd(tx), Self(rx))
    }

    /// A signal that has already fired.
    pub fn ready() -> Self {
        let (end, signal) = Self::channel();
        end.fire();
        signal
    }

    pub async fn ended(self) {
        let _ = self.0.await;
    }
}

/// Terminal state a transition heads for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionTarget {
    Collapsed,
    Expanded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum RegionPhase {
    Collapsed,
    Expanded,
    Transitioning { target: RegionTarget },
}

impl RegionPhase {
    const fn settled(height_px: u32) -> Self {
        if height_px == 0 {
            Self::Collapsed
        } else {
            Self::Expanded
        }
    }
}

/// How a transition request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The region animated to the target.
    Completed,
    /// The region was already there; the surface was not touched.
    AlreadySettled,
    /// A newer request replaced this one while it was queued.
    Superseded,
    /// The region has been removed from the panel.
    Detached,
}

/// Observable state of one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegionSnapshot {
    /// Last height written to the surface.
    pub height_px: u32,
    /// Settled target, or the transition in flight.
    pub phase: RegionPhase,
    /// Set once the region is removed from the popup. Transitions become
    /// no-ops.
    pub detached: bool,
}

#[derive(Debug, Clone, Copy)]
struct QueuedTransition {
    ticket: u64,
    target: RegionTarget,
}

#[derive(Debug)]
struct RegionState {
    height_px: u32,
    phase: RegionPhase,
    detached: bool,
    queued: Option<QueuedTransition>,
    next_ticket: u64,
}

/// A panel region whose height animates between 0 and its content height.
pub struct AnimatableRegion<S> {
    name: &'static str,
    surface: S,
    state: RwLock<RegionState>,
    gate: Mutex<()>,
}

impl<S: RegionSurface> AnimatableRegion<S> {
    /// Create a collapsed region.
    pub fn new(name: &'static str, surface: S) -> Self {
        Self {
            name,
            surface,
            state: RwLock::new(RegionState {
                height_px: 0,
                phase: RegionPhase::Collapsed,
                detached: false,
                queued: None,
                next_ticket: 0,
            }),
            gate: Mutex::new(()),
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn surface(&self) -> &S {
        &self.surface
    }

    /// Height last written to the surface.
    pub async fn height_px(&self) -> u32 {
        self.state.read().await.height_px
    }

    pub async fn is_collapsed(&self) -> bool {
        self.height_px().await == 0
    }

    pub async fn is_expanded(&self) -> bool {
        !self.is_collapsed().await
    }

    pub async fn is_animating(&self) -> bool {
        matches!(
            self.state.read().await.phase,
            RegionPhase::Transitioning { .. }
        )
    }

    pub async fn snapshot(&self) -> RegionSnapshot {
        let state = self.state.read().await;
        RegionSnapshot {
            height_px: state.height_px,
            phase: state.phase,
            detached: state.detached,
        }
    }

    pub async fn expand(&self) -> TransitionOutcome {
        self.transition_to(RegionTarget::Expanded).await
    }

    pub async fn collapse(&self) -> TransitionOutcome {
        self.transition_to(RegionTarget::Collapsed).await
    }

    pub async fn transition_to(&self, target: RegionTarget) -> TransitionOutcome {
        self.transition_with(target, || async {}).await
    }

    /// Queue a transition to `target` and run it once the gate is free.
    ///
    /// `on_start` runs when the request is accepted (not superseded, region
    /// still attached), before any height is written, including when the
    /// region already sits at `target`.
    pub async fn transition_with<F, Fut>(&self, target: RegionTarget, on_start: F) -> TransitionOutcome
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = ()> + Send,
    {
        let ticket = {
            let mut state = self.state.write().await;
            state.next_ticket += 1;
            let ticket = state.next_ticket;
            if let Some(previous) = state.queued.replace(QueuedTransition { ticket, target }) {
                debug!(
                    region = self.name,
                    superseded = ?previous.target,
                    ?target,
                    "Queued transition replaced"
                );
            }
            ticket
        };

        let _permit = self.gate.lock().await;
        {
            let mut state = self.state.write().await;
            match state.queued {
                Some(queued) if queued.ticket == ticket => state.queued = None,
                _ => return TransitionOutcome::Superseded,
            }
        }
        self.animate(target, on_start).await
    }

    /// Wait for the gate and hold it for a sequence of transitions.
    pub async fn begin(&self) -> TransitionGuard<'_, S> {
        TransitionGuard {
            region: self,
            _permit: self.gate.lock().await,
        }
    }

    /// Take the gate only if no transition is in flight.
    pub fn try_begin(&self) -> Option<TransitionGuard<'_, S>> {
        self.gate.try_lock().ok().map(|permit| TransitionGuard {
            region: self,
            _permit: permit,
        })
    }

    /// Remove the region. Every later request resolves as `Detached`.
    pub async fn detach(&self) {
        let mut state = self.state.write().await;
        if state.detached {
            return;
        }
        state.detached = true;
        state.queued = None;
        self.surface.detach();
        debug!(region = self.name, "Region detached");
    }

    /// Run one transition. Callers must hold the gate.
    async fn animate<F, Fut>(&self, target: RegionTarget, on_start: F) -> TransitionOutcome
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = ()> + Send,
    {
        let px = {
            let mut state = self.state.write().await;
            if state.detached {
                return TransitionOutcome::Detached;
            }
            let settled = match target {
                RegionTarget::Collapsed => state.height_px == 0,
                RegionTarget::Expanded => state.height_px != 0,
            };
            let px = match target {
                RegionTarget::Collapsed => 0,
                RegionTarget::Expanded => self.surface.inner_height(),
            };
            // Writing the current height again would never produce an end signal.
            if settled || px == state.height_px {
                None
            } else {
                state.height_px = px;
                state.phase = RegionPhase::Transitioning { target };
                Some(px)
            }
        };

        on_start().await;

        let Some(px) = px else {
            debug!(region = self.name, ?target, "Already settled");
            return TransitionOutcome::AlreadySettled;
        };

        let signal = self.surface.apply_height(px);
        debug!(region = self.name, ?target, height_px = px, "Transition started");
        signal.ended().await;

        self.state.write().await.phase = RegionPhase::settled(px);
        debug!(region = self.name, ?target, "Transition ended");
        TransitionOutcome::Completed
    }
}

/// Exclusive hold on a region's gate.
pub struct TransitionGuard<'a, S> {
    region: &'a AnimatableRegion<S>,
    _permit: MutexGuard<'a, ()>,
}

impl<S: RegionSurface> TransitionGuard<'_, S> {
    pub async fn expand(&self) -> TransitionOutcome {
        self.region
            .animate(RegionTarget::Expanded, || async {})
            .await
    }

    pub async fn collapse(&self) -> TransitionOutcome {
        self.region
            .animate(RegionTarget::Collapsed, || async {})
            .await
    }

    /// Replace the region content and show it.
    ///
    /// An expanded region collapses fully before `swap` runs, then expands
    /// to the new natural height. A collapsed region swaps and expands.
    pub async fn swap_content(&self, swap: impl FnOnce() + Send) -> TransitionOutcome {
        if self.region.is_expanded().await {
            let outcome = self.collapse().await;
            if outcome == TransitionOutcome::Detached {
                return outcome;
            }
        }
        swap();
        self.expand().await
    }
}
