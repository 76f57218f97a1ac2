//! Test doubles for the popup core.
//!
//! - [`RecordingTransport`]: records every outbound message and answers the
//!   startup queries from a script.
//! - [`ManualSurface`]: records applied heights and fires transition ends
//!   immediately, on the next scheduler turn, or on demand.
//! - [`StaticFile`]: an in-memory picked file.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use sitegate_proto::{Envelope, MessageType};

use crate::animation::{RegionSurface, TransitionEnd, TransitionSignal};
use crate::import::PickedFile;
use crate::info_panel::TextContent;
use crate::transport::Transport;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Transport that records messages instead of delivering them.
///
/// `background-wake` sends are answered from the scripted queue in order
/// (an exhausted queue answers `None`); every other type gets no reply.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Envelope>>,
    wake_replies: Mutex<VecDeque<Option<Value>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wake_replies(replies: impl IntoIterator<Item = Option<Value>>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            wake_replies: Mutex::new(replies.into_iter().collect()),
        }
    }

    /// Everything sent so far, in order.
    pub fn sent(&self) -> Vec<Envelope> {
        lock(&self.sent).clone()
    }

    /// Messages of one type, in order.
    pub fn sent_of(&self, kind: MessageType) -> Vec<Envelope> {
        lock(&self.sent)
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }
}

impl Transport for RecordingTransport {
    async fn send(&self, data: Value, kind: MessageType) -> Option<Value> {
        lock(&self.sent).push(Envelope::new(data, kind));
        if kind == MessageType::BackgroundWake {
            lock(&self.wake_replies).pop_front().flatten()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FireMode {
    Immediate,
    Deferred,
    Manual,
}

/// Region surface that records every applied height.
///
/// With text content set, the inner height is one pixel per character;
/// otherwise it is the fixed height given at construction.
#[derive(Debug)]
pub struct ManualSurface {
    mode: FireMode,
    inner_height: AtomicU32,
    text: Mutex<Option<String>>,
    applied: Mutex<Vec<u32>>,
    pending: Mutex<VecDeque<TransitionEnd>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    detached: AtomicBool,
}

impl ManualSurface {
    fn with_mode(mode: FireMode, inner_height: u32) -> Self {
        Self {
            mode,
            inner_height: AtomicU32::new(inner_height),
            text: Mutex::new(None),
            applied: Mutex::new(Vec::new()),
            pending: Mutex::new(VecDeque::new()),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            detached: AtomicBool::new(false),
        }
    }

    /// Transitions end as soon as they start.
    pub fn immediate(inner_height: u32) -> Self {
        Self::with_mode(FireMode::Immediate, inner_height)
    }

    /// Transitions end on a spawned task after yielding to the scheduler.
    pub fn deferred(inner_height: u32) -> Self {
        Self::with_mode(FireMode::Deferred, inner_height)
    }

    /// Transitions end only through [`ManualSurface::fire_next`].
    pub fn manual(inner_height: u32) -> Self {
        Self::with_mode(FireMode::Manual, inner_height)
    }

    /// Text-driven surface (one pixel per character) firing immediately.
    pub fn text_immediate() -> Self {
        let surface = Self::immediate(0);
        *lock(&surface.text) = Some(String::new());
        surface
    }

    /// Text-driven surface whose transitions end on demand.
    pub fn text_manual() -> Self {
        let surface = Self::manual(0);
        *lock(&surface.text) = Some(String::new());
        surface
    }

    pub fn set_inner_height(&self, px: u32) {
        self.inner_height.store(px, Ordering::SeqCst);
    }

    pub fn applied(&self) -> Vec<u32> {
        lock(&self.applied).clone()
    }

    pub fn current_text(&self) -> String {
        lock(&self.text).clone().unwrap_or_default()
    }

    /// Most transitions ever running at once on this surface.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn pending(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Fire the oldest pending transition end. Returns `false` if none.
    pub fn fire_next(&self) -> bool {
        let Some(end) = lock(&self.pending).pop_front() else {
            return false;
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        end.fire();
        true
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }
}

impl RegionSurface for ManualSurface {
    fn inner_height(&self) -> u32 {
        match lock(&self.text).as_deref() {
            Some(text) => u32::try_from(text.chars().count()).unwrap_or(u32::MAX),
            None => self.inner_height.load(Ordering::SeqCst),
        }
    }

    fn apply_height(&self, px: u32) -> TransitionSignal {
        lock(&self.applied).push(px);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let (end, signal) = TransitionSignal::channel();
        match self.mode {
            FireMode::Immediate => {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                end.fire();
            }
            FireMode::Deferred => {
                let in_flight = Arc::clone(&self.in_flight);
                tokio::spawn(async move {
                    tokio::task::yield_now().await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    end.fire();
                });
            }
            FireMode::Manual => lock(&self.pending).push_back(end),
        }
        signal
    }

    fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
    }
}

impl TextContent for ManualSurface {
    fn set_text(&self, text: &str) {
        *lock(&self.text) = Some(text.to_string());
    }
}

/// In-memory picked file.
#[derive(Debug, Clone)]
pub struct StaticFile {
    pub name: String,
    pub media_type: Option<String>,
    /// `None` makes reading fail.
    pub contents: Option<String>,
}

impl StaticFile {
    pub fn json(name: &str, contents: &str) -> Self {
        Self {
            name: name.to_string(),
            media_type: Some("application/json".to_string()),
            contents: Some(contents.to_string()),
        }
    }

    pub fn plain(name: &str, contents: &str) -> Self {
        Self {
            name: name.to_string(),
            media_type: Some("text/plain".to_string()),
            contents: Some(contents.to_string()),
        }
    }

    pub fn unreadable(name: &str) -> Self {
        Self {
            name: name.to_string(),
            media_type: Some("application/json".to_string()),
            contents: None,
        }
    }
}

impl PickedFile for StaticFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    async fn read_text(&self) -> io::Result<String> {
        self.contents
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::PermissionDenied, "read refused"))
    }
}
