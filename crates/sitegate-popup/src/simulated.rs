//! Surfaces that stand in for rendered panel elements outside a browser.
//!
//! Transitions take a fixed wall-clock duration. Text content is measured by
//! wrapping it at a fixed number of characters per line.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use sitegate_core::config::AnimationConfig;

use crate::animation::{RegionSurface, TransitionSignal};
use crate::info_panel::TextContent;

#[derive(Debug)]
enum Measure {
    Fixed(u32),
    Text {
        line_height_px: u32,
        chars_per_line: u32,
    },
}

#[derive(Debug)]
pub struct SimulatedSurface {
    measure: Measure,
    duration: Duration,
    text: Mutex<String>,
    detached: AtomicBool,
}

impl SimulatedSurface {
    pub const fn fixed(height_px: u32, duration: Duration) -> Self {
        Self {
            measure: Measure::Fixed(height_px),
            duration,
            text: Mutex::new(String::new()),
            detached: AtomicBool::new(false),
        }
    }

    pub const fn text(line_height_px: u32, chars_per_line: u32, duration: Duration) -> Self {
        Self {
            measure: Measure::Text {
                line_height_px,
                chars_per_line,
            },
            duration,
            text: Mutex::new(String::new()),
            detached: AtomicBool::new(false),
        }
    }

    /// The file-loader surface described by `config`.
    pub const fn loader(config: &AnimationConfig) -> Self {
        Self::fixed(config.loader_inner_height_px, config.transition())
    }

    /// The info-text surface described by `config`.
    pub const fn info(config: &AnimationConfig) -> Self {
        Self::text(
            config.info_line_height_px,
            config.info_chars_per_line,
            config.transition(),
        )
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }
}

impl RegionSurface for SimulatedSurface {
    fn inner_height(&self) -> u32 {
        match self.measure {
            Measure::Fixed(px) => px,
            Measure::Text {
                line_height_px,
                chars_per_line,
            } => {
                let text = self.text.lock().unwrap_or_else(PoisonError::into_inner);
                let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
                chars.div_ceil(chars_per_line.max(1)) * line_height_px
            }
        }
    }

    fn apply_height(&self, _px: u32) -> TransitionSignal {
        if self.duration.is_zero() {
            return TransitionSignal::ready();
        }
        let (end, signal) = TransitionSignal::channel();
        let duration = self.duration;
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            end.fire();
        });
        signal
    }

    fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
    }
}

impl TextContent for SimulatedSurface {
    fn set_text(&self, text: &str) {
        let mut current = self.text.lock().unwrap_or_else(PoisonError::into_inner);
        text.clone_into(&mut current);
    }
}
