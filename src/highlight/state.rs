use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::HighlightConfig;
use crate::geometry::PixelRect;

/// Lifecycle of one highlight: `Flashing → Steady → Expired`.
/// Flash completion only stops the blinking; removal is by expiry or clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightPhase {
    Flashing,
    Steady,
    /// Removed, or never existed.
    Expired,
}

#[derive(Debug, Clone)]
pub struct HighlightRequest {
    pub rect: PixelRect,
    pub message: Option<String>,
    pub show_click_indicator: bool,
    pub flash: bool,
    pub flash_cycles: u32,
    pub flash_interval: Duration,
    pub auto_expire: bool,
    pub duration: Duration,
}

impl HighlightRequest {
    /// Flashing, auto-expiring highlight with the stock timings.
    pub fn new(rect: PixelRect) -> Self {
        Self {
            rect,
            message: None,
            show_click_indicator: false,
            flash: true,
            flash_cycles: 5,
            flash_interval: Duration::from_millis(400),
            auto_expire: true,
            duration: Duration::from_millis(3000),
        }
    }

    pub fn from_config(rect: PixelRect, config: &HighlightConfig) -> Self {
        Self {
            rect,
            message: None,
            show_click_indicator: config.show_click_indicator,
            flash: config.flash,
            flash_cycles: config.flash_cycles,
            flash_interval: Duration::from_millis(config.flash_interval_ms.max(1)),
            auto_expire: config.auto_expire,
            duration: Duration::from_millis(config.duration_ms),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct Highlight {
    pub id: String,
    pub rect: PixelRect,
    pub message: Option<String>,
    pub show_click_indicator: bool,
    pub visible: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<Instant>,
    toggles_remaining: u32,
    flash_interval: Duration,
    next_toggle: Option<Instant>,
}

impl Highlight {
    pub(crate) fn new(id: String, req: HighlightRequest, now: Instant) -> Self {
        let toggles = if req.flash { req.flash_cycles.saturating_mul(2) } else { 0 };
        Self {
            id,
            rect: req.rect,
            message: req.message,
            show_click_indicator: req.show_click_indicator,
            visible: true,
            created_at: Utc::now(),
            expires_at: req.auto_expire.then(|| now + req.duration),
            toggles_remaining: toggles,
            flash_interval: req.flash_interval,
            next_toggle: (toggles > 0).then(|| now + req.flash_interval),
        }
    }

    pub fn is_flashing(&self) -> bool {
        self.toggles_remaining > 0
    }

    /// One cycle is a hide plus a show.
    pub fn flash_cycles_remaining(&self) -> u32 {
        self.toggles_remaining.div_ceil(2)
    }

    pub fn phase(&self) -> HighlightPhase {
        if self.is_flashing() {
            HighlightPhase::Flashing
        } else {
            HighlightPhase::Steady
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|t| t <= now)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.next_toggle, self.expires_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Apply every flash toggle due at `now`. Returns whether visibility changed.
    pub(crate) fn advance_flash(&mut self, now: Instant) -> bool {
        let before = self.visible;
        while let Some(due) = self.next_toggle {
            if due > now {
                break;
            }
            self.visible = !self.visible;
            self.toggles_remaining -= 1;
            self.next_toggle = if self.toggles_remaining > 0 {
                Some(due + self.flash_interval)
            } else {
                None
            };
        }
        if !self.is_flashing() {
            self.visible = true;
        }
        before != self.visible
    }

    pub fn view(&self) -> HighlightView {
        HighlightView {
            id: self.id.clone(),
            rect: self.rect,
            message: self.message.clone(),
            show_click_indicator: self.show_click_indicator,
            flashing: self.is_flashing(),
            created_at: self.created_at,
        }
    }
}

/// What the render layer needs to draw one visible highlight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightView {
    pub id: String,
    pub rect: PixelRect,
    pub message: Option<String>,
    pub show_click_indicator: bool,
    pub flashing: bool,
    pub created_at: DateTime<Utc>,
}
