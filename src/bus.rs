//! # UI Event Bus
//!
//! Typed events pushed to whatever shell renders the agent (the bundled
//! binary just logs them; a real front-end subscribes and paints). Emission
//! never fails: with no subscriber connected the event is simply dropped,
//! the same way the bot side of an IPC link keeps running without clients.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.3.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Alarm visual cadence metadata on AlarmShown
//! - 1.0.0: Initial event set

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::api::types::Reminder;

/// Broadcast channel capacity for UI events
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Visual cadence the shell should use while an alarm is showing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmVisual {
    /// Full icon shake cycle (four 100 ms swings plus a 200 ms rest)
    pub shake_period_ms: u64,
    /// Pulse ring grow/shrink cycle
    pub pulse_period_ms: u64,
}

impl Default for AlarmVisual {
    fn default() -> Self {
        AlarmVisual {
            shake_period_ms: 600,
            pulse_period_ms: 1000,
        }
    }
}

/// Why a showing alarm left the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HideReason {
    Dismissed,
    Snoozed,
    SessionEnded,
    Shutdown,
}

/// Severity of a transient toast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

/// Events sent from the agent to connected shells
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UiEvent {
    /// A reminder became the active alarm
    AlarmShown {
        reminder: Reminder,
        visual: AlarmVisual,
        shown_at: DateTime<Utc>,
    },
    /// The active alarm was cleared
    AlarmHidden {
        reminder_id: String,
        reason: HideReason,
    },
    /// Transient user-visible notice
    Toast {
        id: String,
        level: ToastLevel,
        title: String,
        detail: Option<String>,
    },
    /// The authenticated flag changed
    SessionChanged { authenticated: bool },
    /// The reminder cache was refreshed from the backend
    RemindersRefreshed { count: usize },
}

/// Handle for emitting and subscribing to UI events
#[derive(Clone)]
pub struct UiBus {
    tx: broadcast::Sender<UiEvent>,
}

impl UiBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        UiBus { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers; a missing audience is not an error
    pub fn emit(&self, event: UiEvent) {
        let _ = self.tx.send(event);
    }

    /// Convenience constructor for toast events
    pub fn toast(&self, level: ToastLevel, title: &str, detail: Option<&str>) {
        self.emit(UiEvent::Toast {
            id: uuid::Uuid::new_v4().to_string(),
            level,
            title: title.to_string(),
            detail: detail.map(String::from),
        });
    }
}

impl Default for UiBus {
    fn default() -> Self {
        Self::new()
    }
}
