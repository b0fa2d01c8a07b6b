// Core layer - configuration and task lifecycle
pub mod core;

// API layer - REST client, normalization, resource models
pub mod api;

// Features layer - session, alarm engine, audio, preferences
pub mod features;

// UI event bus shared with whatever shell renders the agent
pub mod bus;

// Re-export core config for convenient wiring
pub use crate::core::{Config, TaskHandle};

// Re-export feature items
pub use api::{ApiClient, Reminder};
pub use bus::{HideReason, ToastLevel, UiBus, UiEvent};
pub use features::{
    // Alarm
    AlarmController, DueTracker, EngineHandle, ReminderEngine,
    // Audio
    AudioBackend, PlayerConfig, ProcessPlayer, SoundManager,
    // Preferences
    NotificationPreferences,
    // Session
    SessionManager,
};
