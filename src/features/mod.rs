//! # Features Layer
//!
//! All feature modules of the companion agent.

pub mod alarm;
pub mod audio;
pub mod prefs;
pub mod session;

// Re-export feature items for convenient wiring
pub use alarm::{AlarmController, DueTracker, EngineHandle, ReminderEngine};
pub use audio::{AudioBackend, PlaybackHandle, PlayerConfig, ProcessPlayer, SoundManager};
pub use prefs::NotificationPreferences;
pub use session::SessionManager;
