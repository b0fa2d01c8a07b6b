//! # Alarm Feature
//!
//! The reminder polling & due-check engine and the presentation controller
//! that turns its active-alarm slot into something a shell can render.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.4.0
//! - **Toggleable**: true

pub mod controller;
pub mod engine;

pub use controller::{AlarmController, SOUND_REPEAT_INTERVAL};
pub use engine::{
    DueTracker, EngineHandle, ReminderEngine, CATCH_UP_HOURS, CHECK_INTERVAL, FETCH_INTERVAL,
    SNOOZE_MINUTES,
};
