//! # API Layer
//!
//! REST client, payload normalization, and resource models for the finance
//! backend.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false

pub mod client;
pub mod normalize;
pub mod types;

// Re-export commonly used items
pub use client::{ApiClient, AuthSession};
pub use types::{
    Account, CalendarEvent, Category, Movement, NotificationItem, Reminder, SoundEntry, Tag,
    TaskItem,
};
