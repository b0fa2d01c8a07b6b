//! # Audio Feature
//!
//! Notification sound playback: source resolution, the process-backed player,
//! and the single-handle sound manager.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.5.0
//! - **Toggleable**: true

pub mod manager;
pub mod player;

pub use manager::SoundManager;
pub use player::{
    resolve_source, sound_display_name, upload_base, AudioBackend, PlaybackHandle, PlayerConfig,
    ProcessPlayer, SoundSource, BUNDLED_SOUNDS,
};
