//! # Feature: Notification Sound Manager
//!
//! Owns at most one playback handle at any time. Starting a new sound always
//! stops the previous one first, so two notification sounds can never
//! overlap, and a finished playback is reaped so the handle is not held
//! longer than the audio itself.
//!
//! Constructed once at startup and injected where needed; `dispose` is the
//! paired teardown for `init`.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.5.0
//! - **Toggleable**: true

use log::{debug, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::bus::{ToastLevel, UiBus};
use crate::features::audio::player::{
    resolve_source, sound_display_name, AudioBackend, PlaybackHandle,
};

/// Poll cadence of the reaper that detects natural playback completion
const WATCH_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Default)]
struct PlaybackSlot {
    /// Monotonic playback counter; a reaper only touches its own generation
    generation: u64,
    handle: Option<Box<dyn PlaybackHandle>>,
}

/// Dependency-injected sound playback service
pub struct SoundManager {
    backend: Arc<dyn AudioBackend>,
    bus: UiBus,
    sound_dir: PathBuf,
    api_base: String,
    slot: Arc<Mutex<PlaybackSlot>>,
    /// Volume as a percentage, 0–100
    volume: AtomicU32,
    enabled: AtomicBool,
    max_play: Duration,
}

impl SoundManager {
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        bus: UiBus,
        sound_dir: PathBuf,
        api_base: &str,
    ) -> Self {
        SoundManager {
            backend,
            bus,
            sound_dir,
            api_base: api_base.to_string(),
            slot: Arc::new(Mutex::new(PlaybackSlot::default())),
            volume: AtomicU32::new(80),
            enabled: AtomicBool::new(true),
            max_play: Duration::from_secs(30),
        }
    }

    /// Cap a single playback at `seconds` before the reaper stops it
    pub fn with_max_play_seconds(mut self, seconds: u64) -> Self {
        self.max_play = Duration::from_secs(seconds.max(1));
        self
    }

    pub async fn init(&self) {
        if !self.sound_dir.is_dir() {
            warn!(
                "sound directory {} does not exist; bundled sounds will fail to play",
                self.sound_dir.display()
            );
        }
        debug!("sound manager ready (volume {}%)", self.volume.load(Ordering::Relaxed));
    }

    /// Paired teardown for `init`; safe to call more than once
    pub async fn dispose(&self) {
        self.cleanup().await;
        debug!("sound manager disposed");
    }

    pub fn set_volume(&self, volume_percent: u32) {
        self.volume.store(volume_percent.min(100), Ordering::Relaxed);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub async fn is_playing(&self) -> bool {
        self.slot.lock().await.handle.is_some()
    }

    /// Play a notification sound. Disabled playback and the "none" selection
    /// are silent no-ops; failures are logged and toasted, never returned.
    pub async fn play(&self, sound_id: &str, custom_url: Option<&str>) {
        if !self.enabled.load(Ordering::Relaxed) || sound_id == "none" {
            return;
        }

        let Some(source) = resolve_source(sound_id, custom_url, &self.sound_dir, &self.api_base)
        else {
            return;
        };
        let volume = self.volume.load(Ordering::Relaxed) as f32 / 100.0;

        let mut slot = self.slot.lock().await;
        slot.generation += 1;
        if let Some(mut previous) = slot.handle.take() {
            previous.stop();
        }

        match self.backend.start(&source, volume).await {
            Ok(handle) => {
                slot.handle = Some(handle);
                let generation = slot.generation;
                drop(slot);
                self.spawn_reaper(generation);
            }
            Err(e) => {
                warn!("sound playback error: {e}");
                self.bus.toast(
                    ToastLevel::Error,
                    "No se pudo reproducir el sonido",
                    Some(&e.to_string()),
                );
            }
        }
    }

    /// Play a sound for the settings screen's "test" affordance, at the given
    /// volume and regardless of the enabled flag. The caller stops it after a
    /// short moment; the manager itself only bounds it by `max_play`.
    pub async fn preview(&self, sound_id: &str, volume_percent: Option<u32>, custom_url: Option<&str>) {
        if sound_id == "none" {
            self.bus.toast(
                ToastLevel::Info,
                "Sin sonido",
                Some("Las notificaciones serán silenciosas"),
            );
            return;
        }

        let previous_volume = self.volume.load(Ordering::Relaxed);
        let previous_enabled = self.enabled.load(Ordering::Relaxed);
        if let Some(volume) = volume_percent {
            self.set_volume(volume);
        }
        self.set_enabled(true);

        self.play(sound_id, custom_url).await;
        self.bus.toast(
            ToastLevel::Success,
            sound_display_name(sound_id),
            Some("Reproduciendo..."),
        );

        self.volume.store(previous_volume, Ordering::Relaxed);
        self.enabled.store(previous_enabled, Ordering::Relaxed);
    }

    /// Stop and release the current playback, if any. Idempotent.
    pub async fn cleanup(&self) {
        let mut slot = self.slot.lock().await;
        slot.generation += 1;
        if let Some(mut handle) = slot.handle.take() {
            handle.stop();
        }
    }

    /// Release the slot once playback ends on its own, so a finished handle
    /// is not kept loaded until the next play
    fn spawn_reaper(&self, generation: u64) {
        let slot = self.slot.clone();
        let deadline = Instant::now() + self.max_play;
        tokio::spawn(async move {
            loop {
                sleep(WATCH_INTERVAL).await;
                let mut slot = slot.lock().await;
                if slot.generation != generation {
                    return;
                }
                match slot.handle.as_mut() {
                    None => return,
                    Some(handle) => {
                        if handle.is_finished() {
                            slot.handle = None;
                            return;
                        } else if Instant::now() >= deadline {
                            handle.stop();
                            slot.handle = None;
                            return;
                        }
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::UiEvent;
    use crate::features::audio::player::SoundSource;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakeBackend {
        events: Arc<StdMutex<Vec<String>>>,
        finished: Arc<AtomicBool>,
    }

    struct FakeHandle {
        label: String,
        events: Arc<StdMutex<Vec<String>>>,
        finished: Arc<AtomicBool>,
    }

    impl PlaybackHandle for FakeHandle {
        fn is_finished(&mut self) -> bool {
            self.finished.load(Ordering::SeqCst)
        }

        fn stop(&mut self) {
            self.events.lock().unwrap().push(format!("stop {}", self.label));
        }
    }

    #[async_trait]
    impl AudioBackend for FakeBackend {
        async fn start(&self, source: &SoundSource, volume: f32) -> Result<Box<dyn PlaybackHandle>> {
            let label = source.as_player_arg();
            self.events
                .lock()
                .unwrap()
                .push(format!("start {label} @{volume:.2}"));
            Ok(Box::new(FakeHandle {
                label,
                events: self.events.clone(),
                finished: self.finished.clone(),
            }))
        }
    }

    fn manager() -> (SoundManager, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>, UiBus) {
        let backend = Arc::new(FakeBackend::default());
        let events = backend.events.clone();
        let finished = backend.finished.clone();
        let bus = UiBus::new();
        let manager = SoundManager::new(backend, bus.clone(), PathBuf::from("/s"), "http://h/api");
        (manager, events, finished, bus)
    }

    #[tokio::test]
    async fn test_new_play_replaces_the_previous_handle() {
        let (manager, events, _, _) = manager();

        manager.play("ding", None).await;
        manager.play("bell", None).await;

        let log = events.lock().unwrap().clone();
        assert_eq!(
            log,
            vec![
                "start /s/ding.mp3 @0.80",
                "stop /s/ding.mp3",
                "start /s/bell.mp3 @0.80"
            ]
        );
        assert!(manager.is_playing().await);
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let (manager, events, _, _) = manager();

        manager.cleanup().await;
        manager.cleanup().await;
        assert!(events.lock().unwrap().is_empty());

        manager.play("ding", None).await;
        manager.cleanup().await;
        manager.cleanup().await;

        let log = events.lock().unwrap().clone();
        assert_eq!(log, vec!["start /s/ding.mp3 @0.80", "stop /s/ding.mp3"]);
        assert!(!manager.is_playing().await);
    }

    #[tokio::test]
    async fn test_disabled_and_none_are_no_ops() {
        let (manager, events, _, _) = manager();

        manager.set_enabled(false);
        manager.play("ding", None).await;
        manager.set_enabled(true);
        manager.play("none", None).await;

        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_preview_overrides_and_restores_volume() {
        let (manager, events, _, _) = manager();
        manager.set_volume(80);
        manager.set_enabled(false);

        manager.preview("ping", Some(50), None).await;
        manager.play("ping", None).await; // enabled=false restored, so silent

        let log = events.lock().unwrap().clone();
        assert_eq!(log, vec!["start /s/ping.mp3 @0.50"]);
        assert_eq!(manager.volume.load(Ordering::Relaxed), 80);
    }

    #[tokio::test]
    async fn test_preview_none_shows_a_toast() {
        let (manager, events, _, bus) = manager();
        let mut rx = bus.subscribe();

        manager.preview("none", None, None).await;

        assert!(events.lock().unwrap().is_empty());
        match rx.recv().await.unwrap() {
            UiEvent::Toast { level, title, .. } => {
                assert_eq!(level, ToastLevel::Info);
                assert_eq!(title, "Sin sonido");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_finished_playback_is_reaped() {
        let (manager, _, finished, _) = manager();

        manager.play("ding", None).await;
        assert!(manager.is_playing().await);

        finished.store(true, Ordering::SeqCst);
        sleep(Duration::from_millis(500)).await;
        assert!(!manager.is_playing().await);
    }
}
