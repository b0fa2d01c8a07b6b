//! # Feature: Alarm Presentation Controller
//!
//! Translates the engine's single active-alarm slot into what a shell needs
//! to render: `AlarmShown`/`AlarmHidden` events with the shake/pulse cadence,
//! a repeating notification sound while the alarm is up, and the dismiss and
//! snooze user actions.
//!
//! The sound repeat is owned by a TaskHandle that is dropped on every exit
//! path — dismiss, snooze, logout, shutdown — so a hidden alarm can never
//! keep playing audio.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.5.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 1.1.0: Quiet hours mute the repeat without hiding the alarm
//! - 1.0.0: Initial state machine with dismiss/snooze

use chrono::{Local, Utc};
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::sleep;

use crate::api::Reminder;
use crate::bus::{AlarmVisual, HideReason, UiBus, UiEvent};
use crate::core::TaskHandle;
use crate::features::alarm::engine::ReminderEngine;
use crate::features::audio::SoundManager;
use crate::features::prefs::NotificationPreferences;

/// Cadence of the notification sound while an alarm is showing
pub const SOUND_REPEAT_INTERVAL: Duration = Duration::from_secs(3);

/// Drives the visible alarm state and the in-alarm sound repeat
pub struct AlarmController {
    engine: Arc<ReminderEngine>,
    sound: Arc<SoundManager>,
    bus: UiBus,
    prefs: Arc<RwLock<NotificationPreferences>>,
    repeat: Mutex<Option<TaskHandle>>,
    showing: Mutex<Option<String>>,
    pending_reason: Mutex<Option<HideReason>>,
    repeat_interval: Duration,
}

impl AlarmController {
    pub fn new(
        engine: Arc<ReminderEngine>,
        sound: Arc<SoundManager>,
        bus: UiBus,
        prefs: Arc<RwLock<NotificationPreferences>>,
    ) -> Self {
        AlarmController {
            engine,
            sound,
            bus,
            prefs,
            repeat: Mutex::new(None),
            showing: Mutex::new(None),
            pending_reason: Mutex::new(None),
            repeat_interval: SOUND_REPEAT_INTERVAL,
        }
    }

    /// Override the repeat cadence (tests use a short one)
    pub fn with_repeat_interval(mut self, interval: Duration) -> Self {
        self.repeat_interval = interval;
        self
    }

    /// Spawn the controller's driver loop
    pub fn start(self: &Arc<Self>) -> TaskHandle {
        let controller = self.clone();
        TaskHandle::spawn("alarm-controller", async move {
            controller.run().await;
        })
    }

    async fn run(&self) {
        let mut active = self.engine.subscribe_active();
        loop {
            let current = active.borrow_and_update().clone();
            match current {
                Some(reminder) => self.enter_showing(reminder).await,
                None => self.enter_hidden().await,
            }
            if active.changed().await.is_err() {
                break;
            }
        }
        *self.pending_reason.lock().await = Some(HideReason::Shutdown);
        self.enter_hidden().await;
    }

    async fn enter_showing(&self, reminder: Reminder) {
        {
            let mut showing = self.showing.lock().await;
            if showing.as_deref() == Some(reminder.id.as_str()) {
                return;
            }
            // a dismiss and an immediate re-fire can coalesce on the watch
            // channel; close out the previous alarm first
            if let Some(previous) = showing.take() {
                self.repeat.lock().await.take();
                self.sound.cleanup().await;
                let reason = self
                    .pending_reason
                    .lock()
                    .await
                    .take()
                    .unwrap_or(HideReason::Dismissed);
                self.bus.emit(UiEvent::AlarmHidden {
                    reminder_id: previous,
                    reason,
                });
            }
            *self.pending_reason.lock().await = None;
            *showing = Some(reminder.id.clone());
        }

        self.bus.emit(UiEvent::AlarmShown {
            reminder: reminder.clone(),
            visual: AlarmVisual::default(),
            shown_at: Utc::now(),
        });
        self.start_repeat(&reminder).await;
    }

    async fn enter_hidden(&self) {
        let Some(previous) = self.showing.lock().await.take() else {
            return;
        };
        self.repeat.lock().await.take();
        self.sound.cleanup().await;

        let reason = self
            .pending_reason
            .lock()
            .await
            .take()
            .unwrap_or(HideReason::SessionEnded);
        self.bus.emit(UiEvent::AlarmHidden {
            reminder_id: previous,
            reason,
        });
    }

    /// Sound fires immediately, then on the fixed cadence, until the repeat
    /// handle is dropped
    async fn start_repeat(&self, reminder: &Reminder) {
        let sound = self.sound.clone();
        let prefs = self.prefs.clone();
        let sound_id = reminder.notification_sound.clone();
        let custom_url = reminder.custom_sound_url.clone();
        let interval = self.repeat_interval;

        let handle = TaskHandle::spawn("alarm-sound-repeat", async move {
            loop {
                let quiet = prefs.read().await.in_quiet_hours(Local::now().time());
                if quiet {
                    debug!("quiet hours active, skipping alarm sound");
                } else {
                    sound.play(&sound_id, custom_url.as_deref()).await;
                }
                sleep(interval).await;
            }
        });
        *self.repeat.lock().await = Some(handle);
    }

    /// Acknowledge the showing alarm; its reminder stays quiet for the rest
    /// of the session
    pub async fn dismiss(&self) {
        if self.engine.active().is_none() {
            return;
        }
        *self.pending_reason.lock().await = Some(HideReason::Dismissed);
        if let Some(id) = self.engine.dismiss_active() {
            info!("alarm '{id}' dismissed");
        }
    }

    /// Put the showing alarm back to sleep for five minutes
    pub async fn snooze(&self) {
        if self.engine.active().is_none() {
            return;
        }
        *self.pending_reason.lock().await = Some(HideReason::Snoozed);
        if let Some((id, until)) = self.engine.snooze_active(Utc::now()) {
            info!("alarm '{id}' snoozed until {until}");
        }
    }
}
