//! # Feature: Reminder Polling & Due-Check Engine
//!
//! Keeps a fresh local copy of the user's reminders and decides, once per
//! check tick, whether exactly one of them should become the active alarm.
//!
//! Both loops are gated on the session's authenticated flag: logged out means
//! no fetching and no checking, silently. Fetch failures keep the cached list
//! and retry next tick — the feature is non-critical, so there is no backoff
//! and no failure cap.
//!
//! Suppression is purely client-local: a dismissed id never fires again this
//! session unless a snooze re-arms it, and `sent` from the backend is carried
//! for display but never consulted here.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.4.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 1.2.0: 24-hour catch-up window so alerts missed while closed still fire
//! - 1.1.0: Snooze elapse fires regardless of the catch-up window
//! - 1.0.0: Initial fetch/check loops with dismiss and snooze

use chrono::{DateTime, Duration as TimeDelta, Utc};
use dashmap::{DashMap, DashSet};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};

use crate::api::{ApiClient, Reminder};
use crate::bus::{UiBus, UiEvent};
use crate::core::TaskHandle;

/// Cadence of the reminder list refetch while authenticated
pub const FETCH_INTERVAL: Duration = Duration::from_secs(30);

/// Cadence of the due-check scan
pub const CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// How long a snooze suppresses a reminder
pub const SNOOZE_MINUTES: i64 = 5;

/// Catch-up window: an alert that passed up to this long ago still fires,
/// so reminders missed while the app was closed are not lost
pub const CATCH_UP_HOURS: i64 = 24;

/// Session-local suppression state and the due-selection rule
///
/// Both maps are shared between the check loop and the user-action handlers,
/// which run on different tasks; DashMap keeps the access lock-free for the
/// quick scans involved.
#[derive(Debug, Default)]
pub struct DueTracker {
    dismissed: DashSet<String>,
    snoozed: DashMap<String, DateTime<Utc>>,
}

impl DueTracker {
    /// Select the first reminder in list order that is due and not
    /// suppressed. First match wins — this is deliberately not a
    /// min-by-alert-time selection.
    pub fn next_due(&self, reminders: &[Reminder], now: DateTime<Utc>) -> Option<Reminder> {
        for reminder in reminders {
            let snoozed_until = self.snoozed.get(&reminder.id).map(|entry| *entry.value());

            // dismissed stays quiet unless a snooze entry re-armed it
            if self.dismissed.contains(&reminder.id) && snoozed_until.is_none() {
                continue;
            }

            match snoozed_until {
                Some(until) if until > now => continue,
                Some(_) => {
                    // snooze elapsed: fires regardless of the catch-up window
                    self.snoozed.remove(&reminder.id);
                    return Some(reminder.clone());
                }
                None => {}
            }

            let Some(alert_time) = reminder.alert_time else {
                continue;
            };
            let overdue = now - alert_time;
            if overdue >= TimeDelta::zero() && overdue < TimeDelta::hours(CATCH_UP_HOURS) {
                return Some(reminder.clone());
            }
        }
        None
    }

    /// Permanently suppress `id` for the rest of the session
    pub fn dismiss(&self, id: &str) {
        self.dismissed.insert(id.to_string());
    }

    /// Suppress `id` until `now + SNOOZE_MINUTES`; returns the wake time
    pub fn snooze(&self, id: &str, now: DateTime<Utc>) -> DateTime<Utc> {
        let until = now + TimeDelta::minutes(SNOOZE_MINUTES);
        self.snoozed.insert(id.to_string(), until);
        until
    }

    pub fn is_dismissed(&self, id: &str) -> bool {
        self.dismissed.contains(id)
    }

    pub fn snoozed_until(&self, id: &str) -> Option<DateTime<Utc>> {
        self.snoozed.get(id).map(|entry| *entry.value())
    }
}

/// The polling and due-check engine
pub struct ReminderEngine {
    api: Arc<ApiClient>,
    bus: UiBus,
    tracker: DueTracker,
    reminders: RwLock<Vec<Reminder>>,
    active: watch::Sender<Option<Reminder>>,
}

/// Handles for the engine's two loops; dropping (or `stop`) cancels both
pub struct EngineHandle {
    _fetch: TaskHandle,
    _check: TaskHandle,
}

impl EngineHandle {
    pub fn stop(self) {}
}

impl ReminderEngine {
    pub fn new(api: Arc<ApiClient>, bus: UiBus) -> Self {
        let (active, _) = watch::channel(None);
        ReminderEngine {
            api,
            bus,
            tracker: DueTracker::default(),
            reminders: RwLock::new(Vec::new()),
            active,
        }
    }

    /// Spawn the fetch and check loops, gated on the authenticated flag
    pub fn start(self: &Arc<Self>, session: watch::Receiver<bool>) -> EngineHandle {
        let fetch = {
            let engine = self.clone();
            let session = session.clone();
            TaskHandle::spawn("reminder-fetch", async move {
                fetch_loop(engine, session).await;
            })
        };
        let check = {
            let engine = self.clone();
            TaskHandle::spawn("due-check", async move {
                check_loop(engine, session).await;
            })
        };
        EngineHandle {
            _fetch: fetch,
            _check: check,
        }
    }

    /// Receiver for the single active-alarm slot
    pub fn subscribe_active(&self) -> watch::Receiver<Option<Reminder>> {
        self.active.subscribe()
    }

    pub fn active(&self) -> Option<Reminder> {
        self.active.borrow().clone()
    }

    pub(crate) fn tracker(&self) -> &DueTracker {
        &self.tracker
    }

    /// Fetch the reminder list once; failure keeps the cached list
    pub async fn refresh(&self) {
        match self.api.fetch_all_reminders().await {
            Ok(list) => {
                debug!("fetched {} reminder(s)", list.len());
                self.store(list).await;
            }
            Err(e) => warn!("reminder fetch failed, keeping cached list: {e}"),
        }
    }

    pub(crate) async fn store(&self, list: Vec<Reminder>) {
        let count = list.len();
        *self.reminders.write().await = list;
        self.bus.emit(UiEvent::RemindersRefreshed { count });
    }

    /// One due-check tick. While an alarm is showing the scan is skipped
    /// entirely, so the displayed reminder can never be clobbered and no
    /// snooze entry is consumed behind the user's back.
    pub async fn check_now(&self, now: DateTime<Utc>) {
        if self.active.borrow().is_some() {
            return;
        }
        let reminders = self.reminders.read().await;
        if let Some(due) = self.tracker.next_due(&reminders, now) {
            info!("reminder '{}' is due, raising alarm", due.id);
            self.active.send_replace(Some(due));
        }
    }

    /// Dismiss the showing alarm; returns its id
    pub fn dismiss_active(&self) -> Option<String> {
        let reminder = self.active.borrow().clone()?;
        self.tracker.dismiss(&reminder.id);
        self.active.send_replace(None);
        Some(reminder.id)
    }

    /// Snooze the showing alarm; returns its id and the wake time
    pub fn snooze_active(&self, now: DateTime<Utc>) -> Option<(String, DateTime<Utc>)> {
        let reminder = self.active.borrow().clone()?;
        let until = self.tracker.snooze(&reminder.id, now);
        self.active.send_replace(None);
        Some((reminder.id, until))
    }

    /// Hide the showing alarm without suppressing its reminder (logout path)
    pub fn clear_active(&self) {
        self.active.send_replace(None);
    }
}

async fn fetch_loop(engine: Arc<ReminderEngine>, mut session: watch::Receiver<bool>) {
    loop {
        if !*session.borrow() {
            if session.changed().await.is_err() {
                return;
            }
            continue;
        }

        // immediate fetch on becoming authenticated, then the fixed cadence
        engine.refresh().await;
        let mut interval = tokio::time::interval(FETCH_INTERVAL);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => engine.refresh().await,
                changed = session.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if !*session.borrow() {
                        break;
                    }
                }
            }
        }
    }
}

async fn check_loop(engine: Arc<ReminderEngine>, mut session: watch::Receiver<bool>) {
    loop {
        if !*session.borrow() {
            if session.changed().await.is_err() {
                return;
            }
            continue;
        }

        let mut interval = tokio::time::interval(CHECK_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => engine.check_now(Utc::now()).await,
                changed = session.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if !*session.borrow() {
                        // logout hides any showing alarm
                        engine.clear_active();
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs_ago: i64, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        Some(now - TimeDelta::seconds(secs_ago))
    }

    fn reminder(id: &str, alert_time: Option<DateTime<Utc>>) -> Reminder {
        Reminder {
            id: id.to_string(),
            message: format!("recordatorio {id}"),
            alert_time,
            minutes_before: 0,
            sent: false,
            notification_sound: "default".to_string(),
            custom_sound_url: None,
            account_name: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap()
    }

    fn engine() -> Arc<ReminderEngine> {
        let api = Arc::new(ApiClient::new("http://localhost:3000/api", None));
        Arc::new(ReminderEngine::new(api, UiBus::new()))
    }

    #[test]
    fn test_recently_overdue_reminder_is_due() {
        let tracker = DueTracker::default();
        let list = vec![reminder("r1", at(30, now()))];
        let due = tracker.next_due(&list, now()).unwrap();
        assert_eq!(due.id, "r1");
    }

    #[test]
    fn test_future_alert_is_not_due() {
        let tracker = DueTracker::default();
        let list = vec![reminder("r1", at(-60, now()))];
        assert!(tracker.next_due(&list, now()).is_none());
    }

    #[test]
    fn test_catch_up_window_boundary() {
        let tracker = DueTracker::default();

        let inside = vec![reminder("r1", at(23 * 3600, now()))];
        assert!(tracker.next_due(&inside, now()).is_some());

        let outside = vec![reminder("r1", at(25 * 3600, now()))];
        assert!(tracker.next_due(&outside, now()).is_none());
    }

    #[test]
    fn test_first_match_wins_over_more_overdue() {
        let tracker = DueTracker::default();
        // r2 is more overdue but r1 comes first in list order
        let list = vec![reminder("r1", at(30, now())), reminder("r2", at(3600, now()))];
        assert_eq!(tracker.next_due(&list, now()).unwrap().id, "r1");
    }

    #[test]
    fn test_missing_alert_time_is_skipped() {
        let tracker = DueTracker::default();
        let list = vec![reminder("r1", None), reminder("r2", at(30, now()))];
        assert_eq!(tracker.next_due(&list, now()).unwrap().id, "r2");
    }

    #[test]
    fn test_sent_does_not_suppress() {
        let tracker = DueTracker::default();
        let mut r = reminder("r1", at(30, now()));
        r.sent = true;
        assert!(tracker.next_due(&[r], now()).is_some());
    }

    #[test]
    fn test_dismiss_is_permanent_for_the_session() {
        let tracker = DueTracker::default();
        let list = vec![reminder("r1", at(30, now()))];

        tracker.dismiss("r1");
        assert!(tracker.next_due(&list, now()).is_none());
        assert!(tracker.next_due(&list, now() + TimeDelta::hours(1)).is_none());
    }

    #[test]
    fn test_snooze_suppresses_then_refires_and_clears() {
        let tracker = DueTracker::default();
        let list = vec![reminder("r1", at(30, now()))];
        let t0 = now();

        let until = tracker.snooze("r1", t0);
        assert_eq!(until, t0 + TimeDelta::minutes(SNOOZE_MINUTES));

        assert!(tracker.next_due(&list, t0 + TimeDelta::minutes(4)).is_none());

        let refired = tracker
            .next_due(&list, t0 + TimeDelta::minutes(5) + TimeDelta::seconds(1))
            .unwrap();
        assert_eq!(refired.id, "r1");
        assert!(tracker.snoozed_until("r1").is_none());
    }

    #[test]
    fn test_snooze_refires_outside_the_catch_up_window() {
        let tracker = DueTracker::default();
        // alert passed 30 hours ago: outside the window, but the elapsed
        // snooze overrides that
        let list = vec![reminder("r1", at(30 * 3600, now()))];
        let t0 = now();

        tracker.snooze("r1", t0);
        let refired = tracker.next_due(&list, t0 + TimeDelta::minutes(6)).unwrap();
        assert_eq!(refired.id, "r1");
    }

    #[test]
    fn test_snooze_rearms_a_dismissed_reminder() {
        let tracker = DueTracker::default();
        let list = vec![reminder("r1", at(30, now()))];

        tracker.dismiss("r1");
        tracker.snooze("r1", now());
        assert!(tracker
            .next_due(&list, now() + TimeDelta::minutes(6))
            .is_some());
    }

    #[tokio::test]
    async fn test_showing_alarm_is_never_overwritten() {
        let engine = engine();
        engine
            .store(vec![reminder("r1", at(30, now())), reminder("r2", at(40, now()))])
            .await;

        engine.check_now(now()).await;
        assert_eq!(engine.active().unwrap().id, "r1");

        // further ticks must not touch the showing alarm
        engine.check_now(now() + TimeDelta::seconds(10)).await;
        assert_eq!(engine.active().unwrap().id, "r1");
    }

    #[tokio::test]
    async fn test_dismiss_unblocks_the_next_due_reminder() {
        let engine = engine();
        engine
            .store(vec![reminder("r1", at(30, now())), reminder("r2", at(40, now()))])
            .await;

        engine.check_now(now()).await;
        assert_eq!(engine.dismiss_active().as_deref(), Some("r1"));
        assert!(engine.tracker().is_dismissed("r1"));
        assert!(engine.active().is_none());

        engine.check_now(now() + TimeDelta::seconds(10)).await;
        assert_eq!(engine.active().unwrap().id, "r2");

        // r1 never comes back this session
        engine.dismiss_active();
        engine.check_now(now() + TimeDelta::seconds(20)).await;
        assert!(engine.active().is_none());
    }

    #[tokio::test]
    async fn test_snooze_active_sets_the_wake_time() {
        let engine = engine();
        engine.store(vec![reminder("r1", at(30, now()))]).await;

        engine.check_now(now()).await;
        let (id, until) = engine.snooze_active(now()).unwrap();
        assert_eq!(id, "r1");
        assert_eq!(until, now() + TimeDelta::minutes(SNOOZE_MINUTES));
        assert!(engine.active().is_none());

        // not yet
        engine.check_now(now() + TimeDelta::minutes(4)).await;
        assert!(engine.active().is_none());

        // now it re-fires and the entry is consumed
        engine.check_now(now() + TimeDelta::minutes(6)).await;
        assert_eq!(engine.active().unwrap().id, "r1");
        assert!(engine.tracker().snoozed_until("r1").is_none());
    }

    #[tokio::test]
    async fn test_clear_active_does_not_suppress() {
        let engine = engine();
        engine.store(vec![reminder("r1", at(30, now()))]).await;

        engine.check_now(now()).await;
        engine.clear_active();
        assert!(engine.active().is_none());
        assert!(!engine.tracker().is_dismissed("r1"));

        engine.check_now(now() + TimeDelta::seconds(10)).await;
        assert_eq!(engine.active().unwrap().id, "r1");
    }
}
