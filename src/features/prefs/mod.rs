//! # Feature: Notification Preferences
//!
//! Server-stored notification settings merged over local defaults, applied to
//! the sound manager after login. Quiet hours suppress the repeating alarm
//! sound without hiding the alarm itself.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.6.0
//! - **Toggleable**: true

use anyhow::Result;
use chrono::NaiveTime;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::ApiClient;
use crate::features::audio::SoundManager;

/// User notification preferences; field names mirror the backend's camelCase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationPreferences {
    pub notifications_enabled: bool,
    pub notification_sound: String,
    /// 0–100
    pub notification_volume: u32,
    pub quiet_hours_enabled: bool,
    /// "HH:MM"
    pub quiet_hours_start: String,
    /// "HH:MM"; an end before the start wraps past midnight
    pub quiet_hours_end: String,
    pub email_notifications: bool,
    pub browser_notifications: bool,
    pub timezone: String,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        NotificationPreferences {
            notifications_enabled: true,
            notification_sound: "default".to_string(),
            notification_volume: 80,
            quiet_hours_enabled: false,
            quiet_hours_start: "22:00".to_string(),
            quiet_hours_end: "08:00".to_string(),
            email_notifications: true,
            browser_notifications: true,
            timezone: "UTC".to_string(),
        }
    }
}

impl NotificationPreferences {
    /// Whether `now` falls inside the configured quiet window. Unparseable
    /// boundaries disable the window rather than muting forever.
    pub fn in_quiet_hours(&self, now: NaiveTime) -> bool {
        if !self.quiet_hours_enabled {
            return false;
        }
        let (Some(start), Some(end)) = (
            parse_clock(&self.quiet_hours_start),
            parse_clock(&self.quiet_hours_end),
        ) else {
            debug!(
                "ignoring quiet hours with unparseable bounds {}..{}",
                self.quiet_hours_start, self.quiet_hours_end
            );
            return false;
        };

        if start <= end {
            now >= start && now < end
        } else {
            // overnight window, e.g. 22:00..08:00
            now >= start || now < end
        }
    }

    /// Push the enabled flag and volume into the sound manager
    pub fn apply(&self, sound: &SoundManager) {
        sound.set_enabled(self.notifications_enabled);
        sound.set_volume(self.notification_volume);
    }
}

fn parse_clock(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()
}

/// Fetch preferences from the backend, merging over defaults; any failure
/// keeps the defaults (the preferences endpoint is optional server-side)
pub async fn fetch(api: &ApiClient) -> NotificationPreferences {
    match api.fetch_preferences().await {
        Ok(value) => match serde_json::from_value::<NotificationPreferences>(value) {
            Ok(prefs) => {
                info!(
                    "loaded notification preferences (sound '{}', volume {}%)",
                    prefs.notification_sound, prefs.notification_volume
                );
                prefs
            }
            Err(e) => {
                debug!("preferences payload not usable, using defaults: {e}");
                NotificationPreferences::default()
            }
        },
        Err(e) => {
            debug!("preferences fetch failed, using defaults: {e}");
            NotificationPreferences::default()
        }
    }
}

/// Push a partial preference update to the backend (optimistic: the caller
/// applies the change locally first)
pub async fn push(api: &ApiClient, patch: &Value) -> Result<()> {
    api.update_preferences(patch).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_partial_payload_merges_over_defaults() {
        let prefs: NotificationPreferences =
            serde_json::from_value(json!({ "notificationVolume": 40 })).unwrap();
        assert_eq!(prefs.notification_volume, 40);
        assert!(prefs.notifications_enabled);
        assert_eq!(prefs.notification_sound, "default");
        assert_eq!(prefs.quiet_hours_start, "22:00");
    }

    #[test]
    fn test_quiet_hours_disabled_by_default() {
        let prefs = NotificationPreferences::default();
        assert!(!prefs.in_quiet_hours(at(23, 0)));
    }

    #[test]
    fn test_quiet_hours_same_day_window() {
        let prefs = NotificationPreferences {
            quiet_hours_enabled: true,
            quiet_hours_start: "13:00".to_string(),
            quiet_hours_end: "15:00".to_string(),
            ..Default::default()
        };
        assert!(!prefs.in_quiet_hours(at(12, 59)));
        assert!(prefs.in_quiet_hours(at(13, 0)));
        assert!(prefs.in_quiet_hours(at(14, 30)));
        assert!(!prefs.in_quiet_hours(at(15, 0)));
    }

    #[test]
    fn test_quiet_hours_overnight_window() {
        let prefs = NotificationPreferences {
            quiet_hours_enabled: true,
            ..Default::default()
        };
        assert!(prefs.in_quiet_hours(at(23, 30)));
        assert!(prefs.in_quiet_hours(at(3, 0)));
        assert!(!prefs.in_quiet_hours(at(8, 0)));
        assert!(!prefs.in_quiet_hours(at(12, 0)));
    }

    #[test]
    fn test_unparseable_bounds_disable_the_window() {
        let prefs = NotificationPreferences {
            quiet_hours_enabled: true,
            quiet_hours_start: "siempre".to_string(),
            ..Default::default()
        };
        assert!(!prefs.in_quiet_hours(at(23, 0)));
    }
}
