//! # API Payload Normalization
//!
//! The single place where the backend's naming drift is absorbed. Older
//! backend versions emit snake_case (`fecha_recordatorio`, `minutos_antes`,
//! `enviado`), newer ones camelCase (`fechaRecordatorio`, `minutosAntes`);
//! list payloads arrive either bare (`[...]`) or wrapped in a keyed object
//! (`{"reminders": [...]}`), and numeric fields occasionally come back as
//! strings. Everything downstream of this module works with clean types and
//! never consults alternate spellings.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.4.0
//! - **Toggleable**: false

use chrono::{DateTime, NaiveDateTime, Utc};
use log::debug;
use serde_json::Value;

use crate::api::types::Reminder;

/// Unwrap a list payload that may be bare or wrapped under `key`
pub fn unwrap_list(value: Value, key: &str) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Unwrap a single-object payload that may be bare or wrapped under `key`
pub fn unwrap_object(value: Value, key: &str) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key(key) => {
            map.remove(key).unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Build the internal reminder projection from a raw backend object
///
/// Returns `None` when the object has no usable id; every other field
/// degrades to a sensible default so that a partially filled record still
/// reaches the due-check engine.
pub fn reminder_from_value(value: &Value) -> Option<Reminder> {
    let id = id_string(value.get("id")?)?;

    let message = str_field(value, &["mensaje", "titulo", "title"])
        .unwrap_or_default()
        .to_string();

    let alert_time = str_field(value, &["fecha_recordatorio", "fechaRecordatorio"])
        .and_then(parse_timestamp);

    let minutes_before = int_field(value, &["minutos_antes", "minutosAntes"]);

    let sent = bool_field(value, &["enviado", "sent"]);

    let notification_sound = str_field(value, &["notification_sound", "notificationSound"])
        .unwrap_or("default")
        .to_string();

    let custom_sound_url = str_field(value, &["custom_sound_url", "customSoundUrl"])
        .filter(|s| !s.is_empty())
        .map(String::from);

    let account_name = ["cuenta", "account"]
        .iter()
        .find_map(|key| value.get(key))
        .and_then(|acc| str_field(acc, &["nombre", "name"]))
        .map(String::from);

    Some(Reminder {
        id,
        message,
        alert_time,
        minutes_before,
        sent,
        notification_sound,
        custom_sound_url,
        account_name,
    })
}

/// Normalize a full reminder-list payload
pub fn reminders_from_value(value: Value) -> Vec<Reminder> {
    let items = unwrap_list(value, "reminders");
    let total = items.len();
    let reminders: Vec<Reminder> = items.iter().filter_map(reminder_from_value).collect();
    if reminders.len() < total {
        debug!(
            "skipped {} reminder record(s) without a usable id",
            total - reminders.len()
        );
    }
    reminders
}

/// Parse a backend timestamp: RFC 3339 first, then the naive formats the
/// backend has been seen emitting (interpreted as UTC)
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    None
}

fn str_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| value.get(key)?.as_str())
}

fn int_field(value: &Value, keys: &[&str]) -> i64 {
    keys.iter()
        .find_map(|key| match value.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .unwrap_or(0)
}

fn bool_field(value: &Value, keys: &[&str]) -> bool {
    keys.iter()
        .find_map(|key| value.get(key)?.as_bool())
        .unwrap_or(false)
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reminder_from_snake_case() {
        let raw = json!({
            "id": 12,
            "mensaje": "Pagar alquiler",
            "fecha_recordatorio": "2026-08-06T09:00:00Z",
            "minutos_antes": 15,
            "enviado": false,
            "notification_sound": "bell",
            "cuenta": { "nombre": "Gastos" }
        });

        let r = reminder_from_value(&raw).unwrap();
        assert_eq!(r.id, "12");
        assert_eq!(r.message, "Pagar alquiler");
        assert!(r.alert_time.is_some());
        assert_eq!(r.minutes_before, 15);
        assert!(!r.sent);
        assert_eq!(r.notification_sound, "bell");
        assert_eq!(r.account_name.as_deref(), Some("Gastos"));
    }

    #[test]
    fn test_reminder_from_camel_case() {
        let raw = json!({
            "id": "ab-34",
            "titulo": "Revisar tarjeta",
            "fechaRecordatorio": "2026-08-06T09:00:00.000Z",
            "minutosAntes": "30",
            "sent": true,
            "notificationSound": "chime",
            "customSoundUrl": "/uploads/sounds/custom1.mp3",
            "account": { "nombre": "Principal" }
        });

        let r = reminder_from_value(&raw).unwrap();
        assert_eq!(r.id, "ab-34");
        assert_eq!(r.message, "Revisar tarjeta");
        assert_eq!(r.minutes_before, 30);
        assert!(r.sent);
        assert_eq!(
            r.custom_sound_url.as_deref(),
            Some("/uploads/sounds/custom1.mp3")
        );
        assert_eq!(r.account_name.as_deref(), Some("Principal"));
    }

    #[test]
    fn test_reminder_defaults_when_fields_missing() {
        let r = reminder_from_value(&json!({ "id": 1 })).unwrap();
        assert_eq!(r.message, "");
        assert!(r.alert_time.is_none());
        assert_eq!(r.minutes_before, 0);
        assert!(!r.sent);
        assert_eq!(r.notification_sound, "default");
        assert!(r.custom_sound_url.is_none());
    }

    #[test]
    fn test_reminder_requires_an_id() {
        assert!(reminder_from_value(&json!({ "mensaje": "sin id" })).is_none());
    }

    #[test]
    fn test_unwrap_list_accepts_both_shapes() {
        let bare = json!([{ "id": 1 }]);
        assert_eq!(unwrap_list(bare, "reminders").len(), 1);

        let wrapped = json!({ "reminders": [{ "id": 1 }, { "id": 2 }] });
        assert_eq!(unwrap_list(wrapped, "reminders").len(), 2);

        let unrelated = json!({ "other": [] });
        assert!(unwrap_list(unrelated, "reminders").is_empty());
    }

    #[test]
    fn test_unwrap_object_accepts_both_shapes() {
        let wrapped = json!({ "account": { "id": 5 } });
        assert_eq!(unwrap_object(wrapped, "account"), json!({ "id": 5 }));

        let bare = json!({ "id": 5 });
        assert_eq!(unwrap_object(bare.clone(), "account"), bare);
    }

    #[test]
    fn test_reminders_from_value_skips_broken_records() {
        let payload = json!({ "reminders": [{ "id": 1 }, { "mensaje": "roto" }] });
        let reminders = reminders_from_value(payload);
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].id, "1");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2026-08-06T09:00:00Z").is_some());
        assert!(parse_timestamp("2026-08-06T09:00:00.123").is_some());
        assert!(parse_timestamp("2026-08-06 09:00:00").is_some());
        assert!(parse_timestamp("mañana").is_none());
    }
}
