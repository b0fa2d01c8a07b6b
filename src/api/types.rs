//! # Backend Resource Models
//!
//! Typed projections of the backend's JSON payloads. The backend has shipped
//! both snake_case and camelCase spellings across versions; known camelCase
//! variants are tolerated with serde aliases. The reminder projection is the
//! exception — its tolerance rules are involved enough that it is built by
//! the normalization layer instead (see [`crate::api::normalize`]).
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Movement and calendar event projections
//! - 1.1.0: Notification and sound catalog entries
//! - 1.0.0: Initial account/category/tag/task projections

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A reminder as consumed by the alarm engine
///
/// `alert_time` is already adjusted server-side to the moment the alert
/// should fire; `minutes_before` is carried for display only and is never
/// subtracted again. `sent` does not suppress the alarm — suppression is
/// purely local dismissal and snoozing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    /// Opaque identifier, unique per user
    pub id: String,

    /// Display text shown on the alarm
    pub message: String,

    /// Moment the alert should fire, if the backend sent a parseable one
    pub alert_time: Option<DateTime<Utc>>,

    /// Lead time the user configured when creating the reminder
    pub minutes_before: i64,

    /// Set by the backend once it considers the reminder delivered
    pub sent: bool,

    /// Bundled sound id ("default", "chime", ... or "none")
    pub notification_sound: String,

    /// Server-relative or absolute URL of an uploaded custom sound
    pub custom_sound_url: Option<String>,

    /// Display name of the associated account, if any
    pub account_name: Option<String>,
}

/// Deserialize an id that the backend sends as either a number or a string
pub fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Num(i64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Num(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

/// A money account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(alias = "name", default)]
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(alias = "balance", default)]
    pub saldo: Option<f64>,
}

/// A movement category scoped to an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(alias = "name", default)]
    pub nombre: String,
    /// "ingreso" or "gasto"
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// A free-form tag scoped to an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(alias = "name", default)]
    pub nombre: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// A task, optionally bound to an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskItem {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(alias = "title", default)]
    pub titulo: String,
    #[serde(default)]
    pub estado: Option<String>,
    #[serde(alias = "fechaLimite", default)]
    pub fecha_limite: Option<DateTime<Utc>>,
}

/// A money movement on an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub descripcion: String,
    #[serde(alias = "amount", default)]
    pub monto: f64,
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default)]
    pub fecha: Option<DateTime<Utc>>,
}

/// A calendar event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(alias = "title", default)]
    pub titulo: String,
    #[serde(alias = "fechaInicio", default)]
    pub fecha_inicio: Option<DateTime<Utc>>,
    #[serde(alias = "fechaFin", default)]
    pub fecha_fin: Option<DateTime<Utc>>,
}

/// An in-app notification record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationItem {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub titulo: Option<String>,
    #[serde(default)]
    pub mensaje: Option<String>,
    #[serde(alias = "read", default)]
    pub leido: bool,
}

/// A custom sound entry from the server catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundEntry {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(alias = "name", default)]
    pub nombre: String,
    #[serde(default)]
    pub url: Option<String>,
}
