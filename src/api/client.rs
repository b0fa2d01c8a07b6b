//! # Backend REST Client
//!
//! Thin typed wrappers over the finance backend. Every response passes
//! through the normalization layer before it reaches a caller, so envelope
//! shape and field spelling drift stay confined to `api::normalize`.
//!
//! Peripheral resources (accounts, categories, tags, tasks, movements,
//! events, notifications) are plain CRUD pass-throughs; the alarm engine only
//! depends on the auth and reminder endpoints.
//!
//! - **Version**: 1.3.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.3.0: Custom sound upload/delete endpoints
//! - 1.2.0: Notification and preference endpoints
//! - 1.1.0: Peripheral CRUD wrappers
//! - 1.0.0: Auth and reminder endpoints

use anyhow::{Context, Result};
use log::warn;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::api::normalize::{reminder_from_value, reminders_from_value, unwrap_object};
use crate::api::types::{
    Account, CalendarEvent, Category, Movement, NotificationItem, Reminder, SoundEntry, Tag,
    TaskItem,
};
use crate::core::config::normalize_base_url;

/// Result of a successful login or registration
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: Value,
}

/// HTTP client bound to one backend instance
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        ApiClient {
            http: reqwest::Client::new(),
            base_url: normalize_base_url(base_url),
            token: RwLock::new(token),
        }
    }

    /// The configured backend base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn set_token(&self, token: String) {
        *self.token.write().await = Some(token);
    }

    pub async fn clear_token(&self) {
        *self.token.write().await = None;
    }

    pub async fn has_token(&self) -> bool {
        self.token.read().await.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, req: reqwest::RequestBuilder, path: &str) -> Result<Value> {
        let req = match self.token.read().await.as_ref() {
            Some(token) => req.bearer_auth(token),
            None => req,
        };

        let resp = req
            .send()
            .await
            .with_context(|| format!("request to {path} failed"))?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("{path} returned {status}: {body}");
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).with_context(|| format!("{path} returned malformed JSON"))
    }

    async fn get(&self, path: &str) -> Result<Value> {
        self.send(self.http.get(self.url(path)), path).await
    }

    async fn json(&self, method: Method, path: &str, body: &Value) -> Result<Value> {
        self.send(self.http.request(method, self.url(path)).json(body), path)
            .await
    }

    async fn delete(&self, path: &str) -> Result<Value> {
        self.send(self.http.delete(self.url(path)), path).await
    }

    fn parse_list<T: DeserializeOwned>(value: Value, key: &str) -> Vec<T> {
        crate::api::normalize::unwrap_list(value, key)
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!("skipping malformed {key} record: {e}");
                    None
                }
            })
            .collect()
    }

    // ========================================================================
    // Auth
    // ========================================================================

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let value = self
            .json(
                Method::POST,
                "/auth/login",
                &json!({ "email": email, "password": password }),
            )
            .await?;
        Self::auth_session(value)
    }

    pub async fn register(&self, nombre: &str, email: &str, password: &str) -> Result<AuthSession> {
        let value = self
            .json(
                Method::POST,
                "/auth/register",
                &json!({ "nombre": nombre, "email": email, "password": password }),
            )
            .await?;
        Self::auth_session(value)
    }

    fn auth_session(value: Value) -> Result<AuthSession> {
        let token = value
            .get("token")
            .and_then(Value::as_str)
            .context("auth response missing token")?
            .to_string();
        let user = unwrap_object(value, "user");
        Ok(AuthSession { token, user })
    }

    pub async fn get_profile(&self) -> Result<Value> {
        Ok(unwrap_object(self.get("/auth/profile").await?, "user"))
    }

    pub async fn update_profile(&self, data: &Value) -> Result<Value> {
        let value = self.json(Method::PUT, "/auth/profile", data).await?;
        Ok(unwrap_object(value, "user"))
    }

    pub async fn change_password(&self, data: &Value) -> Result<()> {
        self.json(Method::PUT, "/auth/password", data).await?;
        Ok(())
    }

    // ========================================================================
    // Reminders
    // ========================================================================

    pub async fn fetch_all_reminders(&self) -> Result<Vec<Reminder>> {
        Ok(reminders_from_value(self.get("/reminders").await?))
    }

    pub async fn fetch_account_reminders(&self, account_id: &str) -> Result<Vec<Reminder>> {
        let value = self.get(&format!("/accounts/{account_id}/reminders")).await?;
        Ok(reminders_from_value(value))
    }

    pub async fn create_reminder(&self, account_id: &str, data: &Value) -> Result<Reminder> {
        let value = self
            .json(
                Method::POST,
                &format!("/accounts/{account_id}/reminders"),
                data,
            )
            .await?;
        reminder_from_value(&unwrap_object(value, "reminder"))
            .context("create reminder returned an unusable record")
    }

    pub async fn delete_reminder(&self, account_id: &str, reminder_id: &str) -> Result<()> {
        self.delete(&format!("/accounts/{account_id}/reminders/{reminder_id}"))
            .await?;
        Ok(())
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    pub async fn fetch_accounts(&self) -> Result<Vec<Account>> {
        Ok(Self::parse_list(self.get("/accounts").await?, "accounts"))
    }

    pub async fn fetch_account(&self, account_id: &str) -> Result<Account> {
        let value = self.get(&format!("/accounts/{account_id}")).await?;
        serde_json::from_value(unwrap_object(value, "account")).context("malformed account")
    }

    pub async fn create_account(&self, data: &Value) -> Result<Account> {
        let value = self.json(Method::POST, "/accounts", data).await?;
        serde_json::from_value(unwrap_object(value, "account")).context("malformed account")
    }

    pub async fn update_account(&self, account_id: &str, data: &Value) -> Result<Account> {
        let value = self
            .json(Method::PUT, &format!("/accounts/{account_id}"), data)
            .await?;
        serde_json::from_value(unwrap_object(value, "account")).context("malformed account")
    }

    pub async fn delete_account(&self, account_id: &str) -> Result<()> {
        self.delete(&format!("/accounts/{account_id}")).await?;
        Ok(())
    }

    // ========================================================================
    // Categories and tags (account-scoped)
    // ========================================================================

    pub async fn fetch_categories(&self, account_id: &str) -> Result<Vec<Category>> {
        let value = self.get(&format!("/accounts/{account_id}/categories")).await?;
        Ok(Self::parse_list(value, "categories"))
    }

    pub async fn create_category(&self, account_id: &str, data: &Value) -> Result<Category> {
        let value = self
            .json(
                Method::POST,
                &format!("/accounts/{account_id}/categories"),
                data,
            )
            .await?;
        serde_json::from_value(unwrap_object(value, "category")).context("malformed category")
    }

    pub async fn update_category(
        &self,
        account_id: &str,
        category_id: &str,
        data: &Value,
    ) -> Result<Category> {
        let value = self
            .json(
                Method::PUT,
                &format!("/accounts/{account_id}/categories/{category_id}"),
                data,
            )
            .await?;
        serde_json::from_value(unwrap_object(value, "category")).context("malformed category")
    }

    pub async fn delete_category(&self, account_id: &str, category_id: &str) -> Result<()> {
        self.delete(&format!("/accounts/{account_id}/categories/{category_id}"))
            .await?;
        Ok(())
    }

    pub async fn fetch_tags(&self, account_id: &str) -> Result<Vec<Tag>> {
        let value = self.get(&format!("/accounts/{account_id}/tags")).await?;
        Ok(Self::parse_list(value, "tags"))
    }

    pub async fn create_tag(&self, account_id: &str, data: &Value) -> Result<Tag> {
        let value = self
            .json(Method::POST, &format!("/accounts/{account_id}/tags"), data)
            .await?;
        serde_json::from_value(unwrap_object(value, "tag")).context("malformed tag")
    }

    pub async fn update_tag(&self, account_id: &str, tag_id: &str, data: &Value) -> Result<Tag> {
        let value = self
            .json(
                Method::PUT,
                &format!("/accounts/{account_id}/tags/{tag_id}"),
                data,
            )
            .await?;
        serde_json::from_value(unwrap_object(value, "tag")).context("malformed tag")
    }

    pub async fn delete_tag(&self, account_id: &str, tag_id: &str) -> Result<()> {
        self.delete(&format!("/accounts/{account_id}/tags/{tag_id}"))
            .await?;
        Ok(())
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    pub async fn fetch_tasks(&self) -> Result<Vec<TaskItem>> {
        Ok(Self::parse_list(self.get("/tasks").await?, "tasks"))
    }

    pub async fn fetch_account_tasks(&self, account_id: &str) -> Result<Vec<TaskItem>> {
        let value = self.get(&format!("/accounts/{account_id}/tasks")).await?;
        Ok(Self::parse_list(value, "tasks"))
    }

    pub async fn fetch_task_summary(&self) -> Result<Value> {
        self.get("/tasks/summary").await
    }

    pub async fn create_task(&self, data: &Value) -> Result<TaskItem> {
        let value = self.json(Method::POST, "/tasks", data).await?;
        serde_json::from_value(unwrap_object(value, "task")).context("malformed task")
    }

    pub async fn update_task(&self, task_id: &str, data: &Value) -> Result<TaskItem> {
        let value = self
            .json(Method::PUT, &format!("/tasks/{task_id}"), data)
            .await?;
        serde_json::from_value(unwrap_object(value, "task")).context("malformed task")
    }

    pub async fn update_task_status(
        &self,
        task_id: &str,
        estado: &str,
        comentario: Option<&str>,
    ) -> Result<TaskItem> {
        let value = self
            .json(
                Method::PUT,
                &format!("/tasks/{task_id}/status"),
                &json!({ "estado": estado, "comentario": comentario }),
            )
            .await?;
        serde_json::from_value(unwrap_object(value, "task")).context("malformed task")
    }

    pub async fn delete_task(&self, task_id: &str) -> Result<()> {
        self.delete(&format!("/tasks/{task_id}")).await?;
        Ok(())
    }

    // ========================================================================
    // Movements
    // ========================================================================

    pub async fn fetch_movements(&self, account_id: &str) -> Result<Vec<Movement>> {
        let value = self.get(&format!("/accounts/{account_id}/movements")).await?;
        Ok(Self::parse_list(value, "movements"))
    }

    pub async fn create_movement(&self, account_id: &str, data: &Value) -> Result<Movement> {
        let value = self
            .json(
                Method::POST,
                &format!("/accounts/{account_id}/movements"),
                data,
            )
            .await?;
        serde_json::from_value(unwrap_object(value, "movement")).context("malformed movement")
    }

    pub async fn update_movement(
        &self,
        account_id: &str,
        movement_id: &str,
        data: &Value,
    ) -> Result<Movement> {
        let value = self
            .json(
                Method::PUT,
                &format!("/accounts/{account_id}/movements/{movement_id}"),
                data,
            )
            .await?;
        serde_json::from_value(unwrap_object(value, "movement")).context("malformed movement")
    }

    pub async fn delete_movement(&self, account_id: &str, movement_id: &str) -> Result<()> {
        self.delete(&format!("/accounts/{account_id}/movements/{movement_id}"))
            .await?;
        Ok(())
    }

    // ========================================================================
    // Calendar events
    // ========================================================================

    pub async fn fetch_events(&self) -> Result<Vec<CalendarEvent>> {
        Ok(Self::parse_list(self.get("/events").await?, "events"))
    }

    pub async fn fetch_upcoming_events(&self, limit: usize) -> Result<Vec<CalendarEvent>> {
        let value = self
            .send(
                self.http.get(self.url("/events/upcoming")).query(&[("limit", limit)]),
                "/events/upcoming",
            )
            .await?;
        Ok(Self::parse_list(value, "events"))
    }

    pub async fn fetch_events_in_range(&self, inicio: &str, fin: &str) -> Result<Vec<CalendarEvent>> {
        let value = self
            .send(
                self.http
                    .get(self.url("/events/range"))
                    .query(&[("fechaInicio", inicio), ("fechaFin", fin)]),
                "/events/range",
            )
            .await?;
        Ok(Self::parse_list(value, "events"))
    }

    pub async fn create_event(&self, data: &Value) -> Result<CalendarEvent> {
        let value = self.json(Method::POST, "/events", data).await?;
        serde_json::from_value(unwrap_object(value, "event")).context("malformed event")
    }

    pub async fn update_event(&self, event_id: &str, data: &Value) -> Result<CalendarEvent> {
        let value = self
            .json(Method::PUT, &format!("/events/{event_id}"), data)
            .await?;
        serde_json::from_value(unwrap_object(value, "event")).context("malformed event")
    }

    pub async fn delete_event(&self, event_id: &str) -> Result<()> {
        self.delete(&format!("/events/{event_id}")).await?;
        Ok(())
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    pub async fn fetch_notifications(&self) -> Result<Vec<NotificationItem>> {
        Ok(Self::parse_list(
            self.get("/notifications").await?,
            "notifications",
        ))
    }

    pub async fn fetch_unread_count(&self) -> Result<u64> {
        let value = self.get("/notifications/unread/count").await?;
        Ok(value.get("count").and_then(Value::as_u64).unwrap_or(0))
    }

    pub async fn mark_notification_read(&self, notification_id: &str) -> Result<()> {
        self.json(
            Method::PUT,
            &format!("/notifications/{notification_id}/read"),
            &Value::Null,
        )
        .await?;
        Ok(())
    }

    pub async fn mark_all_notifications_read(&self) -> Result<()> {
        self.json(Method::PUT, "/notifications/read-all", &Value::Null)
            .await?;
        Ok(())
    }

    pub async fn delete_notification(&self, notification_id: &str) -> Result<()> {
        self.delete(&format!("/notifications/{notification_id}")).await?;
        Ok(())
    }

    pub async fn clear_notifications(&self) -> Result<()> {
        self.delete("/notifications").await?;
        Ok(())
    }

    // ========================================================================
    // Notification preferences and custom sounds
    // ========================================================================

    pub async fn fetch_preferences(&self) -> Result<Value> {
        Ok(unwrap_object(self.get("/preferences").await?, "preferences"))
    }

    pub async fn update_preferences(&self, patch: &Value) -> Result<()> {
        self.json(Method::PUT, "/preferences", patch).await?;
        Ok(())
    }

    pub async fn fetch_sounds(&self) -> Result<Vec<SoundEntry>> {
        Ok(Self::parse_list(
            self.get("/preferences/sounds").await?,
            "sounds",
        ))
    }

    pub async fn upload_sound(&self, filename: &str, bytes: Vec<u8>) -> Result<SoundEntry> {
        let part = Part::bytes(bytes).file_name(filename.to_string());
        let form = Form::new().part("sound", part);
        let value = self
            .send(
                self.http.post(self.url("/preferences/sounds")).multipart(form),
                "/preferences/sounds",
            )
            .await?;
        serde_json::from_value(unwrap_object(value, "sound")).context("malformed sound entry")
    }

    pub async fn delete_sound(&self, sound_id: &str) -> Result<()> {
        self.delete(&format!("/preferences/sounds/{sound_id}")).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_joining() {
        let client = ApiClient::new("http://localhost:3000/api/", None);
        assert_eq!(client.url("/reminders"), "http://localhost:3000/api/reminders");
    }

    #[test]
    fn test_auth_session_extraction() {
        let session = ApiClient::auth_session(json!({
            "token": "abc",
            "user": { "id": 1, "nombre": "Ana" }
        }))
        .unwrap();
        assert_eq!(session.token, "abc");
        assert_eq!(session.user["nombre"], "Ana");
    }

    #[test]
    fn test_auth_session_requires_token() {
        assert!(ApiClient::auth_session(json!({ "user": {} })).is_err());
    }

    #[tokio::test]
    async fn test_token_lifecycle() {
        let client = ApiClient::new("http://localhost:3000/api", None);
        assert!(!client.has_token().await);
        client.set_token("abc".to_string()).await;
        assert!(client.has_token().await);
        client.clear_token().await;
        assert!(!client.has_token().await);
    }

    #[test]
    fn test_parse_list_skips_malformed_records() {
        let value = json!({ "accounts": [{ "id": 1, "nombre": "A" }, 42] });
        let accounts: Vec<crate::api::types::Account> = ApiClient::parse_list(value, "accounts");
        assert_eq!(accounts.len(), 1);
    }
}
