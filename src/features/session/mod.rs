//! # Feature: Session
//!
//! Auth session bootstrap and the authenticated flag that gates the alarm
//! engine. Bootstrap failures (expired token, backend down) degrade to the
//! logged-out state without surfacing an error — the shell just shows the
//! login screen.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false

use anyhow::Result;
use log::{info, warn};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

use crate::api::ApiClient;
use crate::bus::{UiBus, UiEvent};

/// Owns the authenticated flag and the cached profile
pub struct SessionManager {
    api: Arc<ApiClient>,
    bus: UiBus,
    authenticated: watch::Sender<bool>,
    user: RwLock<Option<Value>>,
}

impl SessionManager {
    pub fn new(api: Arc<ApiClient>, bus: UiBus) -> Self {
        let (authenticated, _) = watch::channel(false);
        SessionManager {
            api,
            bus,
            authenticated,
            user: RwLock::new(None),
        }
    }

    /// Receiver for the authenticated flag; loops gate on this
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.authenticated.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        *self.authenticated.borrow()
    }

    pub async fn user(&self) -> Option<Value> {
        self.user.read().await.clone()
    }

    /// Validate a persisted token by fetching the profile. No token or a
    /// rejected token both land in the logged-out state, silently.
    pub async fn bootstrap(&self) {
        if !self.api.has_token().await {
            info!("no stored session token, starting logged out");
            return;
        }

        match self.api.get_profile().await {
            Ok(profile) => {
                *self.user.write().await = Some(profile);
                self.set_authenticated(true);
                info!("session restored from stored token");
            }
            Err(e) => {
                warn!("auth initialization failed, falling back to logged out: {e}");
                self.api.clear_token().await;
                *self.user.write().await = None;
                self.set_authenticated(false);
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let session = self.api.login(email, password).await?;
        self.api.set_token(session.token).await;
        *self.user.write().await = Some(session.user);
        self.set_authenticated(true);
        info!("logged in as {email}");
        Ok(())
    }

    pub async fn register(&self, nombre: &str, email: &str, password: &str) -> Result<()> {
        let session = self.api.register(nombre, email, password).await?;
        self.api.set_token(session.token).await;
        *self.user.write().await = Some(session.user);
        self.set_authenticated(true);
        info!("registered new account for {email}");
        Ok(())
    }

    pub async fn logout(&self) {
        self.api.clear_token().await;
        *self.user.write().await = None;
        self.set_authenticated(false);
        info!("logged out");
    }

    pub async fn refresh_profile(&self) -> Result<()> {
        let profile = self.api.get_profile().await?;
        *self.user.write().await = Some(profile);
        Ok(())
    }

    fn set_authenticated(&self, value: bool) {
        let changed = *self.authenticated.borrow() != value;
        self.authenticated.send_replace(value);
        if changed {
            self.bus.emit(UiEvent::SessionChanged {
                authenticated: value,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with_bus() -> (SessionManager, UiBus) {
        let bus = UiBus::new();
        let api = Arc::new(ApiClient::new("http://localhost:3000/api", None));
        (SessionManager::new(api, bus.clone()), bus)
    }

    #[tokio::test]
    async fn test_starts_logged_out() {
        let (manager, _bus) = manager_with_bus();
        assert!(!manager.is_authenticated());
        assert!(manager.user().await.is_none());
    }

    #[tokio::test]
    async fn test_bootstrap_without_token_stays_logged_out() {
        let (manager, _bus) = manager_with_bus();
        manager.bootstrap().await;
        assert!(!manager.is_authenticated());
    }

    #[tokio::test]
    async fn test_flag_change_notifies_subscribers_once() {
        let (manager, bus) = manager_with_bus();
        let mut events = bus.subscribe();
        let mut flag = manager.subscribe();

        manager.set_authenticated(true);
        manager.set_authenticated(true);

        assert!(flag.changed().await.is_ok());
        assert!(*flag.borrow());

        match events.recv().await.unwrap() {
            UiEvent::SessionChanged { authenticated } => assert!(authenticated),
            other => panic!("unexpected event: {other:?}"),
        }
        // the repeated set must not have queued a second event
        assert!(events.try_recv().is_err());
    }
}
