use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use monedero::core::Config;
use monedero::features::alarm::{AlarmController, ReminderEngine};
use monedero::features::audio::{PlayerConfig, ProcessPlayer, SoundManager};
use monedero::features::prefs;
use monedero::features::session::SessionManager;
use monedero::{ApiClient, UiBus, UiEvent};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting Monedero companion agent...");
    info!("🌐 Backend: {}", config.api_base_url);

    let bus = UiBus::new();
    let api = Arc::new(ApiClient::new(&config.api_base_url, config.auth_token.clone()));

    // Restore the previous session, if the stored token is still good
    let session = Arc::new(SessionManager::new(api.clone(), bus.clone()));
    session.bootstrap().await;
    if session.is_authenticated() {
        info!("🔐 Session restored, reminder alarms are armed");
    } else {
        info!("🔐 Logged out - alarms stay idle until a login");
    }

    // Audio player: configured file if present, mpv defaults otherwise
    let player_config = match PlayerConfig::load(&config.player_config_path) {
        Ok(loaded) => {
            info!("🔊 Loaded player config from {}", config.player_config_path);
            loaded
        }
        Err(e) => {
            if std::path::Path::new(&config.player_config_path).exists() {
                error!(
                    "❌ Failed to load player config {}: {e}",
                    config.player_config_path
                );
                return Err(e);
            }
            info!(
                "🔊 No player config at {} - using mpv defaults",
                config.player_config_path
            );
            PlayerConfig::default_player()
        }
    };
    let max_play = player_config.max_play_seconds;
    let backend = Arc::new(ProcessPlayer::new(player_config)?);
    let sound = Arc::new(
        SoundManager::new(
            backend,
            bus.clone(),
            PathBuf::from(&config.sound_dir),
            &config.api_base_url,
        )
        .with_max_play_seconds(max_play),
    );
    sound.init().await;

    // Notification preferences: server values when logged in, defaults otherwise
    let preferences = if session.is_authenticated() {
        prefs::fetch(&api).await
    } else {
        prefs::NotificationPreferences::default()
    };
    preferences.apply(sound.as_ref());
    let preferences = Arc::new(RwLock::new(preferences));

    // The core: polling/due-check engine plus the presentation controller
    let engine = Arc::new(ReminderEngine::new(api.clone(), bus.clone()));
    let engine_handle = engine.start(session.subscribe());

    let controller = Arc::new(AlarmController::new(
        engine.clone(),
        sound.clone(),
        bus.clone(),
        preferences.clone(),
    ));
    let controller_handle = controller.start();

    // The bundled shell just logs UI events; a real front-end renders them
    let mut events = bus.subscribe();
    let event_logger = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(UiEvent::AlarmShown { reminder, .. }) => {
                    let message = if reminder.message.is_empty() {
                        "Tienes un recordatorio"
                    } else {
                        reminder.message.as_str()
                    };
                    info!("🔔 ALARM: {message} ({})", reminder.id);
                }
                Ok(UiEvent::AlarmHidden { reminder_id, reason }) => {
                    info!("🔕 alarm {reminder_id} hidden ({reason:?})");
                }
                Ok(UiEvent::Toast { level, title, detail, .. }) => {
                    info!("💬 [{level:?}] {title} {}", detail.unwrap_or_default());
                }
                Ok(other) => info!("📡 {other:?}"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("event logger lagged, {skipped} event(s) skipped");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    info!("Agent running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    controller_handle.stop();
    engine_handle.stop();
    sound.dispose().await;
    event_logger.abort();
    info!("Goodbye 👋");

    Ok(())
}
