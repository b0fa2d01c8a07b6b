//! # Audio Player Backend
//!
//! Resolves sound selections to playable sources and starts playback through
//! an external player process. The spawned child IS the audio resource:
//! `kill_on_drop` plus an explicit `stop` guarantee that releasing the handle
//! always silences the player.
//!
//! The player binary and its argument template live in a YAML file so
//! deployments can swap mpv for paplay or anything else that accepts a path
//! or URL.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.5.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 1.1.0: Custom upload URLs resolved against the API base
//! - 1.0.0: Initial process-backed playback

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::process::{Child, Command};

/// Bundled notification sounds shipped with the client, id → display name
pub const BUNDLED_SOUNDS: &[(&str, &str)] = &[
    ("default", "Por defecto"),
    ("chime", "Campanilla"),
    ("bell", "Campana"),
    ("ping", "Ping"),
    ("pop", "Pop"),
    ("ding", "Ding"),
    ("alert", "Alerta"),
    ("gentle", "Suave"),
    ("none", "Sin sonido"),
];

/// Display name for a sound id; unknown ids fall through unchanged
pub fn sound_display_name(sound_id: &str) -> &str {
    BUNDLED_SOUNDS
        .iter()
        .find(|(id, _)| *id == sound_id)
        .map(|(_, name)| *name)
        .unwrap_or(sound_id)
}

/// A resolved, playable sound source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundSource {
    /// Bundled asset on disk
    Asset(PathBuf),
    /// Remote URL (custom uploaded sound)
    Remote(String),
}

impl SoundSource {
    /// The string handed to the player process
    pub fn as_player_arg(&self) -> String {
        match self {
            SoundSource::Asset(path) => path.to_string_lossy().into_owned(),
            SoundSource::Remote(url) => url.clone(),
        }
    }
}

/// Server root for uploaded sounds: the API base with a trailing `/api`
/// segment stripped
pub fn upload_base(api_base: &str) -> String {
    let trimmed = api_base.trim_end_matches('/');
    trimmed.strip_suffix("/api").unwrap_or(trimmed).to_string()
}

/// Resolve a sound selection to a playable source
///
/// Custom URLs win over the bundled id; relative upload paths are resolved
/// against the server root. Unknown bundled ids fall back to "default", the
/// same as the reference catalog. Returns `None` only for "none" — callers
/// are expected to have filtered that out already.
pub fn resolve_source(
    sound_id: &str,
    custom_url: Option<&str>,
    sound_dir: &Path,
    api_base: &str,
) -> Option<SoundSource> {
    if let Some(url) = custom_url.filter(|u| !u.is_empty()) {
        let resolved = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}{}", upload_base(api_base), url)
        };
        return Some(SoundSource::Remote(resolved));
    }

    if sound_id == "none" {
        return None;
    }

    let known = BUNDLED_SOUNDS.iter().any(|(id, _)| *id == sound_id);
    let id = if known { sound_id } else { "default" };
    Some(SoundSource::Asset(sound_dir.join(format!("{id}.mp3"))))
}

fn default_max_play_seconds() -> u64 {
    30
}

/// External player configuration, loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Player binary, e.g. "mpv"
    pub command: String,

    /// Argument template; `${source}` and `${volume}` are substituted
    #[serde(default)]
    pub args: Vec<String>,

    /// Hard cap on a single playback before the child is killed
    #[serde(default = "default_max_play_seconds")]
    pub max_play_seconds: u64,
}

impl PlayerConfig {
    /// Load and validate a player configuration file
    pub fn load(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read player config {path}"))?;
        let config: PlayerConfig =
            serde_yaml::from_str(&contents).with_context(|| format!("invalid YAML in {path}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Default mpv invocation used when no config file is present
    pub fn default_player() -> Self {
        PlayerConfig {
            command: "mpv".to_string(),
            args: vec![
                "--no-terminal".to_string(),
                "--really-quiet".to_string(),
                "--volume=${volume}".to_string(),
                "${source}".to_string(),
            ],
            max_play_seconds: default_max_play_seconds(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.command.trim().is_empty() {
            return Err(anyhow::anyhow!("player command must not be empty"));
        }
        if !self.args.iter().any(|arg| arg.contains("${source}")) {
            return Err(anyhow::anyhow!(
                "player args must reference ${{source}} somewhere"
            ));
        }
        if self.max_play_seconds == 0 {
            return Err(anyhow::anyhow!("max_play_seconds must be positive"));
        }
        Ok(())
    }

    /// Substitute the template placeholders for one playback
    fn build_args(&self, source: &SoundSource, volume_percent: u32) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("${source}", &source.as_player_arg())
                    .replace("${volume}", &volume_percent.to_string())
            })
            .collect()
    }
}

/// A single playback in flight; dropping it releases the resource
pub trait PlaybackHandle: Send {
    /// True once playback ended on its own
    fn is_finished(&mut self) -> bool;

    /// Stop playback and release the underlying resource. Idempotent.
    fn stop(&mut self);
}

/// Starts playback of resolved sources
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start playing `source` at `volume` (0.0–1.0); the returned handle owns
    /// the playback resource
    async fn start(&self, source: &SoundSource, volume: f32) -> Result<Box<dyn PlaybackHandle>>;
}

/// Playback backend that shells out to a configured player binary
pub struct ProcessPlayer {
    config: PlayerConfig,
}

impl ProcessPlayer {
    pub fn new(config: PlayerConfig) -> Result<Self> {
        config.validate()?;
        Ok(ProcessPlayer { config })
    }
}

#[async_trait]
impl AudioBackend for ProcessPlayer {
    async fn start(&self, source: &SoundSource, volume: f32) -> Result<Box<dyn PlaybackHandle>> {
        let volume_percent = (volume.clamp(0.0, 1.0) * 100.0).round() as u32;
        let args = self.config.build_args(source, volume_percent);

        let child = Command::new(&self.config.command)
            .args(&args)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn player '{}'", self.config.command))?;

        Ok(Box::new(ProcessHandle { child }))
    }
}

struct ProcessHandle {
    child: Child,
}

impl PlaybackHandle for ProcessHandle {
    fn is_finished(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(status) => status.is_some(),
            Err(e) => {
                warn!("player status check failed: {e}");
                true
            }
        }
    }

    fn stop(&mut self) {
        // start_kill errors once the child has already exited; that is fine
        let _ = self.child.start_kill();
    }
}
