//! Persisted plugin settings.
//!
//! One TOML file with one table per plugin. Absent fields keep their
//! defaults, so a partial file (or no file at all) is always valid. A watcher
//! re-parses the file on change and forwards the new settings to the host,
//! which pushes them into the plugins via their `load_settings` methods.

use anyhow::{Context, Result};
use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::recorder::RecorderConfig;
use crate::screen_log::ScreenLogConfig;

pub const SETTINGS_FILE_NAME: &str = "matchlog.toml";

/// Root settings record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub recorder: RecorderConfig,
    pub screen_log: ScreenLogConfig,
}

/// Loads the settings file at `path`, returning `Settings::default()` if the
/// file does not exist. Returns an error if the file exists but cannot be
/// read or parsed.
pub fn load_or_default(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse settings file: {}", path.display()))
}

/// Serializes `settings` to TOML at `path`, creating parent directories as
/// needed.
pub fn save(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let content = toml::to_string_pretty(settings).context("Failed to serialize settings")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write settings file: {}", path.display()))
}

/// Spawns a file watcher on the parent directory of `path`. Whenever the
/// settings file is created or modified, reloads it and sends the re-parsed
/// [`Settings`] to `tx`. A failed re-parse is logged and skipped.
pub async fn watch_settings(path: PathBuf, tx: mpsc::Sender<Settings>) {
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Event>(16);

    let mut watcher = match RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = watch_tx.blocking_send(event);
            }
        },
        NotifyConfig::default(),
    ) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("[settings] Failed to create file watcher: {e}");
            return;
        }
    };

    // Watch the parent directory rather than the file directly so we catch
    // editor-style atomic saves (write-new + rename).
    let watch_dir = match path.parent() {
        Some(d) => d.to_path_buf(),
        None => {
            eprintln!("[settings] Settings path has no parent directory");
            return;
        }
    };

    if let Err(e) = watcher.watch(&watch_dir, RecursiveMode::NonRecursive) {
        eprintln!("[settings] Failed to watch settings directory: {e}");
        return;
    }

    while let Some(event) = watch_rx.recv().await {
        let affects_settings = event.paths.iter().any(|p| p == path.as_path());
        let is_write = matches!(
            event.kind,
            notify::EventKind::Create(_) | notify::EventKind::Modify(_)
        );

        if affects_settings && is_write {
            match load_or_default(&path) {
                Ok(settings) => {
                    if tx.send(settings).await.is_err() {
                        break;
                    }
                }
                Err(e) => eprintln!("[settings] Failed to reload settings: {e}"),
            }
        }
    }
}
