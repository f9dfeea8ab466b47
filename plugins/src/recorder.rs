//! Recording control plugin.
//!
//! Starts the external recording-control command when a lobby is matched and
//! stops it when the individual result is in, handing the stop invocation a
//! rename destination (built from a user-configurable filename template) plus
//! one environment key per recognized result field. The command itself is
//! fire-and-forget: one detached worker thread per invocation, exit status
//! discarded.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;

use chrono::{Datelike, Local, Timelike};
use serde::{Deserialize, Serialize};

use crate::context::{is_turf_war, rule_to_text, weapon_to_text, LobbyKind, MatchContext, UNKNOWN};
use crate::events::EventHandler;
use crate::template::{render, Field};

/// Environment keys exposed to the `stop` invocation.
pub const ENV_DEST_DIR: &str = "MATCHLOG_DEST_DIR";
pub const ENV_DEST_NAME: &str = "MATCHLOG_DEST_NAME";
pub const ENV_STAGE: &str = "MATCHLOG_STAGE";
pub const ENV_RULE: &str = "MATCHLOG_RULE";
pub const ENV_WEAPON: &str = "MATCHLOG_WEAPON";
pub const ENV_KILL: &str = "MATCHLOG_KILL";
pub const ENV_DEATH: &str = "MATCHLOG_DEATH";
pub const ENV_POINT: &str = "MATCHLOG_POINT";
pub const ENV_WON: &str = "MATCHLOG_WON";
pub const ENV_RANK: &str = "MATCHLOG_RANK";
pub const ENV_UDEMAE: &str = "MATCHLOG_UDEMAE";
pub const ENV_RANK_IN_TEAM: &str = "MATCHLOG_RANK_IN_TEAM";

/// Rename template applied when nothing more specific is configured.
pub const DEFAULT_RENAME_TEMPLATE: &str =
    "%year%%month%%date%_%hour%%minute%_%stage%_%weapon%_%rule%_%kill%k%death%d.avi";

/// Default location of the bundled recording-control executable, relative to
/// the process working directory.
const DEFAULT_KICK_PATH: &str = "tools/record-kick";

// ── Match classification ──────────────────────────────────────────────────────

/// Which filename template a finished match falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    TurfWar,
    Competitive,
    Festival,
}

/// Classifies a finished match from lobby kind and rule.
///
/// Checked in order: public turf war, then competitive (any resolvable
/// non-turf-war rule), then festival turf war. An unresolvable rule never
/// counts as competitive. `None` means unclassified.
pub fn classify(ctx: &MatchContext) -> Option<MatchKind> {
    let rule = ctx.rule.as_deref();
    if ctx.lobby == LobbyKind::Public && is_turf_war(rule) {
        return Some(MatchKind::TurfWar);
    }
    let resolved = rule_to_text(rule, "");
    if !resolved.is_empty() && !is_turf_war(rule) {
        return Some(MatchKind::Competitive);
    }
    if ctx.lobby == LobbyKind::Festival && is_turf_war(rule) {
        return Some(MatchKind::Festival);
    }
    None
}

// ── Configuration ─────────────────────────────────────────────────────────────

/// Which rename template applies to which classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RenameTemplates {
    /// One template for every match. `None` means never rename.
    Single { format: Option<String> },
    /// Per-classification templates; an unset variant (and an unclassified
    /// match) falls back to `default`.
    PerMode {
        #[serde(default)]
        turf_war: Option<String>,
        #[serde(default)]
        competitive: Option<String>,
        #[serde(default)]
        festival: Option<String>,
        #[serde(default = "default_rename_template")]
        default: String,
    },
}

impl Default for RenameTemplates {
    fn default() -> Self {
        Self::PerMode {
            turf_war: None,
            competitive: None,
            festival: None,
            default: default_rename_template(),
        }
    }
}

impl RenameTemplates {
    /// Template string for a classified match. `None` means "do not rename".
    pub fn select(&self, kind: Option<MatchKind>) -> Option<&str> {
        match self {
            Self::Single { format } => format.as_deref(),
            Self::PerMode { turf_war, competitive, festival, default } => {
                let specific = match kind {
                    Some(MatchKind::TurfWar) => turf_war.as_deref(),
                    Some(MatchKind::Competitive) => competitive.as_deref(),
                    Some(MatchKind::Festival) => festival.as_deref(),
                    None => None,
                };
                Some(specific.unwrap_or(default))
            }
        }
    }
}

/// Recording-control settings. Persisted under the `[recorder]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub enabled: bool,
    /// Directory the recording tool drops its output into; also exported as
    /// the rename destination directory.
    pub monitoring_dir: Option<PathBuf>,
    /// Path of the recording-control executable.
    pub kick_path: Option<PathBuf>,
    pub templates: RenameTemplates,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            monitoring_dir: None,
            kick_path: std::env::current_dir().ok().map(|d| d.join(DEFAULT_KICK_PATH)),
            templates: RenameTemplates::default(),
        }
    }
}

impl RecorderConfig {
    /// Programmatic constructor using the single-template shape.
    ///
    /// The plugin is enabled only when both paths were supplied explicitly.
    pub fn with_paths(
        monitoring_dir: Option<PathBuf>,
        kick_path: Option<PathBuf>,
        format: Option<String>,
    ) -> Self {
        Self {
            enabled: monitoring_dir.is_some() && kick_path.is_some(),
            monitoring_dir,
            kick_path,
            templates: RenameTemplates::Single { format },
        }
    }
}

fn default_rename_template() -> String {
    DEFAULT_RENAME_TEMPLATE.to_string()
}

// ── Kick environment ──────────────────────────────────────────────────────────

/// Explicit key/value environment handed to the kick command.
///
/// Replaces mutation of the process-wide environment: each spawned worker
/// receives its own cloned snapshot, so concurrent invocations cannot race on
/// a shared map. The map lives across calls, which keeps "clearing" a key an
/// observable operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KickEnv {
    vars: BTreeMap<String, String>,
}

impl KickEnv {
    /// Sets `key`, or removes it entirely when `value` is `None`. Removing an
    /// absent key is a no-op.
    pub fn set(&mut self, key: &str, value: Option<String>) {
        match value {
            Some(v) => {
                self.vars.insert(key.to_string(), v);
            }
            None => {
                self.vars.remove(key);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// ── Result field derivation ───────────────────────────────────────────────────

fn entry_weapon_text(ctx: &MatchContext) -> String {
    weapon_to_text(ctx.my_entry.as_ref().and_then(|e| e.weapon))
}

fn kill_text(ctx: &MatchContext) -> Option<String> {
    ctx.my_entry.as_ref().map(|e| e.kills.to_string())
}

fn death_text(ctx: &MatchContext) -> Option<String> {
    ctx.my_entry.as_ref().map(|e| e.deaths.to_string())
}

fn point_text(ctx: &MatchContext) -> String {
    ctx.my_entry
        .as_ref()
        .and_then(|e| e.score)
        .map(|s| s.to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn rank_text(ctx: &MatchContext) -> Option<String> {
    ctx.my_entry.as_ref().and_then(|e| e.rank).map(|r| r.to_string())
}

fn udemae_text(ctx: &MatchContext) -> String {
    ctx.my_entry
        .as_ref()
        .and_then(|e| e.udemae.clone())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn rank_in_team_text(ctx: &MatchContext) -> Option<String> {
    ctx.my_entry.as_ref().and_then(|e| e.rank_in_team).map(|r| r.to_string())
}

/// Full field set for the rename template, in substitution order. The clock
/// is read here, once per call, from local wall time — not from any event
/// timestamp.
fn result_fields(ctx: &MatchContext) -> Vec<Field> {
    let now = Local::now();
    let unknown = || UNKNOWN.to_string();
    vec![
        Field::text("year", now.year().to_string()),
        Field::padded("month", now.month(), 2),
        Field::padded("date", now.day(), 2),
        Field::padded("hour", now.hour(), 2),
        Field::padded("minute", now.minute(), 2),
        Field::padded("second", now.second(), 2),
        Field::text("stage", ctx.stage_text()),
        Field::text("rule", ctx.rule_text()),
        Field::text("weapon", entry_weapon_text(ctx)),
        Field::text("kill", kill_text(ctx).unwrap_or_else(unknown)),
        Field::text("death", death_text(ctx).unwrap_or_else(unknown)),
        Field::text("point", point_text(ctx)),
        Field::text("won", ctx.won.as_text()),
        Field::text("rank", rank_text(ctx).unwrap_or_else(unknown)),
        Field::text("udemae", udemae_text(ctx)),
        Field::text("rank_in_team", rank_in_team_text(ctx).unwrap_or_else(unknown)),
    ]
}

// ── Plugin ────────────────────────────────────────────────────────────────────

/// The recording-control plugin. Register it against the host event bus.
#[derive(Debug, Default)]
pub struct RecordTrigger {
    config: RecorderConfig,
    /// Environment for the next `stop` invocation. Kept between matches so
    /// that a key cleared by one result stays cleared for the next.
    stop_env: KickEnv,
}

impl RecordTrigger {
    pub fn new(config: RecorderConfig) -> Self {
        Self { config, stop_env: KickEnv::default() }
    }

    /// Current config record, for the host UI to display.
    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Restores built-in defaults.
    pub fn reset_config(&mut self) {
        self.config = RecorderConfig::default();
    }

    /// Commits an edited config record from the host UI.
    pub fn apply_config(&mut self, config: RecorderConfig) {
        self.config = config;
    }

    /// Pulls this plugin's section from persisted settings.
    pub fn load_settings(&mut self, settings: &crate::settings::Settings) {
        self.config = settings.recorder.clone();
    }

    /// Writes this plugin's section into persisted settings.
    pub fn store_settings(&self, settings: &mut crate::settings::Settings) {
        settings.recorder = self.config.clone();
    }

    fn start_record(&self) {
        self.kick("start", KickEnv::default());
    }

    fn stop_record(&mut self, ctx: &MatchContext) {
        let template = self.config.templates.select(classify(ctx));
        let dest_name = render(template, &result_fields(ctx));

        let env = &mut self.stop_env;
        env.set(
            ENV_DEST_DIR,
            self.config.monitoring_dir.as_ref().map(|d| d.display().to_string()),
        );
        env.set(ENV_DEST_NAME, dest_name);
        env.set(ENV_STAGE, Some(ctx.stage_text()));
        env.set(ENV_RULE, Some(ctx.rule_text()));
        env.set(ENV_WEAPON, Some(entry_weapon_text(ctx)));
        env.set(ENV_KILL, kill_text(ctx));
        env.set(ENV_DEATH, death_text(ctx));
        env.set(ENV_POINT, Some(point_text(ctx)));
        env.set(ENV_WON, Some(ctx.won.as_text().to_string()));
        env.set(ENV_RANK, rank_text(ctx));
        env.set(ENV_UDEMAE, Some(udemae_text(ctx)));
        env.set(ENV_RANK_IN_TEAM, rank_in_team_text(ctx));

        self.kick("stop", self.stop_env.clone());
    }

    /// Fire-and-forget invocation of `<kick_path> <arg>` with `env`.
    ///
    /// No-op unless the plugin is enabled and both paths are configured. The
    /// worker thread is detached; the command's exit status (or its failure
    /// to launch) is never fed back into the plugin.
    fn kick(&self, arg: &'static str, env: KickEnv) {
        if !self.config.enabled {
            return;
        }
        let (Some(kick_path), Some(_)) = (&self.config.kick_path, &self.config.monitoring_dir)
        else {
            return;
        };
        let program = kick_path.clone();
        std::thread::spawn(move || {
            println!("[recorder] exec: {} {arg}", program.display());
            if let Err(e) = Command::new(&program).arg(arg).envs(env.iter()).status() {
                eprintln!("[recorder] exec failed: {e}");
            }
        });
    }
}

impl EventHandler for RecordTrigger {
    fn on_lobby_matched(&mut self, _ctx: &MatchContext) {
        self.start_record();
    }

    fn on_game_individual_result(&mut self, ctx: &MatchContext) {
        self.stop_record(ctx);
    }
}
