//! Read-only snapshot of the current match, shared by every plugin callback.
//!
//! The host's recognition engine fills this in before dispatching an event;
//! plugins never write to it. Every lookup that can miss (unmapped id, absent
//! optional field) degrades to the literal string `"unknown"` instead of
//! failing, so a half-populated context never aborts a callback.

use std::path::Path;

use anyhow::{Context as _, Result};

/// Degraded display text for anything the recognizers could not resolve.
pub const UNKNOWN: &str = "unknown";

/// Rule id that marks a turf-war match.
pub const TURF_WAR_RULE: &str = "turf_war";

/// Rule id → display text. Ids outside this table are unresolvable.
const RULE_NAMES: &[(&str, &str)] = &[
    ("turf_war", "Turf War"),
    ("zone_control", "Zone Control"),
    ("tower_escort", "Tower Escort"),
    ("payload_push", "Payload Push"),
];

/// Stage id → display text.
const STAGE_NAMES: &[(&str, &str)] = &[
    ("harbor", "Harbor"),
    ("depot", "Depot"),
    ("plaza", "Plaza"),
    ("warehouse", "Warehouse"),
    ("heights", "Heights"),
];

/// Main-weapon id → display text.
const WEAPON_NAMES: &[(u32, &str)] = &[
    (1, "Blaster"),
    (2, "Roller"),
    (3, "Charger"),
    (4, "Slosher"),
    (5, "Brush"),
];

/// Sub-weapon ids, valid only as a death reason.
const SUB_WEAPON_NAMES: &[(u32, &str)] = &[(101, "Seeker Bomb"), (102, "Sprinkler")];

/// Special-weapon ids, valid only as a death reason.
const SPECIAL_WEAPON_NAMES: &[(u32, &str)] = &[(201, "Airstrike"), (202, "Barrier")];

/// Lobby kind reported by the lobby recognizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LobbyKind {
    Public,
    Festival,
    Ranked,
    Private,
    #[default]
    Unknown,
}

/// Tri-state match outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Outcome {
    Won,
    Lost,
    #[default]
    Unknown,
}

impl Outcome {
    /// Display text used in filenames and screenshot labels.
    pub fn as_text(self) -> &'static str {
        match self {
            Self::Won => "win",
            Self::Lost => "lose",
            Self::Unknown => UNKNOWN,
        }
    }
}

/// The local player's row from the individual-result screen.
///
/// Fields past `deaths` are only recognized on some result screens and stay
/// `None` when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerEntry {
    pub weapon: Option<u32>,
    pub kills: u32,
    pub deaths: u32,
    pub score: Option<i64>,
    pub rank: Option<u32>,
    pub udemae: Option<String>,
    pub rank_in_team: Option<u32>,
}

/// One frame from the capture engine, already encoded as PNG.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub png: Vec<u8>,
}

impl Frame {
    /// Writes the encoded frame to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.png)
            .with_context(|| format!("Failed to write screenshot {}", path.display()))
    }
}

/// Snapshot of the current match state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchContext {
    pub lobby: LobbyKind,
    /// Current rule id, when the game-start recognizer has seen one.
    pub rule: Option<String>,
    /// Current stage id, when the game-start recognizer has seen one.
    pub stage: Option<String>,
    pub won: Outcome,
    /// Weapon-ish id of whatever last splatted the player.
    pub last_death_reason: Option<u32>,
    pub my_entry: Option<PlayerEntry>,
    /// Most recent capture frame. Only the screenshot plugin reads this.
    pub frame: Option<Frame>,
}

impl MatchContext {
    /// Stage display text, `"unknown"` when unset or unmapped.
    pub fn stage_text(&self) -> String {
        stage_to_text(self.stage.as_deref(), UNKNOWN)
    }

    /// Rule display text, `"unknown"` when unset or unmapped.
    pub fn rule_text(&self) -> String {
        rule_to_text(self.rule.as_deref(), UNKNOWN)
    }

    /// Display text for the last death reason, searching main, sub and
    /// special weapon tables.
    pub fn death_reason_text(&self) -> String {
        let Some(id) = self.last_death_reason else {
            return UNKNOWN.to_string();
        };
        lookup_u32(WEAPON_NAMES, id)
            .or_else(|| lookup_u32(SUB_WEAPON_NAMES, id))
            .or_else(|| lookup_u32(SPECIAL_WEAPON_NAMES, id))
            .unwrap_or(UNKNOWN)
            .to_string()
    }
}

fn lookup_str(table: &[(&str, &'static str)], id: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == id).map(|(_, v)| *v)
}

fn lookup_u32(table: &[(u32, &'static str)], id: u32) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == id).map(|(_, v)| *v)
}

/// Resolves a rule id to display text, or `fallback` when unresolvable.
pub fn rule_to_text(id: Option<&str>, fallback: &str) -> String {
    id.and_then(|id| lookup_str(RULE_NAMES, id))
        .unwrap_or(fallback)
        .to_string()
}

/// Resolves a stage id to display text, or `fallback` when unresolvable.
pub fn stage_to_text(id: Option<&str>, fallback: &str) -> String {
    id.and_then(|id| lookup_str(STAGE_NAMES, id))
        .unwrap_or(fallback)
        .to_string()
}

/// Resolves a main-weapon id to display text, `"unknown"` when unmapped.
pub fn weapon_to_text(id: Option<u32>) -> String {
    id.and_then(|id| lookup_u32(WEAPON_NAMES, id))
        .unwrap_or(UNKNOWN)
        .to_string()
}

/// True when `id` resolves to the turf-war rule.
///
/// An unresolvable id compares against the empty string and is never
/// turf war.
pub fn is_turf_war(id: Option<&str>) -> bool {
    rule_to_text(id, "") == rule_to_text(Some(TURF_WAR_RULE), "")
}
