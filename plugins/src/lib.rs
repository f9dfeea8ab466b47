//! Plugins for a screen-capture-driven match logger.
//!
//! Two event-driven plugins, both registered against the host's event bus and
//! fed read-only [`MatchContext`] snapshots:
//!
//! - [`RecordTrigger`] starts an external recording-control command when a
//!   lobby is matched and stops it when the individual result is in, exposing
//!   a templated destination filename and the recognized result fields to the
//!   stop invocation.
//! - [`ScreenshotArchiver`] saves a screenshot at each lifecycle event and
//!   renames the latest "dead" shot once the cause of death is known.
//!
//! Plugin settings are plain records persisted as TOML (see [`settings`]);
//! the host binds its configuration UI to them via each plugin's `config()` /
//! `apply_config()` pair.

pub mod context;
pub mod events;
pub mod recorder;
pub mod screen_log;
pub mod settings;
pub mod template;

pub use context::{Frame, LobbyKind, MatchContext, Outcome, PlayerEntry};
pub use events::EventHandler;
pub use recorder::{RecordTrigger, RecorderConfig, RenameTemplates};
pub use screen_log::{ScreenLogConfig, ScreenshotArchiver};
pub use settings::Settings;
