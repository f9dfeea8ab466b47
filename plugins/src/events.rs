//! Callback contract between the host event bus and the plugins.
//!
//! The host dispatches every event synchronously, on a single thread, with a
//! fresh [`MatchContext`] snapshot. Each method defaults to a no-op so a
//! plugin implements only the events it cares about. Dispatch order between
//! registered plugins is owned by the host.

use crate::context::MatchContext;

/// Handler for host match-lifecycle events.
pub trait EventHandler {
    /// Matchmaking has started.
    fn on_lobby_matching(&mut self, _ctx: &MatchContext) {}
    /// A match has been formed and is about to start.
    fn on_lobby_matched(&mut self, _ctx: &MatchContext) {}
    /// The stage/rule intro screen is up.
    fn on_game_start(&mut self, _ctx: &MatchContext) {}
    /// The go sign fired; play has begun.
    fn on_game_go_sign(&mut self, _ctx: &MatchContext) {}
    /// The match timer ran out.
    fn on_game_finish(&mut self, _ctx: &MatchContext) {}
    /// The player splatted someone.
    fn on_game_killed(&mut self, _ctx: &MatchContext) {}
    /// The player got splatted.
    fn on_game_dead(&mut self, _ctx: &MatchContext) {}
    /// The cause of the most recent death was recognized (arrives some frames
    /// after the dead event).
    fn on_game_death_reason_identified(&mut self, _ctx: &MatchContext) {}
    /// The individual-result screen is being analyzed.
    fn on_game_individual_result_analyze(&mut self, _ctx: &MatchContext) {}
    /// The player's final per-match statistics are available.
    fn on_game_individual_result(&mut self, _ctx: &MatchContext) {}
    /// The gear-reward screen is up.
    fn on_result_gears(&mut self, _ctx: &MatchContext) {}
    /// Recognition state was reset mid-session.
    fn on_game_reset(&mut self, _ctx: &MatchContext) {}
    /// The play session ended.
    fn on_game_session_end(&mut self, _ctx: &MatchContext) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts only the events it overrides; everything else must no-op.
    #[derive(Default)]
    struct Counter {
        matched: u32,
        dead: u32,
    }

    impl EventHandler for Counter {
        fn on_lobby_matched(&mut self, _ctx: &MatchContext) {
            self.matched += 1;
        }

        fn on_game_dead(&mut self, _ctx: &MatchContext) {
            self.dead += 1;
        }
    }

    #[test]
    fn unimplemented_callbacks_default_to_no_ops() {
        let ctx = MatchContext::default();
        let mut counter = Counter::default();

        counter.on_lobby_matching(&ctx);
        counter.on_game_start(&ctx);
        counter.on_game_session_end(&ctx);
        counter.on_lobby_matched(&ctx);
        counter.on_game_dead(&ctx);
        counter.on_game_dead(&ctx);

        assert_eq!(counter.matched, 1);
        assert_eq!(counter.dead, 2);
    }
}
