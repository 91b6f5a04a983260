pub mod events;
pub mod game_trait;
pub mod player;
pub mod powerup;
pub mod rng;
pub mod time;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::collections::HashMap;

    use crate::game_trait::{EntityId, RaceGame, RaceSetup, Standing};
    use crate::player::{Racer, RacerColor};

    /// Create one human racer (id 1) followed by `bots` bot racers (ids 2..).
    pub fn make_roster(bots: usize) -> Vec<Racer> {
        (0..=bots)
            .map(|i| Racer {
                id: i as EntityId + 1,
                display_name: if i == 0 {
                    "Player".to_string()
                } else {
                    format!("Bot{i}")
                },
                color: RacerColor::for_index(i),
                is_human: i == 0,
            })
            .collect()
    }

    /// Create a RaceSetup that pins the track seed.
    pub fn default_setup(seed: u64) -> RaceSetup {
        let mut custom = HashMap::new();
        custom.insert("seed".to_string(), serde_json::Value::from(seed));
        RaceSetup { custom }
    }

    /// Run N ticks, returning all accumulated events.
    pub fn run_ticks<G: RaceGame>(game: &mut G, n: usize, dt: f32) -> Vec<G::Event> {
        let mut all_events = Vec::new();
        for _ in 0..n {
            all_events.extend(game.update(dt));
        }
        all_events
    }

    // ================================================================
    // RaceGame Contract Tests
    // ================================================================
    // Every RaceGame implementation must pass these. Game crates call them
    // from their own #[cfg(test)] modules with a concrete instance.

    /// After init() the snapshot must be non-empty and standings complete.
    pub fn contract_init_lists_every_racer<G: RaceGame>(game: &mut G, bots: usize) {
        let racers = make_roster(bots);
        game.init(&racers, &default_setup(42));
        assert!(
            !game.snapshot().is_empty(),
            "snapshot() must return non-empty bytes after init"
        );
        assert_eq!(
            game.standings().len(),
            racers.len(),
            "standings() must list every racer after init"
        );
    }

    /// update() with dt>0 must change the snapshot.
    pub fn contract_update_advances_time<G: RaceGame>(game: &mut G) {
        let before = game.snapshot();
        game.update(0.1);
        let after = game.snapshot();
        assert_ne!(before, after, "update(dt>0) must advance race state");
    }

    /// pause() must freeze the race, resume() must unfreeze it.
    pub fn contract_pause_stops_updates<G: RaceGame>(game: &mut G) {
        game.pause();
        let before = game.snapshot();
        let events = game.update(0.5);
        assert!(events.is_empty(), "No events may be produced while paused");
        assert_eq!(before, game.snapshot(), "State must not change while paused");

        game.resume();
        game.update(0.5);
        assert_ne!(before, game.snapshot(), "State must change after resume");
    }

    /// Running long enough must end the race.
    pub fn contract_race_eventually_completes<G: RaceGame>(
        game: &mut G,
        max_ticks: usize,
        dt: f32,
    ) {
        for _ in 0..max_ticks {
            game.update(dt);
            if game.is_race_complete() {
                return;
            }
        }
        assert!(
            game.is_race_complete(),
            "Race must complete within {max_ticks} ticks"
        );
    }

    /// racer_left() must remove the racer from standings.
    pub fn contract_racer_left_cleanup<G: RaceGame>(game: &mut G, racer_id: EntityId) {
        let before = game.standings().len();
        game.racer_left(racer_id);
        let after = game.standings();
        assert_eq!(after.len(), before - 1, "racer_left must drop one standing");
        assert!(
            after.iter().all(|s| s.racer_id != racer_id),
            "departed racer must not appear in standings"
        );
        // Ticking after a departure must not panic.
        game.update(0.1);
    }

    /// Places must be 1..=N with no gaps or duplicates.
    pub fn contract_standings_are_dense<G: RaceGame>(game: &G) -> Vec<Standing> {
        let standings = game.standings();
        let mut places: Vec<usize> = standings.iter().map(|s| s.place).collect();
        places.sort_unstable();
        let expected: Vec<usize> = (1..=standings.len()).collect();
        assert_eq!(places, expected, "places must be dense and 1-based");
        standings
    }
}
