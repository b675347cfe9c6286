//! Semantic events derived by comparing two game states
//!
//! The engine itself never emits anything; the driver snapshots the state,
//! advances it, then diffs. Events come out in dispatch order.

use super::state::{GameState, Lane};

/// Something the player should hear about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    ObjectSpawned { id: u32, lane: Lane, speech: String },
    Collected { lane: Lane, delta: i64 },
    LevelComplete { level: u32, score: i64 },
    GameOver { score: i64 },
}

/// Events between two snapshots: spawn, collect, level complete, game over
pub fn diff_events(before: &GameState, after: &GameState) -> Vec<GameEvent> {
    let mut events = Vec::new();

    for obj in &after.objects {
        if !before.objects.iter().any(|b| b.id == obj.id) {
            events.push(GameEvent::ObjectSpawned {
                id: obj.id,
                lane: obj.lane,
                speech: obj.operation.speech().to_string(),
            });
        }
    }

    if after.collected_count > before.collected_count {
        events.push(GameEvent::Collected {
            lane: after.player_lane,
            delta: after.score - before.score,
        });
    }

    if after.is_level_complete() && !before.is_level_complete() {
        events.push(GameEvent::LevelComplete {
            level: after.level,
            score: after.score,
        });
    }

    if after.is_game_over() && !before.is_game_over() {
        events.push(GameEvent::GameOver { score: after.score });
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{FallingObject, LevelTable, Operation, create_initial_state, tick};

    fn object(id: u32, lane: Lane, operation: Operation, position: f32) -> FallingObject {
        FallingObject {
            id,
            lane,
            operation,
            position,
            speed: 0.004,
            consumed: false,
        }
    }

    #[test]
    fn test_no_change_no_events() {
        let state = create_initial_state(&LevelTable::standard().level_config(1));
        assert!(diff_events(&state, &state).is_empty());
    }

    #[test]
    fn test_event_order() {
        let mut state = create_initial_state(&LevelTable::standard().level_config(1));
        state.score = 8;
        state.add_object(object(1, Lane::Left, Operation::add(3), 0.84));
        let before = state.clone();

        state.add_object(object(2, Lane::Right, Operation::add(2), 0.0));
        tick(&mut state, 1.0);

        assert_eq!(
            diff_events(&before, &state),
            vec![
                GameEvent::ObjectSpawned {
                    id: 2,
                    lane: Lane::Right,
                    speech: "plus 2".into()
                },
                GameEvent::Collected {
                    lane: Lane::Left,
                    delta: 3
                },
                GameEvent::LevelComplete { level: 1, score: 11 },
            ]
        );
    }

    #[test]
    fn test_game_over_event_fires_once() {
        let mut state = create_initial_state(&LevelTable::standard().level_config(1));
        state.score = -20;
        state.add_object(object(1, Lane::Left, Operation::subtract(1), 0.84));

        let before = state.clone();
        tick(&mut state, 1.0);
        let events = diff_events(&before, &state);
        assert_eq!(events.last(), Some(&GameEvent::GameOver { score: -21 }));

        let before = state.clone();
        tick(&mut state, 1.0);
        assert!(diff_events(&before, &state).is_empty());
    }
}
