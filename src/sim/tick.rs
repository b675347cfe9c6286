//! Fixed cadence simulation tick
//!
//! Advances falling objects, resolves collisions with the player and
//! evaluates the win/lose conditions.

use super::operation::apply_operation;
use super::state::{GamePhase, GameState};
use crate::consts::*;

/// Returns true if `position` lies inside the player's collision band
#[inline]
pub fn in_collision_band(position: f32) -> bool {
    (position - PLAYER_POSITION).abs() < COLLISION_HALF_WIDTH
}

/// Advance the game by `elapsed` nominal frames (1.0 = one 60 Hz frame).
///
/// Does nothing unless the state is playing. Each object is collected at
/// most once: it leaves the live set in the tick that collects it. The
/// win check runs before the loss check and at most one of them fires.
pub fn tick(state: &mut GameState, elapsed: f32) {
    if state.phase != GamePhase::Playing {
        return;
    }

    let elapsed = elapsed.max(0.0);
    let lane = state.player_lane;
    let mut score = state.score;
    let mut collected = 0;
    let mut missed = 0;

    state.objects.retain_mut(|obj| {
        if obj.consumed {
            return false;
        }

        obj.position += obj.speed * elapsed;

        if obj.lane == lane && in_collision_band(obj.position) {
            obj.consumed = true;
            score = apply_operation(score, &obj.operation);
            collected += 1;
            return false;
        }

        if obj.position > PASS_THROUGH_POSITION {
            missed += 1;
            return false;
        }

        true
    });

    state.score = score;
    state.collected_count += collected;
    state.missed_count += missed;

    if state.score >= state.target_score {
        log::info!("Level {} complete with score {}", state.level, state.score);
        state.phase = GamePhase::LevelComplete;
    } else if state.score < SCORE_FLOOR {
        log::info!("Game over on level {} with score {}", state.level, state.score);
        state.phase = GamePhase::GameOver;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{
        FallingObject, Lane, LevelConfig, LevelTable, Operation, OperationSource,
        create_initial_state,
    };
    use proptest::prelude::*;

    fn level_one() -> LevelConfig {
        LevelTable::standard().level_config(1)
    }

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
    fn test_level_one_scenario() {
        let config = level_one();
        let mut state = create_initial_state(&config);
        assert_eq!(state.player_lane, Lane::Left);
        state.add_object(object(1, Lane::Left, Operation::add(3), 0.0));

        for _ in 0..300 {
            tick(&mut state, 1.0);
        }

        assert_eq!(state.score, 3);
        assert_eq!(state.collected_count, 1);
        assert_eq!(state.missed_count, 0);
        assert!(state.objects.is_empty());
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_other_lane_is_missed_without_penalty() {
        let mut state = create_initial_state(&level_one());
        state.add_object(object(1, Lane::Right, Operation::add(3), 0.0));

        for _ in 0..300 {
            tick(&mut state, 1.0);
        }

        assert_eq!(state.score, 0);
        assert_eq!(state.collected_count, 0);
        assert_eq!(state.missed_count, 1);
        assert!(state.objects.is_empty());
    }

    #[test]
    fn test_object_consumed_once() {
        let mut state = create_initial_state(&level_one());
        state.add_object(object(1, Lane::Left, Operation::add(2), 0.82));

        tick(&mut state, 1.0);
        assert_eq!(state.score, 2);
        assert!(state.objects.is_empty());

        // Would still be in band, but it is gone
        tick(&mut state, 1.0);
        assert_eq!(state.score, 2);
        assert_eq!(state.collected_count, 1);
        assert_eq!(state.missed_count, 0);
    }

    #[test]
    fn test_already_consumed_object_is_dropped() {
        let mut state = create_initial_state(&level_one());
        let mut obj = object(1, Lane::Left, Operation::add(2), 0.84);
        obj.consumed = true;
        state.add_object(obj);

        tick(&mut state, 1.0);
        assert_eq!(state.score, 0);
        assert_eq!(state.collected_count, 0);
        assert!(state.objects.is_empty());
    }

    #[test]
    fn test_lane_change_applies_next_tick() {
        let mut state = create_initial_state(&level_one());
        state.add_object(object(1, Lane::Right, Operation::add(1), 0.81));

        tick(&mut state, 1.0);
        assert_eq!(state.score, 0);

        state.move_player(Lane::Right);
        tick(&mut state, 1.0);
        assert_eq!(state.score, 1);
    }

    #[test]
    fn test_multiple_collisions_complete_level_once() {
        let mut state = create_initial_state(&level_one());
        state.score = 8;
        state.add_object(object(1, Lane::Left, Operation::add(3), 0.84));
        state.add_object(object(2, Lane::Left, Operation::add(3), 0.83));

        tick(&mut state, 1.0);
        assert_eq!(state.score, 14);
        assert_eq!(state.collected_count, 2);
        assert!(state.is_level_complete());
    }

    #[test]
    fn test_win_freezes_score() {
        let mut state = create_initial_state(&level_one());
        state.score = 9;
        state.add_object(object(1, Lane::Left, Operation::add(1), 0.84));
        state.add_object(object(2, Lane::Left, Operation::add(3), 0.5));

        tick(&mut state, 1.0);
        assert!(state.is_level_complete());
        assert_eq!(state.score, 10);

        for _ in 0..200 {
            tick(&mut state, 1.0);
        }
        assert_eq!(state.score, 10);
        assert_eq!(state.objects.len(), 1);
    }

    #[test]
    fn test_score_floor_is_sticky() {
        let mut state = create_initial_state(&level_one());
        state.score = -19;
        state.add_object(object(1, Lane::Left, Operation::subtract(2), 0.84));

        tick(&mut state, 1.0);
        assert_eq!(state.score, -21);
        assert!(state.is_game_over());

        state.move_player(Lane::Right);
        state.set_paused(true);
        tick(&mut state, 1.0);
        assert!(state.is_game_over());
        assert_eq!(state.player_lane, Lane::Left);
    }

    #[test]
    fn test_score_at_floor_is_not_game_over() {
        let mut state = create_initial_state(&level_one());
        state.score = -20;
        tick(&mut state, 1.0);
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_level_complete_wins_same_tick_tie() {
        let config = LevelConfig {
            target_score: -30,
            operations: OperationSource::list([Operation::subtract(1)]),
            ..level_one()
        };
        let mut state = create_initial_state(&config);
        state.score = -25;

        tick(&mut state, 1.0);
        assert!(state.is_level_complete());
        assert!(!state.is_game_over());
    }

    #[test]
    fn test_paused_tick_is_noop() {
        let mut state = create_initial_state(&level_one());
        state.add_object(object(1, Lane::Left, Operation::add(1), 0.5));
        state.set_paused(true);
        let before = state.clone();

        tick(&mut state, 1.0);
        assert_eq!(state, before);

        state.set_paused(false);
        tick(&mut state, 1.0);
        assert!(state.objects[0].position > 0.5);
    }

    #[test]
    fn test_elapsed_scales_movement() {
        let mut state = create_initial_state(&level_one());
        state.add_object(object(1, Lane::Right, Operation::add(1), 0.0));
        tick(&mut state, 2.5);
        assert!((state.objects[0].position - 0.01).abs() < 1e-6);

        tick(&mut state, -1.0);
        assert!((state.objects[0].position - 0.01).abs() < 1e-6);
    }

    fn arb_lane() -> impl Strategy<Value = Lane> {
        prop_oneof![Just(Lane::Left), Just(Lane::Right)]
    }

    fn arb_terminal_phase() -> impl Strategy<Value = GamePhase> {
        prop_oneof![
            Just(GamePhase::Paused),
            Just(GamePhase::LevelComplete),
            Just(GamePhase::GameOver),
        ]
    }

    proptest! {
        #[test]
        fn non_playing_tick_is_noop(
            phase in arb_terminal_phase(),
            score in -100i64..100,
            positions in proptest::collection::vec((arb_lane(), 0.0f32..1.2), 0..8),
            elapsed in 0.0f32..4.0,
        ) {
            let mut state = create_initial_state(&level_one());
            state.score = score;
            state.phase = phase;
            for (i, (lane, position)) in positions.into_iter().enumerate() {
                state.add_object(object(i as u32, lane, Operation::add(1), position));
            }
            let before = state.clone();

            tick(&mut state, elapsed);
            prop_assert_eq!(state, before);
        }

        #[test]
        fn objects_are_accounted_exactly_once(
            lanes in proptest::collection::vec(arb_lane(), 1..12),
            player in arb_lane(),
        ) {
            let config = LevelConfig { target_score: 1_000, ..level_one() };
            let mut state = create_initial_state(&config);
            state.move_player(player);
            for (i, lane) in lanes.iter().enumerate() {
                state.add_object(object(i as u32, *lane, Operation::add(1), i as f32 * 0.05));
            }

            for _ in 0..400 {
                tick(&mut state, 1.0);
            }

            let expected = lanes.iter().filter(|l| **l == player).count() as u32;
            prop_assert!(state.objects.is_empty());
            prop_assert_eq!(state.collected_count, expected);
            prop_assert_eq!(state.missed_count, lanes.len() as u32 - expected);
            prop_assert_eq!(state.score, expected as i64);
        }
    }
}
