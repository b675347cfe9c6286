//! Game state and core simulation types

use serde::{Deserialize, Serialize};

use super::level::LevelConfig;
use super::operation::Operation;

/// One of the two tracks objects fall through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    #[default]
    Left,
    Right,
}

impl Lane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::Left => "left",
            Lane::Right => "right",
        }
    }

    pub fn other(&self) -> Lane {
        match self {
            Lane::Left => Lane::Right,
            Lane::Right => Lane::Left,
        }
    }
}

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GamePhase {
    /// Objects are falling
    #[default]
    Playing,
    /// Suspended, resumable
    Paused,
    /// Target reached (terminal)
    LevelComplete,
    /// Score fell below the floor (terminal)
    GameOver,
}

impl GamePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GamePhase::LevelComplete | GamePhase::GameOver)
    }
}

/// An object falling toward the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallingObject {
    pub id: u32,
    pub lane: Lane,
    pub operation: Operation,
    /// 0 = spawn edge, 1 = player edge
    pub position: f32,
    /// Position units per nominal frame
    pub speed: f32,
    pub consumed: bool,
}

/// Complete game state for one level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub score: i64,
    pub target_score: i64,
    pub level: u32,
    pub player_lane: Lane,
    /// Live objects in insertion order
    pub objects: Vec<FallingObject>,
    pub phase: GamePhase,
    pub collected_count: u32,
    pub missed_count: u32,
}

impl GameState {
    /// Fresh state for a level: score 0, no objects, playing
    pub fn new(config: &LevelConfig) -> Self {
        Self {
            score: 0,
            target_score: config.target_score,
            level: config.level,
            player_lane: Lane::Left,
            objects: Vec::new(),
            phase: GamePhase::Playing,
            collected_count: 0,
            missed_count: 0,
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    pub fn is_level_complete(&self) -> bool {
        self.phase == GamePhase::LevelComplete
    }

    pub fn is_paused(&self) -> bool {
        self.phase == GamePhase::Paused
    }

    /// Move the player; ignored once the level has ended
    pub fn move_player(&mut self, lane: Lane) {
        if self.phase.is_terminal() {
            return;
        }
        self.player_lane = lane;
    }

    /// Append a live object
    pub fn add_object(&mut self, object: FallingObject) {
        self.objects.push(object);
    }

    /// Pause or resume; ignored once the level has ended
    pub fn set_paused(&mut self, paused: bool) {
        self.phase = match (self.phase, paused) {
            (GamePhase::Playing, true) => GamePhase::Paused,
            (GamePhase::Paused, false) => GamePhase::Playing,
            (phase, _) => phase,
        };
    }
}

/// Initial state for a level
pub fn create_initial_state(config: &LevelConfig) -> GameState {
    GameState::new(config)
}
