//! Deterministic game engine
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Caller-driven cadence only (no timers)
//! - Seeded RNG only
//! - Stable iteration order (insertion order)
//! - No audio or platform dependencies

pub mod events;
pub mod level;
pub mod operation;
pub mod spawn;
pub mod state;
pub mod tick;

pub use events::{GameEvent, diff_events};
pub use level::{LevelConfig, LevelTable, OperationRange, OperationSource, WeightedOperation};
pub use operation::{Operation, OperationKind, apply_operation};
pub use spawn::Spawner;
pub use state::{FallingObject, GamePhase, GameState, Lane, create_initial_state};
pub use tick::{in_collision_band, tick};
