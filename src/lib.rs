//! Lane Sums - a two-lane falling arithmetic game you can play by ear
//!
//! Core modules:
//! - `sim`: Deterministic game engine (spawn, tick, scoring, levels)
//! - `audio`: Announcer, tone synthesis and platform playback backends
//! - `session`: Host loop glue between the engine and the announcer
//! - `settings`: Player preferences and audio configuration

pub mod audio;
pub mod session;
pub mod settings;
pub mod sim;

pub use audio::{Announcer, AudioBackend};
pub use session::Session;
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Nominal driver cadence (60 Hz)
    pub const FRAME_MS: f32 = 1000.0 / 60.0;
    /// Maximum frames advanced by a single driver update (avoids catch-up bursts)
    pub const MAX_FRAMES_PER_UPDATE: f32 = 4.0;

    /// Player's fixed vertical position along the fall axis
    pub const PLAYER_POSITION: f32 = 0.85;
    /// Half-width of the collision band around the player
    pub const COLLISION_HALF_WIDTH: f32 = 0.04;
    /// Objects past this position are missed
    pub const PASS_THROUGH_POSITION: f32 = 1.10;

    /// Game over once the score drops below this
    pub const SCORE_FLOOR: i64 = -20;

    /// Level overflow progression
    pub const TARGET_INCREMENT: i64 = 50;
    pub const SPAWN_INTERVAL_STEP_MS: u32 = 100;
    pub const SPAWN_INTERVAL_FLOOR_MS: u32 = 600;
    pub const SPEED_STEP: f32 = 0.001;
    pub const SPEED_CAP: f32 = 0.02;

    /// Default output sample rate for generated tones
    pub const SAMPLE_RATE: u32 = 44_100;
}
