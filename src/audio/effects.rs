//! Sound effect and cue definitions
//!
//! Every effect is a short tone sequence rendered at runtime.

use super::tone::{Pan, Tone, ToneSequence};
use crate::sim::Lane;

/// Frequency of the directional lane cue
pub const CUE_FREQUENCY: f32 = 600.0;
/// Duration of the directional lane cue
pub const CUE_DURATION_MS: u32 = 150;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundEffect {
    /// Beep announcing which lane an object falls in
    LaneCue(Lane),
    /// Object collected - quick rising chirp on the player's side
    Collect(Lane),
    /// Level complete - rising arpeggio
    Success,
    /// Game over - sad descending
    GameOver,
}

impl SoundEffect {
    pub fn sequence(&self) -> ToneSequence {
        match *self {
            SoundEffect::LaneCue(lane) => {
                ToneSequence::single(Tone::new(CUE_FREQUENCY, CUE_DURATION_MS, Pan::from(lane)))
            }
            SoundEffect::Collect(lane) => {
                let pan = Pan::from(lane);
                ToneSequence::new()
                    .then(Tone::new(880.0, 60, pan), 0)
                    .then(Tone::new(1320.0, 80, pan), 0)
            }
            SoundEffect::Success => [523.0, 659.0, 784.0, 1047.0]
                .into_iter()
                .fold(ToneSequence::new(), |seq, freq| {
                    seq.then(Tone::new(freq, 120, Pan::Center), 20)
                }),
            SoundEffect::GameOver => [400.0, 350.0, 300.0, 200.0]
                .into_iter()
                .fold(ToneSequence::new(), |seq, freq| {
                    seq.then(Tone::new(freq, 200, Pan::Center), 30)
                }),
        }
    }
}
