//! Stereo tone synthesis
//!
//! Procedurally generated PCM shared by every backend: the web audio graph
//! plays these buffers directly, the file backend writes them to WAV.

use std::f32::consts::{FRAC_1_SQRT_2, TAU};

use serde::{Deserialize, Serialize};

use crate::sim::Lane;

/// Amplitude of the channel a tone is panned to
pub const DOMINANT_AMPLITUDE: f32 = 0.6;
/// Amplitude of the opposite channel (10% of dominant, never silent)
pub const FAINT_AMPLITUDE: f32 = 0.06;
/// Per-channel amplitude of a centered tone (equal power)
pub const CENTER_AMPLITUDE: f32 = DOMINANT_AMPLITUDE * FRAC_1_SQRT_2;
/// Linear fade at both ends to avoid clicks
pub const FADE_MS: f32 = 10.0;

/// Stereo placement of a tone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pan {
    Left,
    Right,
    Center,
}

impl Pan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pan::Left => "left",
            Pan::Right => "right",
            Pan::Center => "center",
        }
    }

    /// (left, right) channel gains
    pub fn gains(&self) -> (f32, f32) {
        match self {
            Pan::Left => (DOMINANT_AMPLITUDE, FAINT_AMPLITUDE),
            Pan::Right => (FAINT_AMPLITUDE, DOMINANT_AMPLITUDE),
            Pan::Center => (CENTER_AMPLITUDE, CENTER_AMPLITUDE),
        }
    }
}

impl From<Lane> for Pan {
    fn from(lane: Lane) -> Self {
        match lane {
            Lane::Left => Pan::Left,
            Lane::Right => Pan::Right,
        }
    }
}

/// Planar stereo PCM in [-1, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct StereoBuffer {
    pub sample_rate: u32,
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl StereoBuffer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            left: Vec::new(),
            right: Vec::new(),
        }
    }

    /// Frames of silence
    pub fn silence(duration_ms: u32, sample_rate: u32) -> Self {
        let frames = frames_for(duration_ms, sample_rate);
        Self {
            sample_rate,
            left: vec![0.0; frames],
            right: vec![0.0; frames],
        }
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn duration_ms(&self) -> u32 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.len() as u64 * 1000 / self.sample_rate as u64) as u32
    }

    pub fn append(&mut self, other: &StereoBuffer) {
        self.left.extend_from_slice(&other.left);
        self.right.extend_from_slice(&other.right);
    }

    pub fn peak_left(&self) -> f32 {
        peak(&self.left)
    }

    pub fn peak_right(&self) -> f32 {
        peak(&self.right)
    }

    /// Interleaved L/R samples scaled by `gain`, clamped to [-1, 1]
    pub fn interleaved(&self, gain: f32) -> Vec<f32> {
        self.left
            .iter()
            .zip(&self.right)
            .flat_map(|(l, r)| [(l * gain).clamp(-1.0, 1.0), (r * gain).clamp(-1.0, 1.0)])
            .collect()
    }
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

fn frames_for(duration_ms: u32, sample_rate: u32) -> usize {
    (sample_rate as u64 * duration_ms as u64 / 1000) as usize
}

/// Generate a panned sine tone with a short fade at both ends
pub fn generate_tone(frequency: f32, duration_ms: u32, pan: Pan, sample_rate: u32) -> StereoBuffer {
    let frames = frames_for(duration_ms, sample_rate);
    let fade = ((sample_rate as f32 * FADE_MS / 1000.0) as usize).min(frames / 2);
    let (gain_l, gain_r) = pan.gains();

    let mut buffer = StereoBuffer {
        sample_rate,
        left: Vec::with_capacity(frames),
        right: Vec::with_capacity(frames),
    };

    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let envelope = if i < fade {
            i as f32 / fade as f32
        } else if i >= frames - fade {
            (frames - 1 - i) as f32 / fade as f32
        } else {
            1.0
        };
        let sample = (TAU * frequency * t).sin() * envelope;
        buffer.left.push(sample * gain_l);
        buffer.right.push(sample * gain_r);
    }

    buffer
}

/// A single tone description
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    pub frequency: f32,
    pub duration_ms: u32,
    pub pan: Pan,
}

impl Tone {
    pub fn new(frequency: f32, duration_ms: u32, pan: Pan) -> Self {
        Self {
            frequency,
            duration_ms,
            pan,
        }
    }

    /// Content signature used as cache key
    pub fn key(&self) -> String {
        format!(
            "{}hz_{}ms_{}",
            self.frequency.round() as u32,
            self.duration_ms,
            self.pan.as_str()
        )
    }

    pub fn render(&self, sample_rate: u32) -> StereoBuffer {
        generate_tone(self.frequency, self.duration_ms, self.pan, sample_rate)
    }
}

/// Tones played back to back, each followed by an optional gap
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToneSequence {
    notes: Vec<(Tone, u32)>,
}

impl ToneSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tone followed by `gap_ms` of silence
    pub fn then(mut self, tone: Tone, gap_ms: u32) -> Self {
        self.notes.push((tone, gap_ms));
        self
    }

    pub fn single(tone: Tone) -> Self {
        Self::new().then(tone, 0)
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Content signature used as cache key
    pub fn key(&self) -> String {
        let parts: Vec<String> = self
            .notes
            .iter()
            .map(|(tone, gap)| {
                if *gap == 0 {
                    tone.key()
                } else {
                    format!("{}_g{}", tone.key(), gap)
                }
            })
            .collect();
        format!("tone_{}", parts.join("-"))
    }

    pub fn render(&self, sample_rate: u32) -> StereoBuffer {
        let mut buffer = StereoBuffer::new(sample_rate);
        for (tone, gap_ms) in &self.notes {
            buffer.append(&tone.render(sample_rate));
            if *gap_ms > 0 {
                buffer.append(&StereoBuffer::silence(*gap_ms, sample_rate));
            }
        }
        buffer
    }
}
