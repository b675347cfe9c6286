//! In-memory backend that records calls instead of making sound
//!
//! Used by headless hosts and tests. Voice completions are held until the
//! owner fires them, or fired immediately in auto-complete mode.

use std::collections::VecDeque;

use super::{AudioBackend, Clip, Completion, PlaybackOutcome, Sound, Speech};
use crate::audio::error::AudioError;

/// One observed backend call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Init,
    Tone { key: String },
    Clip { key: String, resource: String },
    Speak { text: String },
    Effect { key: String },
    StopVoice,
    Release,
}

/// Backend that records every call
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
    pending: VecDeque<Completion>,
    auto_complete: bool,
    fail_init: bool,
    fail_speech: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finish every voice playback as soon as it starts
    pub fn auto_complete() -> Self {
        Self {
            auto_complete: true,
            ..Self::default()
        }
    }

    /// Make `init` fail, as a missing audio device would
    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Make `speak` fail, as a missing speech engine would
    pub fn failing_speech(mut self) -> Self {
        self.fail_speech = true;
        self
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Phrases spoken so far
    pub fn spoken(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::Speak { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Fire the oldest held completion; returns false if none was held
    pub fn complete_next(&mut self, outcome: PlaybackOutcome) -> bool {
        match self.pending.pop_front() {
            Some(done) => {
                done.finish(outcome);
                true
            }
            None => false,
        }
    }

    fn hold(&mut self, done: Completion) {
        if self.auto_complete {
            done.finish(PlaybackOutcome::Completed);
        } else {
            self.pending.push_back(done);
        }
    }
}

impl AudioBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn init(&mut self) -> Result<(), AudioError> {
        self.calls.push(BackendCall::Init);
        if self.fail_init {
            return Err(AudioError::Unavailable("no output device".into()));
        }
        Ok(())
    }

    fn play_tone(&mut self, sound: &Sound, done: Completion) -> Result<(), AudioError> {
        self.calls.push(BackendCall::Tone {
            key: sound.key.clone(),
        });
        self.hold(done);
        Ok(())
    }

    fn play_clip(&mut self, clip: &Clip, done: Completion) -> Result<(), AudioError> {
        self.calls.push(BackendCall::Clip {
            key: clip.key.clone(),
            resource: clip.resource.clone(),
        });
        self.hold(done);
        Ok(())
    }

    fn speak(&mut self, speech: &Speech, done: Completion) -> Result<(), AudioError> {
        if self.fail_speech {
            return Err(AudioError::Unavailable("no speech engine".into()));
        }
        self.calls.push(BackendCall::Speak {
            text: speech.text.clone(),
        });
        self.hold(done);
        Ok(())
    }

    fn play_effect(&mut self, sound: &Sound) -> Result<(), AudioError> {
        self.calls.push(BackendCall::Effect {
            key: sound.key.clone(),
        });
        Ok(())
    }

    fn stop_voice(&mut self) {
        // Held completions stay held: real engines may still call back late
        self.calls.push(BackendCall::StopVoice);
    }

    fn release(&mut self) {
        self.calls.push(BackendCall::Release);
        self.pending.clear();
    }
}
