//! Playback backend abstraction
//!
//! A backend knows how to make sound on one platform. It has a single
//! tracked "voice" (announcement tone, clip or speech) that can be stopped,
//! plus untracked fire-and-forget effects. Voice playback reports back
//! through a [`Completion`], which may be fired from any thread.

use std::sync::{Arc, Mutex};

use futures::channel::mpsc::UnboundedSender;
use futures::channel::oneshot;

use super::error::AudioError;
use super::tone::StereoBuffer;

mod recording;
pub use recording::{BackendCall, RecordingBackend};

#[cfg(not(target_arch = "wasm32"))]
mod file;
#[cfg(not(target_arch = "wasm32"))]
pub use file::{FileBackend, FileBackendConfig};

#[cfg(target_arch = "wasm32")]
mod web;
#[cfg(target_arch = "wasm32")]
pub use web::WebAudioBackend;

/// A rendered buffer ready for playback
#[derive(Debug, Clone)]
pub struct Sound {
    /// Content signature, stable across calls
    pub key: String,
    pub buffer: Arc<StereoBuffer>,
    pub gain: f32,
}

/// A phrase for the speech synthesizer
#[derive(Debug, Clone, PartialEq)]
pub struct Speech {
    pub text: String,
    /// 1.0 = normal speaking rate
    pub rate: f32,
    pub volume: f32,
}

/// A pre-recorded clip resolved from the clip library
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub key: String,
    pub resource: String,
    pub volume: f32,
}

/// How a voice playback ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed,
    Stopped,
    Failed,
}

/// Identifies one step of one announcement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    /// Announcer epoch at the time the step started
    pub epoch: u64,
    pub step: u32,
}

/// Completion notice delivered to the announcer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finished {
    pub ticket: Ticket,
    pub outcome: PlaybackOutcome,
}

/// Shared slot for a `speak_and_wait` caller; first resolver wins
pub(crate) type Waiter = Arc<Mutex<Option<oneshot::Sender<PlaybackOutcome>>>>;

/// Resolve a waiter if nobody has yet
pub(crate) fn resolve_waiter(waiter: &Waiter, outcome: PlaybackOutcome) {
    if let Ok(mut slot) = waiter.lock() {
        if let Some(tx) = slot.take() {
            let _ = tx.send(outcome);
        }
    }
}

struct CompletionInner {
    ticket: Ticket,
    tx: UnboundedSender<Finished>,
    waiter: Option<Waiter>,
}

/// One-shot completion handle for a voice playback.
///
/// Dropping it unfired reports [`PlaybackOutcome::Failed`], so a backend
/// that errors out or discards a playback can never strand a waiter.
pub struct Completion {
    inner: Option<CompletionInner>,
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("ticket", &self.inner.as_ref().map(|i| i.ticket))
            .finish()
    }
}

impl Completion {
    pub(crate) fn new(
        ticket: Ticket,
        tx: UnboundedSender<Finished>,
        waiter: Option<Waiter>,
    ) -> Self {
        Self {
            inner: Some(CompletionInner { ticket, tx, waiter }),
        }
    }

    /// Report the outcome. Safe to call from any thread.
    pub fn finish(mut self, outcome: PlaybackOutcome) {
        self.fire(outcome);
    }

    fn fire(&mut self, outcome: PlaybackOutcome) {
        let Some(inner) = self.inner.take() else {
            return;
        };
        if let Some(waiter) = &inner.waiter {
            resolve_waiter(waiter, outcome);
        }
        // Receiver gone means the announcer was dropped
        let _ = inner.tx.unbounded_send(Finished {
            ticket: inner.ticket,
            outcome,
        });
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.fire(PlaybackOutcome::Failed);
    }
}

/// Platform playback backend
pub trait AudioBackend {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Acquire platform resources. Called once, lazily, by the announcer.
    fn init(&mut self) -> Result<(), AudioError>;

    /// Play a tone on the voice lane
    fn play_tone(&mut self, sound: &Sound, done: Completion) -> Result<(), AudioError>;

    /// Play a pre-recorded clip on the voice lane
    fn play_clip(&mut self, clip: &Clip, done: Completion) -> Result<(), AudioError>;

    /// Speak a phrase on the voice lane
    fn speak(&mut self, speech: &Speech, done: Completion) -> Result<(), AudioError>;

    /// Fire-and-forget effect; never stopped by [`AudioBackend::stop_voice`]
    fn play_effect(&mut self, sound: &Sound) -> Result<(), AudioError>;

    /// Halt the voice lane. Completion may or may not fire afterwards.
    fn stop_voice(&mut self);

    /// Release everything. The backend is not used again.
    fn release(&mut self);
}
