//! Announcement coordinator
//!
//! The announcer owns the playback backend and serializes everything that
//! talks: lane cues, clips and synthesized speech share one voice lane, and
//! at most one announcement is audible at a time. Effects bypass the voice
//! lane entirely.
//!
//! Cancellation uses an epoch counter. Every interruption bumps it; backend
//! completions carry the epoch they were started under and are ignored in
//! [`Announcer::pump`] once it has moved on, however late they arrive.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::channel::oneshot;

use super::backend::{
    AudioBackend, Clip, Completion, Finished, PlaybackOutcome, Sound, Speech, Ticket, Waiter,
    resolve_waiter,
};
use super::clips::ClipLibrary;
use super::effects::SoundEffect;
use super::request::{AnnouncementRequest, Priority};
use super::tone::StereoBuffer;
use crate::settings::Settings;
use crate::sim::Lane;

/// Resolves when an announcement finishes, fails or is interrupted
#[derive(Debug)]
pub struct PlaybackWait {
    rx: oneshot::Receiver<PlaybackOutcome>,
}

impl PlaybackWait {
    fn pair() -> (Self, Waiter) {
        let (tx, rx) = oneshot::channel();
        (Self { rx }, Arc::new(Mutex::new(Some(tx))))
    }

    /// Non-blocking check for frame-driven hosts
    pub fn try_outcome(&mut self) -> Option<PlaybackOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => outcome,
            Err(_) => Some(PlaybackOutcome::Stopped),
        }
    }
}

impl Future for PlaybackWait {
    type Output = PlaybackOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.unwrap_or(PlaybackOutcome::Stopped))
    }
}

/// Backend lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    Uninitialized,
    Ready,
    /// Initialization failed; audio stays off for the session
    Disabled,
    Released,
}

/// One voice-lane step of an announcement
#[derive(Debug)]
enum Step {
    Tone(SoundEffect),
    Clip(Clip),
    Speech(String),
}

/// The announcement currently holding the voice lane
struct Active {
    priority: Priority,
    steps: VecDeque<Step>,
    in_flight: Option<Ticket>,
    waiter: Waiter,
}

/// Single-owner playback coordinator, one per game session
pub struct Announcer<B: AudioBackend> {
    backend: B,
    status: BackendStatus,
    settings: Settings,
    clips: ClipLibrary,
    sounds: HashMap<String, Arc<StereoBuffer>>,
    epoch: u64,
    next_step: u32,
    active: Option<Active>,
    finished_tx: UnboundedSender<Finished>,
    finished_rx: UnboundedReceiver<Finished>,
}

impl<B: AudioBackend> Announcer<B> {
    pub fn new(backend: B, clips: ClipLibrary, settings: &Settings) -> Self {
        let (finished_tx, finished_rx) = mpsc::unbounded();
        Self {
            backend,
            status: BackendStatus::Uninitialized,
            settings: settings.clone(),
            clips,
            sounds: HashMap::new(),
            epoch: 0,
            next_step: 0,
            active: None,
            finished_tx,
            finished_rx,
        }
    }

    /// Set up the backend. Only the first call has any effect.
    pub fn initialize(&mut self) -> bool {
        if self.status == BackendStatus::Uninitialized {
            self.status = match self.backend.init() {
                Ok(()) => {
                    log::info!("Audio backend '{}' ready", self.backend.name());
                    BackendStatus::Ready
                }
                Err(e) => {
                    log::warn!("Audio backend '{}' unavailable, audio disabled: {e}", self.backend.name());
                    BackendStatus::Disabled
                }
            };
        }
        self.status == BackendStatus::Ready
    }

    pub fn status(&self) -> BackendStatus {
        self.status
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Apply new settings (volume changes take effect on the next playback)
    pub fn set_settings(&mut self, settings: &Settings) {
        if settings.sample_rate != self.settings.sample_rate {
            self.sounds.clear();
        }
        self.settings = settings.clone();
    }

    /// True while an announcement holds the voice lane
    pub fn is_speaking(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_priority(&self) -> Option<Priority> {
        self.active.as_ref().map(|a| a.priority)
    }

    /// Number of rendered buffers held in the cache
    pub fn cached_sounds(&self) -> usize {
        self.sounds.len()
    }

    // === Announcements ===

    /// Start an announcement. The returned handle may be awaited or ignored.
    pub fn announce(&mut self, request: AnnouncementRequest) -> PlaybackWait {
        let (wait, waiter) = PlaybackWait::pair();
        if !self.admit(request.priority(), &waiter) {
            return wait;
        }

        let mut steps = VecDeque::new();
        if let Some(effect) = request.lead_in() {
            steps.push_back(Step::Tone(effect));
        }
        let key = request.clip_key();
        match self.clips.resolve(&key) {
            Some(resource) => steps.push_back(Step::Clip(Clip {
                key,
                resource: resource.to_string(),
                volume: self.settings.speech_gain(),
            })),
            None => steps.push_back(Step::Speech(request.phrase())),
        }

        log::debug!("Announcing {:?}", request);
        self.begin(request.priority(), steps, waiter);
        wait
    }

    pub fn announce_object(&mut self, lane: Lane, speech: &str) {
        let _ = self.announce(AnnouncementRequest::AnnounceObject {
            lane,
            speech: speech.to_string(),
        });
    }

    pub fn announce_level_intro(&mut self, level: u32, description: &str) {
        let _ = self.announce(AnnouncementRequest::LevelIntro {
            level,
            description: description.to_string(),
        });
    }

    pub fn announce_countdown(&mut self, value: u32) {
        let _ = self.announce(AnnouncementRequest::Countdown { value });
    }

    pub fn announce_level_complete(&mut self, level: u32, score: i64) {
        let _ = self.announce(AnnouncementRequest::LevelComplete { level, score });
    }

    pub fn announce_game_over(&mut self, score: i64) {
        let _ = self.announce(AnnouncementRequest::GameOver { score });
    }

    /// Speak free text; resolves once playback completes, fails or is stopped
    pub fn speak_and_wait(&mut self, text: &str) -> PlaybackWait {
        let (wait, waiter) = PlaybackWait::pair();
        if self.admit(Priority::Terminal, &waiter) {
            self.begin(
                Priority::Terminal,
                VecDeque::from([Step::Speech(text.to_string())]),
                waiter,
            );
        }
        wait
    }

    // === Effects ===

    pub fn play_collect(&mut self, lane: Lane) {
        self.play_effect(SoundEffect::Collect(lane));
    }

    pub fn play_success(&mut self) {
        self.play_effect(SoundEffect::Success);
    }

    pub fn play_game_over(&mut self) {
        self.play_effect(SoundEffect::GameOver);
    }

    fn play_effect(&mut self, effect: SoundEffect) {
        if !self.initialize() || self.settings.muted {
            return;
        }
        let sound = self.sound(effect, self.settings.effect_gain());
        if let Err(e) = self.backend.play_effect(&sound) {
            log::warn!("Effect {:?} failed: {e}", effect);
        }
    }

    // === Lifecycle ===

    /// Halt the voice lane and cancel pending completions
    pub fn stop(&mut self) {
        self.epoch += 1;
        if let Some(active) = self.active.take() {
            resolve_waiter(&active.waiter, PlaybackOutcome::Stopped);
        }
        if self.status == BackendStatus::Ready {
            self.backend.stop_voice();
        }
    }

    /// Release the backend. Later calls are ignored.
    pub fn cleanup(&mut self) {
        if self.status == BackendStatus::Released {
            return;
        }
        self.stop();
        if self.status == BackendStatus::Ready {
            self.backend.release();
        }
        self.status = BackendStatus::Released;
        self.sounds.clear();
        log::info!("Audio released");
    }

    /// Drain backend completions and advance the active announcement
    pub fn pump(&mut self) {
        // The announcer holds a sender, so the channel never closes
        while let Ok(Some(finished)) = self.finished_rx.try_next() {
            if finished.ticket.epoch != self.epoch {
                log::debug!("Ignoring stale completion {:?}", finished.ticket);
                continue;
            }
            let Some(active) = self.active.as_mut() else {
                continue;
            };
            if active.in_flight != Some(finished.ticket) {
                continue;
            }
            active.in_flight = None;

            match finished.outcome {
                PlaybackOutcome::Completed => self.advance(),
                PlaybackOutcome::Failed => {
                    log::warn!("Announcement step failed, skipping");
                    self.advance();
                }
                PlaybackOutcome::Stopped => {
                    if let Some(active) = self.active.take() {
                        resolve_waiter(&active.waiter, PlaybackOutcome::Stopped);
                    }
                }
            }
        }
    }

    // === Internals ===

    /// Decide whether a new announcement may take the voice lane; resolves
    /// the waiter itself when it may not.
    fn admit(&mut self, priority: Priority, waiter: &Waiter) -> bool {
        if !self.initialize() {
            resolve_waiter(waiter, PlaybackOutcome::Failed);
            return false;
        }
        if self.settings.muted {
            resolve_waiter(waiter, PlaybackOutcome::Completed);
            return false;
        }
        if let Some(current) = self.active_priority() {
            if current > priority {
                log::debug!("Dropping {:?} announcement, {:?} in progress", priority, current);
                resolve_waiter(waiter, PlaybackOutcome::Stopped);
                return false;
            }
        }
        true
    }

    fn begin(&mut self, priority: Priority, steps: VecDeque<Step>, waiter: Waiter) {
        if self.active.is_some() {
            self.stop();
        }
        self.active = Some(Active {
            priority,
            steps,
            in_flight: None,
            waiter,
        });
        self.advance();
    }

    /// Start the next step, skipping steps that fail to start
    fn advance(&mut self) {
        loop {
            let Some(active) = self.active.as_mut() else {
                return;
            };
            let Some(step) = active.steps.pop_front() else {
                if let Some(active) = self.active.take() {
                    resolve_waiter(&active.waiter, PlaybackOutcome::Completed);
                }
                return;
            };
            // Only the final step resolves a waiter directly from the backend
            let waiter = active.steps.is_empty().then(|| active.waiter.clone());

            self.next_step = self.next_step.wrapping_add(1);
            let ticket = Ticket {
                epoch: self.epoch,
                step: self.next_step,
            };
            let done = Completion::new(ticket, self.finished_tx.clone(), waiter);

            let result = match step {
                Step::Tone(effect) => {
                    let sound = self.sound(effect, self.settings.effect_gain());
                    self.backend.play_tone(&sound, done)
                }
                Step::Clip(clip) => self.backend.play_clip(&clip, done),
                Step::Speech(text) => {
                    let speech = Speech {
                        text,
                        rate: self.settings.speech_rate,
                        volume: self.settings.speech_gain(),
                    };
                    self.backend.speak(&speech, done)
                }
            };

            match result {
                Ok(()) => {
                    if let Some(active) = self.active.as_mut() {
                        active.in_flight = Some(ticket);
                    }
                    return;
                }
                Err(e) => log::warn!("{} playback failed: {e}", self.backend.name()),
            }
        }
    }

    /// Rendered buffer for an effect, cached by content signature
    fn sound(&mut self, effect: SoundEffect, gain: f32) -> Sound {
        let sequence = effect.sequence();
        let key = sequence.key();
        let sample_rate = self.settings.sample_rate;
        let buffer = self
            .sounds
            .entry(key.clone())
            .or_insert_with(|| Arc::new(sequence.render(sample_rate)))
            .clone();
        Sound { key, buffer, gain }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::{BackendCall, RecordingBackend};
    use futures::executor::block_on;

    fn announcer(backend: RecordingBackend) -> Announcer<RecordingBackend> {
        Announcer::new(backend, ClipLibrary::empty(), &Settings::default())
    }

    fn cue_key(lane: Lane) -> String {
        SoundEffect::LaneCue(lane).sequence().key()
    }

    fn complete(a: &mut Announcer<RecordingBackend>) {
        assert!(a.backend_mut().complete_next(PlaybackOutcome::Completed));
        a.pump();
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut a = announcer(RecordingBackend::new());
        assert!(a.initialize());
        assert!(a.initialize());
        assert_eq!(a.backend().calls(), &[BackendCall::Init]);
    }

    #[test]
    fn test_lazy_initialization() {
        let mut a = announcer(RecordingBackend::new());
        assert_eq!(a.status(), BackendStatus::Uninitialized);
        a.play_success();
        assert_eq!(a.status(), BackendStatus::Ready);
        assert_eq!(a.backend().calls()[0], BackendCall::Init);
    }

    #[test]
    fn test_object_announcement_sequence() {
        let mut a = announcer(RecordingBackend::new());
        a.announce_object(Lane::Left, "plus 3");
        assert_eq!(
            a.backend().calls(),
            &[BackendCall::Init, BackendCall::Tone { key: cue_key(Lane::Left) }]
        );

        complete(&mut a);
        assert_eq!(a.backend().spoken(), vec!["left, plus 3"]);
        assert!(a.is_speaking());

        complete(&mut a);
        assert!(!a.is_speaking());
    }

    #[test]
    fn test_clip_preferred_over_speech() {
        let clips = ClipLibrary::from_entries([("announce_right_minus_2", "clips/r_m2.wav")]);
        let mut a = Announcer::new(RecordingBackend::new(), clips, &Settings::default());

        a.announce_object(Lane::Right, "minus 2");
        complete(&mut a);
        assert_eq!(
            a.backend().calls().last(),
            Some(&BackendCall::Clip {
                key: "announce_right_minus_2".into(),
                resource: "clips/r_m2.wav".into()
            })
        );
        assert!(a.backend().spoken().is_empty());
        complete(&mut a);
        assert!(!a.is_speaking());

        // Unknown keys fall back to speech
        a.announce_object(Lane::Left, "minus 2");
        complete(&mut a);
        assert_eq!(a.backend().spoken(), vec!["left, minus 2"]);
    }

    #[test]
    fn test_game_over_supersedes_object_announcement() {
        let mut a = announcer(RecordingBackend::new());
        a.announce_object(Lane::Left, "plus 3");
        a.announce_game_over(-21);

        let game_over_key = SoundEffect::GameOver.sequence().key();
        assert_eq!(
            a.backend().calls(),
            &[
                BackendCall::Init,
                BackendCall::Tone { key: cue_key(Lane::Left) },
                BackendCall::StopVoice,
                BackendCall::Tone { key: game_over_key },
            ]
        );

        // The object cue finishes late; nothing may follow from it
        let before = a.backend().calls().len();
        complete(&mut a);
        assert_eq!(a.backend().calls().len(), before);
        assert!(a.backend().spoken().is_empty());

        // Game-over sound finishes, then the phrase
        complete(&mut a);
        assert_eq!(a.backend().spoken(), vec!["Game over. Final score -21."]);
    }

    #[test]
    fn test_terminal_not_interrupted_by_object_or_effects() {
        let mut a = announcer(RecordingBackend::new());
        a.announce_level_complete(1, 11);
        a.play_collect(Lane::Left);
        a.announce_object(Lane::Right, "plus 1");

        let calls = a.backend().calls();
        assert!(!calls.contains(&BackendCall::StopVoice));
        assert!(!calls.contains(&BackendCall::Tone { key: cue_key(Lane::Right) }));
        assert!(calls.contains(&BackendCall::Effect {
            key: SoundEffect::Collect(Lane::Left).sequence().key()
        }));
        assert_eq!(a.active_priority(), Some(Priority::Terminal));

        complete(&mut a);
        assert_eq!(a.backend().spoken(), vec!["Level 1 complete! Score 11."]);
    }

    #[test]
    fn test_terminal_replaces_terminal() {
        let mut a = announcer(RecordingBackend::new());
        a.announce_countdown(3);
        a.announce_countdown(2);
        assert_eq!(a.backend().spoken(), vec!["3", "2"]);
        assert!(a.backend().calls().contains(&BackendCall::StopVoice));
    }

    #[test]
    fn test_objects_resume_after_terminal_finishes() {
        let mut a = announcer(RecordingBackend::new());
        a.announce_countdown(0);
        complete(&mut a);
        assert!(!a.is_speaking());

        a.announce_object(Lane::Right, "plus 2");
        assert_eq!(a.active_priority(), Some(Priority::Object));
    }

    #[test]
    fn test_speak_and_wait_completes() {
        let mut a = announcer(RecordingBackend::new());
        let mut wait = a.speak_and_wait("Level 1");
        assert_eq!(wait.try_outcome(), None);

        a.backend_mut().complete_next(PlaybackOutcome::Completed);
        assert_eq!(block_on(wait), PlaybackOutcome::Completed);
    }

    #[test]
    fn test_speak_and_wait_resolves_on_stop() {
        let mut a = announcer(RecordingBackend::new());
        let wait = a.speak_and_wait("Level 1");
        a.stop();
        assert_eq!(block_on(wait), PlaybackOutcome::Stopped);
        assert!(!a.is_speaking());
    }

    #[test]
    fn test_speak_and_wait_resolves_on_failure() {
        let mut a = announcer(RecordingBackend::new().failing_speech());
        let wait = a.speak_and_wait("Level 1");
        assert_eq!(block_on(wait), PlaybackOutcome::Failed);
        a.pump();
        assert!(!a.is_speaking());
    }

    #[test]
    fn test_stale_completion_after_stop() {
        let mut a = announcer(RecordingBackend::new());
        a.announce_object(Lane::Left, "plus 1");
        a.stop();

        let before = a.backend().calls().len();
        complete(&mut a);
        assert_eq!(a.backend().calls().len(), before);
        assert!(!a.is_speaking());
    }

    #[test]
    fn test_failed_step_is_skipped() {
        let mut a = announcer(RecordingBackend::new());
        a.announce_object(Lane::Left, "plus 1");
        assert!(a.backend_mut().complete_next(PlaybackOutcome::Failed));
        a.pump();
        assert_eq!(a.backend().spoken(), vec!["left, plus 1"]);
    }

    #[test]
    fn test_init_failure_disables_audio() {
        let mut a = announcer(RecordingBackend::new().failing_init());
        let wait = a.speak_and_wait("hello");
        a.announce_object(Lane::Left, "plus 1");
        a.play_success();
        a.stop();

        assert_eq!(block_on(wait), PlaybackOutcome::Failed);
        assert_eq!(a.status(), BackendStatus::Disabled);
        assert_eq!(a.backend().calls(), &[BackendCall::Init]);
    }

    #[test]
    fn test_muted_skips_playback() {
        let settings = Settings {
            muted: true,
            ..Settings::default()
        };
        let mut a = Announcer::new(RecordingBackend::new(), ClipLibrary::empty(), &settings);
        let wait = a.speak_and_wait("hello");
        a.play_collect(Lane::Right);

        assert_eq!(block_on(wait), PlaybackOutcome::Completed);
        assert_eq!(a.backend().calls(), &[BackendCall::Init]);
    }

    #[test]
    fn test_effects_overlap_and_survive_stop() {
        let mut a = announcer(RecordingBackend::new());
        a.play_success();
        a.play_success();
        a.play_game_over();
        a.stop();

        let effects = a
            .backend()
            .calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::Effect { .. }))
            .count();
        assert_eq!(effects, 3);
    }

    #[test]
    fn test_set_settings_clears_cache_on_sample_rate_change() {
        let mut a = announcer(RecordingBackend::auto_complete());
        a.play_collect(Lane::Left);
        assert_eq!(a.cached_sounds(), 1);

        let quieter = Settings {
            master_volume: 0.3,
            ..Settings::default()
        };
        a.set_settings(&quieter);
        assert_eq!(a.cached_sounds(), 1);
        assert_eq!(a.settings().master_volume, 0.3);

        let resampled = Settings {
            sample_rate: 22_050,
            ..quieter
        };
        a.set_settings(&resampled);
        assert_eq!(a.cached_sounds(), 0);
        assert_eq!(a.settings().sample_rate, 22_050);

        a.play_collect(Lane::Left);
        assert_eq!(a.cached_sounds(), 1);
    }

    #[test]
    fn test_sound_cache_reuses_buffers() {
        let mut a = announcer(RecordingBackend::auto_complete());
        a.announce_object(Lane::Left, "plus 1");
        a.announce_object(Lane::Left, "plus 2");
        a.play_collect(Lane::Left);
        a.play_collect(Lane::Left);
        assert_eq!(a.cached_sounds(), 2);
    }

    #[test]
    fn test_cleanup_releases_once() {
        let mut a = announcer(RecordingBackend::new());
        a.announce_countdown(1);
        a.cleanup();
        a.cleanup();
        a.announce_countdown(2);

        let releases = a
            .backend()
            .calls()
            .iter()
            .filter(|c| **c == BackendCall::Release)
            .count();
        assert_eq!(releases, 1);
        assert_eq!(a.backend().spoken(), vec!["1"]);
        assert_eq!(a.status(), BackendStatus::Released);
    }
}
