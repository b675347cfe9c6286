//! Host loop glue
//!
//! A session owns one game state, one spawner and one announcer. The host
//! calls [`Session::update`] once per frame with the elapsed wall time; the
//! session schedules spawns, ticks the engine, diffs the result into
//! [`GameEvent`]s and hands them to the announcer in dispatch order.
//!
//! Each level opens with an intro and a countdown. Gameplay does not start
//! until the last countdown phrase has finished (or failed, or been
//! stopped). Async hosts await [`Session::start_level`]; frame-driven hosts
//! call [`Session::begin_level`] and keep calling `update`.

use std::collections::VecDeque;

use crate::audio::{AnnouncementRequest, Announcer, AudioBackend, PlaybackWait};
use crate::consts::{FRAME_MS, MAX_FRAMES_PER_UPDATE};
use crate::sim::{
    GameEvent, GamePhase, GameState, Lane, LevelConfig, LevelTable, Spawner, create_initial_state,
    diff_events, tick,
};

/// Countdown values spoken before play; 0 is "Go!"
const COUNTDOWN: [u32; 4] = [3, 2, 1, 0];

/// Intro announcement in progress
struct Intro {
    wait: PlaybackWait,
    remaining: VecDeque<u32>,
}

/// One player's run through the level table
pub struct Session<B: AudioBackend> {
    levels: LevelTable,
    config: LevelConfig,
    state: GameState,
    spawner: Spawner,
    announcer: Announcer<B>,
    spawn_timer_ms: f32,
    intro: Option<Intro>,
    running: bool,
}

impl<B: AudioBackend> Session<B> {
    /// New session positioned at level 1; call a start method to begin
    pub fn new(announcer: Announcer<B>, levels: LevelTable, seed: u64) -> Self {
        let config = levels.level_config(1);
        let state = create_initial_state(&config);
        log::info!("Session created (seed {seed})");
        Self {
            levels,
            config,
            state,
            spawner: Spawner::new(seed),
            announcer,
            spawn_timer_ms: 0.0,
            intro: None,
            running: false,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    pub fn announcer(&self) -> &Announcer<B> {
        &self.announcer
    }

    pub fn announcer_mut(&mut self) -> &mut Announcer<B> {
        &mut self.announcer
    }

    /// True while the intro or countdown is playing
    pub fn in_intro(&self) -> bool {
        self.intro.is_some()
    }

    /// True once the countdown finished and the engine is being ticked
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Reset the level and start its intro without waiting for it
    pub fn begin_level(&mut self) {
        self.state = create_initial_state(&self.config);
        self.spawn_timer_ms = 0.0;
        self.running = false;

        log::info!(
            "Level {} (target {}, spawn every {} ms)",
            self.config.level,
            self.config.target_score,
            self.config.spawn_interval_ms
        );
        let wait = self.announcer.announce(AnnouncementRequest::LevelIntro {
            level: self.config.level,
            description: self.config.speech_description.clone(),
        });
        self.intro = Some(Intro {
            wait,
            remaining: VecDeque::from(COUNTDOWN),
        });
    }

    /// Reset the level, play the intro and countdown, and return once play begins
    pub async fn start_level(&mut self) {
        self.begin_level();
        while let Some(intro) = self.intro.as_mut() {
            let outcome = (&mut intro.wait).await;
            log::debug!("Intro step finished: {:?}", outcome);
            self.announcer.pump();
            self.advance_intro();
        }
    }

    /// Move from a completed level to the next one and begin it
    pub fn advance_level(&mut self) -> bool {
        if !self.state.is_level_complete() {
            return false;
        }
        self.config = self.levels.level_config(self.state.level.saturating_add(1));
        self.begin_level();
        true
    }

    /// Start the current level over
    pub fn restart_level(&mut self) {
        self.begin_level();
    }

    pub fn move_player(&mut self, lane: Lane) {
        self.state.move_player(lane);
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.state.set_paused(paused);
    }

    /// Advance by `elapsed_ms` of wall time; returns the dispatched events
    pub fn update(&mut self, elapsed_ms: f32) -> Vec<GameEvent> {
        self.announcer.pump();

        if self.intro.is_some() {
            self.poll_intro();
            return Vec::new();
        }
        if !self.running || self.state.phase != GamePhase::Playing {
            return Vec::new();
        }

        let elapsed_ms = elapsed_ms.max(0.0);
        let before = self.state.clone();

        let interval = self.config.spawn_interval_ms as f32;
        self.spawn_timer_ms += elapsed_ms;
        if self.spawn_timer_ms >= interval {
            // One spawn per update; a long stall does not release a burst
            self.spawn_timer_ms = (self.spawn_timer_ms - interval).min(interval);
            let object = self.spawner.spawn_object(&self.config);
            self.state.add_object(object);
        }

        let frames = (elapsed_ms / FRAME_MS).min(MAX_FRAMES_PER_UPDATE);
        tick(&mut self.state, frames);

        let events = diff_events(&before, &self.state);
        self.dispatch(&events);
        events
    }

    /// Release audio; the session is not used again
    pub fn cleanup(&mut self) {
        self.intro = None;
        self.running = false;
        self.announcer.cleanup();
    }

    fn dispatch(&mut self, events: &[GameEvent]) {
        for event in events {
            match event {
                GameEvent::ObjectSpawned { lane, speech, .. } => {
                    self.announcer.announce_object(*lane, speech);
                }
                GameEvent::Collected { lane, delta } => {
                    log::debug!("Collected in {} lane ({delta:+})", lane.as_str());
                    self.announcer.play_collect(*lane);
                }
                GameEvent::LevelComplete { level, score } => {
                    self.announcer.announce_level_complete(*level, *score);
                }
                GameEvent::GameOver { score } => {
                    self.announcer.announce_game_over(*score);
                }
            }
        }
    }

    /// Step the intro along for as long as its announcements have finished
    fn poll_intro(&mut self) {
        while let Some(intro) = self.intro.as_mut() {
            if intro.wait.try_outcome().is_none() {
                return;
            }
            self.advance_intro();
        }
    }

    fn advance_intro(&mut self) {
        let Some(intro) = self.intro.as_mut() else {
            return;
        };
        match intro.remaining.pop_front() {
            Some(value) => {
                intro.wait = self
                    .announcer
                    .announce(AnnouncementRequest::Countdown { value });
            }
            None => {
                self.intro = None;
                self.running = true;
                // First object drops as soon as play starts
                self.spawn_timer_ms = self.config.spawn_interval_ms as f32;
                log::info!("Level {} started", self.config.level);
            }
        }
    }
}
