//! Lane Sums entry point
//!
//! Natively this runs a headless demonstration: an autopilot plays through
//! the levels while the native backend speaks every announcement. On the web
//! it exposes a `WebGame` handle and drives it from `requestAnimationFrame`.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use web_sys::KeyboardEvent;

    use lane_sums::audio::{Announcer, ClipLibrary, WebAudioBackend};
    use lane_sums::consts::FRAME_MS;
    use lane_sums::sim::{GamePhase, Lane, LevelTable};
    use lane_sums::{Session, Settings};

    /// Browser-facing game handle
    #[wasm_bindgen]
    pub struct WebGame {
        session: Session<WebAudioBackend>,
        last_time: f64,
    }

    #[wasm_bindgen]
    impl WebGame {
        #[wasm_bindgen(constructor)]
        pub fn new() -> WebGame {
            let settings = Settings::load();
            let seed = settings.seed.unwrap_or(js_sys::Date::now() as u64);
            let announcer = Announcer::new(WebAudioBackend::new(), ClipLibrary::empty(), &settings);
            Self {
                session: Session::new(announcer, LevelTable::standard(), seed),
                last_time: 0.0,
            }
        }

        /// Start (or restart) the current level; call from a user gesture
        pub fn start(&mut self) {
            self.session.announcer().backend().resume();
            self.session.begin_level();
        }

        /// Advance one animation frame
        pub fn frame(&mut self, time: f64) {
            let elapsed = if self.last_time > 0.0 {
                (time - self.last_time) as f32
            } else {
                FRAME_MS
            };
            self.last_time = time;
            self.session.update(elapsed);
        }

        pub fn move_left(&mut self) {
            self.session.move_player(Lane::Left);
        }

        pub fn move_right(&mut self) {
            self.session.move_player(Lane::Right);
        }

        /// Flip the mute setting and persist it
        pub fn toggle_mute(&mut self) {
            let mut settings = self.session.announcer().settings().clone();
            settings.muted = !settings.muted;
            settings.save();
            self.session.announcer_mut().set_settings(&settings);
        }

        pub fn toggle_pause(&mut self) {
            let paused = self.session.state().is_paused();
            self.session.set_paused(!paused);
        }

        /// Continue after a level ends: next level on a win, retry on a loss
        pub fn proceed(&mut self) {
            if !self.session.advance_level() && self.session.state().is_game_over() {
                self.session.restart_level();
            }
        }

        pub fn score(&self) -> f64 {
            self.session.state().score as f64
        }

        pub fn target(&self) -> f64 {
            self.session.state().target_score as f64
        }

        pub fn level(&self) -> u32 {
            self.session.state().level
        }

        pub fn phase(&self) -> String {
            match self.session.state().phase {
                GamePhase::Playing => "playing",
                GamePhase::Paused => "paused",
                GamePhase::LevelComplete => "level_complete",
                GamePhase::GameOver => "game_over",
            }
            .to_string()
        }

        pub fn cleanup(&mut self) {
            self.session.cleanup();
        }
    }

    impl Default for WebGame {
        fn default() -> Self {
            Self::new()
        }
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            return;
        }
        log::info!("Lane Sums starting...");

        let game = Rc::new(RefCell::new(WebGame::new()));
        setup_keyboard(Rc::clone(&game));
        request_animation_frame(game);
    }

    fn setup_keyboard(game: Rc<RefCell<WebGame>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::<dyn FnMut(KeyboardEvent)>::new(move |e: KeyboardEvent| {
            let mut g = game.borrow_mut();
            match e.key().as_str() {
                "ArrowLeft" | "a" => g.move_left(),
                "ArrowRight" | "d" => g.move_right(),
                "p" | "Escape" => g.toggle_pause(),
                "m" => g.toggle_mute(),
                "Enter" | " " => {
                    if g.session.is_running() {
                        g.proceed();
                    } else if !g.session.in_intro() {
                        g.start();
                    }
                }
                _ => {}
            }
        });
        let _ = window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(game: Rc<RefCell<WebGame>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<WebGame>>, time: f64) {
        game.borrow_mut().frame(time);
        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
mod autopilot {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use futures::executor::block_on;
    use lane_sums::audio::{Announcer, ClipLibrary, FileBackend, FileBackendConfig};
    use lane_sums::consts::{COLLISION_HALF_WIDTH, FRAME_MS, PLAYER_POSITION};
    use lane_sums::sim::{GamePhase, GameState, Lane, LevelTable, apply_operation};
    use lane_sums::{Session, Settings};

    /// Give up on a level after this many frames (ten minutes of play)
    const MAX_FRAMES_PER_LEVEL: u32 = 60 * 60 * 10;

    /// Wait at most this long for a closing announcement to finish
    const MAX_DRAIN_FRAMES: u32 = 60 * 10;

    /// Lane the autopilot wants: toward the nearest helpful object, away
    /// from the nearest harmful one
    pub fn choose_lane(state: &GameState) -> Lane {
        let reach = PLAYER_POSITION + COLLISION_HALF_WIDTH;
        let nearest = state
            .objects
            .iter()
            .filter(|o| !o.consumed && o.position < reach)
            .max_by(|a, b| a.position.total_cmp(&b.position));

        match nearest {
            Some(o) if apply_operation(state.score, &o.operation) > state.score => o.lane,
            Some(o) => o.lane.other(),
            None => state.player_lane,
        }
    }

    fn load_clips(settings: &Settings) -> ClipLibrary {
        let loaded = if let Some(path) = &settings.clip_manifest {
            ClipLibrary::load_manifest(path)
        } else if let Some(dir) = &settings.clip_dir {
            ClipLibrary::scan_dir(dir)
        } else {
            return ClipLibrary::empty();
        };
        loaded.unwrap_or_else(|e| {
            log::warn!("Clips unavailable, using speech only: {e}");
            ClipLibrary::empty()
        })
    }

    fn frame() {
        std::thread::sleep(Duration::from_secs_f32(FRAME_MS / 1000.0));
    }

    pub fn run(levels: u32) {
        let settings = Settings::load();
        let seed = settings.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default()
        });

        let backend = FileBackend::new(FileBackendConfig::from_settings(&settings));
        let announcer = Announcer::new(backend, load_clips(&settings), &settings);
        let mut session = Session::new(announcer, LevelTable::standard(), seed);

        block_on(session.start_level());
        for played in 1..=levels {
            let mut frames = 0;
            while session.state().phase == GamePhase::Playing && frames < MAX_FRAMES_PER_LEVEL {
                let lane = choose_lane(session.state());
                session.move_player(lane);
                session.update(FRAME_MS);
                frame();
                frames += 1;
            }

            // Let the closing announcement play out
            let mut drain = 0;
            while session.announcer().is_speaking() && drain < MAX_DRAIN_FRAMES {
                session.update(FRAME_MS);
                frame();
                drain += 1;
            }

            let state = session.state();
            log::info!(
                "Level {} ended {:?}: score {}, collected {}, missed {}",
                state.level,
                state.phase,
                state.score,
                state.collected_count,
                state.missed_count
            );
            if played == levels || !session.advance_level() {
                break;
            }
            while session.in_intro() {
                session.update(FRAME_MS);
                frame();
            }
        }

        session.cleanup();
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Lane Sums (native) starting...");

    let levels = std::env::args()
        .nth(1)
        .and_then(|a| a.parse().ok())
        .unwrap_or(1);
    autopilot::run(levels);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::autopilot::choose_lane;
    use lane_sums::sim::{FallingObject, Lane, LevelTable, Operation, create_initial_state};

    fn object(lane: Lane, operation: Operation, position: f32) -> FallingObject {
        FallingObject {
            id: 1,
            lane,
            operation,
            position,
            speed: 0.004,
            consumed: false,
        }
    }

    #[test]
    fn test_autopilot_steers() {
        let mut state = create_initial_state(&LevelTable::standard().level_config(1));
        assert_eq!(choose_lane(&state), Lane::Left);

        state.add_object(object(Lane::Right, Operation::add(2), 0.5));
        assert_eq!(choose_lane(&state), Lane::Right);

        state.add_object(object(Lane::Right, Operation::subtract(2), 0.7));
        assert_eq!(choose_lane(&state), Lane::Left);
    }
}
