//! Audio for non-visual play
//!
//! Everything is synthesized or looked up at runtime: stereo-panned tones
//! tell the player which lane an object is in, speech (or a pre-recorded
//! clip) says what it does.

mod announcer;
pub mod backend;
mod clips;
mod effects;
mod error;
mod request;
mod tone;

pub use announcer::{Announcer, BackendStatus, PlaybackWait};
pub use backend::{AudioBackend, PlaybackOutcome, RecordingBackend};
#[cfg(not(target_arch = "wasm32"))]
pub use backend::{FileBackend, FileBackendConfig};
#[cfg(target_arch = "wasm32")]
pub use backend::WebAudioBackend;
pub use clips::{ClipLibrary, normalize_key};
pub use effects::SoundEffect;
pub use error::AudioError;
pub use request::{AnnouncementRequest, Priority};
pub use tone::{Pan, StereoBuffer, Tone, ToneSequence, generate_tone};
