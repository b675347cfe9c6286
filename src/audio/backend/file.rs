//! Native backend built on rodio
//!
//! Tones are rendered once to WAV files in a cache directory and decoded
//! into a [`rodio::Sink`], as are clip files. A helper thread blocks on the
//! voice sink until it drains and then reports through the completion
//! handle. Speech goes through the platform synthesizer via `tts`, except on
//! Linux where `espeak` renders each phrase to a WAV for the same sink.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

use super::{AudioBackend, Clip, Completion, PlaybackOutcome, Sound, Speech};
use crate::audio::error::AudioError;
use crate::settings::Settings;

/// Speaking rate of espeak at rate 1.0, in words per minute
#[cfg(target_os = "linux")]
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// Completion shared between the backend and a watcher thread
type SharedCompletion = Arc<Mutex<Option<Completion>>>;

/// Fire the shared completion, if still unfired
fn finish(done: &SharedCompletion, outcome: PlaybackOutcome) {
    let taken = done.lock().ok().and_then(|mut slot| slot.take());
    if let Some(done) = taken {
        done.finish(outcome);
    }
}

/// Paths and programs used by [`FileBackend`]
#[derive(Debug, Clone, PartialEq)]
pub struct FileBackendConfig {
    pub cache_dir: PathBuf,
    /// Synthesizer invoked as `<program> -s <wpm> -w <file> <text>`
    #[cfg(target_os = "linux")]
    pub speech_program: String,
}

impl Default for FileBackendConfig {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir().join("lane-sums-tones"),
            #[cfg(target_os = "linux")]
            speech_program: "espeak".into(),
        }
    }
}

impl FileBackendConfig {
    /// Defaults overridden by whatever the settings provide
    pub fn from_settings(settings: &Settings) -> Self {
        let defaults = Self::default();
        Self {
            cache_dir: settings.cache_dir.clone().unwrap_or(defaults.cache_dir),
            ..defaults
        }
    }
}

/// The open output device; dropping it silences every sink
struct Output {
    _stream: OutputStream,
    handle: OutputStreamHandle,
}

enum Voice {
    Sink {
        sink: Arc<Sink>,
        done: SharedCompletion,
    },
    #[cfg(not(target_os = "linux"))]
    Speech,
}

/// Backend that plays through the default output device
pub struct FileBackend {
    config: FileBackendConfig,
    output: Option<Output>,
    written: HashSet<PathBuf>,
    voice: Option<Voice>,
    #[cfg(not(target_os = "linux"))]
    speaker: Option<speaker::Speaker>,
    #[cfg(target_os = "linux")]
    next_utterance: u64,
}

impl FileBackend {
    pub fn new(config: FileBackendConfig) -> Self {
        Self {
            config,
            output: None,
            written: HashSet::new(),
            voice: None,
            #[cfg(not(target_os = "linux"))]
            speaker: None,
            #[cfg(target_os = "linux")]
            next_utterance: 0,
        }
    }

    pub fn config(&self) -> &FileBackendConfig {
        &self.config
    }

    /// Path of the cached WAV for a sound, writing it on first use.
    ///
    /// Files are written under a temporary name and renamed into place, and
    /// a file left by an earlier run is reused only if it holds the whole
    /// buffer.
    pub fn render(&mut self, sound: &Sound) -> Result<PathBuf, AudioError> {
        let gain = (sound.gain.clamp(0.0, 1.0) * 100.0).round() as u32;
        let path = self
            .config
            .cache_dir
            .join(format!("{}_g{}.wav", sound.key, gain));
        if self.written.contains(&path) {
            return Ok(path);
        }

        if !is_complete_wav(&path, sound) {
            let partial = path.with_extension(format!("{}.part", std::process::id()));
            write_wav(&partial, sound).map_err(|source| AudioError::WriteWav {
                path: partial.clone(),
                source,
            })?;
            fs::rename(&partial, &path)?;
            log::debug!("Wrote {}", path.display());
        }
        self.written.insert(path.clone());
        Ok(path)
    }

    fn sink(&self) -> Result<Sink, AudioError> {
        let output = self
            .output
            .as_ref()
            .ok_or_else(|| AudioError::Unavailable("audio output not open".into()))?;
        Sink::try_new(&output.handle)
            .map_err(|e| AudioError::Unavailable(format!("audio sink: {e}")))
    }

    /// Play a file on the voice sink
    fn start_voice(
        &mut self,
        path: &Path,
        volume: f32,
        done: Completion,
    ) -> Result<(), AudioError> {
        self.stop_voice();
        let source = open_source(path)?;
        let sink = Arc::new(self.sink()?);
        sink.set_volume(volume.clamp(0.0, 1.0));
        sink.append(source);

        let done = Arc::new(Mutex::new(Some(done)));
        let watched = Arc::clone(&sink);
        let watcher = Arc::clone(&done);
        thread::spawn(move || {
            watched.sleep_until_end();
            finish(&watcher, PlaybackOutcome::Completed);
        });

        self.voice = Some(Voice::Sink { sink, done });
        Ok(())
    }
}

fn write_wav(path: &Path, sound: &Sound) -> Result<(), hound::Error> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: sound.buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for sample in sound.buffer.interleaved(sound.gain) {
        writer.write_sample((sample * i16::MAX as f32) as i16)?;
    }
    writer.finalize()
}

fn is_complete_wav(path: &Path, sound: &Sound) -> bool {
    let Ok(reader) = hound::WavReader::open(path) else {
        return false;
    };
    let spec = reader.spec();
    spec.channels == 2
        && spec.sample_rate == sound.buffer.sample_rate
        && reader.len() as usize == sound.buffer.len() * 2
}

fn open_source(path: &Path) -> Result<Decoder<BufReader<File>>, AudioError> {
    let file = File::open(path)?;
    Decoder::new(BufReader::new(file)).map_err(|e| AudioError::Decode {
        path: path.to_path_buf(),
        source: Box::new(e),
    })
}

#[cfg(target_os = "linux")]
fn espeak(program: &str, speech: &Speech, path: &Path) -> Result<std::process::Child, AudioError> {
    use std::process::{Command, Stdio};

    let wpm = (BASE_WORDS_PER_MINUTE * speech.rate).round() as u32;
    Command::new(program)
        .arg("-s")
        .arg(wpm.to_string())
        .arg("-w")
        .arg(path)
        .arg(&speech.text)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| AudioError::Spawn {
            command: program.to_string(),
            source,
        })
}

/// Wait for the synthesizer, then play what it wrote unless stopped first
#[cfg(target_os = "linux")]
fn play_speech(
    mut child: std::process::Child,
    path: PathBuf,
    sink: Arc<Sink>,
    done: SharedCompletion,
) {
    match child.wait() {
        Ok(status) if status.success() => {}
        Ok(status) => {
            log::warn!("Speech synthesizer exited with {status}");
            finish(&done, PlaybackOutcome::Failed);
            return;
        }
        Err(e) => {
            log::warn!("Lost track of speech synthesizer: {e}");
            finish(&done, PlaybackOutcome::Failed);
            return;
        }
    }

    let stopped = done.lock().map(|slot| slot.is_none()).unwrap_or(true);
    if !stopped {
        match open_source(&path) {
            Ok(source) => {
                sink.append(source);
                sink.sleep_until_end();
                finish(&done, PlaybackOutcome::Completed);
            }
            Err(e) => {
                log::warn!("Speech output unreadable: {e}");
                finish(&done, PlaybackOutcome::Failed);
            }
        }
    }
    let _ = fs::remove_file(&path);
}

#[cfg(not(target_os = "linux"))]
mod speaker {
    use std::sync::{Arc, Mutex};

    use tts::{Tts, UtteranceId};

    use super::super::{Completion, PlaybackOutcome, Speech};
    use crate::audio::error::AudioError;

    /// Utterance bookkeeping shared with the synthesizer's end callback
    #[derive(Default)]
    struct Utterances {
        current: Option<(UtteranceId, Completion)>,
        /// An utterance that ended before its id was recorded
        ended: Option<UtteranceId>,
    }

    pub struct Speaker {
        tts: Tts,
        utterances: Arc<Mutex<Utterances>>,
        tracked: bool,
    }

    impl Speaker {
        pub fn new() -> Result<Self, tts::Error> {
            let tts = Tts::default()?;
            let utterances = Arc::new(Mutex::new(Utterances::default()));
            let tracked = tts.supported_features().utterance_callbacks;
            if tracked {
                let shared = Arc::clone(&utterances);
                tts.on_utterance_end(Some(Box::new(move |id| {
                    let taken = shared.lock().ok().and_then(|mut u| {
                        if u.current.as_ref().is_some_and(|(current, _)| *current == id) {
                            u.current.take()
                        } else {
                            u.ended = Some(id);
                            None
                        }
                    });
                    if let Some((_, done)) = taken {
                        done.finish(PlaybackOutcome::Completed);
                    }
                })))?;
            }
            Ok(Self {
                tts,
                utterances,
                tracked,
            })
        }

        pub fn speak(&mut self, speech: &Speech, done: Completion) -> Result<(), AudioError> {
            let rate = (self.tts.normal_rate() * speech.rate)
                .clamp(self.tts.min_rate(), self.tts.max_rate());
            let volume = (self.tts.max_volume() * speech.volume)
                .clamp(self.tts.min_volume(), self.tts.max_volume());
            // Not every synthesizer supports both
            let _ = self.tts.set_rate(rate);
            let _ = self.tts.set_volume(volume);

            let id = self
                .tts
                .speak(speech.text.as_str(), true)
                .map_err(|e| AudioError::Playback(e.to_string()))?;
            match id {
                Some(id) if self.tracked => {
                    if let Ok(mut u) = self.utterances.lock() {
                        if u.ended == Some(id) {
                            u.ended = None;
                            drop(u);
                            done.finish(PlaybackOutcome::Completed);
                        } else {
                            u.current = Some((id, done));
                        }
                    }
                }
                _ => {
                    log::debug!("Synthesizer cannot report utterance ends");
                    done.finish(PlaybackOutcome::Completed);
                }
            }
            Ok(())
        }

        pub fn stop(&mut self) {
            let taken = self.utterances.lock().ok().and_then(|mut u| u.current.take());
            if let Some((_, done)) = taken {
                done.finish(PlaybackOutcome::Stopped);
            }
            let _ = self.tts.stop();
        }
    }
}

impl AudioBackend for FileBackend {
    fn name(&self) -> &'static str {
        "rodio"
    }

    fn init(&mut self) -> Result<(), AudioError> {
        fs::create_dir_all(&self.config.cache_dir).map_err(|source| AudioError::CreateDir {
            path: self.config.cache_dir.clone(),
            source,
        })?;
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| AudioError::Unavailable(format!("no audio output: {e}")))?;
        self.output = Some(Output {
            _stream: stream,
            handle,
        });

        #[cfg(not(target_os = "linux"))]
        {
            self.speaker = match speaker::Speaker::new() {
                Ok(speaker) => Some(speaker),
                Err(e) => {
                    log::warn!("Speech synthesis unavailable: {e}");
                    None
                }
            };
        }

        log::info!("Audio output open, tone cache at {}", self.config.cache_dir.display());
        Ok(())
    }

    fn play_tone(&mut self, sound: &Sound, done: Completion) -> Result<(), AudioError> {
        let path = self.render(sound)?;
        // Gain is already baked into the rendered file
        self.start_voice(&path, 1.0, done)
    }

    fn play_clip(&mut self, clip: &Clip, done: Completion) -> Result<(), AudioError> {
        self.start_voice(Path::new(&clip.resource), clip.volume, done)
    }

    #[cfg(target_os = "linux")]
    fn speak(&mut self, speech: &Speech, done: Completion) -> Result<(), AudioError> {
        self.stop_voice();
        self.next_utterance += 1;
        let path = self.config.cache_dir.join(format!(
            "speech_{}_{}.wav",
            std::process::id(),
            self.next_utterance
        ));
        let mut child = espeak(&self.config.speech_program, speech, &path)?;
        let sink = match self.sink() {
            Ok(sink) => Arc::new(sink),
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        };
        sink.set_volume(speech.volume.clamp(0.0, 1.0));

        let done = Arc::new(Mutex::new(Some(done)));
        let played = Arc::clone(&sink);
        let watcher = Arc::clone(&done);
        thread::spawn(move || play_speech(child, path, played, watcher));

        self.voice = Some(Voice::Sink { sink, done });
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    fn speak(&mut self, speech: &Speech, done: Completion) -> Result<(), AudioError> {
        self.stop_voice();
        let Some(speaker) = self.speaker.as_mut() else {
            return Err(AudioError::Unavailable("speech synthesizer".into()));
        };
        speaker.speak(speech, done)?;
        self.voice = Some(Voice::Speech);
        Ok(())
    }

    fn play_effect(&mut self, sound: &Sound) -> Result<(), AudioError> {
        let path = self.render(sound)?;
        let source = open_source(&path)?;
        let sink = self.sink()?;
        sink.append(source);
        sink.detach();
        Ok(())
    }

    fn stop_voice(&mut self) {
        match self.voice.take() {
            Some(Voice::Sink { sink, done }) => {
                finish(&done, PlaybackOutcome::Stopped);
                sink.stop();
            }
            #[cfg(not(target_os = "linux"))]
            Some(Voice::Speech) => {
                if let Some(speaker) = self.speaker.as_mut() {
                    speaker.stop();
                }
            }
            None => {}
        }
    }

    fn release(&mut self) {
        self.stop_voice();
        #[cfg(not(target_os = "linux"))]
        {
            self.speaker = None;
        }
        self.output = None;
    }
}
