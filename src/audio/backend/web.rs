//! Browser backend using the Web Audio and Web Speech APIs

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    AudioBuffer, AudioBufferSourceNode, AudioContext, HtmlAudioElement, SpeechSynthesis,
    SpeechSynthesisUtterance,
};

use super::{AudioBackend, Clip, Completion, PlaybackOutcome, Sound, Speech};
use crate::audio::error::AudioError;

type SharedCompletion = Rc<RefCell<Option<Completion>>>;

fn js_err(e: JsValue) -> AudioError {
    AudioError::Playback(format!("{e:?}"))
}

/// Callback that fires the shared completion, if still unfired
fn completion_callback(done: &SharedCompletion, outcome: PlaybackOutcome) -> JsValue {
    let done = Rc::clone(done);
    Closure::once_into_js(move || {
        if let Some(done) = done.borrow_mut().take() {
            done.finish(outcome);
        }
    })
}

/// Give up on a playback whose callbacks will never fire
fn abandon(done: &SharedCompletion, e: JsValue) -> AudioError {
    // Dropping the completion reports it as failed
    drop(done.borrow_mut().take());
    js_err(e)
}

enum VoiceNode {
    Source(AudioBufferSourceNode),
    Speech,
    Clip(HtmlAudioElement),
}

struct Voice {
    node: VoiceNode,
    done: SharedCompletion,
}

/// Web Audio graph plus `speechSynthesis`
#[derive(Default)]
pub struct WebAudioBackend {
    ctx: Option<AudioContext>,
    synth: Option<SpeechSynthesis>,
    buffers: HashMap<String, AudioBuffer>,
    voice: Option<Voice>,
}

impl WebAudioBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume the context (browsers require a user gesture first)
    pub fn resume(&self) {
        if let Some(ctx) = &self.ctx {
            if ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = ctx.resume();
            }
        }
    }

    fn context(&self) -> Result<&AudioContext, AudioError> {
        self.ctx.as_ref().ok_or(AudioError::Released)
    }

    fn buffer(&mut self, sound: &Sound) -> Result<AudioBuffer, AudioError> {
        if let Some(buffer) = self.buffers.get(&sound.key) {
            return Ok(buffer.clone());
        }
        let ctx = self.context()?;
        let data = &sound.buffer;
        let length = data.len().max(1) as u32;
        let buffer = ctx
            .create_buffer(2, length, data.sample_rate as f32)
            .map_err(js_err)?;
        buffer.copy_to_channel(&data.left, 0).map_err(js_err)?;
        buffer.copy_to_channel(&data.right, 1).map_err(js_err)?;
        self.buffers.insert(sound.key.clone(), buffer.clone());
        Ok(buffer)
    }

    /// Build a buffer source routed through a gain node
    fn source(&mut self, sound: &Sound) -> Result<AudioBufferSourceNode, AudioError> {
        self.resume();
        let buffer = self.buffer(sound)?;
        let ctx = self.context()?;
        let source = ctx.create_buffer_source().map_err(js_err)?;
        let gain = ctx.create_gain().map_err(js_err)?;
        source.set_buffer(Some(&buffer));
        gain.gain().set_value(sound.gain);
        source.connect_with_audio_node(&gain).map_err(js_err)?;
        gain.connect_with_audio_node(&ctx.destination())
            .map_err(js_err)?;
        Ok(source)
    }
}

impl AudioBackend for WebAudioBackend {
    fn name(&self) -> &'static str {
        "web-audio"
    }

    fn init(&mut self) -> Result<(), AudioError> {
        let ctx = AudioContext::new()
            .map_err(|e| AudioError::Unavailable(format!("AudioContext: {e:?}")))?;
        self.ctx = Some(ctx);
        self.synth = web_sys::window().and_then(|w| w.speech_synthesis().ok());
        if self.synth.is_none() {
            log::warn!("speechSynthesis unavailable; only clips and tones will play");
        }
        Ok(())
    }

    fn play_tone(&mut self, sound: &Sound, done: Completion) -> Result<(), AudioError> {
        self.stop_voice();
        let source = self.source(sound)?;
        let done = Rc::new(RefCell::new(Some(done)));
        let on_ended = completion_callback(&done, PlaybackOutcome::Completed);
        source.set_onended(Some(on_ended.unchecked_ref()));
        source.start().map_err(|e| abandon(&done, e))?;
        self.voice = Some(Voice {
            node: VoiceNode::Source(source),
            done,
        });
        Ok(())
    }

    fn play_clip(&mut self, clip: &Clip, done: Completion) -> Result<(), AudioError> {
        self.stop_voice();
        let audio = HtmlAudioElement::new_with_src(&clip.resource).map_err(js_err)?;
        audio.set_volume(f64::from(clip.volume.clamp(0.0, 1.0)));

        let done = Rc::new(RefCell::new(Some(done)));
        let on_ended = completion_callback(&done, PlaybackOutcome::Completed);
        let on_error = completion_callback(&done, PlaybackOutcome::Failed);
        audio
            .add_event_listener_with_callback("ended", on_ended.unchecked_ref())
            .map_err(|e| abandon(&done, e))?;
        audio
            .add_event_listener_with_callback("error", on_error.unchecked_ref())
            .map_err(|e| abandon(&done, e))?;
        let _ = audio.play().map_err(|e| abandon(&done, e))?;

        self.voice = Some(Voice {
            node: VoiceNode::Clip(audio),
            done,
        });
        Ok(())
    }

    fn speak(&mut self, speech: &Speech, done: Completion) -> Result<(), AudioError> {
        self.stop_voice();
        let Some(synth) = self.synth.clone() else {
            return Err(AudioError::Unavailable("speechSynthesis".into()));
        };
        let utterance = SpeechSynthesisUtterance::new_with_text(&speech.text).map_err(js_err)?;
        utterance.set_rate(speech.rate);
        utterance.set_volume(speech.volume.clamp(0.0, 1.0));

        let done = Rc::new(RefCell::new(Some(done)));
        let on_end = completion_callback(&done, PlaybackOutcome::Completed);
        let on_error = completion_callback(&done, PlaybackOutcome::Failed);
        utterance.set_onend(Some(on_end.unchecked_ref()));
        utterance.set_onerror(Some(on_error.unchecked_ref()));
        synth.speak(&utterance);

        self.voice = Some(Voice {
            node: VoiceNode::Speech,
            done,
        });
        Ok(())
    }

    fn play_effect(&mut self, sound: &Sound) -> Result<(), AudioError> {
        let source = self.source(sound)?;
        source.start().map_err(js_err)
    }

    fn stop_voice(&mut self) {
        let Some(voice) = self.voice.take() else {
            return;
        };
        if let Some(done) = voice.done.borrow_mut().take() {
            done.finish(PlaybackOutcome::Stopped);
        }
        match voice.node {
            VoiceNode::Source(source) => {
                let _ = source.stop();
            }
            VoiceNode::Speech => {
                if let Some(synth) = &self.synth {
                    synth.cancel();
                }
            }
            VoiceNode::Clip(audio) => {
                let _ = audio.pause();
            }
        }
    }

    fn release(&mut self) {
        self.stop_voice();
        self.buffers.clear();
        if let Some(ctx) = self.ctx.take() {
            let _ = ctx.close();
        }
        self.synth = None;
    }
}
