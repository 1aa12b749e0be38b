//! Web Audio backend
//!
//! Each voice is a buffer source (a decoded sample, or a shared noise
//! burst) through a high-pass biquad and a gain envelope. Impact drives
//! peak gain and decay; the low-cut factor drives the high-pass cutoff.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use web_sys::{
    AudioBuffer, AudioBufferSourceNode, AudioContext, AudioContextState, BiquadFilterType,
    GainNode,
};

use super::{AudioBackend, AudioError};
use crate::sim::HitPayload;
use crate::voice::{VoiceHandle, VoiceId, VoiceKind};

/// Length of the shared noise burst (seconds)
const NOISE_SECS: f32 = 0.5;
/// High-pass cutoff for the strongest hits (Hz)
const MIN_CUTOFF_HZ: f32 = 40.0;
/// Extra cutoff applied at a low-cut factor of 1 (Hz)
const LOW_CUT_SPAN_HZ: f32 = 2400.0;
/// Envelope floor for exponential ramps
const SILENCE: f32 = 0.001;

struct WebVoice {
    source: AudioBufferSourceNode,
    gain: GainNode,
    ends_at: f64,
}

/// Renders hit voices through an `AudioContext`
pub struct WebAudioBackend {
    ctx: AudioContext,
    master: GainNode,
    noise: AudioBuffer,
    samples: Vec<Option<AudioBuffer>>,
    voices: HashMap<VoiceId, WebVoice>,
    next_id: u64,
}

fn js_err(e: wasm_bindgen::JsValue) -> AudioError {
    AudioError::Backend(format!("{:?}", e))
}

impl WebAudioBackend {
    /// Acquire an output context and build the shared noise buffer
    ///
    /// Nothing is kept if any step fails.
    pub async fn initialize(master_volume: f32) -> Result<Self, AudioError> {
        let ctx = AudioContext::new()
            .map_err(|e| AudioError::ContextUnavailable(format!("{:?}", e)))?;

        let master = ctx.create_gain().map_err(js_err)?;
        master.gain().set_value(master_volume.clamp(0.0, 1.0));
        master
            .connect_with_audio_node(&ctx.destination())
            .map_err(js_err)?;

        let rate = ctx.sample_rate();
        let len = (rate * NOISE_SECS) as u32;
        let noise = ctx.create_buffer(1, len, rate).map_err(js_err)?;
        let mut rng = Pcg32::seed_from_u64(0xFA4);
        let data: Vec<f32> = (0..len).map(|_| rng.random_range(-1.0..=1.0)).collect();
        noise.copy_to_channel(&data, 0).map_err(js_err)?;

        // The context may start suspended; it is resumed on demand once the
        // page has seen a user gesture
        log::info!("Web Audio ready at {} Hz ({:?})", rate, ctx.state());
        Ok(Self {
            ctx,
            master,
            noise,
            samples: Vec::new(),
            voices: HashMap::new(),
            next_id: 0,
        })
    }

    /// Attach a decoded sample for bank index `index`
    pub fn set_sample(&mut self, index: usize, buffer: AudioBuffer) {
        if self.samples.len() <= index {
            self.samples.resize(index + 1, None);
        }
        self.samples[index] = Some(buffer);
    }

    /// Resume the context if the browser suspended it
    pub fn resume(&self) {
        if self.ctx.state() == AudioContextState::Suspended {
            let _ = self.ctx.resume();
        }
    }

    pub fn set_master_volume(&self, vol: f32) {
        self.master.gain().set_value(vol.clamp(0.0, 1.0));
    }

    fn buffer_for(&self, kind: VoiceKind) -> &AudioBuffer {
        match kind {
            VoiceKind::Sample(i) => self
                .samples
                .get(i)
                .and_then(|b| b.as_ref())
                .unwrap_or(&self.noise),
            VoiceKind::Noise => &self.noise,
        }
    }

    fn build_voice(&self, kind: VoiceKind, hit: &HitPayload) -> Result<WebVoice, AudioError> {
        let t = self.ctx.current_time();
        let impact = hit.impact_strength.clamp(0.0, 1.0);
        let peak = (impact * hit.obstacle.volume).max(SILENCE);
        let decay = match kind {
            VoiceKind::Sample(_) => self.buffer_for(kind).duration(),
            VoiceKind::Noise => 0.04 + 0.2 * impact as f64,
        };

        let source = self.ctx.create_buffer_source().map_err(js_err)?;
        source.set_buffer(Some(self.buffer_for(kind)));

        let filter = self.ctx.create_biquad_filter().map_err(js_err)?;
        filter.set_type(BiquadFilterType::Highpass);
        let cutoff = MIN_CUTOFF_HZ + LOW_CUT_SPAN_HZ * hit.soft_low_cut_factor.clamp(0.0, 1.0);
        filter.frequency().set_value(cutoff);

        let gain = self.ctx.create_gain().map_err(js_err)?;
        gain.gain().set_value_at_time(peak, t).map_err(js_err)?;
        gain.gain()
            .exponential_ramp_to_value_at_time(SILENCE, t + decay)
            .map_err(js_err)?;

        source.connect_with_audio_node(&filter).map_err(js_err)?;
        filter.connect_with_audio_node(&gain).map_err(js_err)?;
        gain.connect_with_audio_node(&self.master).map_err(js_err)?;

        source.start_with_when(t).map_err(js_err)?;
        source.stop_with_when(t + decay).map_err(js_err)?;

        Ok(WebVoice {
            source,
            gain,
            ends_at: t + decay,
        })
    }
}

impl AudioBackend for WebAudioBackend {
    fn now(&self) -> f64 {
        self.ctx.current_time()
    }

    fn start_voice(&mut self, kind: VoiceKind, hit: &HitPayload) -> Option<VoiceHandle> {
        self.resume();
        match self.build_voice(kind, hit) {
            Ok(voice) => {
                self.next_id += 1;
                let id = VoiceId(self.next_id);
                let handle = VoiceHandle {
                    id,
                    ends_at: voice.ends_at,
                };
                self.voices.insert(id, voice);
                Some(handle)
            }
            Err(e) => {
                log::warn!("Failed to start voice: {}", e);
                None
            }
        }
    }

    fn release_voice(&mut self, voice: VoiceId, tail_secs: f64) {
        let t = self.ctx.current_time();
        let Some(v) = self.voices.get_mut(&voice) else {
            return;
        };
        if v.ends_at <= t {
            return;
        }
        let end = t + tail_secs.max(0.0);
        let param = v.gain.gain();
        let current = param.value();
        param.cancel_scheduled_values(t).ok();
        param.set_value_at_time(current, t).ok();
        param.linear_ramp_to_value_at_time(0.0, end).ok();
        v.source.stop_with_when(end).ok();
        v.ends_at = end;
    }

    fn drain_finished(&mut self) -> Vec<VoiceId> {
        let t = self.ctx.current_time();
        let finished: Vec<VoiceId> = self
            .voices
            .iter()
            .filter(|(_, v)| v.ends_at <= t)
            .map(|(id, _)| *id)
            .collect();
        for id in &finished {
            if let Some(v) = self.voices.remove(id) {
                v.gain.disconnect().ok();
            }
        }
        finished
    }
}
