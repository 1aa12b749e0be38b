//! Audio-rendering seam
//!
//! The simulation never synthesizes sound itself. It hands resolved hits
//! to an `AudioBackend`, which owns the actual voices. Backend setup is a
//! one-shot (possibly asynchronous) step; until it completes, hits are
//! dropped rather than queued.

#[cfg(target_arch = "wasm32")]
pub mod web;

use thiserror::Error;

use crate::sim::HitPayload;
use crate::voice::{VoiceHandle, VoiceId, VoiceKind};

/// Failure to bring up audio output
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    #[error("audio output context unavailable: {0}")]
    ContextUnavailable(String),

    #[error("audio backend failed: {0}")]
    Backend(String),
}

/// Something that can render hit voices
pub trait AudioBackend {
    /// Backend clock (seconds)
    fn now(&self) -> f64;

    /// Called once per frame before any hits are delivered
    fn update(&mut self, _dt: f64) {}

    /// Start a voice for `hit`; `None` if the backend could not start one
    fn start_voice(&mut self, kind: VoiceKind, hit: &HitPayload) -> Option<VoiceHandle>;

    /// Fade `voice` out over `tail_secs`, then stop it
    ///
    /// Unknown or already finished voices are ignored.
    fn release_voice(&mut self, voice: VoiceId, tail_secs: f64);

    /// Voices that finished since the last call
    fn drain_finished(&mut self) -> Vec<VoiceId>;
}

/// One-shot audio setup state
#[derive(Debug, Default)]
pub enum AudioState<B> {
    /// Setup not completed yet
    #[default]
    Pending,
    Running(B),
    Failed(AudioError),
}

impl<B> AudioState<B> {
    pub fn is_running(&self) -> bool {
        matches!(self, AudioState::Running(_))
    }

    pub fn backend(&self) -> Option<&B> {
        match self {
            AudioState::Running(b) => Some(b),
            _ => None,
        }
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        match self {
            AudioState::Running(b) => Some(b),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&AudioError> {
        match self {
            AudioState::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Default voice length used by the headless backend (seconds)
pub const NULL_VOICE_SECS: f64 = 0.25;

#[derive(Debug, Clone, Copy)]
struct NullVoice {
    id: VoiceId,
    ends_at: f64,
}

/// Silent backend with a frame-driven clock
///
/// Tracks voice lifetimes like a real renderer would, for headless runs.
#[derive(Debug, Clone, Default)]
pub struct NullBackend {
    clock: f64,
    next_id: u64,
    voices: Vec<NullVoice>,
    pub voices_started: u64,
    pub voices_released: u64,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Voices not yet finished
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }
}

impl AudioBackend for NullBackend {
    fn now(&self) -> f64 {
        self.clock
    }

    fn update(&mut self, dt: f64) {
        if dt > 0.0 && dt.is_finite() {
            self.clock += dt;
        }
    }

    fn start_voice(&mut self, _kind: VoiceKind, hit: &HitPayload) -> Option<VoiceHandle> {
        self.next_id += 1;
        let id = VoiceId(self.next_id);
        // Harder hits ring longer
        let length = NULL_VOICE_SECS * (0.5 + 0.5 * hit.impact_strength as f64);
        let ends_at = self.clock + length;
        self.voices.push(NullVoice { id, ends_at });
        self.voices_started += 1;
        Some(VoiceHandle { id, ends_at })
    }

    fn release_voice(&mut self, voice: VoiceId, tail_secs: f64) {
        let clock = self.clock;
        if let Some(v) = self
            .voices
            .iter_mut()
            .find(|v| v.id == voice && v.ends_at > clock)
        {
            v.ends_at = v.ends_at.min(clock + tail_secs.max(0.0));
            self.voices_released += 1;
        }
    }

    fn drain_finished(&mut self) -> Vec<VoiceId> {
        let clock = self.clock;
        let finished: Vec<VoiceId> = self
            .voices
            .iter()
            .filter(|v| v.ends_at <= clock)
            .map(|v| v.id)
            .collect();
        self.voices.retain(|v| v.ends_at > clock);
        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Obstacle;

    fn hit() -> HitPayload {
        HitPayload {
            raw_strength: 0.5,
            strength: 0.5,
            impact_strength: 1.0,
            soft_low_cut_factor: 0.0,
            blade_index: 0,
            obstacle_index: 0,
            obstacle: Obstacle::new(0.0),
            sim_time: 0.0,
        }
    }

    #[test]
    fn test_null_backend_voice_lifetime() {
        let mut backend = NullBackend::new();
        let handle = backend.start_voice(VoiceKind::Noise, &hit()).unwrap();
        assert!((handle.ends_at - NULL_VOICE_SECS).abs() < 1e-12);
        assert_eq!(backend.active_voices(), 1);

        backend.update(0.1);
        assert!(backend.drain_finished().is_empty());
        backend.update(0.2);
        assert_eq!(backend.drain_finished(), vec![handle.id]);
        assert_eq!(backend.active_voices(), 0);
    }

    #[test]
    fn test_release_shortens_voice() {
        let mut backend = NullBackend::new();
        let handle = backend.start_voice(VoiceKind::Noise, &hit()).unwrap();
        backend.release_voice(handle.id, 0.03);
        assert_eq!(backend.voices_released, 1);
        backend.update(0.05);
        assert_eq!(backend.drain_finished(), vec![handle.id]);

        // Releasing a finished voice is a no-op
        backend.release_voice(handle.id, 0.03);
        backend.release_voice(VoiceId(999), 0.03);
        assert_eq!(backend.voices_released, 1);
    }

    #[test]
    fn test_audio_state_accessors() {
        let mut state: AudioState<NullBackend> = AudioState::default();
        assert!(!state.is_running());
        assert!(state.backend_mut().is_none());

        state = AudioState::Failed(AudioError::ContextUnavailable("blocked".into()));
        assert!(state.error().is_some());

        state = AudioState::Running(NullBackend::new());
        assert!(state.is_running());
        assert!(state.backend().is_some());
    }
}
