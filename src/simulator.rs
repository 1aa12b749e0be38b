//! Driving-loop facade
//!
//! Owns the simulation context, the obstacle ring and the voice arbiter,
//! and routes accepted hits to the audio backend once setup completes.

use crate::audio::{AudioBackend, AudioError, AudioState};
use crate::config::SimulationConfig;
use crate::samples::SampleBank;
use crate::sim::{HitPayload, ObstacleRing, SimContext, advance};
use crate::voice::VoiceArbiter;

/// What happened during one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Hits that passed the gate
    pub accepted: usize,
    /// Hits that started a voice
    pub voiced: usize,
    /// Hits dropped because audio was not running
    pub dropped: usize,
    /// Voices cut short by mono stealing
    pub stolen: usize,
}

/// Fan simulation wired to an audio backend
pub struct Simulator<B: AudioBackend> {
    ctx: SimContext,
    obstacles: ObstacleRing,
    arbiter: VoiceArbiter,
    samples: SampleBank,
    audio: AudioState<B>,
}

impl<B: AudioBackend> Simulator<B> {
    pub fn new(config: SimulationConfig, obstacles: ObstacleRing) -> Self {
        Self {
            ctx: SimContext::new(config),
            obstacles,
            arbiter: VoiceArbiter::new(),
            samples: SampleBank::new(),
            audio: AudioState::Pending,
        }
    }

    /// Complete the one-shot audio setup
    ///
    /// On failure the audio state becomes `Failed` and the error is
    /// returned; simulation state is left untouched either way.
    pub fn attach_audio(&mut self, result: Result<B, AudioError>) -> Result<(), AudioError> {
        if self.audio.is_running() {
            log::warn!("Audio already running, ignoring second setup");
            return Ok(());
        }
        match result {
            Ok(backend) => {
                self.audio = AudioState::Running(backend);
                log::info!("Audio running");
                Ok(())
            }
            Err(e) => {
                log::warn!("Audio setup failed: {}", e);
                self.audio = AudioState::Failed(e.clone());
                Err(e)
            }
        }
    }

    /// Advance by one frame of `dt` seconds
    pub fn frame(&mut self, dt: f64) -> FrameReport {
        let mut report = FrameReport::default();

        if let AudioState::Running(backend) = &mut self.audio {
            backend.update(dt);
            for id in backend.drain_finished() {
                self.arbiter.ended(id);
            }
        }

        let mut hits: Vec<HitPayload> = Vec::new();
        report.accepted = advance(&mut self.ctx, &self.obstacles, dt, &mut |p: HitPayload| {
            hits.push(p)
        });

        let Some(backend) = self.audio.backend_mut() else {
            if !hits.is_empty() {
                log::trace!("Dropping {} hits, audio not running", hits.len());
            }
            report.dropped = hits.len();
            return report;
        };

        let mode = self.ctx.config().voice_mode;
        let tail = self.ctx.config().release_tail_secs();
        for hit in &hits {
            let kind = self.samples.resolve(hit.obstacle.sample_index);
            let now = backend.now();
            if let Some(old) = self.arbiter.trigger(hit.obstacle_index, kind, mode, now) {
                backend.release_voice(old, tail);
                report.stolen += 1;
            }
            if let Some(handle) = backend.start_voice(kind, hit) {
                self.arbiter.started(hit.obstacle_index, kind, handle);
                report.voiced += 1;
            }
        }

        report
    }

    /// Release every sounding voice (e.g. when the fan is stopped)
    pub fn silence(&mut self) {
        let Some(backend) = self.audio.backend_mut() else {
            return;
        };
        let tail = self.ctx.config().release_tail_secs();
        for id in self.arbiter.sounding(backend.now()) {
            backend.release_voice(id, tail);
        }
        self.arbiter.clear();
    }

    pub fn context(&self) -> &SimContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut SimContext {
        &mut self.ctx
    }

    pub fn config(&self) -> &SimulationConfig {
        self.ctx.config()
    }

    pub fn set_config(&mut self, config: SimulationConfig) {
        self.ctx.set_config(config);
    }

    pub fn obstacles(&self) -> &ObstacleRing {
        &self.obstacles
    }

    /// Obstacle edits; count and angle changes resync before the next pass
    pub fn obstacles_mut(&mut self) -> &mut ObstacleRing {
        &mut self.obstacles
    }

    pub fn set_samples(&mut self, samples: SampleBank) {
        self.samples = samples;
    }

    pub fn samples(&self) -> &SampleBank {
        &self.samples
    }

    pub fn arbiter(&self) -> &VoiceArbiter {
        &self.arbiter
    }

    pub fn audio(&self) -> &AudioState<B> {
        &self.audio
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.audio.backend_mut()
    }

    /// Reset per-pair zone state for the current geometry
    pub fn reset_hit_zones(&mut self) {
        self.ctx.reset_hit_zones(&self.obstacles);
    }

    pub fn reset_wobble_phases(&mut self) {
        self.ctx.reset_wobble_phases();
    }
}
