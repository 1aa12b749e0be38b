//! End-to-end voicing through the simulator with a recording backend

use std::collections::HashMap;

use vent_fan_beat::audio::{AudioBackend, AudioError};
use vent_fan_beat::samples::SampleBank;
use vent_fan_beat::sim::{HitPayload, Obstacle, ObstacleRing};
use vent_fan_beat::voice::{VoiceHandle, VoiceId, VoiceKind};
use vent_fan_beat::{SimulationConfig, Simulator, VoiceMode};

const DT: f64 = 1.0 / 60.0;

/// Voices ring for `voice_secs`; records everything it is asked to do
#[derive(Default)]
struct RecordingBackend {
    clock: f64,
    voice_secs: f64,
    next_id: u64,
    live: HashMap<VoiceId, f64>,
    started: Vec<(VoiceKind, HitPayload)>,
    released: Vec<VoiceId>,
    max_overlap: usize,
}

impl RecordingBackend {
    fn new(voice_secs: f64) -> Self {
        Self {
            voice_secs,
            ..Default::default()
        }
    }
}

impl AudioBackend for RecordingBackend {
    fn now(&self) -> f64 {
        self.clock
    }

    fn update(&mut self, dt: f64) {
        self.clock += dt;
    }

    fn start_voice(&mut self, kind: VoiceKind, hit: &HitPayload) -> Option<VoiceHandle> {
        self.next_id += 1;
        let id = VoiceId(self.next_id);
        let ends_at = self.clock + self.voice_secs;
        self.live.insert(id, ends_at);
        self.started.push((kind, hit.clone()));
        let clock = self.clock;
        let audible = self.live.values().filter(|&&end| end > clock).count();
        self.max_overlap = self.max_overlap.max(audible);
        Some(VoiceHandle { id, ends_at })
    }

    fn release_voice(&mut self, voice: VoiceId, tail_secs: f64) {
        if let Some(end) = self.live.get_mut(&voice) {
            *end = end.min(self.clock + tail_secs);
            self.released.push(voice);
        }
    }

    fn drain_finished(&mut self) -> Vec<VoiceId> {
        let clock = self.clock;
        let done: Vec<VoiceId> = self
            .live
            .iter()
            .filter(|(_, end)| **end <= clock)
            .map(|(id, _)| *id)
            .collect();
        for id in &done {
            self.live.remove(id);
        }
        done
    }
}

fn one_obstacle(sample_index: i32) -> ObstacleRing {
    let mut ring = ObstacleRing::new();
    ring.push(Obstacle::new(0.0).with_sample(sample_index));
    ring
}

fn run(sim: &mut Simulator<RecordingBackend>, secs: f64) {
    for _ in 0..(secs / DT).round() as usize {
        sim.frame(DT);
    }
}

#[test]
fn mono_keeps_one_voice_per_obstacle() {
    let config = SimulationConfig {
        hit_threshold: 0.0,
        voice_mode: VoiceMode::Mono,
        release_tail_ms: 20.0,
        ..Default::default()
    };
    let mut sim = Simulator::new(config, one_obstacle(-1));
    // Voices far longer than the gap between blade passes
    sim.attach_audio(Ok(RecordingBackend::new(5.0))).unwrap();
    run(&mut sim, 2.0);

    let backend = sim.backend_mut().unwrap();
    assert!(backend.started.len() >= 15);
    // Every hit after the first cut off its predecessor
    assert_eq!(backend.released.len(), backend.started.len() - 1);
    // Old voice is still in its 20 ms tail when the new one starts
    assert!(backend.max_overlap <= 2);
}

#[test]
fn poly_lets_voices_overlap() {
    let config = SimulationConfig {
        hit_threshold: 0.0,
        voice_mode: VoiceMode::Poly,
        ..Default::default()
    };
    let mut sim = Simulator::new(config, one_obstacle(-1));
    sim.attach_audio(Ok(RecordingBackend::new(5.0))).unwrap();
    run(&mut sim, 2.0);

    let backend = sim.backend_mut().unwrap();
    assert!(backend.released.is_empty());
    assert!(backend.max_overlap >= 10);
}

#[test]
fn naturally_ended_voice_is_not_stopped_again() {
    let config = SimulationConfig {
        hit_threshold: 0.0,
        voice_mode: VoiceMode::Mono,
        ..Default::default()
    };
    let mut sim = Simulator::new(config, one_obstacle(-1));
    // Voices end well before the next blade arrives (~0.1 s apart)
    sim.attach_audio(Ok(RecordingBackend::new(0.02))).unwrap();
    run(&mut sim, 2.0);

    let backend = sim.backend_mut().unwrap();
    assert!(!backend.started.is_empty());
    assert!(backend.released.is_empty());
}

#[test]
fn sample_index_resolves_through_bank() {
    let bank = SampleBank::from_manifest_json(r#"[{ "file": "a.wav", "label": "a" }]"#).unwrap();

    let mut sim = Simulator::new(SimulationConfig::default(), one_obstacle(0));
    sim.set_samples(bank.clone());
    sim.attach_audio(Ok(RecordingBackend::new(0.1))).unwrap();
    run(&mut sim, 1.0);
    let backend = sim.backend_mut().unwrap();
    assert!(backend.started.iter().all(|(k, _)| *k == VoiceKind::Sample(0)));

    // Index past the bank falls back to noise
    let mut sim = Simulator::new(SimulationConfig::default(), one_obstacle(3));
    sim.set_samples(bank);
    sim.attach_audio(Ok(RecordingBackend::new(0.1))).unwrap();
    run(&mut sim, 1.0);
    let backend = sim.backend_mut().unwrap();
    assert!(!backend.started.is_empty());
    assert!(backend.started.iter().all(|(k, _)| *k == VoiceKind::Noise));
}

#[test]
fn payloads_carry_obstacle_and_normalized_values() {
    let config = SimulationConfig {
        hit_threshold: 0.2,
        impact_dynamics: 0.5,
        soft_hit_low_cut_bias: 0.8,
        ..Default::default()
    };
    let mut ring = one_obstacle(-1);
    ring.set_volume(0, 1.2);
    let mut sim = Simulator::new(config, ring);
    sim.attach_audio(Ok(RecordingBackend::new(0.1))).unwrap();
    run(&mut sim, 1.0);

    let backend = sim.backend_mut().unwrap();
    assert!(!backend.started.is_empty());
    for (_, hit) in &backend.started {
        assert!(hit.raw_strength >= 0.2);
        assert!((0.0..=1.0).contains(&hit.strength));
        assert!((0.5..=1.0).contains(&hit.impact_strength));
        assert!((0.0..=0.8).contains(&hit.soft_low_cut_factor));
        assert_eq!(hit.obstacle.volume, 1.2);
    }
}

#[test]
fn setup_failure_then_retry() {
    let mut sim: Simulator<RecordingBackend> =
        Simulator::new(SimulationConfig::default(), one_obstacle(-1));
    let err = sim.attach_audio(Err(AudioError::ContextUnavailable("no device".into())));
    assert!(err.is_err());
    run(&mut sim, 0.5);
    assert!(sim.backend_mut().is_none());

    sim.attach_audio(Ok(RecordingBackend::new(0.1))).unwrap();
    run(&mut sim, 1.0);
    assert!(!sim.backend_mut().unwrap().started.is_empty());
}
