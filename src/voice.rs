//! Voice arbitration per obstacle
//!
//! Each (obstacle, kind) pair owns a slot that is either idle or sounding.
//! In mono mode a new hit steals the sounding voice of its slot (fast
//! release, then the new voice starts). In poly mode voices overlap and
//! the slot only remembers the latest one.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::VoiceMode;

/// Sound source behind a voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoiceKind {
    /// A loaded sample, by bank index
    Sample(usize),
    /// Synthesized noise when no sample is available
    Noise,
}

impl VoiceKind {
    /// Slot class: all sample voices of an obstacle share one slot
    fn class(&self) -> SlotClass {
        match self {
            VoiceKind::Sample(_) => SlotClass::Sample,
            VoiceKind::Noise => SlotClass::Noise,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SlotClass {
    Sample,
    Noise,
}

/// Backend-assigned identifier of an in-flight voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoiceId(pub u64);

/// A started voice and when it ends on its own
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceHandle {
    pub id: VoiceId,
    /// Backend clock time at which the voice's decay completes
    pub ends_at: f64,
}

/// Slot state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SlotState {
    #[default]
    Idle,
    Sounding(VoiceHandle),
}

/// Inputs to a slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotEvent {
    /// An accepted hit is about to start a voice in this slot
    Trigger { mode: VoiceMode, now: f64 },
    /// The backend started the new voice
    Started(VoiceHandle),
    /// A voice finished (naturally or after a forced release)
    Ended(VoiceId),
    /// Explicit stop request
    Stop { now: f64 },
}

/// Side effect requested by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotCommand {
    /// Fade `voice` out over the release tail, then stop it
    Release(VoiceId),
}

impl SlotState {
    /// Voice still audible at `now`; stale handles count as idle
    pub fn live_voice(&self, now: f64) -> Option<VoiceId> {
        match self {
            SlotState::Sounding(handle) if handle.ends_at > now => Some(handle.id),
            _ => None,
        }
    }

    /// Pure transition function
    pub fn transition(self, event: SlotEvent) -> (SlotState, Option<SlotCommand>) {
        match event {
            SlotEvent::Trigger { mode, now } => match mode {
                VoiceMode::Mono => match self.live_voice(now) {
                    Some(id) => (SlotState::Idle, Some(SlotCommand::Release(id))),
                    None => (SlotState::Idle, None),
                },
                VoiceMode::Poly => (self, None),
            },
            SlotEvent::Started(handle) => (SlotState::Sounding(handle), None),
            SlotEvent::Ended(id) => match self {
                SlotState::Sounding(handle) if handle.id == id => (SlotState::Idle, None),
                other => (other, None),
            },
            SlotEvent::Stop { now } => match self.live_voice(now) {
                Some(id) => (SlotState::Idle, Some(SlotCommand::Release(id))),
                None => (SlotState::Idle, None),
            },
        }
    }
}

/// Slots for every (obstacle, kind) pair that has sounded
#[derive(Debug, Clone, Default)]
pub struct VoiceArbiter {
    slots: HashMap<(usize, SlotClass), SlotState>,
}

impl VoiceArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply(&mut self, key: (usize, SlotClass), event: SlotEvent) -> Option<SlotCommand> {
        let slot = self.slots.entry(key).or_default();
        let (next, command) = slot.transition(event);
        *slot = next;
        command
    }

    /// Prepare `obstacle` for a new voice; returns a voice to release first
    pub fn trigger(
        &mut self,
        obstacle: usize,
        kind: VoiceKind,
        mode: VoiceMode,
        now: f64,
    ) -> Option<VoiceId> {
        match self.apply((obstacle, kind.class()), SlotEvent::Trigger { mode, now }) {
            Some(SlotCommand::Release(id)) => Some(id),
            None => None,
        }
    }

    /// Record the voice the backend started for `obstacle`
    pub fn started(&mut self, obstacle: usize, kind: VoiceKind, handle: VoiceHandle) {
        self.apply((obstacle, kind.class()), SlotEvent::Started(handle));
    }

    /// A voice finished; its slot returns to idle if it still points at it
    pub fn ended(&mut self, id: VoiceId) {
        for slot in self.slots.values_mut() {
            let (next, _) = slot.transition(SlotEvent::Ended(id));
            *slot = next;
        }
    }

    /// Stop whatever `obstacle` is sounding; no-op on idle or stale slots
    pub fn stop(&mut self, obstacle: usize, kind: VoiceKind, now: f64) -> Option<VoiceId> {
        let key = (obstacle, kind.class());
        let slot = self.slots.get_mut(&key)?;
        let (next, command) = slot.transition(SlotEvent::Stop { now });
        *slot = next;
        command.map(|SlotCommand::Release(id)| id)
    }

    /// Voices still audible at `now`, one per sounding slot
    pub fn sounding(&self, now: f64) -> Vec<VoiceId> {
        let mut ids: Vec<VoiceId> = self
            .slots
            .values()
            .filter_map(|slot| slot.live_voice(now))
            .collect();
        ids.sort();
        ids
    }

    pub fn state(&self, obstacle: usize, kind: VoiceKind) -> SlotState {
        self.slots
            .get(&(obstacle, kind.class()))
            .copied()
            .unwrap_or_default()
    }

    /// Drop every slot (e.g. when the obstacle list is rebuilt)
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
