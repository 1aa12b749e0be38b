//! Sample bank
//!
//! The sample preparation tool writes `samples/manifest.json`: an array of
//! `{ "file": "...", "label": "..." }` entries. Obstacles refer to samples
//! by index into that list.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::voice::VoiceKind;

/// Default manifest location, relative to the asset root
pub const MANIFEST_PATH: &str = "samples/manifest.json";

/// One prepared sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleEntry {
    /// File name inside the samples directory
    pub file: String,
    pub label: String,
}

/// Ordered list of prepared samples
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleBank {
    pub entries: Vec<SampleEntry>,
}

impl SampleBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_manifest_json(json: &str) -> Result<Self, ConfigError> {
        let bank: SampleBank = serde_json::from_str(json)?;
        log::info!("Loaded sample manifest with {} entries", bank.entries.len());
        Ok(bank)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SampleEntry> {
        self.entries.get(index)
    }

    /// Voice kind for an obstacle's sample index
    ///
    /// Negative indices and indices with no loaded sample fall back to noise.
    pub fn resolve(&self, sample_index: i32) -> VoiceKind {
        match usize::try_from(sample_index) {
            Ok(index) if index < self.entries.len() => VoiceKind::Sample(index),
            _ => VoiceKind::Noise,
        }
    }

    /// Human-readable name for an obstacle's sample
    pub fn label(&self, sample_index: i32) -> &str {
        match self.resolve(sample_index) {
            VoiceKind::Sample(index) => self.get(index).map_or("Noise", |e| e.label.as_str()),
            VoiceKind::Noise => "Noise",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"[
  { "file": "clank.wav", "label": "clank" },
  { "file": "tick.wav", "label": "tick" }
]"#;

    #[test]
    fn test_parse_manifest() {
        let bank = SampleBank::from_manifest_json(MANIFEST).unwrap();
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.get(1).unwrap().file, "tick.wav");
        assert_eq!(bank.label(0), "clank");
    }

    #[test]
    fn test_resolve_falls_back_to_noise() {
        let bank = SampleBank::from_manifest_json(MANIFEST).unwrap();
        assert_eq!(bank.resolve(1), VoiceKind::Sample(1));
        assert_eq!(bank.resolve(-1), VoiceKind::Noise);
        assert_eq!(bank.resolve(2), VoiceKind::Noise);
        assert_eq!(SampleBank::new().resolve(0), VoiceKind::Noise);
        assert_eq!(bank.label(-1), "Noise");
        assert_eq!(bank.label(2), "Noise");
        assert_eq!(SampleBank::new().label(0), "Noise");
    }

    #[test]
    fn test_bad_manifest() {
        assert!(SampleBank::from_manifest_json(r#"{ "file": "x" }"#).is_err());
    }
}
