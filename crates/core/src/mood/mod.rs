//! Mood lookup: scales, timbres and the per-category profile table.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{MoodMusicError, Result};

/// Label of the mandatory fallback profile.
pub const DEFAULT_MOOD: &str = "default";

/// Shortest note the sequencer will schedule.
pub const MIN_NOTE_DURATION: Duration = Duration::from_millis(1);

const MAJOR: [f32; 7] = [261.63, 293.66, 329.63, 349.23, 392.00, 440.00, 493.88];
const MINOR: [f32; 7] = [261.63, 277.18, 311.13, 349.23, 392.00, 415.30, 466.16];

/// Waveform shape used for every note of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timbre {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// One octave of a named mode, lowest pitch first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scale {
    name: String,
    frequencies: Vec<f32>,
}

impl Scale {
    /// Builds a scale, rejecting empty octaves and non-audible pitches.
    pub fn new(name: impl Into<String>, frequencies: Vec<f32>) -> Result<Self> {
        let name = name.into();
        if frequencies.is_empty() {
            return Err(MoodMusicError::invalid_table(format!(
                "scale `{name}` has no pitches"
            )));
        }
        if let Some(bad) = frequencies.iter().find(|f| !f.is_finite() || **f <= 0.0) {
            return Err(MoodMusicError::invalid_table(format!(
                "scale `{name}` contains invalid frequency {bad}"
            )));
        }
        Ok(Self { name, frequencies })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frequencies(&self) -> &[f32] {
        &self.frequencies
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Frequency of an arbitrary degree, wrapped into the octave.
    pub fn frequency(&self, degree: i64) -> f32 {
        let index = degree.rem_euclid(self.frequencies.len() as i64) as usize;
        self.frequencies[index]
    }
}

/// Scale, timbre, tempo and melodic pattern associated with a category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodProfile {
    pub label: String,
    pub scale: Scale,
    pub instrument: Timbre,
    pub note_duration_seconds: f32,
    pub pattern: Vec<i32>,
}

impl MoodProfile {
    /// Note length, never shorter than [`MIN_NOTE_DURATION`].
    pub fn note_duration(&self) -> Duration {
        Duration::try_from_secs_f32(self.note_duration_seconds)
            .unwrap_or(MIN_NOTE_DURATION)
            .max(MIN_NOTE_DURATION)
    }
}

/// Serialised form of a single mood entry. The scale is referenced by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub scale: String,
    pub instrument: Timbre,
    /// Note duration in seconds.
    pub tempo: f32,
    pub pattern: Vec<i32>,
}

impl MoodEntry {
    fn new(scale: &str, instrument: Timbre, tempo: f32, pattern: &[i32]) -> Self {
        Self {
            scale: scale.to_string(),
            instrument,
            tempo,
            pattern: pattern.to_vec(),
        }
    }
}

/// Serialised form of the whole mood table as found in configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodTableConfig {
    pub scales: BTreeMap<String, Vec<f32>>,
    pub moods: BTreeMap<String, MoodEntry>,
}

impl MoodTableConfig {
    pub fn builtin() -> Self {
        let scales = BTreeMap::from([
            ("major".to_string(), MAJOR.to_vec()),
            ("minor".to_string(), MINOR.to_vec()),
        ]);

        let moods = BTreeMap::from([
            (
                "Politics".to_string(),
                MoodEntry::new("minor", Timbre::Sawtooth, 0.30, &[6, 4, 2, 0, 5, 3, 1]),
            ),
            (
                "World".to_string(),
                MoodEntry::new("minor", Timbre::Sine, 0.35, &[6, 4, 5, 3, 2, 1]),
            ),
            (
                "Business".to_string(),
                MoodEntry::new("major", Timbre::Sine, 0.25, &[0, 2, 4, 5, 6, 5, 4]),
            ),
            (
                "Technology".to_string(),
                MoodEntry::new("major", Timbre::Square, 0.25, &[0, 4, 5, 2, 6]),
            ),
            (
                "Health".to_string(),
                MoodEntry::new("major", Timbre::Sine, 0.40, &[0, 2, 4, 5, 4, 2, 0]),
            ),
            (
                DEFAULT_MOOD.to_string(),
                MoodEntry::new("major", Timbre::Sine, 0.30, &[0, 2, 4, 5]),
            ),
        ]);

        Self { scales, moods }
    }
}

impl Default for MoodTableConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Immutable lookup table from category or subgenre label to profile.
#[derive(Debug, Clone)]
pub struct MoodTable {
    profiles: HashMap<String, MoodProfile>,
    default: MoodProfile,
}

impl MoodTable {
    pub fn builtin() -> Self {
        Self::from_config(&MoodTableConfig::builtin()).expect("built-in mood table is valid")
    }

    /// Validates a configured table and resolves scale references.
    pub fn from_config(config: &MoodTableConfig) -> Result<Self> {
        let mut scales = HashMap::with_capacity(config.scales.len());
        for (name, frequencies) in &config.scales {
            scales.insert(name.as_str(), Scale::new(name.clone(), frequencies.clone())?);
        }

        let mut profiles = HashMap::with_capacity(config.moods.len());
        for (label, entry) in &config.moods {
            let scale = scales.get(entry.scale.as_str()).ok_or_else(|| {
                MoodMusicError::invalid_table(format!(
                    "mood `{label}` references unknown scale `{}`",
                    entry.scale
                ))
            })?;
            if entry.pattern.is_empty() {
                return Err(MoodMusicError::invalid_table(format!(
                    "mood `{label}` has an empty pattern"
                )));
            }
            match Duration::try_from_secs_f32(entry.tempo) {
                Ok(duration) if duration >= MIN_NOTE_DURATION => {}
                _ => {
                    return Err(MoodMusicError::invalid_table(format!(
                        "mood `{label}` has invalid tempo {}",
                        entry.tempo
                    )));
                }
            }

            profiles.insert(
                label.clone(),
                MoodProfile {
                    label: label.clone(),
                    scale: scale.clone(),
                    instrument: entry.instrument,
                    note_duration_seconds: entry.tempo,
                    pattern: entry.pattern.clone(),
                },
            );
        }

        let default = profiles.remove(DEFAULT_MOOD).ok_or_else(|| {
            MoodMusicError::invalid_table(format!("missing `{DEFAULT_MOOD}` mood"))
        })?;

        Ok(Self { profiles, default })
    }

    pub fn get(&self, label: &str) -> Option<&MoodProfile> {
        if label == DEFAULT_MOOD {
            return Some(&self.default);
        }
        self.profiles.get(label)
    }

    pub fn default_profile(&self) -> &MoodProfile {
        &self.default
    }

    /// Resolves a profile: exact subgenre match, then exact category match,
    /// then the default entry. Never fails.
    pub fn resolve_profile(&self, subgenre: Option<&str>, category: Option<&str>) -> &MoodProfile {
        subgenre
            .and_then(|label| self.get(label))
            .or_else(|| category.and_then(|label| self.get(label)))
            .unwrap_or(&self.default)
    }

    /// Labels of all non-default profiles, sorted.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        labels.sort_unstable();
        labels
    }
}

impl Default for MoodTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Sum of the UTF-16 code units of `title`. Order independent and collision
/// prone; kept as-is so the same titles keep producing the same melodies.
pub fn title_hash(title: &str) -> u64 {
    title.encode_utf16().map(u64::from).sum()
}

/// Starting pitch offset derived from the title.
pub fn resolve_start_offset(title: &str, scale: &Scale) -> usize {
    (title_hash(title) % scale.len() as u64) as usize
}
