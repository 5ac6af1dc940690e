use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::mood::{MoodTable, MoodTableConfig};
use crate::{MoodMusicError, Result};

/// Longest fade applied when playback stops.
pub const MAX_STOP_FADE_SECONDS: f32 = 5.0;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    /// Replaces the built-in mood table when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moods: Option<MoodTableConfig>,
}

impl AppConfig {
    /// Reads a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        // Fail early rather than on first playback.
        config.audio.validate()?;
        config.mood_table()?;
        Ok(config)
    }

    pub fn mood_table(&self) -> Result<MoodTable> {
        match &self.moods {
            Some(moods) => MoodTable::from_config(moods),
            None => Ok(MoodTable::builtin()),
        }
    }
}

/// Configuration specific to tone generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Envelope peak, as a fraction of full scale.
    pub peak_gain: f32,
    /// Fade applied to the sounding note when playback stops.
    pub stop_fade_seconds: f32,
}

impl AudioConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(MoodMusicError::invalid_audio("sample_rate must be positive"));
        }
        if !(0.0..=1.0).contains(&self.peak_gain) {
            return Err(MoodMusicError::invalid_audio(format!(
                "peak_gain must be within 0..=1, got {}",
                self.peak_gain
            )));
        }
        if !(0.0..=MAX_STOP_FADE_SECONDS).contains(&self.stop_fade_seconds) {
            return Err(MoodMusicError::invalid_audio(format!(
                "stop_fade_seconds must be within 0..={MAX_STOP_FADE_SECONDS}, got {}",
                self.stop_fade_seconds
            )));
        }
        Ok(())
    }

    /// Stop fade, clamped to `0..=MAX_STOP_FADE_SECONDS`.
    pub fn stop_fade(&self) -> Duration {
        let seconds = if self.stop_fade_seconds.is_nan() {
            0.0
        } else {
            self.stop_fade_seconds.clamp(0.0, MAX_STOP_FADE_SECONDS)
        };
        Duration::from_secs_f32(seconds)
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            peak_gain: 0.5,
            stop_fade_seconds: 0.05,
        }
    }
}
