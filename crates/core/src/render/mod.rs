use serde::{Deserialize, Serialize};

use crate::audio::OfflineSynth;
use crate::config::AppConfig;
use crate::melody::{Melody, MelodyStep};
use crate::sequencer::MelodySequencer;
use crate::timeline::VirtualTimer;
use crate::{MoodMusicError, Result};

/// Sequencer wired to the in-memory synth and virtual time.
pub type OfflineSequencer = MelodySequencer<OfflineSynth, VirtualTimer>;

/// What to play: the content title plus the labels used for profile lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MelodyRequest {
    pub title: String,
    pub subgenre: Option<String>,
    pub category: Option<String>,
}

impl MelodyRequest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subgenre: None,
            category: None,
        }
    }

    pub fn subgenre(mut self, subgenre: impl Into<String>) -> Self {
        self.subgenre = Some(subgenre.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Resolves the melody this request would play without producing audio.
    pub fn melody(&self, config: &AppConfig) -> Result<Melody> {
        let table = config.mood_table()?;
        let profile = table
            .resolve_profile(self.subgenre.as_deref(), self.category.as_deref())
            .clone();
        Ok(Melody::new(profile, &self.title))
    }
}

/// Output of an offline render.
#[derive(Debug, Clone)]
pub struct RenderedAudio {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
    pub melody: Melody,
    pub notes_played: usize,
}

impl RenderedAudio {
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate.max(1))
    }

    /// The notes that were started, in order.
    pub fn steps(&self) -> Vec<MelodyStep> {
        self.melody.steps().take(self.notes_played).collect()
    }
}

/// Builds an idle sequencer for offline rendering from `config`.
pub fn offline_sequencer(config: &AppConfig) -> Result<OfflineSequencer> {
    let table = config.mood_table()?;
    Ok(MelodySequencer::with_config(
        table,
        config.audio.clone(),
        OfflineSynth::new(config.audio.sample_rate),
        VirtualTimer::new(),
    ))
}

/// Fires every timer due up to `seconds`, rendering audio in between.
pub fn run_until(sequencer: &mut OfflineSequencer, seconds: f64) {
    while let Some(due) = sequencer.timer().next_due() {
        if due > seconds {
            break;
        }
        sequencer.backend_mut().advance_to(due);
        if let Some(token) = sequencer.timer_mut().pop_due(due) {
            sequencer.on_timer(token);
        }
    }
    sequencer.backend_mut().advance_to(seconds);
    sequencer.timer_mut().advance_to(seconds);
}

/// Plays `request` for `seconds` of virtual time, then stops and lets the
/// final note fade out.
pub fn render_melody(
    request: &MelodyRequest,
    config: &AppConfig,
    seconds: f64,
) -> Result<RenderedAudio> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(MoodMusicError::msg(format!(
            "render length must be positive, got {seconds}"
        )));
    }

    config.audio.validate()?;
    let mut sequencer = offline_sequencer(config)?;
    sequencer.start(
        &request.title,
        request.subgenre.as_deref(),
        request.category.as_deref(),
    );
    let melody = sequencer
        .melody()
        .cloned()
        .ok_or_else(|| MoodMusicError::backend("offline synth refused to start"))?;

    tracing::info!(
        title = %request.title,
        profile = %melody.profile().label,
        seconds,
        "rendering melody"
    );

    run_until(&mut sequencer, seconds);
    sequencer.stop();
    let tail = seconds + config.audio.stop_fade().as_secs_f64();
    sequencer.backend_mut().advance_to(tail);

    let (synth, _timer) = sequencer.into_parts();
    let notes_played = synth.started_voices();
    Ok(RenderedAudio {
        sample_rate: synth.sample_rate(),
        samples: synth.into_samples(),
        melody,
        notes_played,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioConfig;

    fn config() -> AppConfig {
        AppConfig {
            audio: AudioConfig {
                sample_rate: 8_000,
                ..AudioConfig::default()
            },
            moods: None,
        }
    }

    #[test]
    fn renders_one_note_per_tempo_step() {
        let request = MelodyRequest::new("Economy Grows").category("Business");
        let rendered = render_melody(&request, &config(), 1.0).unwrap();

        // notes at 0.0, 0.25, 0.5, 0.75 and 1.0
        assert_eq!(rendered.notes_played, 5);
        assert_eq!(rendered.steps()[0].frequency, 392.00);
        assert!((rendered.duration_seconds() - 1.05).abs() < 1e-3);
        assert!(rendered.samples.iter().any(|s| s.abs() > 0.1));
    }

    #[test]
    fn rendering_is_deterministic() {
        let request = MelodyRequest::new("Markets Rally").subgenre("Technology");
        let a = render_melody(&request, &config(), 0.6).unwrap();
        let b = render_melody(&request, &config(), 0.6).unwrap();
        assert_eq!(a.samples, b.samples);
    }

    #[test]
    fn rejects_non_positive_lengths() {
        let request = MelodyRequest::new("x");
        assert!(render_melody(&request, &config(), 0.0).is_err());
        assert!(render_melody(&request, &config(), f64::NAN).is_err());
    }

    #[test]
    fn invalid_audio_settings_fail_before_rendering() {
        let mut zero_rate = config();
        zero_rate.audio.sample_rate = 0;
        let mut endless_fade = config();
        endless_fade.audio.stop_fade_seconds = 1e30;

        for config in [zero_rate, endless_fade] {
            let err = render_melody(&MelodyRequest::new("x"), &config, 1.0).unwrap_err();
            assert!(matches!(err, MoodMusicError::InvalidAudioConfig(_)));
        }
    }

    #[test]
    fn request_resolves_melody_without_audio() {
        let melody = MelodyRequest::new("")
            .category("UnknownCategory")
            .subgenre("UnknownGenre")
            .melody(&config())
            .unwrap();
        assert_eq!(melody.profile().label, "default");
        assert_eq!(melody.start_offset(), 0);
    }
}
