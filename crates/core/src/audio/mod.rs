//! Offline tone generation.
//!
//! [`OfflineSynth`] is a [`ToneBackend`] that renders voices into a mono
//! buffer as fast as possible. The driver advances it in lock step with a
//! [`crate::VirtualTimer`], so each tone starts at the sample the sequencer
//! asked for it.

use std::f32::consts::PI;
use std::time::Duration;

use crate::host::{Envelope, Readiness, Tone, ToneBackend, VoiceId};
use crate::mood::Timbre;
use crate::{MoodMusicError, Result};

/// Phase-accumulating oscillator for a single [`Timbre`].
#[derive(Debug, Clone)]
pub struct Oscillator {
    timbre: Timbre,
    phase: f32,
    increment: f32,
}

impl Oscillator {
    pub fn new(timbre: Timbre, frequency: f32, sample_rate: u32) -> Self {
        Self {
            timbre,
            phase: 0.0,
            increment: frequency / sample_rate as f32,
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        let sample = match self.timbre {
            Timbre::Sine => (self.phase * 2.0 * PI).sin(),
            Timbre::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Timbre::Sawtooth => (self.phase * 2.0) - 1.0,
            Timbre::Triangle => {
                if self.phase < 0.5 {
                    (self.phase * 4.0) - 1.0
                } else {
                    3.0 - (self.phase * 4.0)
                }
            }
        };

        self.phase += self.increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        sample
    }
}

#[derive(Debug, Clone, Copy)]
struct Fade {
    from_gain: f32,
    start: u64,
    length: u64,
}

#[derive(Debug, Clone)]
struct Voice {
    id: VoiceId,
    oscillator: Oscillator,
    envelope: Envelope,
    start: u64,
    end: u64,
    fade: Option<Fade>,
}

impl Voice {
    fn gain_at(&self, sample: u64, sample_rate: u32) -> f32 {
        if let Some(fade) = self.fade {
            let into = sample.saturating_sub(fade.start);
            if into >= fade.length {
                return 0.0;
            }
            return fade.from_gain * (1.0 - into as f32 / fade.length as f32);
        }
        let elapsed = sample.saturating_sub(self.start) as f64 / f64::from(sample_rate);
        self.envelope.gain_at(Duration::from_secs_f64(elapsed))
    }

    fn is_finished(&self, sample: u64) -> bool {
        if sample >= self.end {
            return true;
        }
        matches!(self.fade, Some(fade) if sample >= fade.start.saturating_add(fade.length))
    }
}

/// Ready-state behaviour of an [`OfflineSynth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartupMode {
    #[default]
    Immediate,
    /// Reports [`Readiness::Pending`] like a device that resumes lazily.
    Deferred,
    /// Refuses to prepare, as if output were blocked.
    Unavailable,
}

/// Mono software synthesiser that renders into memory.
#[derive(Debug)]
pub struct OfflineSynth {
    sample_rate: u32,
    startup: StartupMode,
    cursor: u64,
    voices: Vec<Voice>,
    samples: Vec<f32>,
    next_voice: u64,
    started_voices: usize,
}

impl OfflineSynth {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            startup: StartupMode::Immediate,
            cursor: 0,
            voices: Vec::new(),
            samples: Vec::new(),
            next_voice: 0,
            started_voices: 0,
        }
    }

    pub fn with_startup(mut self, startup: StartupMode) -> Self {
        self.startup = startup;
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn now_seconds(&self) -> f64 {
        self.cursor as f64 / f64::from(self.sample_rate.max(1))
    }

    /// Voices still producing sound at the current position.
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Total number of tones ever started.
    pub fn started_voices(&self) -> usize {
        self.started_voices
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Renders every sample up to `seconds`.
    pub fn advance_to(&mut self, seconds: f64) {
        let target = (seconds * f64::from(self.sample_rate)).round().max(0.0) as u64;
        while self.cursor < target {
            let mut mixed = 0.0f32;
            for voice in &mut self.voices {
                let gain = voice.gain_at(self.cursor, self.sample_rate);
                mixed += voice.oscillator.next_sample() * gain;
            }
            self.samples.push(mixed.clamp(-1.0, 1.0));
            self.cursor += 1;

            let cursor = self.cursor;
            self.voices.retain(|voice| !voice.is_finished(cursor));
        }
    }

    fn duration_samples(&self, duration: Duration) -> u64 {
        (duration.as_secs_f64() * f64::from(self.sample_rate)).round() as u64
    }
}

impl ToneBackend for OfflineSynth {
    fn prepare(&mut self) -> Result<Readiness> {
        if self.sample_rate == 0 {
            return Err(MoodMusicError::backend("sample rate must be positive"));
        }
        match self.startup {
            StartupMode::Immediate => Ok(Readiness::Ready),
            StartupMode::Deferred => Ok(Readiness::Pending),
            StartupMode::Unavailable => Err(MoodMusicError::backend("audio output is blocked")),
        }
    }

    fn play_tone(&mut self, tone: &Tone) -> Result<VoiceId> {
        if self.sample_rate == 0 {
            return Err(MoodMusicError::backend("sample rate must be positive"));
        }
        self.next_voice += 1;
        let id = VoiceId(self.next_voice);
        let end = self.cursor.saturating_add(self.duration_samples(tone.duration));
        self.voices.push(Voice {
            id,
            oscillator: Oscillator::new(tone.timbre, tone.frequency, self.sample_rate),
            envelope: tone.envelope,
            start: self.cursor,
            end,
            fade: None,
        });
        self.started_voices += 1;
        Ok(id)
    }

    fn release(&mut self, voice: VoiceId, fade: Duration) {
        let length = self.duration_samples(fade).max(1);
        let cursor = self.cursor;
        let sample_rate = self.sample_rate;
        if let Some(voice) = self.voices.iter_mut().find(|candidate| candidate.id == voice) {
            let from_gain = voice.gain_at(cursor, sample_rate);
            voice.fade = Some(Fade {
                from_gain,
                start: cursor,
                length,
            });
        }
    }
}
