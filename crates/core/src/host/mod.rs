//! Capabilities the embedding environment supplies to the sequencer.
//!
//! The sequencer never talks to an audio device or a clock directly. A host
//! provides a [`ToneBackend`] that turns [`Tone`] descriptions into sound and
//! a [`Timer`] that arms delayed wake-ups. Fired timers are handed back to the
//! sequencer through [`crate::MelodySequencer::on_timer`], carrying the
//! [`TimerToken`] they were armed with.

use std::time::Duration;

use serde::Serialize;

use crate::{mood::Timbre, Result};

/// Identifies one playback session. Increases monotonically per sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionId(pub u64);

/// Handle to a sounding (or finished) voice owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceId(pub u64);

/// Cancelable handle to an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u64);

/// Payload delivered back to the sequencer when a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerToken {
    pub session: SessionId,
    pub note_index: usize,
}

/// Linear gain envelope: 0 to `peak` over `attack`, then back to 0 at
/// `release_end`. Times are relative to the start of the tone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Envelope {
    pub peak: f32,
    pub attack: Duration,
    pub release_end: Duration,
}

impl Envelope {
    /// Soft attack over a quarter of the note, decaying to silence at its end.
    pub fn for_note(duration: Duration, peak: f32) -> Self {
        Self {
            peak,
            attack: duration / 4,
            release_end: duration,
        }
    }

    /// Gain at `elapsed` since the tone started.
    pub fn gain_at(&self, elapsed: Duration) -> f32 {
        if elapsed >= self.release_end {
            return 0.0;
        }
        if elapsed < self.attack {
            return self.peak * elapsed.as_secs_f32() / self.attack.as_secs_f32();
        }
        let decay = (self.release_end - self.attack).as_secs_f32();
        if decay <= 0.0 {
            return 0.0;
        }
        let into_decay = (elapsed - self.attack).as_secs_f32();
        self.peak * (1.0 - into_decay / decay)
    }
}

/// A single note as handed to the backend; it starts immediately.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tone {
    pub frequency: f32,
    pub timbre: Timbre,
    pub duration: Duration,
    pub envelope: Envelope,
}

/// Outcome of preparing a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The backend can emit tones right away.
    Ready,
    /// Initialisation continues in the background; the host must call
    /// [`crate::MelodySequencer::backend_ready`] with the starting session's
    /// id once it completes.
    Pending,
}

/// Tone generation capability.
pub trait ToneBackend {
    /// Makes sure the output is usable. Called on every session start.
    fn prepare(&mut self) -> Result<Readiness>;

    /// Creates an oscillator and its gain envelope, connects it to the
    /// output and starts it now. It stops itself at `tone.duration`.
    fn play_tone(&mut self, tone: &Tone) -> Result<VoiceId>;

    /// Ramps the voice's gain to zero over `fade`. Voices that have already
    /// finished are ignored.
    fn release(&mut self, voice: VoiceId, fade: Duration);
}

/// Delayed callback capability.
pub trait Timer {
    fn schedule(&mut self, delay: Duration, token: TimerToken) -> TimerHandle;

    /// Cancelling an unknown or already fired handle is a no-op.
    fn cancel(&mut self, handle: TimerHandle);
}

impl<B: ToneBackend + ?Sized> ToneBackend for Box<B> {
    fn prepare(&mut self) -> Result<Readiness> {
        (**self).prepare()
    }

    fn play_tone(&mut self, tone: &Tone) -> Result<VoiceId> {
        (**self).play_tone(tone)
    }

    fn release(&mut self, voice: VoiceId, fade: Duration) {
        (**self).release(voice, fade)
    }
}

impl<T: Timer + ?Sized> Timer for Box<T> {
    fn schedule(&mut self, delay: Duration, token: TimerToken) -> TimerHandle {
        (**self).schedule(delay, token)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        (**self).cancel(handle)
    }
}
