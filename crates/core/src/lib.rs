//! Core library for the mood music sequencer.
//!
//! Given a content title and its category labels, the sequencer picks a
//! scale, a timbre, a tempo and a short melodic pattern, seeds the starting
//! pitch from the title, and loops the pattern until stopped. Audio output
//! and timers are host capabilities (see [`host`]); the crate ships an
//! offline synthesiser and a virtual-time timer so melodies can be rendered
//! to WAV files and tested deterministically.

pub mod audio;
pub mod config;
pub mod error;
pub mod feed;
pub mod host;
pub mod melody;
pub mod mood;
pub mod record;
pub mod render;
pub mod sequencer;
pub mod timeline;

pub use audio::{OfflineSynth, Oscillator, StartupMode};
pub use config::{AppConfig, AudioConfig, MAX_STOP_FADE_SECONDS};
pub use error::{MoodMusicError, Result};
pub use feed::{load_feed, parse_feed, Article};
pub use host::{
    Envelope, Readiness, SessionId, Timer, TimerHandle, TimerToken, Tone, ToneBackend, VoiceId,
};
pub use melody::{Melody, MelodyStep};
pub use mood::{
    resolve_start_offset, title_hash, MoodEntry, MoodProfile, MoodTable, MoodTableConfig, Scale,
    Timbre, DEFAULT_MOOD, MIN_NOTE_DURATION,
};
pub use record::{RecordingSettings, WavRecorder};
pub use render::{
    offline_sequencer, render_melody, run_until, MelodyRequest, OfflineSequencer, RenderedAudio,
};
pub use sequencer::MelodySequencer;
pub use timeline::{PlaybackClock, ScheduledEvent, VirtualTimer};
