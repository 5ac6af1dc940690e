//! Looping mood-music playback driven by host timers.
//!
//! The sequencer is a small state machine. Every timer it arms carries the
//! [`SessionId`] it was armed for; a fired token whose session is no longer
//! the playing one is dropped. At most one timer is outstanding at a time.

use std::time::Duration;

use crate::config::AudioConfig;
use crate::host::{
    Envelope, Readiness, SessionId, Timer, TimerHandle, TimerToken, Tone, ToneBackend, VoiceId,
};
use crate::melody::Melody;
use crate::mood::MoodTable;
use crate::Result;

#[derive(Debug)]
struct Session {
    id: SessionId,
    melody: Melody,
    note_index: usize,
    pending: Option<TimerHandle>,
    voice: Option<VoiceId>,
}

#[derive(Debug)]
enum State {
    Idle,
    /// Waiting for an asynchronously initialising backend.
    Starting(Session),
    Playing(Session),
}

/// Plays one deterministic, looping melody at a time.
#[derive(Debug)]
pub struct MelodySequencer<B, T> {
    table: MoodTable,
    audio: AudioConfig,
    backend: B,
    timer: T,
    state: State,
    next_session: u64,
}

impl<B: ToneBackend, T: Timer> MelodySequencer<B, T> {
    /// Creates a sequencer over the built-in mood table.
    pub fn new(backend: B, timer: T) -> Self {
        Self::with_config(MoodTable::builtin(), AudioConfig::default(), backend, timer)
    }

    pub fn with_config(table: MoodTable, audio: AudioConfig, backend: B, timer: T) -> Self {
        Self {
            table,
            audio,
            backend,
            timer,
            state: State::Idle,
            next_session: 1,
        }
    }

    /// Starts looping the melody for `title`, replacing any current session.
    ///
    /// The first note is armed with a zero delay and sounds on the next timer
    /// tick. Backend failures are logged and leave the sequencer idle.
    pub fn start(&mut self, title: &str, subgenre: Option<&str>, category: Option<&str>) {
        self.stop();

        let profile = self.table.resolve_profile(subgenre, category).clone();
        let melody = Melody::new(profile, title);
        let id = SessionId(self.next_session);
        self.next_session += 1;

        tracing::info!(
            session = id.0,
            title,
            profile = %melody.profile().label,
            start_offset = melody.start_offset(),
            "starting mood music"
        );

        let session = Session {
            id,
            melody,
            note_index: 0,
            pending: None,
            voice: None,
        };

        match self.backend.prepare() {
            Ok(Readiness::Ready) => {
                self.state = State::Playing(session);
                self.arm(Duration::ZERO, 0);
            }
            Ok(Readiness::Pending) => {
                tracing::debug!(session = id.0, "waiting for tone backend");
                self.state = State::Starting(session);
            }
            Err(err) => {
                tracing::warn!(session = id.0, error = %err, "mood music unavailable");
            }
        }
    }

    /// Completes the [`Readiness::Pending`] preparation of `session`. A stop
    /// that arrived in the meantime wins: nothing is resurrected, and a
    /// completion meant for an earlier session never promotes a later one.
    pub fn backend_ready(&mut self, session: SessionId, result: Result<()>) {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Starting(waiting) if waiting.id == session => match result {
                Ok(()) => {
                    tracing::debug!(session = session.0, "tone backend ready");
                    self.state = State::Playing(waiting);
                    self.arm(Duration::ZERO, 0);
                }
                Err(err) => {
                    tracing::warn!(session = session.0, error = %err, "mood music unavailable");
                }
            },
            other => {
                tracing::debug!(session = session.0, "ignoring stale backend readiness");
                self.state = other;
            }
        }
    }

    /// Handles a fired timer: plays the note and arms the next one.
    pub fn on_timer(&mut self, token: TimerToken) {
        let session = match &mut self.state {
            State::Playing(session) if session.id == token.session => session,
            _ => {
                tracing::debug!(session = token.session.0, "ignoring stale timer");
                return;
            }
        };
        session.pending = None;

        let index = token.note_index;
        let profile = session.melody.profile();
        let duration = profile.note_duration();
        let tone = Tone {
            frequency: session.melody.frequency_at(index),
            timbre: profile.instrument,
            duration,
            envelope: Envelope::for_note(duration, self.audio.peak_gain),
        };

        match self.backend.play_tone(&tone) {
            Ok(voice) => {
                tracing::debug!(
                    session = session.id.0,
                    note = index,
                    frequency = tone.frequency,
                    "note"
                );
                session.voice = Some(voice);
                session.note_index = index;
                let next = session.melody.next_index(index);
                self.arm(duration, next);
            }
            Err(err) => {
                tracing::warn!(error = %err, "tone backend failed mid-session");
                self.stop();
            }
        }
    }

    /// Cancels the pending timer and fades out the sounding note. Calling it
    /// while idle does nothing.
    pub fn stop(&mut self) {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle => {}
            State::Starting(session) => {
                tracing::info!(session = session.id.0, "mood music cancelled before start");
            }
            State::Playing(session) => {
                if let Some(handle) = session.pending {
                    self.timer.cancel(handle);
                }
                if let Some(voice) = session.voice {
                    self.backend.release(voice, self.audio.stop_fade());
                }
                tracing::info!(session = session.id.0, "stopped mood music");
            }
        }
    }

    /// Play/pause: stops when a session is active, starts one otherwise.
    /// Returns whether music is playing afterwards.
    pub fn toggle(&mut self, title: &str, subgenre: Option<&str>, category: Option<&str>) -> bool {
        if self.is_playing() {
            self.stop();
        } else {
            self.start(title, subgenre, category);
        }
        self.is_playing()
    }

    /// True while a session is active, including one still waiting on the
    /// backend.
    pub fn is_playing(&self) -> bool {
        !matches!(self.state, State::Idle)
    }

    pub fn is_starting(&self) -> bool {
        matches!(self.state, State::Starting(_))
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session().map(|session| session.id)
    }

    /// Melody of the active session.
    pub fn melody(&self) -> Option<&Melody> {
        self.session().map(|session| &session.melody)
    }

    /// Index of the note most recently played in the active session.
    pub fn current_note_index(&self) -> Option<usize> {
        self.session().map(|session| session.note_index)
    }

    pub fn table(&self) -> &MoodTable {
        &self.table
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    /// Gives the backend and timer back, dropping any session state.
    pub fn into_parts(self) -> (B, T) {
        (self.backend, self.timer)
    }

    fn session(&self) -> Option<&Session> {
        match &self.state {
            State::Idle => None,
            State::Starting(session) | State::Playing(session) => Some(session),
        }
    }

    fn arm(&mut self, delay: Duration, note_index: usize) {
        let State::Playing(session) = &mut self.state else {
            return;
        };
        if let Some(previous) = session.pending.take() {
            self.timer.cancel(previous);
        }
        let token = TimerToken {
            session: session.id,
            note_index,
        };
        session.pending = Some(self.timer.schedule(delay, token));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MoodMusicError;

    #[derive(Debug, Default)]
    struct RecordingBackend {
        readiness: Option<Readiness>,
        fail_prepare: bool,
        fail_play: bool,
        tones: Vec<Tone>,
        released: Vec<(VoiceId, Duration)>,
    }

    impl ToneBackend for RecordingBackend {
        fn prepare(&mut self) -> Result<Readiness> {
            if self.fail_prepare {
                return Err(MoodMusicError::backend("blocked"));
            }
            Ok(self.readiness.unwrap_or(Readiness::Ready))
        }

        fn play_tone(&mut self, tone: &Tone) -> Result<VoiceId> {
            if self.fail_play {
                return Err(MoodMusicError::backend("device lost"));
            }
            self.tones.push(*tone);
            Ok(VoiceId(self.tones.len() as u64))
        }

        fn release(&mut self, voice: VoiceId, fade: Duration) {
            self.released.push((voice, fade));
        }
    }

    #[derive(Debug, Default)]
    struct ManualTimer {
        next: u64,
        armed: Vec<(TimerHandle, Duration, TimerToken)>,
        cancelled: Vec<TimerHandle>,
    }

    impl ManualTimer {
        fn fire(&mut self) -> Option<TimerToken> {
            if self.armed.is_empty() {
                return None;
            }
            Some(self.armed.remove(0).2)
        }
    }

    impl Timer for ManualTimer {
        fn schedule(&mut self, delay: Duration, token: TimerToken) -> TimerHandle {
            self.next += 1;
            let handle = TimerHandle(self.next);
            self.armed.push((handle, delay, token));
            handle
        }

        fn cancel(&mut self, handle: TimerHandle) {
            self.armed.retain(|(armed, _, _)| *armed != handle);
            self.cancelled.push(handle);
        }
    }

    fn sequencer() -> MelodySequencer<RecordingBackend, ManualTimer> {
        MelodySequencer::new(RecordingBackend::default(), ManualTimer::default())
    }

    fn tick(seq: &mut MelodySequencer<RecordingBackend, ManualTimer>) {
        let token = seq.timer_mut().fire().expect("a timer should be armed");
        seq.on_timer(token);
    }

    #[test]
    fn first_note_waits_for_a_zero_delay_tick() {
        let mut seq = sequencer();
        seq.start("Economy Grows", None, Some("Business"));

        assert!(seq.is_playing());
        assert!(seq.backend().tones.is_empty());
        assert_eq!(seq.timer().armed.len(), 1);
        assert_eq!(seq.timer().armed[0].1, Duration::ZERO);

        tick(&mut seq);
        let tone = seq.backend().tones[0];
        assert_eq!(tone.frequency, 392.00);
        assert_eq!(tone.duration, Duration::from_secs_f32(0.25));
        assert_eq!(tone.envelope.peak, 0.5);
        assert_eq!(seq.timer().armed[0].1, Duration::from_secs_f32(0.25));
        assert_eq!(seq.timer().armed[0].2.note_index, 1);
    }

    #[test]
    fn loops_over_the_pattern() {
        let mut seq = sequencer();
        seq.start("", None, None);
        for _ in 0..5 {
            tick(&mut seq);
        }
        let played: Vec<f32> = seq.backend().tones.iter().map(|t| t.frequency).collect();
        // default pattern [0, 2, 4, 5] from the tonic, then wraps
        assert_eq!(played, vec![261.63, 329.63, 392.00, 440.00, 261.63]);
        assert_eq!(seq.current_note_index(), Some(0));
    }

    #[test]
    fn restarting_keeps_a_single_timer() {
        let mut seq = sequencer();
        seq.start("First", None, Some("Politics"));
        tick(&mut seq);
        seq.start("Second", None, Some("Health"));

        assert_eq!(seq.timer().armed.len(), 1);
        assert_eq!(seq.timer().cancelled.len(), 1);
        assert_eq!(seq.melody().unwrap().profile().label, "Health");

        let stale = TimerToken {
            session: SessionId(1),
            note_index: 1,
        };
        seq.on_timer(stale);
        assert_eq!(seq.backend().tones.len(), 1);
    }

    #[test]
    fn stop_releases_the_sounding_note() {
        let mut seq = sequencer();
        seq.start("X", None, None);
        tick(&mut seq);
        seq.stop();

        assert!(!seq.is_playing());
        assert!(seq.timer().armed.is_empty());
        assert_eq!(
            seq.backend().released,
            vec![(VoiceId(1), Duration::from_secs_f32(0.05))]
        );
    }

    #[test]
    fn stop_twice_is_harmless() {
        let mut seq = sequencer();
        seq.stop();
        seq.start("X", None, None);
        seq.stop();
        seq.stop();
        assert!(!seq.is_playing());
        assert!(seq.backend().released.is_empty());
    }

    #[test]
    fn prepare_failure_leaves_sequencer_idle() {
        let mut seq = sequencer();
        seq.backend_mut().fail_prepare = true;
        seq.start("X", None, None);
        assert!(!seq.is_playing());
        assert!(seq.timer().armed.is_empty());
    }

    #[test]
    fn play_failure_tears_the_session_down() {
        let mut seq = sequencer();
        seq.start("X", None, None);
        seq.backend_mut().fail_play = true;
        tick(&mut seq);
        assert!(!seq.is_playing());
        assert!(seq.timer().armed.is_empty());
    }

    #[test]
    fn pending_backend_arms_after_ready() {
        let mut seq = sequencer();
        seq.backend_mut().readiness = Some(Readiness::Pending);
        seq.start("X", None, None);
        let id = seq.session_id().unwrap();

        assert!(seq.is_starting());
        assert!(seq.timer().armed.is_empty());

        seq.backend_ready(id, Ok(()));
        assert!(!seq.is_starting());
        assert!(seq.is_playing());
        assert_eq!(seq.timer().armed.len(), 1);
    }

    #[test]
    fn stop_during_init_is_not_resurrected() {
        let mut seq = sequencer();
        seq.backend_mut().readiness = Some(Readiness::Pending);
        seq.start("X", None, None);
        let id = seq.session_id().unwrap();
        seq.stop();
        seq.backend_ready(id, Ok(()));

        assert!(!seq.is_playing());
        assert!(seq.timer().armed.is_empty());
    }

    #[test]
    fn late_readiness_does_not_promote_a_newer_session() {
        let mut seq = sequencer();
        seq.backend_mut().readiness = Some(Readiness::Pending);
        seq.start("A", None, None);
        let first = seq.session_id().unwrap();
        seq.stop();
        seq.start("B", None, None);
        let second = seq.session_id().unwrap();
        assert_ne!(first, second);

        seq.backend_ready(first, Ok(()));
        assert!(seq.is_starting());
        assert_eq!(seq.session_id(), Some(second));
        assert!(seq.timer().armed.is_empty());

        seq.backend_ready(second, Ok(()));
        assert!(!seq.is_starting());
        assert!(seq.is_playing());
        assert_eq!(seq.timer().armed.len(), 1);
    }

    #[test]
    fn failed_init_resets_to_idle() {
        let mut seq = sequencer();
        seq.backend_mut().readiness = Some(Readiness::Pending);
        seq.start("X", None, None);
        let id = seq.session_id().unwrap();
        seq.backend_ready(id, Err(MoodMusicError::backend("permission denied")));
        assert!(!seq.is_playing());
    }

    #[test]
    fn toggle_flips_playback() {
        let mut seq = sequencer();
        assert!(seq.toggle("X", Some("World"), None));
        assert_eq!(seq.melody().unwrap().profile().label, "World");
        assert!(!seq.toggle("X", Some("World"), None));
        assert!(seq.session_id().is_none());
    }

    #[test]
    fn sessions_get_fresh_ids() {
        let mut seq = sequencer();
        seq.start("a", None, None);
        let first = seq.session_id().unwrap();
        seq.start("b", None, None);
        let second = seq.session_id().unwrap();
        assert!(second > first);
    }
}
