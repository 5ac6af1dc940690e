use serde::Serialize;

use crate::mood::{resolve_start_offset, MoodProfile};

/// The deterministic note sequence of one playback session.
#[derive(Debug, Clone, PartialEq)]
pub struct Melody {
    profile: MoodProfile,
    start_offset: usize,
}

/// A single note of a [`Melody`] laid out on a timeline starting at zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MelodyStep {
    pub index: usize,
    pub at_seconds: f32,
    pub frequency: f32,
    pub duration_seconds: f32,
}

impl Melody {
    /// Seeds the melody from the title hash.
    pub fn new(profile: MoodProfile, title: &str) -> Self {
        let start_offset = resolve_start_offset(title, &profile.scale);
        Self::with_offset(profile, start_offset)
    }

    pub fn with_offset(profile: MoodProfile, start_offset: usize) -> Self {
        Self {
            profile,
            start_offset,
        }
    }

    pub fn profile(&self) -> &MoodProfile {
        &self.profile
    }

    pub fn start_offset(&self) -> usize {
        self.start_offset
    }

    /// Number of notes before the pattern repeats.
    pub fn len(&self) -> usize {
        self.profile.pattern.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profile.pattern.is_empty()
    }

    /// `scale[(start_offset + pattern[index]) mod len(scale)]`
    pub fn frequency_at(&self, note_index: usize) -> f32 {
        let pattern = &self.profile.pattern;
        let degree = pattern[note_index % pattern.len()];
        self.profile
            .scale
            .frequency(self.start_offset as i64 + i64::from(degree))
    }

    pub fn next_index(&self, note_index: usize) -> usize {
        (note_index + 1) % self.profile.pattern.len()
    }

    /// Endless stream of steps, one note duration apart.
    pub fn steps(&self) -> impl Iterator<Item = MelodyStep> + '_ {
        let duration = self.profile.note_duration_seconds;
        (0usize..).map(move |n| {
            let index = n % self.len();
            MelodyStep {
                index,
                at_seconds: n as f32 * duration,
                frequency: self.frequency_at(index),
                duration_seconds: duration,
            }
        })
    }
}
