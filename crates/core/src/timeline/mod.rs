use std::time::Duration;

use crate::host::{Timer, TimerHandle, TimerToken};

#[derive(Debug, Default, Clone)]
pub struct PlaybackClock {
    pub time_seconds: f64,
}

impl PlaybackClock {
    pub fn reset(&mut self) {
        self.time_seconds = 0.0;
    }

    pub fn advance(&mut self, delta: f64) {
        self.time_seconds = (self.time_seconds + delta).max(0.0);
    }

    pub fn advance_to(&mut self, time_seconds: f64) {
        self.time_seconds = self.time_seconds.max(time_seconds);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledEvent {
    pub handle: TimerHandle,
    pub due_seconds: f64,
    pub token: TimerToken,
}

/// Deterministic [`Timer`] running on virtual time. Delays are measured from
/// the clock's current time; the driver advances the clock and pops whatever
/// became due.
#[derive(Debug, Default)]
pub struct VirtualTimer {
    clock: PlaybackClock,
    events: Vec<ScheduledEvent>,
    next_handle: u64,
}

impl VirtualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> f64 {
        self.clock.time_seconds
    }

    /// Number of armed, not yet fired timers.
    pub fn pending(&self) -> usize {
        self.events.len()
    }

    pub fn next_due(&self) -> Option<f64> {
        self.events.first().map(|event| event.due_seconds)
    }

    /// Removes the earliest event due at or before `now`, moving the clock to
    /// its due time.
    pub fn pop_due(&mut self, now: f64) -> Option<TimerToken> {
        let due = self.next_due()?;
        if due > now {
            return None;
        }
        let event = self.events.remove(0);
        self.clock.advance_to(event.due_seconds);
        Some(event.token)
    }

    /// Moves the clock forward without firing anything.
    pub fn advance_to(&mut self, time_seconds: f64) {
        self.clock.advance_to(time_seconds);
    }
}

impl Timer for VirtualTimer {
    fn schedule(&mut self, delay: Duration, token: TimerToken) -> TimerHandle {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        let event = ScheduledEvent {
            handle,
            due_seconds: self.clock.time_seconds + delay.as_secs_f64(),
            token,
        };
        // Equal due times fire in arming order.
        let position = self
            .events
            .partition_point(|queued| queued.due_seconds <= event.due_seconds);
        self.events.insert(position, event);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.events.retain(|event| event.handle != handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SessionId;

    fn token(note_index: usize) -> TimerToken {
        TimerToken {
            session: SessionId(1),
            note_index,
        }
    }

    #[test]
    fn fires_in_due_order() {
        let mut timer = VirtualTimer::new();
        timer.schedule(Duration::from_millis(300), token(3));
        timer.schedule(Duration::from_millis(100), token(1));
        timer.schedule(Duration::from_millis(100), token(2));

        assert_eq!(timer.pop_due(0.05), None);
        assert_eq!(timer.pop_due(1.0), Some(token(1)));
        assert_eq!(timer.pop_due(1.0), Some(token(2)));
        assert!((timer.now() - 0.1).abs() < 1e-9);
        assert_eq!(timer.pop_due(1.0), Some(token(3)));
        assert_eq!(timer.pending(), 0);
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut timer = VirtualTimer::new();
        let handle = timer.schedule(Duration::ZERO, token(0));
        timer.cancel(handle);
        timer.cancel(handle);
        assert_eq!(timer.pop_due(10.0), None);
    }

    #[test]
    fn delays_are_relative_to_the_clock() {
        let mut timer = VirtualTimer::new();
        timer.advance_to(2.0);
        timer.schedule(Duration::from_millis(500), token(0));
        assert_eq!(timer.next_due(), Some(2.5));
    }

    #[test]
    fn clock_never_runs_backwards() {
        let mut clock = PlaybackClock::default();
        clock.advance(1.0);
        clock.advance_to(0.5);
        assert_eq!(clock.time_seconds, 1.0);
        clock.advance(-4.0);
        assert_eq!(clock.time_seconds, 0.0);
        clock.advance(0.25);
        clock.reset();
        assert_eq!(clock.time_seconds, 0.0);
    }
}
