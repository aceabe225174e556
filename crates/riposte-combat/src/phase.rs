//! Timed phase driver shared by the defense, telegraph and combo machines.
//!
//! Every machine in this crate has the same shape: enter a phase with a
//! duration, count it down, and on expiry consult a transition table for the
//! next phase. [`TimedPhase`] owns that countdown so the machines only supply
//! the table.
//!
//! Leftover time after an expiry is discarded. A single huge delta therefore
//! produces exactly one transition and never skips a phase.

use serde::{Deserialize, Serialize};

/// What the transition table returns for an expired phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PhaseStep<P> {
    /// Enter `P` for the given duration in seconds.
    Timed(P, f32),
    /// Enter `P` and stay there until something external moves it on.
    Held(P),
}

/// A phase change reported by [`TimedPhase::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition<P> {
    /// Phase that expired.
    pub from: P,
    /// Phase that was entered.
    pub to: P,
}

/// Countdown for the current phase of a state machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedPhase<P> {
    phase: P,
    duration: f32,
    remaining: f32,
    timed: bool,
}

impl<P: Copy + PartialEq> TimedPhase<P> {
    /// Starts held in `phase`.
    #[must_use]
    pub fn held(phase: P) -> Self {
        Self {
            phase,
            duration: 0.0,
            remaining: 0.0,
            timed: false,
        }
    }

    /// Enters `phase` with a countdown of `duration` seconds.
    ///
    /// Negative durations are treated as zero, which expires on the next
    /// [`advance`](Self::advance).
    pub fn enter(&mut self, phase: P, duration: f32) {
        let duration = duration.max(0.0);
        self.phase = phase;
        self.duration = duration;
        self.remaining = duration;
        self.timed = true;
    }

    /// Enters `phase` without a countdown.
    pub fn hold(&mut self, phase: P) {
        self.phase = phase;
        self.duration = 0.0;
        self.remaining = 0.0;
        self.timed = false;
    }

    /// Applies a [`PhaseStep`].
    pub fn apply(&mut self, step: PhaseStep<P>) {
        match step {
            PhaseStep::Timed(phase, duration) => self.enter(phase, duration),
            PhaseStep::Held(phase) => self.hold(phase),
        }
    }

    /// Counts down by `dt` seconds.
    ///
    /// When the timer reaches zero the table is consulted once and the
    /// resulting phase is entered with its full duration.
    pub fn advance(
        &mut self,
        dt: f32,
        table: impl FnOnce(P) -> PhaseStep<P>,
    ) -> Option<Transition<P>> {
        if !self.timed {
            return None;
        }

        self.remaining -= dt.max(0.0);
        if self.remaining > 0.0 {
            return None;
        }

        let from = self.phase;
        self.apply(table(from));
        Some(Transition {
            from,
            to: self.phase,
        })
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> P {
        self.phase
    }

    /// Whether the current phase is counting down.
    #[must_use]
    pub fn is_timed(&self) -> bool {
        self.timed
    }

    /// Seconds left in a timed phase, zero when held.
    #[must_use]
    pub fn remaining(&self) -> f32 {
        if self.timed {
            self.remaining.max(0.0)
        } else {
            0.0
        }
    }

    /// Seconds spent in a timed phase so far.
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        if self.timed {
            (self.duration - self.remaining).max(0.0)
        } else {
            0.0
        }
    }

    /// Full duration of the current timed phase.
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Fraction of the current timed phase completed, in `[0, 1]`.
    ///
    /// Held phases and zero-length phases report `1.0`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if !self.timed || self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed() / self.duration).clamp(0.0, 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Light {
        Off,
        Amber,
        Red,
        Green,
    }

    fn table(phase: Light) -> PhaseStep<Light> {
        match phase {
            Light::Amber => PhaseStep::Timed(Light::Red, 1.0),
            Light::Red => PhaseStep::Timed(Light::Green, 2.0),
            Light::Green | Light::Off => PhaseStep::Held(Light::Off),
        }
    }

    #[test]
    fn test_held_phase_never_transitions() {
        let mut phase = TimedPhase::held(Light::Off);
        assert!(phase.advance(100.0, table).is_none());
        assert_eq!(phase.phase(), Light::Off);
        assert_eq!(phase.progress(), 1.0);
    }

    #[test]
    fn test_countdown_is_monotonic() {
        let mut phase = TimedPhase::held(Light::Off);
        phase.enter(Light::Amber, 0.5);

        let mut last = phase.remaining();
        for _ in 0..4 {
            assert!(phase.advance(0.1, table).is_none());
            assert!(phase.remaining() < last);
            last = phase.remaining();
        }
        assert_eq!(phase.phase(), Light::Amber);
    }

    #[test]
    fn test_transition_on_crossing_zero() {
        let mut phase = TimedPhase::held(Light::Off);
        phase.enter(Light::Amber, 0.25);

        assert!(phase.advance(0.2, table).is_none());
        let t = phase.advance(0.1, table).expect("should expire");
        assert_eq!(t.from, Light::Amber);
        assert_eq!(t.to, Light::Red);
        assert!((phase.remaining() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_large_delta_transitions_once() {
        let mut phase = TimedPhase::held(Light::Off);
        phase.enter(Light::Amber, 0.1);

        let t = phase.advance(1000.0, table).expect("should expire");
        assert_eq!(t.to, Light::Red);
        assert_eq!(phase.phase(), Light::Red);
        assert!((phase.remaining() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_zero_duration_expires_next_advance() {
        let mut phase = TimedPhase::held(Light::Off);
        phase.enter(Light::Green, 0.0);
        assert_eq!(phase.phase(), Light::Green);

        let t = phase.advance(0.0, table).expect("zero-length phase expires");
        assert_eq!(t.to, Light::Off);
        assert!(!phase.is_timed());
    }

    #[test]
    fn test_progress_and_elapsed() {
        let mut phase = TimedPhase::held(Light::Off);
        phase.enter(Light::Red, 2.0);
        phase.advance(0.5, table);
        assert!((phase.elapsed() - 0.5).abs() < 1e-6);
        assert!((phase.progress() - 0.25).abs() < 1e-6);
    }
}
