//! Fixed-step clock.
//!
//! Frames of arbitrary length are converted into a whole number of fixed
//! combat ticks. Leftover time carries into the next frame.

/// Most ticks run for a single frame.
const MAX_STEPS_PER_FRAME: u32 = 10;

/// Longest frame accepted before clamping.
const MAX_FRAME_DT: f32 = 0.25;

/// Accumulates frame time and releases it in fixed ticks.
#[derive(Debug, Clone)]
pub struct FixedStep {
    fixed_dt: f32,
    accumulator: f32,
    dropped: u32,
}

impl Default for FixedStep {
    fn default() -> Self {
        Self::new(60)
    }
}

impl FixedStep {
    /// Clock ticking `tick_rate` times per second.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        Self {
            fixed_dt: 1.0 / tick_rate.max(1) as f32,
            accumulator: 0.0,
            dropped: 0,
        }
    }

    /// Seconds per tick.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Fraction of a tick left over, for interpolating presentation.
    #[must_use]
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.fixed_dt
    }

    /// Times the clock fell behind and discarded backlog.
    #[must_use]
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Adds a frame and returns how many ticks to run for it.
    pub fn accumulate(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt.clamp(0.0, MAX_FRAME_DT);
        let mut count = 0;

        while self.accumulator >= self.fixed_dt && count < MAX_STEPS_PER_FRAME {
            self.accumulator -= self.fixed_dt;
            count += 1;
        }

        // Still behind: drop the backlog instead of spiralling
        if self.accumulator > self.fixed_dt * 2.0 {
            self.accumulator = 0.0;
            self.dropped += 1;
        }

        count
    }
}
