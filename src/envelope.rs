//! Gain-over-time envelopes for the music path.
//!
//! An envelope is an ordered breakpoint list, evaluated the way scheduled
//! audio-parameter automation behaves: a ramp breakpoint interpolates from
//! whatever breakpoint precedes it, a step holds the previous value and then
//! jumps. Breakpoints inserted at the same instant apply in insertion order,
//! so a later decision overrides an earlier one.

/// How the envelope approaches a breakpoint's value from the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ramp {
    /// Jump to the value at the breakpoint time.
    Step,
    /// Straight-line interpolation from the previous breakpoint.
    Linear,
    /// Exponential interpolation from the previous breakpoint. Values are
    /// floored at a small positive epsilon; an exponential ramp cannot pass
    /// through zero.
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    pub time: f64,
    pub value: f64,
    pub ramp: Ramp,
}

/// Smallest gain an exponential ramp can start from or reach.
pub const MIN_RAMP_GAIN: f64 = 1e-4;

const EXP_FLOOR: f64 = 1e-6;

/// A per-render gain curve. Built once, evaluated per output sample.
#[derive(Debug, Clone, Default)]
pub struct GainEnvelope {
    points: Vec<Breakpoint>,
}

impl GainEnvelope {
    pub fn new() -> Self {
        GainEnvelope { points: Vec::new() }
    }

    /// An envelope pinned to a single value for its whole lifetime.
    pub fn constant(value: f64) -> Self {
        let mut env = GainEnvelope::new();
        env.set_value_at(0.0, value);
        env
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Value of the most recently scheduled breakpoint, if any.
    pub fn last_value(&self) -> Option<f64> {
        self.points.last().map(|p| p.value)
    }

    fn insert(&mut self, point: Breakpoint) {
        // Keep breakpoints time-sorted; equal times go after existing ones so
        // the newest decision wins.
        let idx = self.points.partition_point(|p| p.time <= point.time);
        self.points.insert(idx, point);
    }

    /// Schedule an instantaneous jump to `value` at `time`.
    pub fn set_value_at(&mut self, time: f64, value: f64) {
        self.insert(Breakpoint {
            time,
            value,
            ramp: Ramp::Step,
        });
    }

    /// Ramp linearly from the previous breakpoint, reaching `value` at `time`.
    pub fn linear_ramp_to(&mut self, time: f64, value: f64) {
        self.insert(Breakpoint {
            time,
            value,
            ramp: Ramp::Linear,
        });
    }

    /// Ramp exponentially from the previous breakpoint, reaching `value` at
    /// `time`.
    pub fn exponential_ramp_to(&mut self, time: f64, value: f64) {
        self.insert(Breakpoint {
            time,
            value,
            ramp: Ramp::Exponential,
        });
    }

    /// Evaluate the envelope at time `t` (seconds).
    pub fn value_at(&self, t: f64) -> f64 {
        if self.points.is_empty() {
            return 1.0;
        }
        let next = self.points.partition_point(|p| p.time <= t);
        self.eval(next, t)
    }

    fn eval(&self, next: usize, t: f64) -> f64 {
        if next == 0 {
            return self.points[0].value;
        }
        let prev = &self.points[next - 1];
        let Some(target) = self.points.get(next) else {
            return prev.value;
        };
        let span = target.time - prev.time;
        match target.ramp {
            Ramp::Step => prev.value,
            _ if span <= 0.0 => target.value,
            Ramp::Linear => {
                let frac = (t - prev.time) / span;
                prev.value + (target.value - prev.value) * frac
            }
            Ramp::Exponential => {
                let frac = (t - prev.time) / span;
                let v0 = prev.value.max(EXP_FLOOR);
                let v1 = target.value.max(EXP_FLOOR);
                v0 * (v1 / v0).powf(frac)
            }
        }
    }

    /// Monotonic-time evaluator for the render loop: O(1) amortized as long
    /// as queries never go backwards.
    pub fn cursor(&self) -> EnvelopeCursor<'_> {
        EnvelopeCursor { env: self, next: 0 }
    }
}

pub struct EnvelopeCursor<'a> {
    env: &'a GainEnvelope,
    next: usize,
}

impl EnvelopeCursor<'_> {
    pub fn value_at(&mut self, t: f64) -> f64 {
        if self.env.points.is_empty() {
            return 1.0;
        }
        while self
            .env
            .points
            .get(self.next)
            .is_some_and(|p| p.time <= t)
        {
            self.next += 1;
        }
        self.env.eval(self.next, t)
    }
}

// ── Fade generators ──────────────────────────────────────────────────────────

/// Gain the fade-in ramps up to: `bgm_gain` scaled by the ratio, which
/// centers at 50% (50 → nominal gain, 0 → near silence, 100 → double).
pub fn fade_in_target(bgm_gain: f64, fade_in_ratio: f64) -> f64 {
    bgm_gain * (fade_in_ratio / 100.0 * 2.0).clamp(MIN_RAMP_GAIN, 2.0)
}

/// Schedule the music fade-in: exponential rise from near-silence at t = 0,
/// holding the target afterwards.
pub fn apply_fade_in(env: &mut GainEnvelope, bgm_gain: f64, fade_in: f64, fade_in_ratio: f64) {
    env.set_value_at(0.0, MIN_RAMP_GAIN);
    env.exponential_ramp_to(fade_in.max(0.01), fade_in_target(bgm_gain, fade_in_ratio));
}

/// Output time at which the fade-out window opens.
pub fn fade_out_start(bgm_total_len: f64, fade_out: f64) -> f64 {
    bgm_total_len - fade_out.max(0.01)
}

/// Build the multiplicative fade-out stage: unity until the window opens,
/// then a linear drop from `fade_out_ratio`/100 to zero at the end of the
/// music bed. Separate from the control envelope so the tail always fades
/// from a known loudness, whatever the ducking state was.
pub fn fade_out_stage(bgm_total_len: f64, fade_out: f64, fade_out_ratio: f64) -> GainEnvelope {
    let mut env = GainEnvelope::new();
    env.set_value_at(0.0, 1.0);
    if fade_out > 0.0 {
        let start = fade_out_start(bgm_total_len, fade_out).max(0.0);
        env.set_value_at(start, fade_out_ratio / 100.0);
        env.linear_ramp_to(bgm_total_len.max(start), 0.0);
    }
    env
}
