/// How a smoother treats a new target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmootherUpdateMode {
    /// Jump straight to the target. Used while preparing, before audio starts.
    Initialize,
    /// Ramp towards the target over the configured ramp length.
    LiveInRealtime,
}

/// Linear ramp between parameter values.
///
/// The engine advances it once per block by the block length, so stage
/// parameters move in block-sized steps rather than per sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Smoother {
    current: f32,
    target: f32,
    step: f32,
    remaining: usize,
    ramp_samples: usize,
}

impl Smoother {
    pub const fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            step: 0.0,
            remaining: 0,
            ramp_samples: 0,
        }
    }

    pub fn set_ramp(&mut self, ramp_ms: f32, sample_rate: f32) {
        self.ramp_samples = (ramp_ms.max(0.0) * 0.001 * sample_rate).round() as usize;
    }

    pub const fn is_smoothing(&self) -> bool {
        self.remaining > 0
    }

    pub const fn current(&self) -> f32 {
        self.current
    }

    pub const fn target(&self) -> f32 {
        self.target
    }

    pub fn set_target(&mut self, target: f32, mode: SmootherUpdateMode) {
        if mode == SmootherUpdateMode::Initialize || self.ramp_samples == 0 {
            self.current = target;
            self.target = target;
            self.remaining = 0;
            return;
        }

        if target == self.target {
            return;
        }

        self.target = target;
        self.remaining = self.ramp_samples;
        self.step = (target - self.current) / self.ramp_samples as f32;
    }

    /// Advance by `samples` and return the new value.
    pub fn skip(&mut self, samples: usize) -> f32 {
        if self.remaining == 0 {
            return self.current;
        }

        if samples >= self.remaining {
            self.current = self.target;
            self.remaining = 0;
        } else {
            self.current += self.step * samples as f32;
            self.remaining -= samples;
        }
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn without_ramp_values_jump() {
        let mut s = Smoother::new(0.0);
        s.set_target(1.0, SmootherUpdateMode::LiveInRealtime);
        assert_eq!(s.current(), 1.0);
        assert!(!s.is_smoothing());
    }

    #[test]
    fn ramps_linearly_then_lands_on_target() {
        let mut s = Smoother::new(0.0);
        s.set_ramp(10.0, 1000.0);
        s.set_target(1.0, SmootherUpdateMode::LiveInRealtime);

        assert!((s.skip(5) - 0.5).abs() < 1e-6);
        assert!(s.is_smoothing());
        assert_eq!(s.skip(100), 1.0);
        assert!(!s.is_smoothing());
    }

    #[test]
    fn initialize_skips_the_ramp() {
        let mut s = Smoother::new(0.0);
        s.set_ramp(50.0, 48_000.0);
        s.set_target(3.0, SmootherUpdateMode::Initialize);
        assert_eq!(s.current(), 3.0);
        assert_eq!(s.skip(64), 3.0);
    }

    #[test]
    fn same_target_does_not_restart_ramp() {
        let mut s = Smoother::new(0.0);
        s.set_ramp(10.0, 1000.0);
        s.set_target(1.0, SmootherUpdateMode::LiveInRealtime);
        s.skip(4);
        s.set_target(1.0, SmootherUpdateMode::LiveInRealtime);
        assert!((s.skip(6) - 1.0).abs() < 1e-6);
        assert!(!s.is_smoothing());
    }
}
