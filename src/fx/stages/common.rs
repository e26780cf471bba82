use std::f32::consts::TAU;

/// Convert decibels to linear amplitude.
#[inline]
pub fn db_to_lin(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Check a parameter value against an inclusive range.
#[inline]
pub fn within(value: f32, min: f32, max: f32, err: &'static str) -> Result<f32, &'static str> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(err)
    }
}

/// Sine oscillator used as a modulation source.
///
/// Output is in `[-1, 1]`. The phase is kept in `[0, 1)`.
#[derive(Clone, Debug)]
pub struct Lfo {
    phase: f32,
    increment: f32,
    rate_hz: f32,
    sample_rate: f32,
}

impl Lfo {
    pub fn new(rate_hz: f32, sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            increment: rate_hz / sample_rate,
            rate_hz,
            sample_rate,
        }
    }

    pub fn set_rate(&mut self, rate_hz: f32) {
        self.rate_hz = rate_hz;
        self.increment = rate_hz / self.sample_rate;
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.set_rate(self.rate_hz);
    }

    pub const fn reset(&mut self) {
        self.phase = 0.0;
    }

    #[inline]
    pub fn next(&mut self) -> f32 {
        let value = (self.phase * TAU).sin();
        self.phase += self.increment;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        value
    }

    /// Advance the phase by `samples` without producing output.
    pub fn skip(&mut self, samples: usize) {
        self.phase = (self.increment.mul_add(samples as f32, self.phase)).fract();
    }
}

/// Ring buffer with linearly interpolated fractional reads.
#[derive(Clone, Debug, Default)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    pub fn new(max_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; max_samples.max(2)],
            write_pos: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Read `delay` samples behind the write head. `delay` is clamped to the buffer.
    #[inline]
    pub fn read(&self, delay: f32) -> f32 {
        let len = self.buffer.len();
        let delay = delay.clamp(1.0, (len - 1) as f32);

        let read_pos = self.write_pos as f32 - delay + len as f32;
        let read_idx = read_pos as usize % len;
        let next_idx = (read_idx + 1) % len;
        let frac = read_pos.fract();

        (1.0 - frac).mul_add(self.buffer[read_idx], frac * self.buffer[next_idx])
    }

    #[inline]
    pub fn write(&mut self, value: f32) {
        self.buffer[self.write_pos] = value;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}
