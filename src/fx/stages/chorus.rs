use crate::fx::stages::common::{DelayLine, Lfo, within};
use crate::fx::stages::{ProcessSpec, Stage};

const MAX_CENTRE_DELAY_MS: f32 = 100.0;
/// Delay excursion at full depth.
const MAX_MODULATION_MS: f32 = 20.0;
const FEEDBACK_SCALE: f32 = 0.95;

/// Chorus stage: a delay line whose read position is swept by an LFO.
pub struct ChorusStage {
    rate_hz: f32,
    depth: f32,
    centre_delay_ms: f32,
    feedback: f32,
    mix: f32,
    lfo: Lfo,
    delay: DelayLine,
    sample_rate: f32,
}

impl Default for ChorusStage {
    fn default() -> Self {
        Self::new(0.2, 0.05, 7.0, 0.0, 0.05, 44_100.0)
    }
}

impl ChorusStage {
    pub fn new(
        rate_hz: f32,
        depth: f32,
        centre_delay_ms: f32,
        feedback: f32,
        mix: f32,
        sample_rate: f32,
    ) -> Self {
        Self {
            rate_hz,
            depth,
            centre_delay_ms,
            feedback,
            mix,
            lfo: Lfo::new(rate_hz, sample_rate),
            delay: DelayLine::new(Self::buffer_len(sample_rate)),
            sample_rate,
        }
    }

    fn buffer_len(sample_rate: f32) -> usize {
        ((MAX_CENTRE_DELAY_MS + MAX_MODULATION_MS) * 0.001 * sample_rate) as usize + 2
    }
}

impl Stage for ChorusStage {
    fn prepare(&mut self, spec: &ProcessSpec) {
        let len = Self::buffer_len(spec.sample_rate);
        if len != self.delay.len() {
            self.delay = DelayLine::new(len);
        }
        self.sample_rate = spec.sample_rate;
        self.lfo.set_sample_rate(spec.sample_rate);
        self.reset();
    }

    fn process(&mut self, input: f32) -> f32 {
        let modulation = self.depth * MAX_MODULATION_MS * self.lfo.next();
        let delay_ms = (self.centre_delay_ms + modulation).max(0.0);
        let delayed = self.delay.read(delay_ms * 0.001 * self.sample_rate);

        self.delay
            .write((self.feedback * FEEDBACK_SCALE).mul_add(delayed, input));

        (1.0 - self.mix).mul_add(input, self.mix * delayed)
    }

    fn reset(&mut self) {
        self.delay.clear();
        self.lfo.reset();
    }

    fn set_parameter(&mut self, name: &str, value: f32) -> Result<(), &'static str> {
        match name {
            "rate" => {
                self.rate_hz = within(value, 0.0, 100.0, "Rate must be between 0 Hz and 100 Hz")?;
                self.lfo.set_rate(self.rate_hz);
            }
            "depth" => self.depth = within(value, 0.0, 1.0, "Depth must be between 0.0 and 1.0")?,
            "center_delay" => {
                self.centre_delay_ms = within(
                    value,
                    1.0,
                    MAX_CENTRE_DELAY_MS,
                    "Centre delay must be between 1 ms and 100 ms",
                )?;
            }
            "feedback" => {
                self.feedback =
                    within(value, -1.0, 1.0, "Feedback must be between -1.0 and 1.0")?;
            }
            "mix" => self.mix = within(value, 0.0, 1.0, "Mix must be between 0.0 and 1.0")?,
            _ => return Err("Unknown parameter name"),
        }
        Ok(())
    }

    fn get_parameter(&self, name: &str) -> Result<f32, &'static str> {
        match name {
            "rate" => Ok(self.rate_hz),
            "depth" => Ok(self.depth),
            "center_delay" => Ok(self.centre_delay_ms),
            "feedback" => Ok(self.feedback),
            "mix" => Ok(self.mix),
            _ => Err("Unknown parameter name"),
        }
    }
}
