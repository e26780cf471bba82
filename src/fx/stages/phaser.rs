use crate::fx::stages::common::{Lfo, within};
use crate::fx::stages::{ProcessSpec, Stage};
use std::f32::consts::PI;

const NUM_ALLPASS: usize = 6;
/// The allpass coefficients follow the LFO at this interval rather than per sample.
const CONTROL_INTERVAL: usize = 32;
/// Sweep range at full depth, in octaves either side of the centre frequency.
const SWEEP_OCTAVES: f32 = 2.0;
const FEEDBACK_SCALE: f32 = 0.95;

/// First-order allpass section: `y[n] = a*x[n] + x[n-1] - a*y[n-1]`.
#[derive(Clone, Copy, Default)]
struct Allpass {
    x1: f32,
    y1: f32,
}

impl Allpass {
    #[inline]
    fn process(&mut self, input: f32, a: f32) -> f32 {
        let output = a.mul_add(input - self.y1, self.x1);
        self.x1 = input;
        self.y1 = output;
        output
    }
}

pub struct PhaserStage {
    rate_hz: f32,
    depth: f32,
    centre_hz: f32,
    feedback: f32,
    mix: f32,
    lfo: Lfo,
    sections: [Allpass; NUM_ALLPASS],
    coeff: f32,
    last_output: f32,
    countdown: usize,
    sample_rate: f32,
}

impl Default for PhaserStage {
    fn default() -> Self {
        Self::new(0.2, 0.05, 1000.0, 0.0, 0.05, 44_100.0)
    }
}

impl PhaserStage {
    pub fn new(
        rate_hz: f32,
        depth: f32,
        centre_hz: f32,
        feedback: f32,
        mix: f32,
        sample_rate: f32,
    ) -> Self {
        let mut phaser = Self {
            rate_hz,
            depth,
            centre_hz,
            feedback,
            mix,
            lfo: Lfo::new(rate_hz, sample_rate),
            sections: [Allpass::default(); NUM_ALLPASS],
            coeff: 0.0,
            last_output: 0.0,
            countdown: 0,
            sample_rate,
        };
        phaser.coeff = phaser.allpass_coeff(centre_hz);
        phaser
    }

    fn allpass_coeff(&self, freq_hz: f32) -> f32 {
        let freq = freq_hz.clamp(20.0, 0.45 * self.sample_rate);
        let t = (PI * freq / self.sample_rate).tan();
        (t - 1.0) / (t + 1.0)
    }

    fn update_sweep(&mut self) {
        let lfo = self.lfo.next();
        self.lfo.skip(CONTROL_INTERVAL - 1);
        let freq = self.centre_hz * (self.depth * SWEEP_OCTAVES * lfo).exp2();
        self.coeff = self.allpass_coeff(freq);
    }
}

impl Stage for PhaserStage {
    fn prepare(&mut self, spec: &ProcessSpec) {
        self.sample_rate = spec.sample_rate;
        self.lfo.set_sample_rate(spec.sample_rate);
        self.reset();
    }

    fn process(&mut self, input: f32) -> f32 {
        if self.countdown == 0 {
            self.update_sweep();
            self.countdown = CONTROL_INTERVAL;
        }
        self.countdown -= 1;

        let mut wet = (self.feedback * FEEDBACK_SCALE).mul_add(self.last_output, input);
        for section in &mut self.sections {
            wet = section.process(wet, self.coeff);
        }
        self.last_output = wet;

        (1.0 - self.mix).mul_add(input, self.mix * wet)
    }

    fn reset(&mut self) {
        self.sections = [Allpass::default(); NUM_ALLPASS];
        self.last_output = 0.0;
        self.countdown = 0;
        self.lfo.reset();
    }

    fn set_parameter(&mut self, name: &str, value: f32) -> Result<(), &'static str> {
        match name {
            "rate" => {
                self.rate_hz = within(value, 0.0, 100.0, "Rate must be between 0 Hz and 100 Hz")?;
                self.lfo.set_rate(self.rate_hz);
            }
            "depth" => self.depth = within(value, 0.0, 1.0, "Depth must be between 0.0 and 1.0")?,
            "center_freq" => {
                self.centre_hz = within(
                    value,
                    20.0,
                    20_000.0,
                    "Centre frequency must be between 20 Hz and 20 kHz",
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
            "center_freq" => Ok(self.centre_hz),
            "feedback" => Ok(self.feedback),
            "mix" => Ok(self.mix),
            _ => Err("Unknown parameter name"),
        }
    }
}
