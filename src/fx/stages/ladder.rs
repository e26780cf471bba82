use crate::fx::stages::common::within;
use crate::fx::stages::{ProcessSpec, Stage};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum LadderMode {
    #[default]
    Lpf12,
    Hpf12,
    Bpf12,
    Lpf24,
    Hpf24,
    Bpf24,
}

impl LadderMode {
    pub const ALL: [Self; 6] = [
        Self::Lpf12,
        Self::Hpf12,
        Self::Bpf12,
        Self::Lpf24,
        Self::Hpf24,
        Self::Bpf24,
    ];

    pub const NAMES: [&'static str; 6] = ["LPF12", "HPF12", "BPF12", "LPF24", "HPF24", "BPF24"];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Output mix of the five ladder taps, and the input compensation amount.
    const fn taps(self) -> ([f32; 5], f32) {
        match self {
            Self::Lpf12 => ([0.0, 0.0, 1.0, 0.0, 0.0], 0.5),
            Self::Hpf12 => ([1.0, -2.0, 1.0, 0.0, 0.0], 0.0),
            Self::Bpf12 => ([0.0, 0.0, -1.0, 1.0, 0.0], 0.5),
            Self::Lpf24 => ([0.0, 0.0, 0.0, 0.0, 1.0], 0.5),
            Self::Hpf24 => ([1.0, -4.0, 6.0, -4.0, 1.0], 0.0),
            Self::Bpf24 => ([0.0, 0.0, 1.0, -2.0, 1.0], 0.5),
        }
    }
}

impl std::fmt::Display for LadderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Self::NAMES[*self as usize])
    }
}

/// Four-pole transistor-ladder filter with tanh saturation at the input and in
/// the resonance path. The 12 dB and band/high-pass responses are mixed from the
/// intermediate pole outputs.
pub struct LadderFilterStage {
    mode: LadderMode,
    cutoff_hz: f32,
    resonance: f32,
    drive: f32,
    // Derived coefficients
    pole_coeff: f32,
    scaled_resonance: f32,
    gain: f32,
    drive_fb: f32,
    gain_fb: f32,
    taps: [f32; 5],
    compensation: f32,
    state: [f32; 5],
    sample_rate: f32,
}

impl Default for LadderFilterStage {
    fn default() -> Self {
        Self::new(LadderMode::Lpf12, 20_000.0, 0.0, 1.0, 44_100.0)
    }
}

impl LadderFilterStage {
    const OUTPUT_GAIN: f32 = 1.2;

    pub fn new(
        mode: LadderMode,
        cutoff_hz: f32,
        resonance: f32,
        drive: f32,
        sample_rate: f32,
    ) -> Self {
        let mut filter = Self {
            mode,
            cutoff_hz,
            resonance,
            drive,
            pole_coeff: 0.0,
            scaled_resonance: 0.0,
            gain: 1.0,
            drive_fb: 1.0,
            gain_fb: 1.0,
            taps: [0.0; 5],
            compensation: 0.0,
            state: [0.0; 5],
            sample_rate,
        };
        filter.update_cutoff();
        filter.update_resonance();
        filter.update_drive();
        filter.update_mode();
        filter
    }

    fn update_cutoff(&mut self) {
        let cutoff = self.cutoff_hz.min(0.45 * self.sample_rate);
        self.pole_coeff = (-TAU * cutoff / self.sample_rate).exp();
    }

    fn update_resonance(&mut self) {
        self.scaled_resonance = 0.9f32.mul_add(self.resonance, 0.1);
    }

    fn update_drive(&mut self) {
        let makeup = |drive: f32| drive.powf(-2.642).mul_add(0.6103, 0.3903);
        self.gain = makeup(self.drive);
        self.drive_fb = self.drive.mul_add(0.04, 0.96);
        self.gain_fb = makeup(self.drive_fb);
    }

    fn update_mode(&mut self) {
        let (taps, compensation) = self.mode.taps();
        self.taps = taps.map(|t| t * Self::OUTPUT_GAIN);
        self.compensation = compensation;
    }

    pub const fn mode(&self) -> LadderMode {
        self.mode
    }
}

impl Stage for LadderFilterStage {
    fn prepare(&mut self, spec: &ProcessSpec) {
        self.sample_rate = spec.sample_rate;
        self.update_cutoff();
        self.reset();
    }

    fn process(&mut self, input: f32) -> f32 {
        let a1 = self.pole_coeff;
        let g = 1.0 - a1;
        let b0 = g * 0.769_230_77;
        let b1 = g * 0.230_769_23;

        let s = &mut self.state;
        let dx = self.gain * (self.drive * input).tanh();
        let fb = self.gain_fb * (self.drive_fb * s[4]).tanh();
        let a = (self.scaled_resonance * -4.0).mul_add(fb - dx * self.compensation, dx);

        let b = b1.mul_add(s[0], a1.mul_add(s[1], b0 * a));
        let c = b1.mul_add(s[1], a1.mul_add(s[2], b0 * b));
        let d = b1.mul_add(s[2], a1.mul_add(s[3], b0 * c));
        let e = b1.mul_add(s[3], a1.mul_add(s[4], b0 * d));

        *s = [a, b, c, d, e];

        self.taps
            .iter()
            .zip(s.iter())
            .fold(0.0, |acc, (tap, v)| tap.mul_add(*v, acc))
    }

    fn reset(&mut self) {
        self.state = [0.0; 5];
    }

    fn set_parameter(&mut self, name: &str, value: f32) -> Result<(), &'static str> {
        match name {
            "mode" => {
                let mode = LadderMode::from_index(value.round().max(0.0) as usize)
                    .ok_or("Mode must be an index between 0 and 5")?;
                if mode != self.mode {
                    self.mode = mode;
                    self.update_mode();
                }
            }
            "cutoff" => {
                let value = within(value, 20.0, 20_000.0, "Cutoff must be between 20 Hz and 20 kHz")?;
                if value != self.cutoff_hz {
                    self.cutoff_hz = value;
                    self.update_cutoff();
                }
            }
            "resonance" => {
                self.resonance = within(value, 0.0, 1.0, "Resonance must be between 0.0 and 1.0")?;
                self.update_resonance();
            }
            "drive" => {
                let value = within(value, 1.0, 100.0, "Drive must be between 1 and 100")?;
                if value != self.drive {
                    self.drive = value;
                    self.update_drive();
                }
            }
            _ => return Err("Unknown parameter name"),
        }
        Ok(())
    }

    fn get_parameter(&self, name: &str) -> Result<f32, &'static str> {
        match name {
            "mode" => Ok(self.mode as usize as f32),
            "cutoff" => Ok(self.cutoff_hz),
            "resonance" => Ok(self.resonance),
            "drive" => Ok(self.drive),
            _ => Err("Unknown parameter name"),
        }
    }
}
