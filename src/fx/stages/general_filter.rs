use crate::fx::stages::common::{db_to_lin, within};
use crate::fx::stages::{ProcessSpec, Stage};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum FilterMode {
    #[default]
    Peak,
    Bandpass,
    Notch,
    Allpass,
}

impl FilterMode {
    pub const ALL: [Self; 4] = [Self::Peak, Self::Bandpass, Self::Notch, Self::Allpass];

    pub const NAMES: [&'static str; 4] = ["Peak", "Bandpass", "Notch", "Allpass"];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl std::fmt::Display for FilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Self::NAMES[*self as usize])
    }
}

/// Normalised biquad coefficients (`a0 == 1`).
#[derive(Clone, Copy, Debug, PartialEq)]
struct Coefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Coefficients {
    /// RBJ cookbook designs.
    fn design(mode: FilterMode, freq_hz: f32, q: f32, gain_db: f32, sample_rate: f32) -> Self {
        let freq = freq_hz.clamp(1.0, 0.49 * sample_rate);
        let omega = TAU * freq / sample_rate;
        let (sin_w, cos_w) = omega.sin_cos();
        let alpha = sin_w / (2.0 * q.max(0.01));

        let (b0, b1, b2, a0, a1, a2) = match mode {
            FilterMode::Peak => {
                let a = db_to_lin(gain_db).sqrt();
                (
                    alpha.mul_add(a, 1.0),
                    -2.0 * cos_w,
                    (-alpha).mul_add(a, 1.0),
                    1.0 + alpha / a,
                    -2.0 * cos_w,
                    1.0 - alpha / a,
                )
            }
            FilterMode::Bandpass => (alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_w, 1.0 - alpha),
            FilterMode::Notch => (
                1.0,
                -2.0 * cos_w,
                1.0,
                1.0 + alpha,
                -2.0 * cos_w,
                1.0 - alpha,
            ),
            FilterMode::Allpass => (
                1.0 - alpha,
                -2.0 * cos_w,
                1.0 + alpha,
                1.0 + alpha,
                -2.0 * cos_w,
                1.0 - alpha,
            ),
        };

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// General-purpose IIR stage (biquad, transposed direct form II).
///
/// Coefficients are only redesigned when one of mode, frequency, quality or gain
/// actually changes, so applying unchanged parameters every block is cheap.
pub struct GeneralFilterStage {
    mode: FilterMode,
    freq_hz: f32,
    quality: f32,
    gain_db: f32,
    coeffs: Coefficients,
    z1: f32,
    z2: f32,
    sample_rate: f32,
}

impl Default for GeneralFilterStage {
    fn default() -> Self {
        Self::new(FilterMode::Peak, 750.0, 1.0, 0.0, 44_100.0)
    }
}

impl GeneralFilterStage {
    pub fn new(mode: FilterMode, freq_hz: f32, quality: f32, gain_db: f32, sample_rate: f32) -> Self {
        Self {
            mode,
            freq_hz,
            quality,
            gain_db,
            coeffs: Coefficients::design(mode, freq_hz, quality, gain_db, sample_rate),
            z1: 0.0,
            z2: 0.0,
            sample_rate,
        }
    }

    fn redesign(&mut self) {
        self.coeffs = Coefficients::design(
            self.mode,
            self.freq_hz,
            self.quality,
            self.gain_db,
            self.sample_rate,
        );
    }

    pub const fn mode(&self) -> FilterMode {
        self.mode
    }
}

impl Stage for GeneralFilterStage {
    fn prepare(&mut self, spec: &ProcessSpec) {
        self.sample_rate = spec.sample_rate;
        self.redesign();
        self.reset();
    }

    fn process(&mut self, input: f32) -> f32 {
        let c = &self.coeffs;
        let output = c.b0.mul_add(input, self.z1);
        self.z1 = c.b1.mul_add(input, (-c.a1).mul_add(output, self.z2));
        self.z2 = c.b2.mul_add(input, -c.a2 * output);
        output
    }

    fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    fn set_parameter(&mut self, name: &str, value: f32) -> Result<(), &'static str> {
        match name {
            "mode" => {
                let mode = FilterMode::from_index(value.round().max(0.0) as usize)
                    .ok_or("Mode must be an index between 0 and 3")?;
                if mode != self.mode {
                    self.mode = mode;
                    self.redesign();
                }
            }
            "freq" => {
                let value = within(value, 20.0, 20_000.0, "Frequency must be between 20 Hz and 20 kHz")?;
                if value != self.freq_hz {
                    self.freq_hz = value;
                    self.redesign();
                }
            }
            "quality" => {
                let value = within(value, 0.1, 10.0, "Quality must be between 0.1 and 10")?;
                if value != self.quality {
                    self.quality = value;
                    self.redesign();
                }
            }
            "gain" => {
                let value = within(value, -24.0, 24.0, "Gain must be between -24 dB and 24 dB")?;
                if value != self.gain_db {
                    self.gain_db = value;
                    self.redesign();
                }
            }
            _ => return Err("Unknown parameter name"),
        }
        Ok(())
    }

    fn get_parameter(&self, name: &str) -> Result<f32, &'static str> {
        match name {
            "mode" => Ok(self.mode as usize as f32),
            "freq" => Ok(self.freq_hz),
            "quality" => Ok(self.quality),
            "gain" => Ok(self.gain_db),
            _ => Err("Unknown parameter name"),
        }
    }
}
