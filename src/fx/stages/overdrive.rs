use crate::fx::stages::common::within;
use crate::fx::stages::{ProcessSpec, Stage};

/// Memoryless tanh saturation. The output is normalised so a full-scale input
/// stays at full scale whatever the drive.
pub struct OverdriveStage {
    saturation: f32,
    makeup: f32,
}

impl Default for OverdriveStage {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl OverdriveStage {
    pub fn new(saturation: f32) -> Self {
        Self {
            saturation,
            makeup: Self::compute_makeup(saturation),
        }
    }

    fn compute_makeup(saturation: f32) -> f32 {
        1.0 / saturation.tanh()
    }
}

impl Stage for OverdriveStage {
    fn prepare(&mut self, _spec: &ProcessSpec) {}

    fn process(&mut self, input: f32) -> f32 {
        (input * self.saturation).tanh() * self.makeup
    }

    fn reset(&mut self) {}

    fn set_parameter(&mut self, name: &str, value: f32) -> Result<(), &'static str> {
        match name {
            "saturation" => {
                let value = within(value, 1.0, 100.0, "Saturation must be between 1 and 100")?;
                if value != self.saturation {
                    self.saturation = value;
                    self.makeup = Self::compute_makeup(value);
                }
                Ok(())
            }
            _ => Err("Unknown parameter name"),
        }
    }

    fn get_parameter(&self, name: &str) -> Result<f32, &'static str> {
        match name {
            "saturation" => Ok(self.saturation),
            _ => Err("Unknown parameter name"),
        }
    }
}
