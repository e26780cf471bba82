pub mod chorus;
pub mod common;
pub mod general_filter;
pub mod ladder;
pub mod overdrive;
pub mod phaser;

use crate::fx::order::StageKind;
use chorus::ChorusStage;
use general_filter::GeneralFilterStage;
use ladder::LadderFilterStage;
use overdrive::OverdriveStage;
use phaser::PhaserStage;

/// Processing context handed to every stage before audio starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSpec {
    pub sample_rate: f32,
    pub max_block_size: usize,
    pub num_channels: usize,
}

impl ProcessSpec {
    pub const fn new(sample_rate: f32, max_block_size: usize, num_channels: usize) -> Self {
        Self {
            sample_rate,
            max_block_size,
            num_channels,
        }
    }
}

// The core trait that all processing stages must implement
pub trait Stage: Send + Sync + 'static {
    // Size internal buffers and coefficients. Called before any processing.
    fn prepare(&mut self, spec: &ProcessSpec);

    // Process a single sample through this stage
    fn process(&mut self, input: f32) -> f32;

    // Process a block in place. A bypassed stage leaves the block untouched
    // and does not advance its internal state.
    fn process_block(&mut self, block: &mut [f32], bypassed: bool) {
        if bypassed {
            return;
        }
        for sample in block.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    // Clear delay lines and filter history, keeping allocations.
    fn reset(&mut self);

    // Set a parameter value by name
    fn set_parameter(&mut self, name: &str, value: f32) -> Result<(), &'static str>;

    // Get a parameter value by name
    fn get_parameter(&self, name: &str) -> Result<f32, &'static str>;
}

/// One instance of every stage kind, for a single audio channel.
#[derive(Default)]
pub struct StageRack {
    phaser: PhaserStage,
    chorus: ChorusStage,
    overdrive: OverdriveStage,
    ladder: LadderFilterStage,
    general_filter: GeneralFilterStage,
}

impl StageRack {
    pub fn new(spec: &ProcessSpec) -> Self {
        let mut rack = Self::default();
        rack.prepare(spec);
        rack
    }

    /// `EndOfList` has no stage.
    pub fn stage(&self, kind: StageKind) -> Option<&dyn Stage> {
        match kind {
            StageKind::Phaser => Some(&self.phaser),
            StageKind::Chorus => Some(&self.chorus),
            StageKind::OverDrive => Some(&self.overdrive),
            StageKind::LadderFilter => Some(&self.ladder),
            StageKind::GeneralFilter => Some(&self.general_filter),
            StageKind::EndOfList => None,
        }
    }

    pub fn stage_mut(&mut self, kind: StageKind) -> Option<&mut dyn Stage> {
        match kind {
            StageKind::Phaser => Some(&mut self.phaser),
            StageKind::Chorus => Some(&mut self.chorus),
            StageKind::OverDrive => Some(&mut self.overdrive),
            StageKind::LadderFilter => Some(&mut self.ladder),
            StageKind::GeneralFilter => Some(&mut self.general_filter),
            StageKind::EndOfList => None,
        }
    }

    pub fn prepare(&mut self, spec: &ProcessSpec) {
        for kind in StageKind::ALL {
            if let Some(stage) = self.stage_mut(kind) {
                stage.prepare(spec);
            }
        }
    }

    pub fn reset(&mut self) {
        for kind in StageKind::ALL {
            if let Some(stage) = self.stage_mut(kind) {
                stage.reset();
            }
        }
    }
}
