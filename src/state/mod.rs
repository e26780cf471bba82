//! Saving and restoring the engine state blob.
//!
//! The blob is a JSON document holding every parameter by its stable id and the
//! active order as integer codes. Loading validates the whole document before
//! anything is applied.

use crate::fx::order::{DspOrder, STAGE_COUNT};
use crate::params::ParameterSet;
use anyhow::{Context, Result, bail, ensure};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub version: u32,
    #[serde(default)]
    pub parameters: BTreeMap<String, f32>,
    pub dsp_order: [i32; STAGE_COUNT],
}

impl Default for PersistedState {
    fn default() -> Self {
        Self::capture(&ParameterSet::new(), DspOrder::default())
    }
}

impl PersistedState {
    pub fn capture(params: &ParameterSet, order: DspOrder) -> Self {
        Self {
            version: STATE_VERSION,
            parameters: params
                .iter()
                .map(|p| (p.name().to_string(), p.raw()))
                .collect(),
            dsp_order: order.to_codes(),
        }
    }

    pub fn order(&self) -> DspOrder {
        DspOrder::from_codes(self.dsp_order)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).context("failed to serialize state")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ensure!(!bytes.is_empty(), "state blob is empty");

        let state: Self = serde_json::from_slice(bytes).context("failed to parse state blob")?;
        state.validate()?;
        Ok(state)
    }

    fn validate(&self) -> Result<()> {
        if self.version == 0 || self.version > STATE_VERSION {
            bail!("unsupported state version {}", self.version);
        }

        if let Some((name, value)) = self.parameters.iter().find(|(_, v)| !v.is_finite()) {
            bail!("parameter '{name}' has non-finite value {value}");
        }

        Ok(())
    }

    /// Write the stored values into `params`. Unknown ids are skipped and
    /// parameters missing from the blob keep their current value.
    pub fn apply(&self, params: &ParameterSet) {
        for (name, value) in &self.parameters {
            match params.by_name(name) {
                Some(param) => param.set_raw(*value),
                None => debug!("Ignoring unknown parameter '{name}' in state"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::order::StageKind;
    use crate::params::{ParamId, ParamValue};

    #[test]
    fn capture_covers_every_parameter() {
        let state = PersistedState::default();
        assert_eq!(state.parameters.len(), crate::params::PARAM_COUNT);
        assert_eq!(state.dsp_order, [0, 1, 2, 3, 4]);
    }

    #[test]
    fn round_trip_through_bytes() {
        let params = ParameterSet::new();
        params.get(ParamId::ChorusMix).set(ParamValue::Float(0.8));
        params.set_bypassed(StageKind::Phaser, true);
        let order: DspOrder = "filter,ladder,overdrive,chorus,phaser".parse().unwrap();

        let bytes = PersistedState::capture(&params, order).to_bytes().unwrap();
        let restored = PersistedState::from_bytes(&bytes).unwrap();

        let target = ParameterSet::new();
        restored.apply(&target);
        assert_eq!(restored.order(), order);
        assert_eq!(target.get(ParamId::ChorusMix).raw(), 0.8);
        assert!(target.is_bypassed(StageKind::Phaser));
    }

    #[test]
    fn malformed_blobs_fail() {
        assert!(PersistedState::from_bytes(b"").is_err());
        assert!(PersistedState::from_bytes(b"{\"version\":1,").is_err());
        assert!(PersistedState::from_bytes(b"{\"version\":1}").is_err());
        assert!(
            PersistedState::from_bytes(b"{\"version\":1,\"dsp_order\":[0,1,2]}").is_err()
        );
        assert!(
            PersistedState::from_bytes(b"{\"version\":9,\"dsp_order\":[0,1,2,3,4]}").is_err()
        );
    }

    #[test]
    fn unknown_entries_are_ignored() {
        let blob = br#"{
            "version": 1,
            "comment": "hand edited",
            "parameters": { "Reverb Size": 0.5, "OverDrive Saturation": 12.5 },
            "dsp_order": [2, 9, -1, 5, 4]
        }"#;
        let state = PersistedState::from_bytes(blob).unwrap();
        let params = ParameterSet::new();
        state.apply(&params);

        assert_eq!(params.get(ParamId::OverdriveSaturation).raw(), 12.5);
        assert_eq!(
            state.order(),
            DspOrder::new([
                StageKind::OverDrive,
                StageKind::EndOfList,
                StageKind::EndOfList,
                StageKind::EndOfList,
                StageKind::GeneralFilter,
            ])
        );
    }

    #[test]
    fn out_of_range_values_are_clamped_on_apply() {
        let blob = br#"{"version":1,"parameters":{"Phaser RateHz":50.0},"dsp_order":[0,1,2,3,4]}"#;
        let params = ParameterSet::new();
        PersistedState::from_bytes(blob).unwrap().apply(&params);
        assert_eq!(params.get(ParamId::PhaserRate).raw(), 2.0);
    }
}
