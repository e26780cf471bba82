use anyhow::Result;
use chainfx::audio::buffer::AudioBuffer;
use chainfx::audio::engine::{Engine, EngineConfig, EngineHandle};
use chainfx::fx::order::{DspOrder, STAGE_COUNT, StageKind};
use chainfx::fx::stages::ProcessSpec;
use chainfx::params::{ParamId, ParameterSet};
use chainfx::state::PersistedState;
use std::sync::Arc;

fn build_engine() -> (Engine, EngineHandle) {
    let (mut engine, handle) = Engine::new(Arc::new(ParameterSet::new()), EngineConfig::default());
    engine.prepare(ProcessSpec::new(48_000.0, 32, 1));
    (engine, handle)
}

fn permutations() -> Vec<[StageKind; STAGE_COUNT]> {
    fn permute(kinds: &mut [StageKind; STAGE_COUNT], k: usize, out: &mut Vec<[StageKind; STAGE_COUNT]>) {
        if k == STAGE_COUNT {
            out.push(*kinds);
            return;
        }
        for i in k..STAGE_COUNT {
            kinds.swap(k, i);
            permute(kinds, k + 1, out);
            kinds.swap(k, i);
        }
    }

    let mut out = Vec::new();
    permute(&mut StageKind::ALL, 0, &mut out);
    out
}

#[test]
fn every_permutation_round_trips() -> Result<()> {
    let all = permutations();
    assert_eq!(all.len(), 120);

    for (n, kinds) in all.into_iter().enumerate() {
        let order = DspOrder::new(kinds);

        let (mut source, mut source_handle) = build_engine();
        let params = source_handle.params();
        params.get(ParamId::PhaserRate).set_raw(0.1 + n as f32 * 0.01);
        params.get(ParamId::GeneralFilterMode).set_raw((n % 4) as f32);
        params.set_bypassed(kinds[n % STAGE_COUNT], true);
        source_handle.push_order(order);
        source.process(&mut AudioBuffer::new(1, 32));

        let blob = source_handle.save_state()?;

        let (mut target, mut target_handle) = build_engine();
        target_handle.restore_state(&blob)?;
        target.process(&mut AudioBuffer::new(1, 32));

        assert_eq!(target.current_order(), order);
        assert_eq!(target_handle.active_order(), order);
        for id in ParamId::ALL {
            assert_eq!(
                target_handle.params().get(id).raw(),
                source_handle.params().get(id).raw(),
                "{id} differs for order {order}"
            );
        }
    }

    Ok(())
}

#[test]
fn empty_blob_changes_nothing() {
    let (mut engine, mut handle) = build_engine();
    handle.params().get(ParamId::ChorusMix).set_raw(0.7);

    assert!(handle.restore_state(&[]).is_err());
    engine.process(&mut AudioBuffer::new(1, 32));

    assert_eq!(engine.current_order(), DspOrder::default());
    assert_eq!(handle.pull_announced_order(), None);
    assert_eq!(handle.params().get(ParamId::ChorusMix).raw(), 0.7);
    assert_eq!(handle.params().get(ParamId::PhaserRate).raw(), 0.2);
}

#[test]
fn truncated_blob_changes_nothing() -> Result<()> {
    let (_source, source_handle) = build_engine();
    source_handle.params().get(ParamId::LadderCutoff).set_raw(440.0);
    let blob = source_handle.save_state()?;

    let (mut engine, mut handle) = build_engine();
    for cut in [1, blob.len() / 2, blob.len() - 1] {
        assert!(handle.restore_state(&blob[..cut]).is_err());
    }
    engine.process(&mut AudioBuffer::new(1, 32));

    assert_eq!(handle.params().get(ParamId::LadderCutoff).raw(), 20_000.0);
    assert_eq!(handle.pull_announced_order(), None);
    Ok(())
}

#[test]
fn unknown_fields_and_ids_are_ignored() -> Result<()> {
    let blob = br#"{
        "version": 1,
        "saved_by": "another build",
        "parameters": {
            "Chorus Mix %": 0.5,
            "Tremolo Depth": 0.3
        },
        "dsp_order": [4, 3, 2, 1, 0]
    }"#;

    let (mut engine, mut handle) = build_engine();
    handle.restore_state(blob)?;
    engine.process(&mut AudioBuffer::new(1, 32));

    assert_eq!(handle.params().get(ParamId::ChorusMix).raw(), 0.5);
    assert_eq!(engine.current_order(), "filter,ladder,overdrive,chorus,phaser".parse::<DspOrder>()?);
    Ok(())
}

#[test]
fn saved_blob_is_plain_json() -> Result<()> {
    let (_engine, handle) = build_engine();
    let blob = handle.save_state()?;
    let value: serde_json::Value = serde_json::from_slice(&blob)?;

    assert_eq!(value["version"], 1);
    assert_eq!(value["dsp_order"], serde_json::json!([0, 1, 2, 3, 4]));
    assert_eq!(value["parameters"]["OverDrive Saturation"], 1.0);

    let state = PersistedState::from_bytes(&blob)?;
    assert_eq!(state.parameters.len(), ParamId::ALL.len());
    Ok(())
}
