use crate::fx::order::{DspOrder, STAGE_COUNT, StageKind};
use crate::fx::stages::StageRack;

/// One position of a resolved chain. `kind == None` is a no-op slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Slot {
    pub kind: Option<StageKind>,
    pub bypassed: bool,
}

/// Block-local view of the chain: which stage runs at each position and whether
/// it is bypassed. Built fresh every block, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedChain {
    slots: [Slot; STAGE_COUNT],
}

impl ResolvedChain {
    pub fn resolve(order: &DspOrder, is_bypassed: impl Fn(StageKind) -> bool) -> Self {
        let mut slots = [Slot::default(); STAGE_COUNT];

        for (slot, kind) in slots.iter_mut().zip(order.iter()) {
            if kind.is_stage() {
                *slot = Slot {
                    kind: Some(kind),
                    bypassed: is_bypassed(kind),
                };
            }
        }

        Self { slots }
    }

    pub const fn slots(&self) -> &[Slot; STAGE_COUNT] {
        &self.slots
    }

    pub fn active_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.kind.is_some() && !s.bypassed)
            .count()
    }

    /// Run one channel's block through the rack in slot order.
    pub fn run(&self, rack: &mut StageRack, block: &mut [f32]) {
        for slot in &self.slots {
            let Some(kind) = slot.kind else {
                continue;
            };
            if let Some(stage) = rack.stage_mut(kind) {
                stage.process_block(block, slot.bypassed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::stages::ProcessSpec;

    fn spec() -> ProcessSpec {
        ProcessSpec::new(48_000.0, 64, 1)
    }

    #[test]
    fn sentinel_resolves_to_empty_slot() {
        let order = DspOrder::new([
            StageKind::Phaser,
            StageKind::EndOfList,
            StageKind::Chorus,
            StageKind::OverDrive,
            StageKind::GeneralFilter,
        ]);
        let chain = ResolvedChain::resolve(&order, |_| false);

        assert_eq!(chain.slots()[1], Slot::default());
        assert_eq!(chain.slots()[0].kind, Some(StageKind::Phaser));
        assert_eq!(chain.active_count(), 4);
    }

    #[test]
    fn bypass_flags_follow_kind() {
        let chain = ResolvedChain::resolve(&DspOrder::default(), |k| k == StageKind::Chorus);
        for slot in chain.slots() {
            assert_eq!(slot.bypassed, slot.kind == Some(StageKind::Chorus));
        }
    }

    #[test]
    fn unset_chain_is_identity() {
        let mut rack = StageRack::new(&spec());
        let chain = ResolvedChain::resolve(&DspOrder::unset(), |_| false);
        let input: Vec<f32> = (0..64).map(|i| (i as f32 * 0.3).sin()).collect();
        let mut block = input.clone();

        chain.run(&mut rack, &mut block);

        assert_eq!(block, input);
        assert_eq!(chain.active_count(), 0);
    }

    #[test]
    fn repeated_kind_runs_the_same_instance_twice() {
        let mut once = StageRack::new(&spec());
        let mut twice = StageRack::new(&spec());
        for rack in [&mut once, &mut twice] {
            rack.stage_mut(StageKind::OverDrive)
                .unwrap()
                .set_parameter("saturation", 4.0)
                .unwrap();
        }

        let single = DspOrder::new([
            StageKind::OverDrive,
            StageKind::EndOfList,
            StageKind::EndOfList,
            StageKind::EndOfList,
            StageKind::EndOfList,
        ]);
        let double = DspOrder::new([
            StageKind::OverDrive,
            StageKind::EndOfList,
            StageKind::OverDrive,
            StageKind::EndOfList,
            StageKind::EndOfList,
        ]);

        let mut a = vec![0.2f32; 8];
        let mut b = a.clone();
        ResolvedChain::resolve(&single, |_| false).run(&mut once, &mut a);
        ResolvedChain::resolve(&double, |_| false).run(&mut twice, &mut b);

        let expected = twice
            .stage_mut(StageKind::OverDrive)
            .unwrap()
            .process(a[0]);
        assert!((b[0] - expected).abs() < 1e-6);
    }
}
