pub mod chain;
pub mod order;
pub mod queue;
pub mod stages;

pub use chain::{ResolvedChain, Slot};
pub use order::{DspOrder, STAGE_COUNT, SharedOrder, StageKind};
pub use stages::{ProcessSpec, Stage, StageRack};
