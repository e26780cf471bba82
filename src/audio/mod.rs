pub mod buffer;
pub mod engine;
pub mod offline;
pub mod wav;

pub use buffer::AudioBuffer;
pub use engine::{Engine, EngineConfig, EngineHandle};
