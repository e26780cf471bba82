use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::audio::engine::EngineHandle;
use crate::state::PersistedState;

pub mod manager;

pub use manager::Manager;

/// A named engine snapshot: every parameter plus the chain order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub state: PersistedState,
}

impl Default for Preset {
    fn default() -> Self {
        Self::new("Init".to_string(), PersistedState::default())
    }
}

impl Preset {
    pub const fn new(name: String, state: PersistedState) -> Self {
        Self {
            name,
            description: None,
            author: None,
            state,
        }
    }

    /// Snapshot what the engine is running right now.
    pub fn capture(name: &str, handle: &EngineHandle) -> Self {
        Self::new(name.to_string(), handle.capture_state())
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    /// Read a single preset file. The embedded state is validated like a
    /// restored blob.
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read(path)
            .with_context(|| format!("failed to read preset file {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("invalid preset file {}", path.display()))
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let preset: Self = serde_json::from_slice(bytes).context("failed to parse preset JSON")?;
        let state = serde_json::to_vec(&preset.state).context("failed to re-encode preset state")?;
        PersistedState::from_bytes(&state)?;
        Ok(preset)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize preset")
    }
}
