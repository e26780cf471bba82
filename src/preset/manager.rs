use super::Preset;
use anyhow::{Context, Result, bail};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory of `*.json` presets, kept sorted by name.
pub struct Manager {
    presets_dir: PathBuf,
    presets: Vec<Preset>,
}

impl Manager {
    pub fn new(preset_dir: impl AsRef<Path>) -> Result<Self> {
        let presets_dir = preset_dir.as_ref().to_path_buf();
        fs::create_dir_all(&presets_dir).with_context(|| {
            format!("failed to create presets directory {}", presets_dir.display())
        })?;

        let mut manager = Self {
            presets_dir,
            presets: Vec::new(),
        };

        manager.load_presets()?;

        Ok(manager)
    }

    pub fn dir(&self) -> &Path {
        &self.presets_dir
    }

    pub fn load_presets(&mut self) -> Result<()> {
        self.presets.clear();

        let entries = fs::read_dir(&self.presets_dir).with_context(|| {
            format!("failed to list presets in {}", self.presets_dir.display())
        })?;

        for entry in entries {
            let path = entry?.path();

            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            match Preset::load_file(&path) {
                Ok(preset) => self.presets.push(preset),
                Err(e) => warn!("Skipping preset {}: {e:#}", path.display()),
            }
        }

        self.presets.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("Loaded {} preset(s) from {}", self.presets.len(), self.presets_dir.display());

        Ok(())
    }

    /// Write `preset` to disk, replacing any preset with the same file name.
    pub fn save_preset(&mut self, preset: &Preset) -> Result<PathBuf> {
        let path = self.path_for(&preset.name);
        fs::write(&path, preset.to_json()?)
            .with_context(|| format!("failed to write preset file {}", path.display()))?;

        self.load_presets()?;

        Ok(path)
    }

    pub fn delete_preset(&mut self, preset_name: &str) -> Result<()> {
        let path = self.path_for(preset_name);

        if !path.exists() {
            bail!("preset file not found: {preset_name}");
        }

        fs::remove_file(&path)
            .with_context(|| format!("failed to delete preset file {}", path.display()))?;
        self.load_presets()
    }

    pub fn preset_exists(&self, name: &str) -> bool {
        self.presets.iter().any(|p| p.name == name)
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.iter().map(|p| p.name.as_str())
    }

    pub fn get_preset_by_name(&self, name: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.name == name)
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.presets_dir
            .join(format!("{}.json", sanitize_filename(name)))
    }
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::order::DspOrder;
    use crate::params::ParameterSet;
    use crate::state::PersistedState;

    fn preset(name: &str, order: &str) -> Preset {
        let order: DspOrder = order.parse().unwrap();
        Preset::new(
            name.to_string(),
            PersistedState::capture(&ParameterSet::new(), order),
        )
    }

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize_filename("Warm Lead / v2"), "Warm_Lead___v2");
        assert_eq!(sanitize_filename("clean-1_a"), "clean-1_a");
    }

    #[test]
    fn save_load_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = Manager::new(dir.path()).unwrap();
        assert!(manager.presets().is_empty());

        manager
            .save_preset(
                &preset("Zebra", "phaser,chorus")
                    .with_author("me")
                    .with_description("slow sweep"),
            )
            .unwrap();
        manager.save_preset(&preset("Alpha", "filter")).unwrap();

        let reopened = Manager::new(dir.path()).unwrap();
        assert_eq!(reopened.names().collect::<Vec<_>>(), vec!["Alpha", "Zebra"]);
        let zebra = reopened.get_preset_by_name("Zebra").unwrap();
        assert_eq!(zebra.author.as_deref(), Some("me"));
        assert_eq!(zebra.description.as_deref(), Some("slow sweep"));
        assert_eq!(zebra.state.order(), "phaser,chorus".parse::<DspOrder>().unwrap());

        manager.delete_preset("Zebra").unwrap();
        assert!(!manager.preset_exists("Zebra"));
        assert!(manager.delete_preset("Zebra").is_err());
    }

    #[test]
    fn broken_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{ nope").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::write(
            dir.path().join("bad_state.json"),
            r#"{"name":"Bad","description":null,"author":null,"state":{"version":7,"dsp_order":[0,1,2,3,4]}}"#,
        )
        .unwrap();

        let manager = Manager::new(dir.path()).unwrap();
        assert!(manager.presets().is_empty());
    }
}
