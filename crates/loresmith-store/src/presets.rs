//! File-backed persistence for named book presets.

use crate::error::PresetError;
use crate::model::Preset;
use log::{debug, info};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Preset store persisting a single JSON file.
#[derive(Debug, Clone)]
pub struct FilePresetStore {
    path: PathBuf,
}

impl FilePresetStore {
    /// Create a store at the given file path, creating parent directories.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, PresetError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        debug!("preset store at {}", path.display());
        Ok(Self { path })
    }

    /// Load all presets; a missing file is an empty list.
    pub fn list(&self) -> Result<Vec<Preset>, PresetError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&data)?)
    }

    /// Look up a preset by name.
    pub fn get(&self, name: &str) -> Result<Option<Preset>, PresetError> {
        Ok(self.list()?.into_iter().find(|preset| preset.name == name))
    }

    /// Insert or replace a preset by name.
    pub fn save(&self, preset: Preset) -> Result<(), PresetError> {
        let mut presets = self.list()?;
        match presets.iter_mut().find(|existing| existing.name == preset.name) {
            Some(existing) => *existing = preset,
            None => presets.push(preset),
        }
        self.write_all(&presets)
    }

    /// Delete a preset by name; returns whether it existed.
    pub fn delete(&self, name: &str) -> Result<bool, PresetError> {
        let mut presets = self.list()?;
        let before = presets.len();
        presets.retain(|preset| preset.name != name);
        if presets.len() == before {
            return Ok(false);
        }
        self.write_all(&presets)?;
        info!("deleted preset {name}");
        Ok(true)
    }

    /// Rewrite the preset file atomically.
    fn write_all(&self, presets: &[Preset]) -> Result<(), PresetError> {
        let temp_path = self.path.with_extension("json.tmp");
        {
            let mut file = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&temp_path)?;
            let data = serde_json::to_string_pretty(presets)?;
            file.write_all(data.as_bytes())?;
        }
        fs::rename(temp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::FilePresetStore;
    use crate::model::Preset;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn preset(name: &str, books: &[&str]) -> Preset {
        Preset {
            name: name.to_string(),
            books: books.iter().map(|book| book.to_string()).collect(),
        }
    }

    #[test]
    fn missing_file_lists_empty() {
        let temp = tempdir().expect("tempdir");
        let store = FilePresetStore::new(temp.path().join("presets.json")).expect("store");
        assert_eq!(store.list().expect("list"), Vec::new());
    }

    #[test]
    fn save_upserts_by_name() {
        let temp = tempdir().expect("tempdir");
        let store = FilePresetStore::new(temp.path().join("presets.json")).expect("store");

        store.save(preset("fantasy", &["dragons"])).expect("save");
        store
            .save(preset("fantasy", &["dragons", "castles"]))
            .expect("save again");
        store.save(preset("scifi", &["stations"])).expect("save other");

        let presets = store.list().expect("list");
        assert_eq!(presets.len(), 2);
        assert_eq!(presets[0].books, vec!["dragons", "castles"]);
    }

    #[test]
    fn delete_reports_existence() {
        let temp = tempdir().expect("tempdir");
        let store = FilePresetStore::new(temp.path().join("presets.json")).expect("store");
        store.save(preset("fantasy", &["dragons"])).expect("save");

        assert!(store.delete("fantasy").expect("delete"));
        assert!(!store.delete("fantasy").expect("delete again"));
        assert_eq!(store.get("fantasy").expect("get"), None);
    }
}
