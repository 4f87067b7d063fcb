//! Durable set of natural keys that have already been delivered.
//! Kept apart from the opportunity store so delivery idempotence
//! survives a store rebuild.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::info;

pub struct SeenSet {
    path: PathBuf,
    keys: Mutex<HashSet<String>>,
}

impl SeenSet {
    /// Load the set from disk. A missing file is an empty set; a corrupt
    /// file is a startup error — silently resetting it would re-deliver
    /// everything ever sent.
    pub fn load(path: &Path) -> Result<Self> {
        let keys = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read seen-set file {}", path.display()))?;
            let list: Vec<String> = serde_json::from_str(&content)
                .with_context(|| format!("corrupt seen-set file {}", path.display()))?;
            let set: HashSet<String> = list.into_iter().collect();
            info!(path = %path.display(), keys = set.len(), "Loaded seen-set");
            set
        } else {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create seen-set directory {}", parent.display())
                    })?;
                }
            }
            info!(path = %path.display(), "Seen-set file not found, starting empty");
            HashSet::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            keys: Mutex::new(keys),
        })
    }

    pub fn is_sent(&self, key: &str) -> bool {
        self.keys.lock().expect("seen-set lock poisoned").contains(key)
    }

    /// Commit a batch of keys. All-or-none on disk: the file is rewritten
    /// to a temp file in the same directory and renamed over the old one.
    /// The in-memory set only picks up the batch once the rename landed.
    pub fn mark_sent(&self, new_keys: &[String]) -> Result<()> {
        if new_keys.is_empty() {
            return Ok(());
        }

        let mut guard = self.keys.lock().expect("seen-set lock poisoned");
        let mut merged = guard.clone();
        merged.extend(new_keys.iter().cloned());

        let mut sorted: Vec<&String> = merged.iter().collect();
        sorted.sort();
        let json = serde_json::to_string_pretty(&sorted)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
        tmp.write_all(json.as_bytes())
            .context("failed to write seen-set")?;
        tmp.persist(&self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;

        *guard = merged;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.keys.lock().expect("seen-set lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let seen = SeenSet::load(&dir.path().join("sent.json")).unwrap();
        assert!(seen.is_empty());
        assert!(!seen.is_sent("remotive_1"));
    }

    #[test]
    fn mark_sent_is_read_your_writes_and_durable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent.json");

        let seen = SeenSet::load(&path).unwrap();
        seen.mark_sent(&["remotive_1".to_string(), "upwork_a".to_string()])
            .unwrap();
        assert!(seen.is_sent("remotive_1"));
        assert!(seen.is_sent("upwork_a"));
        assert!(!seen.is_sent("wwr_x"));

        // Reload from disk — the batch survived.
        let reloaded = SeenSet::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.is_sent("upwork_a"));
    }

    #[test]
    fn marking_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent.json");
        let seen = SeenSet::load(&path).unwrap();

        seen.mark_sent(&["k1".to_string()]).unwrap();
        seen.mark_sent(&["k1".to_string(), "k2".to_string()]).unwrap();
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn corrupt_file_is_a_startup_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent.json");
        std::fs::write(&path, "not json at all").unwrap();
        assert!(SeenSet::load(&path).is_err());
    }

    #[test]
    fn nested_directories_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep/nested/sent.json");
        let seen = SeenSet::load(&path).unwrap();
        seen.mark_sent(&["k".to_string()]).unwrap();
        assert!(path.exists());
    }
}
