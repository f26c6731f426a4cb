//! File-backed substitution store shared across runs.
//!
//! The backing file is a JSON object keyed by the character itself. Values
//! are either a full entry (`{"replacement": ..., "name": ...}`) or a bare
//! replacement string, the legacy form still found in older store files.
//! Saves go through a sibling temp file and a rename so a prior mapping is
//! never left half-written.
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Where a mapping came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Learned,
    Builtin,
}

fn default_origin() -> Origin {
    Origin::Learned
}

/// One stored mapping. The triggering character is the map key, never part
/// of the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionEntry {
    pub replacement: String,
    pub name: String,
    #[serde(default = "default_origin")]
    pub origin: Origin,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredValue {
    Entry(SubstitutionEntry),
    Legacy(String),
}

/// Keyed mapping from character to replacement, with explicit load/save.
#[derive(Debug, Default)]
pub struct SubstitutionStore {
    path: Option<PathBuf>,
    entries: BTreeMap<char, SubstitutionEntry>,
}

impl SubstitutionStore {
    /// Open a store backed by `path`. A missing or empty file is an empty
    /// store, not an error.
    pub fn load(path: &Path) -> Result<Self> {
        let mut store = Self {
            path: Some(path.to_path_buf()),
            entries: BTreeMap::new(),
        };
        if !path.exists() {
            return Ok(store);
        }
        let text = fs::read_to_string(path)?;
        if text.trim().is_empty() {
            return Ok(store);
        }
        let raw: BTreeMap<String, StoredValue> = serde_json::from_str(&text)?;
        for (key, value) in raw {
            let mut chars = key.chars();
            let (Some(ch), None) = (chars.next(), chars.next()) else {
                tracing::warn!(key = %key, "ignoring store key that is not a single character");
                continue;
            };
            let entry = match value {
                StoredValue::Entry(entry) => entry,
                StoredValue::Legacy(replacement) => SubstitutionEntry {
                    replacement,
                    name: crate::inventory::character_name(ch),
                    origin: Origin::Learned,
                },
            };
            store.entries.insert(ch, entry);
        }
        Ok(store)
    }

    /// In-memory store with no backing file; `save` keeps state but writes
    /// nothing. Used by tests and callers that inject scripted mappings.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn get(&self, ch: char) -> Option<&SubstitutionEntry> {
        self.entries.get(&ch)
    }

    pub fn contains(&self, ch: char) -> bool {
        self.entries.contains_key(&ch)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace the mapping for `ch`. The replacement is sanitized
    /// before storage.
    pub fn insert(&mut self, ch: char, replacement: &str, name: &str, origin: Origin) {
        self.entries.insert(
            ch,
            SubstitutionEntry {
                replacement: sanitize_replacement(replacement),
                name: name.to_string(),
                origin,
            },
        );
    }

    /// Persist the current mapping. Writes a temp sibling first and renames
    /// it over the target so readers never observe a partial file.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let raw: BTreeMap<String, &SubstitutionEntry> = self
            .entries
            .iter()
            .map(|(ch, entry)| (ch.to_string(), entry))
            .collect();
        let bytes = serde_json::to_vec_pretty(&raw)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("store");
        let tmp_path = path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(format!(".{file_name}.tmp"));
        fs::write(&tmp_path, bytes)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

/// Trim and strip inner line breaks from operator-supplied replacement text.
pub fn sanitize_replacement(text: &str) -> String {
    text.trim().replace(['\r', '\n'], "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = SubstitutionStore::load(&dir.path().join("absent.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("store.json");
        let mut store = SubstitutionStore::load(&path).unwrap();
        store.insert('\u{e9}', "\\'e", "LATIN SMALL LETTER E WITH ACUTE", Origin::Learned);
        store.insert('\u{2014}', "---", "EM DASH", Origin::Builtin);
        store.save().unwrap();

        let reloaded = SubstitutionStore::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get('\u{e9}'), store.get('\u{e9}'));
        assert_eq!(reloaded.get('\u{2014}'), store.get('\u{2014}'));
    }

    #[test]
    fn backslashes_in_replacements_survive_the_round_trip() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("store.json");
        let mut store = SubstitutionStore::load(&path).unwrap();
        store.insert('\u{f6}', "\\\"o", "LATIN SMALL LETTER O WITH DIAERESIS", Origin::Learned);
        store.save().unwrap();

        let reloaded = SubstitutionStore::load(&path).unwrap();
        assert_eq!(reloaded.get('\u{f6}').unwrap().replacement, "\\\"o");
    }

    #[test]
    fn legacy_bare_string_values_load_with_derived_names() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("store.json");
        fs::write(&path, "{\"\u{e9}\": \"e\"}").unwrap();

        let store = SubstitutionStore::load(&path).unwrap();
        let entry = store.get('\u{e9}').expect("legacy entry");
        assert_eq!(entry.replacement, "e");
        assert_eq!(entry.name, "LATIN SMALL LETTER E WITH ACUTE");
        assert_eq!(entry.origin, Origin::Learned);
    }

    #[test]
    fn insert_sanitizes_replacement_text() {
        let mut store = SubstitutionStore::in_memory();
        store.insert('\u{e9}', "  e\n ", "LATIN SMALL LETTER E WITH ACUTE", Origin::Learned);
        assert_eq!(store.get('\u{e9}').unwrap().replacement, "e");
    }
}
