//! External link tables for software, video, and supplementary URLs.
//!
//! Each table is a two-column `key,url` CSV with no header row. An absent
//! table is valid and loads as an empty map.
use crate::error::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Load a link table keyed by original entry key.
pub fn load_link_table(path: Option<&Path>) -> Result<BTreeMap<String, String>> {
    let Some(path) = path else {
        return Ok(BTreeMap::new());
    };
    if !path.exists() {
        tracing::warn!(path = %path.display(), "link table not found; treating as empty");
        return Ok(BTreeMap::new());
    }
    let text = fs::read_to_string(path)?;
    let mut table = BTreeMap::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some((key, url)) = trimmed.split_once(',') else {
            tracing::warn!(line = %trimmed, "link table row has no comma; skipping");
            continue;
        };
        table.insert(
            unquote(key.trim()).to_string(),
            unquote(url.trim()).to_string(),
        );
    }
    Ok(table)
}

fn unquote(field: &str) -> &str {
    field
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(field)
}
