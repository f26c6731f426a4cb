//! Input decoding with a fallback chain.
//!
//! UTF-8 is preferred. On failure the bytes are reinterpreted once (BOM
//! stripped) and finally transliterated from Latin-1, which covers the
//! single-byte legacy files still in circulation. Output is always UTF-8
//! regardless of what the input was.
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Read a bibliography file, decoding through the fallback chain.
pub fn read_input(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    let bytes = fs::read(path)?;
    decode(&bytes).map_err(|reason| Error::DecodingFailure {
        path: path.to_path_buf(),
        reason,
    })
}

fn decode(bytes: &[u8]) -> std::result::Result<String, String> {
    match std::str::from_utf8(bytes) {
        Ok(text) => return Ok(text.to_string()),
        Err(err) => tracing::debug!(%err, "input is not valid UTF-8; trying reinterpretation"),
    }

    // Reinterpretation attempt: a BOM-prefixed file whose remainder is
    // valid UTF-8.
    let stripped = bytes.strip_prefix(&UTF8_BOM).unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(stripped) {
        return Ok(text.to_string());
    }

    // Latin-1 transliteration maps every byte, so guard against binary
    // input before accepting it.
    if bytes.contains(&0) {
        return Err("input contains NUL bytes; not a text file".to_string());
    }
    tracing::debug!("falling back to Latin-1 transliteration");
    Ok(bytes.iter().map(|&b| b as char).collect())
}
