//! Error taxonomy for the ingestion pipeline.
//!
//! Fatal conditions abort the run; `MissingAuthorField` is the one
//! per-entry recoverable kind and is caught at the assembly loop.
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Input bibliography file does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Every decode attempt (UTF-8, reinterpretation, Latin-1) failed.
    #[error("could not decode {path}: {reason}")]
    DecodingFailure { path: PathBuf, reason: String },

    /// A character had no stored or supplied replacement under strict policy.
    #[error("no substitution found for character '{ch}' ({name}) in strict mode")]
    UnresolvableSubstitution { ch: char, name: String },

    /// An abstract contained raw non-ASCII characters.
    #[error("abstract in entry '{entry}' contains raw Unicode characters: {chars}; replace them with LaTeX commands")]
    AbstractEncodingViolation { entry: String, chars: String },

    /// A person name decomposed to an empty given or family part.
    #[error("entry '{entry}': the {part} name of {field} {index} is empty or invalid")]
    MalformedPersonName {
        entry: String,
        field: &'static str,
        index: usize,
        part: &'static str,
    },

    /// Author list missing or unusable. Recoverable: the entry is skipped.
    #[error("entry '{entry}' has a missing or malformed author field")]
    MissingAuthorField { entry: String },

    /// The primary document asset for a record is not on disk.
    #[error("expected asset {0} is not present")]
    MissingExpectedAsset(PathBuf),

    /// Structural issues escalated by strict mode.
    #[error("{count} structural issue(s) found in strict mode")]
    StructuralIssues { count: usize },

    /// Raw entry text that the entry scanner could not shape into fields.
    #[error("malformed entry: {0}")]
    MalformedEntry(String),

    /// A date field that would not parse as a calendar date.
    #[error("entry '{entry}': could not parse {field} date '{value}'")]
    MalformedDate {
        entry: String,
        field: String,
        value: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
