//! CLI argument parsing for the proceedings pipeline.
//!
//! The CLI is intentionally thin: it wires policy flags into the core
//! components without embedding any processing logic, so the same pipeline
//! can be driven from tests with scripted inputs.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// File that persists learned substitutions next to the input by default.
pub const DEFAULT_STORE_FILE: &str = "unicode_replacements.json";

/// Root CLI entrypoint for the volume pipeline.
#[derive(Parser, Debug)]
#[command(
    name = "volpress",
    version,
    about = "Proceedings volume ingestion and publication record builder",
    after_help = "Commands:\n  tidy-unicode INPUT [OUTPUT]   Resolve non-ASCII characters against the substitution store\n  audit INPUT [OUTPUT]          Scan for structural defects; optionally apply the percent fix\n  build INPUT --volume N        Build per-publication records for a volume\n\nExamples:\n  volpress tidy-unicode volume.bib --accept-all --strict\n  volpress audit volume.bib volume_cleaned.bib --fix-percent\n  volpress build volume.bib --volume 42 --software-file software.csv",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level pipeline commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    TidyUnicode(TidyArgs),
    Audit(AuditArgs),
    Build(BuildArgs),
}

/// Tidy command inputs for the Unicode substitution pass.
#[derive(Parser, Debug)]
#[command(about = "Replace non-ASCII characters using the substitution store")]
pub struct TidyArgs {
    /// Bibliography file to clean
    pub input: PathBuf,

    /// Output path; defaults to the input with a `_clean` suffix
    pub output: Option<PathBuf>,

    /// Substitution store file; defaults to one next to the input
    #[arg(long, value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// Automatically accept all stored substitutions (no prompt)
    #[arg(long)]
    pub accept_all: bool,

    /// Fail when a character has no stored substitution
    #[arg(long)]
    pub strict: bool,

    /// Prompt for every character even when a substitution is stored
    #[arg(long)]
    pub interactive: bool,

    /// Print extra information during processing
    #[arg(long)]
    pub verbose: bool,

    /// Suppress all non-essential output, including the summary
    #[arg(long)]
    pub quiet: bool,
}

/// Audit command inputs for the structural defect scan.
#[derive(Parser, Debug)]
#[command(about = "Audit raw entries for structural defects")]
pub struct AuditArgs {
    /// Bibliography file to audit
    pub input: PathBuf,

    /// Output path; defaults to the input with a `_cleaned` suffix
    pub output: Option<PathBuf>,

    /// Fail when issues are found and no fix was applied
    #[arg(long)]
    pub strict: bool,

    /// Escape unescaped % characters in titles and abstracts
    #[arg(long)]
    pub fix_percent: bool,

    /// Report empty author slots (double commas); never auto-fixed
    #[arg(long)]
    pub check_author_commas: bool,

    /// Apply all automatic fixes
    #[arg(long)]
    pub fix_all: bool,

    /// Print extra information during processing
    #[arg(long)]
    pub verbose: bool,

    /// Suppress all non-essential output
    #[arg(long)]
    pub quiet: bool,
}

/// Build command inputs for the full record pipeline.
#[derive(Parser, Debug)]
#[command(about = "Build per-publication records for one volume")]
pub struct BuildArgs {
    /// Bibliography file describing the volume
    pub input: PathBuf,

    /// Volume number to build
    #[arg(
        short = 'v',
        long,
        value_name = "N",
        required_unless_present = "reissue"
    )]
    pub volume: Option<u32>,

    /// Build the volume as a reissue instead
    #[arg(short = 'r', long, value_name = "N", conflicts_with = "volume")]
    pub reissue: Option<u32>,

    /// Two-column key,url table of software links
    #[arg(short = 's', long, value_name = "PATH")]
    pub software_file: Option<PathBuf>,

    /// Two-column key,url table of video links
    #[arg(short = 'V', long, value_name = "PATH")]
    pub video_file: Option<PathBuf>,

    /// Two-column key,url table of supplementary links
    #[arg(short = 'S', long, value_name = "PATH")]
    pub supplementary_file: Option<PathBuf>,

    /// Label attached to table-supplied supplementary links
    #[arg(
        short = 'l',
        long,
        value_name = "LABEL",
        default_value = "Supplementary Material"
    )]
    pub supplementary_label: String,

    /// Directory the record files are written into
    #[arg(long, value_name = "DIR", default_value = "_records")]
    pub out_dir: PathBuf,

    /// Directory containing the volume's assets/ tree
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub assets_dir: PathBuf,

    /// Substitution store file; defaults to one next to the input
    #[arg(long, value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// Print extra information during processing
    #[arg(long)]
    pub verbose: bool,

    /// Suppress all non-essential output
    #[arg(long)]
    pub quiet: bool,
}
