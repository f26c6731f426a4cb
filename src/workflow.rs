//! Orchestration of the three pipeline commands.
//!
//! Each run is strictly sequential: one entry is processed fully before the
//! next begins, because stub disambiguation and store writes are functions
//! of the entries seen so far. The only suspension point is the interactive
//! substitution prompt.
use crate::assemble::{self, ArtifactAssembler, LinkTables};
use crate::audit::{self, IssueKind};
use crate::autofix;
use crate::bib;
use crate::cli::{AuditArgs, BuildArgs, TidyArgs, DEFAULT_STORE_FILE};
use crate::encoding;
use crate::error::Error;
use crate::inventory;
use crate::links::load_link_table;
use crate::normalize::{CanonicalRecord, RecordNormalizer};
use crate::resolver::{self, ConsolePrompter, ResolvePolicy};
use crate::rewrite;
use crate::store::SubstitutionStore;
use crate::volume::{VolumeContext, VolumeType};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Run the Unicode substitution pass over one file.
pub fn run_tidy(args: &TidyArgs) -> Result<()> {
    let text = encoding::read_input(&args.input)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| derived_output(&args.input, "_clean"));
    let store_path = store_path(args.store.as_deref(), &args.input);
    tracing::debug!(
        input = %args.input.display(),
        output = %output.display(),
        store = %store_path.display(),
        "tidy-unicode configuration"
    );

    let chars = inventory::scan_non_ascii(&text);
    if chars.is_empty() {
        if !args.quiet {
            println!("No Unicode characters found. No changes made.");
        }
        if output != args.input {
            fs::write(&output, &text).with_context(|| format!("write {}", output.display()))?;
        }
        return Ok(());
    }
    for &ch in &chars {
        tracing::debug!(%ch, name = %inventory::character_name(ch), "found non-ASCII character");
    }

    let mut store = SubstitutionStore::load(&store_path)?;
    let policy = ResolvePolicy {
        auto_accept: args.accept_all,
        strict: args.strict,
        // Prompting is the default; batch flags opt out of it.
        interactive: args.interactive || (!args.accept_all && !args.strict),
        verbose: args.verbose,
        quiet: args.quiet,
    };
    let mut prompter = ConsolePrompter;
    let resolution = resolver::resolve_all(&chars, &mut store, &policy, &mut prompter)?;

    let outcome = rewrite::rewrite(&text, &resolution.map);
    fs::write(&output, &outcome.text).with_context(|| format!("write {}", output.display()))?;

    if args.verbose && !args.quiet {
        println!("Cleaned file written to {}", output.display());
    }
    if !args.quiet && !outcome.counts.is_empty() {
        println!(
            "{} replacements made: [{}]",
            outcome.total(),
            outcome.summary(&resolution.map)
        );
    }
    Ok(())
}

/// Run the structural audit, optionally applying the percent fix.
pub fn run_audit(args: &AuditArgs) -> Result<()> {
    let text = encoding::read_input(&args.input)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| derived_output(&args.input, "_cleaned"));

    let issues = audit::audit(&text);
    let mut cleaned = text;
    let mut fixes: Vec<String> = Vec::new();
    if args.fix_percent || args.fix_all {
        let outcome = autofix::fix_unescaped_percent(&cleaned);
        if outcome.replacements > 0 {
            fixes.push(outcome.summary());
        }
        cleaned = outcome.text;
    }

    if args.check_author_commas || args.fix_all {
        let empty_slots = issues
            .iter()
            .filter(|issue| matches!(issue.kind, IssueKind::EmptyAuthorSlot))
            .count();
        if empty_slots > 0 && !args.quiet {
            println!("Found {empty_slots} empty author field(s) that need manual review");
        }
    }

    if !issues.is_empty() && !args.quiet {
        println!("Issues found:");
        for issue in &issues {
            println!("  - {}", issue.message);
        }
    }
    if !fixes.is_empty() && !args.quiet {
        println!("Fixes applied:");
        for fix in &fixes {
            println!("  - {fix}");
        }
    }

    if args.strict && !issues.is_empty() && fixes.is_empty() {
        return Err(Error::StructuralIssues {
            count: issues.len(),
        }
        .into());
    }

    fs::write(&output, &cleaned).with_context(|| format!("write {}", output.display()))?;
    if !args.quiet {
        println!("Cleaned file written to {}", output.display());
        if !issues.is_empty() && fixes.is_empty() {
            println!(
                "Warning: issues found but no fixes applied. Use --fix-percent or --fix-all to apply fixes."
            );
        }
    }
    Ok(())
}

/// Build per-publication records for a volume.
pub fn run_build(args: &BuildArgs) -> Result<()> {
    let (volume_no, volume_type) = match (args.volume, args.reissue) {
        (_, Some(number)) => (number, VolumeType::Reissue),
        (Some(number), None) => (number, VolumeType::Volume),
        (None, None) => anyhow::bail!("a volume or reissue number is required"),
    };

    let text = encoding::read_input(&args.input)?;

    // The build always runs the substitution pass in its batch form: stored
    // answers are accepted, unknown characters abort.
    let store_path = store_path(args.store.as_deref(), &args.input);
    let mut store = SubstitutionStore::load(&store_path)?;
    let chars = inventory::scan_non_ascii(&text);
    let policy = ResolvePolicy {
        auto_accept: true,
        strict: true,
        interactive: false,
        verbose: args.verbose,
        quiet: args.quiet,
    };
    let resolution = resolver::resolve_all(&chars, &mut store, &policy, &mut ConsolePrompter)?;
    let outcome = rewrite::rewrite(&text, &resolution.map);
    let cleaned_path = derived_output(&args.input, "_clean");
    fs::write(&cleaned_path, &outcome.text)
        .with_context(|| format!("write {}", cleaned_path.display()))?;
    if outcome.total() > 0 {
        tracing::debug!(replacements = outcome.total(), "applied stored substitutions");
    }

    let entries = bib::parse_entries(&outcome.text)?;
    let proceedings = bib::entries_of_type(&entries, "proceedings")
        .into_iter()
        .next()
        .ok_or_else(|| Error::MalformedEntry("no proceedings entry in input".to_string()))?;

    let normalizer = RecordNormalizer::new();
    let context = VolumeContext::from_entry(proceedings, volume_no, volume_type, normalizer.decoder())?;
    if !args.quiet {
        println!(
            "Volume {}: {}, published {}",
            context.volume_label,
            context.booktitle,
            context.published.format("%Y-%m-%d")
        );
    }

    let tables = LinkTables {
        software: load_link_table(args.software_file.as_deref())?,
        video: load_link_table(args.video_file.as_deref())?,
        supplementary: load_link_table(args.supplementary_file.as_deref())?,
        supplementary_label: args.supplementary_label.clone(),
    };
    let mut assembler = ArtifactAssembler::new(&context, tables, &args.assets_dir);

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create {}", args.out_dir.display()))?;
    for entry in bib::entries_of_type(&entries, "inproceedings") {
        let record = normalizer.normalize(entry, &context)?;
        if let Some(record) = assembler.assemble(record)? {
            write_record(&args.out_dir, &record)?;
        }
    }

    let counts = assembler.counts();
    if !args.quiet {
        println!(
            "Processed {} entries, skipped {} due to errors.",
            counts.processed, counts.skipped
        );
    }
    Ok(())
}

fn write_record(out_dir: &Path, record: &CanonicalRecord) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(record).context("serialize record")?;
    let path = out_dir.join(assemble::record_filename(record));
    fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))?;
    tracing::debug!(record = %record.id, path = %path.display(), "wrote record");
    Ok(())
}

/// Derive a sibling output path: `volume.bib` -> `volume_clean.bib`.
fn derived_output(input: &Path, suffix: &str) -> PathBuf {
    let name = input
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("input.bib");
    let derived = match name.strip_suffix(".bib") {
        Some(stem) => format!("{stem}{suffix}.bib"),
        None => format!("{name}{suffix}"),
    };
    input.with_file_name(derived)
}

fn store_path(explicit: Option<&Path>, input: &Path) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => input
            .parent()
            .map(|parent| parent.join(DEFAULT_STORE_FILE))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_FILE)),
    }
}
