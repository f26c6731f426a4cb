//! Per-entry assembly: identifier assignment, link-table merges, asset
//! validation, and extras discovery.
//!
//! Assembly is strictly sequential. Stub suffixes depend on the entries
//! already seen, so processing order must follow the source file. A missing
//! author list skips the entry and the run continues; a missing primary
//! asset aborts the whole run.
use crate::error::{Error, Result};
use crate::ident::IdentifierAssigner;
use crate::normalize::{CanonicalRecord, Extra, Issued};
use crate::volume::{VolumeContext, VolumeType, PUBLISHER};
use chrono::Datelike;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Raw-content host that serves committed volume assets.
pub const DEFAULT_ASSET_URL_BASE: &str = "https://raw.githubusercontent.com/mlresearch";
/// Site that serves volumes still stored in the legacy layout.
pub const SITE_URL: &str = "https://proceedings.mlr.press";

/// Externally supplied link tables, keyed by original entry key.
#[derive(Debug, Default)]
pub struct LinkTables {
    pub software: BTreeMap<String, String>,
    pub video: BTreeMap<String, String>,
    pub supplementary: BTreeMap<String, String>,
    pub supplementary_label: String,
}

/// Running totals reported at the end of a build.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssemblyCounts {
    pub processed: usize,
    pub skipped: usize,
}

pub struct ArtifactAssembler<'a> {
    context: &'a VolumeContext,
    tables: LinkTables,
    assets_root: PathBuf,
    assigner: IdentifierAssigner,
    counts: AssemblyCounts,
}

impl<'a> ArtifactAssembler<'a> {
    pub fn new(context: &'a VolumeContext, tables: LinkTables, assets_root: &Path) -> Self {
        Self {
            context,
            tables,
            assets_root: assets_root.to_path_buf(),
            assigner: IdentifierAssigner::new(),
            counts: AssemblyCounts::default(),
        }
    }

    pub fn counts(&self) -> AssemblyCounts {
        self.counts
    }

    /// Enrich one normalized record. Returns `None` when the entry is
    /// skipped for a missing author list; the skip is counted and the run
    /// continues.
    pub fn assemble(&mut self, mut record: CanonicalRecord) -> Result<Option<CanonicalRecord>> {
        let mut date = self.context.stub_date();

        if self.context.volume_type == VolumeType::Reissue {
            record.note = Some(format!(
                "Reissued by {PUBLISHER} on {}.",
                self.context.published.format("%d %B %Y")
            ));
        }

        // Cyclic volumes stamp each record with its own section's date.
        if let Some(section_name) = record.section.clone() {
            if let Some((index, section)) = self.context.section_named(&section_name) {
                if let Some(section_date) = section.published {
                    date = section_date;
                    record.number = Some(index + 1);
                }
            }
        }
        record.date = Some(date);

        record.address = self.context.address.clone();
        record.publisher = PUBLISHER.to_string();
        record.container_title = Some(self.context.booktitle.clone());
        record.volume = Some(self.context.volume_label.clone());
        record.genre = Some(record.layout.clone());
        record.issued = Some(Issued {
            date_parts: vec![
                date.year(),
                i32::try_from(date.month()).unwrap_or_default(),
                i32::try_from(date.day()).unwrap_or_default(),
            ],
        });

        // The one recoverable failure: a missing author list skips the
        // entry, while a malformed name or missing asset aborts the run.
        let Some(first_author) = record.authors.first() else {
            let reason = Error::MissingAuthorField {
                entry: record.id.clone(),
            };
            tracing::warn!(%reason, title = %record.title, "skipping entry");
            self.counts.skipped += 1;
            return Ok(None);
        };
        let stub = self
            .assigner
            .assign(&first_author.family, self.context.stub_date());
        tracing::debug!(entry = %record.id, %stub, "assigned identifier stub");

        let legacy = legacy_layout(self.context.volume_no);
        if legacy {
            self.enrich_legacy(&mut record, &stub);
        } else {
            self.check_primary_asset(&mut record, &stub)?;
        }

        // Link merges and extras key off the entry's original key; the stub
        // only replaces the identity at the very end.
        self.merge_links(&mut record);
        if !legacy {
            self.collect_extras(&mut record, &stub);
        }
        if let Some(other_files) = record.passthrough.remove("other_files") {
            record.extras.push(Extra {
                label: "Other Files".to_string(),
                link: other_files,
            });
        }
        if !legacy {
            record.id = stub;
        }

        self.counts.processed += 1;
        Ok(Some(record))
    }

    /// Standard layout: the primary document must already sit at its
    /// derived path.
    fn check_primary_asset(&self, record: &mut CanonicalRecord, stub: &str) -> Result<()> {
        let pdf_path = self
            .assets_root
            .join("assets")
            .join(stub)
            .join(format!("{stub}.pdf"));
        if !pdf_path.is_file() {
            return Err(Error::MissingExpectedAsset(pdf_path));
        }
        record.pdf = Some(format!(
            "{DEFAULT_ASSET_URL_BASE}/{}/main/assets/{stub}/{stub}.pdf",
            self.context.volume_dir
        ));
        Ok(())
    }

    /// Companion files plus the optional table-supplied link become extras.
    fn collect_extras(&self, record: &mut CanonicalRecord, stub: &str) {
        let asset_dir = self.assets_root.join("assets").join(stub);
        for companion in companion_files(&asset_dir, stub) {
            let extension = Path::new(&companion)
                .extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or_default()
                .to_uppercase();
            record.extras.push(Extra {
                label: format!("Supplementary {extension}"),
                link: format!(
                    "{DEFAULT_ASSET_URL_BASE}/{}/main/assets/{stub}/{companion}",
                    self.context.volume_dir
                ),
            });
        }
        if let Some(link) = self.tables.supplementary.get(&record.id) {
            record.extras.push(Extra {
                label: self.tables.supplementary_label.clone(),
                link: link.clone(),
            });
        }
    }

    /// Legacy volumes keep their original keys and site-served paths; no
    /// asset presence check applies.
    fn enrich_legacy(&self, record: &mut CanonicalRecord, stub: &str) {
        record.pdf = Some(format!(
            "{SITE_URL}/{}/{}.pdf",
            self.context.volume_dir, record.id
        ));
        let supplement = record
            .passthrough
            .get("supplementary")
            .and_then(|value| value.split(':').next_back())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{stub}-supp.pdf"));
        record.passthrough.insert(
            "supplementary".to_string(),
            format!(
                "{SITE_URL}/{}/assets/{supplement}",
                self.context.volume_dir
            ),
        );
    }

    /// Table links fill in only when the record does not already define the
    /// field.
    fn merge_links(&self, record: &mut CanonicalRecord) {
        if record.software.is_none() {
            record.software = self.tables.software.get(&record.id).cloned();
        }
        if record.video.is_none() {
            record.video = self.tables.video.get(&record.id).cloned();
        }
        if record.supp.is_none() {
            record.supp = self.tables.supplementary.get(&record.id).cloned();
        }
    }
}

/// Volume ranges that never conformed to the per-stub asset layout.
fn legacy_layout(volume_no: u32) -> bool {
    (27..=53).contains(&volume_no)
        || (55..=56).contains(&volume_no)
        || (63..=64).contains(&volume_no)
}

/// `<stub>-supp.*` companions in the record's asset directory, sorted for
/// deterministic extras ordering.
fn companion_files(asset_dir: &Path, stub: &str) -> Vec<String> {
    let prefix = format!("{stub}-supp.");
    let Ok(entries) = fs::read_dir(asset_dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with(&prefix))
        .collect();
    names.sort();
    names
}

/// Record file name: published date then identifier.
pub fn record_filename(record: &CanonicalRecord) -> String {
    let date = record
        .date
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "0000-00-00".to_string());
    format!("{date}-{}.json", record.id)
}
