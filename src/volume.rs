//! Volume-level context extracted from the proceedings entry.
//!
//! The proceedings entry carries the dates, sections, and naming that every
//! paper record inherits. Cyclic volumes publish their sections on
//! different dates; the context records the per-section dates so records
//! can be stamped with the date of their own section.
use crate::bib::RawEntry;
use crate::error::{Error, Result};
use crate::latex::LatexDecoder;
use chrono::NaiveDate;
use serde::Serialize;

pub const SERIES: &str = "Proceedings of Machine Learning Research";
pub const PUBLISHER: &str = "PMLR";
pub const ISSN: &str = "2640-3498";

/// Whether a volume is an original volume or a reissue of older material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeType {
    Volume,
    Reissue,
}

impl VolumeType {
    pub fn prefix(self) -> &'static str {
        match self {
            VolumeType::Volume => "v",
            VolumeType::Reissue => "r",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VolumeType::Volume => "Volume",
            VolumeType::Reissue => "Reissue",
        }
    }
}

/// One section of a volume; `published` is set only for cyclic volumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub name: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct VolumeContext {
    pub volume_no: u32,
    pub volume_type: VolumeType,
    /// Directory and repository name, e.g. `v42` or `r7`.
    pub volume_dir: String,
    /// Display label: the bare number for volumes, `R7` style for reissues.
    pub volume_label: String,
    pub booktitle: String,
    pub address: Option<String>,
    pub published: NaiveDate,
    pub firstpublished: Option<NaiveDate>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub sections: Vec<Section>,
    pub cycles: bool,
}

impl VolumeContext {
    /// Build the context from the proceedings entry. A missing published
    /// date falls back to today with a warning, matching long-standing
    /// operator expectations for draft volumes.
    pub fn from_entry(
        entry: &RawEntry,
        volume_no: u32,
        volume_type: VolumeType,
        decoder: &LatexDecoder,
    ) -> Result<Self> {
        let published = match entry.field("published") {
            Some(raw) => parse_leading_date(raw, &entry.key, "published")?,
            None => {
                let today = chrono::Local::now().date_naive();
                tracing::warn!(
                    entry = %entry.key,
                    fallback = %today,
                    "no published date found in proceedings entry; using today's date"
                );
                today
            }
        };
        let firstpublished = entry
            .field("firstpublished")
            .map(|raw| parse_leading_date(raw, &entry.key, "firstpublished"))
            .transpose()?;
        let start = entry
            .field("start")
            .map(|raw| parse_leading_date(raw, &entry.key, "start"))
            .transpose()?;
        let end = entry
            .field("end")
            .map(|raw| parse_leading_date(raw, &entry.key, "end"))
            .transpose()?;

        let (sections, cycles) = parse_sections(
            entry.field("sections"),
            entry.field("published"),
            &entry.key,
        )?;

        let volume_dir = format!("{}{volume_no}", volume_type.prefix());
        let volume_label = match volume_type {
            VolumeType::Volume => volume_no.to_string(),
            VolumeType::Reissue => volume_dir.to_uppercase(),
        };

        Ok(Self {
            volume_no,
            volume_type,
            volume_dir,
            volume_label,
            booktitle: entry
                .field("booktitle")
                .map(|raw| decoder.decode(raw))
                .unwrap_or_default(),
            address: entry.field("address").map(|raw| decoder.decode(raw)),
            published,
            firstpublished,
            start,
            end,
            sections,
            cycles,
        })
    }

    /// Date used for record defaults and stub years: the first publication
    /// date when the volume has one, the volume date otherwise.
    pub fn stub_date(&self) -> NaiveDate {
        self.firstpublished.unwrap_or(self.published)
    }

    /// Section named by a record, with its position, if the volume has it.
    pub fn section_named(&self, name: &str) -> Option<(usize, &Section)> {
        self.sections
            .iter()
            .enumerate()
            .find(|(_, section)| section.name == name)
    }
}

/// Parse `name=title|name=title` section lists. When the published field
/// carries one date per section, the volume is cyclic and each section gets
/// its date.
pub fn parse_sections(
    sections_field: Option<&str>,
    published_field: Option<&str>,
    entry_key: &str,
) -> Result<(Vec<Section>, bool)> {
    let Some(raw) = sections_field else {
        return Ok((Vec::new(), false));
    };
    let names: Vec<&str> = raw.split('|').collect();
    let dates: Vec<&str> = published_field
        .map(|field| field.split('|').collect())
        .unwrap_or_default();
    let dated = dates.len() == names.len();

    let mut sections = Vec::with_capacity(names.len());
    for (index, part) in names.iter().copied().enumerate() {
        let pieces: Vec<&str> = part.split('=').collect();
        let name = pieces.first().copied().unwrap_or(part).trim().to_string();
        let title = pieces.last().copied().unwrap_or(part).trim().to_string();
        let published = if dated {
            Some(parse_leading_date(dates[index], entry_key, "published")?)
        } else {
            None
        };
        sections.push(Section {
            name,
            title,
            published,
        });
    }
    Ok((sections, dated))
}

/// Parse the leading date of a possibly `|`-separated date list.
pub fn parse_leading_date(raw: &str, entry: &str, field: &str) -> Result<NaiveDate> {
    let lead = raw.split('|').next().unwrap_or(raw).trim();
    NaiveDate::parse_from_str(lead, "%Y-%m-%d").map_err(|_| Error::MalformedDate {
        entry: entry.to_string(),
        field: field.to_string(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn proceedings(fields: &[(&str, &str)]) -> RawEntry {
        RawEntry {
            key: "v42".to_string(),
            entry_type: "proceedings".to_string(),
            fields: fields
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn context_carries_dates_and_naming() {
        let entry = proceedings(&[
            ("booktitle", "Conference on Examples"),
            ("published", "2024-07-01"),
            ("start", "2024-06-10"),
            ("end", "2024-06-12"),
        ]);
        let decoder = LatexDecoder::new();
        let context =
            VolumeContext::from_entry(&entry, 42, VolumeType::Volume, &decoder).unwrap();
        assert_eq!(context.volume_dir, "v42");
        assert_eq!(context.volume_label, "42");
        assert_eq!(
            context.published,
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
        );
        assert_eq!(context.stub_date(), context.published);
        assert!(!context.cycles);
    }

    #[test]
    fn reissue_labels_use_the_prefixed_form() {
        let entry = proceedings(&[("booktitle", "B"), ("published", "2020-01-15")]);
        let decoder = LatexDecoder::new();
        let context =
            VolumeContext::from_entry(&entry, 7, VolumeType::Reissue, &decoder).unwrap();
        assert_eq!(context.volume_dir, "r7");
        assert_eq!(context.volume_label, "R7");
    }

    #[test]
    fn matching_section_and_date_counts_make_the_volume_cyclic() {
        let entry = proceedings(&[
            ("booktitle", "B"),
            ("sections", "week1=Week One|week2=Week Two"),
            ("published", "2024-01-08|2024-01-15"),
        ]);
        let decoder = LatexDecoder::new();
        let context =
            VolumeContext::from_entry(&entry, 9, VolumeType::Volume, &decoder).unwrap();
        assert!(context.cycles);
        assert_eq!(context.sections.len(), 2);
        assert_eq!(
            context.sections[1].published,
            Some(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
        );
        // Entry-level published stays the leading date.
        assert_eq!(
            context.published,
            NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()
        );
    }

    #[test]
    fn mismatched_date_count_leaves_sections_undated() {
        let (sections, cycles) = parse_sections(
            Some("a=Alpha|b=Beta"),
            Some("2024-01-08"),
            "v9",
        )
        .unwrap();
        assert!(!cycles);
        assert!(sections.iter().all(|section| section.published.is_none()));
    }

    #[test]
    fn firstpublished_wins_as_the_stub_date() {
        let entry = proceedings(&[
            ("booktitle", "B"),
            ("published", "2024-07-01"),
            ("firstpublished", "2023-12-01"),
        ]);
        let decoder = LatexDecoder::new();
        let context =
            VolumeContext::from_entry(&entry, 3, VolumeType::Volume, &decoder).unwrap();
        assert_eq!(
            context.stub_date(),
            NaiveDate::from_ymd_opt(2023, 12, 1).unwrap()
        );
    }

    #[test]
    fn unparseable_date_is_a_malformed_date_error() {
        let entry = proceedings(&[("booktitle", "B"), ("published", "July 2024")]);
        let decoder = LatexDecoder::new();
        let err =
            VolumeContext::from_entry(&entry, 3, VolumeType::Volume, &decoder).unwrap_err();
        assert!(matches!(err, Error::MalformedDate { .. }));
    }
}
