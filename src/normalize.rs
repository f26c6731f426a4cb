//! Conversion of a raw entry into a canonical publication record.
//!
//! One record is derived from one entry: markup is decoded, pages and dates
//! are parsed, author and editor lists are decomposed, and section metadata
//! is reconstructed. Enrichment fields (identifier, asset URL, external
//! links, extras) stay empty here; the assembler fills them in.
use crate::bib::RawEntry;
use crate::error::{Error, Result};
use crate::latex::LatexDecoder;
use crate::names::{parse_person, split_name_list};
use crate::volume::{self, Section, VolumeContext};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// A page bound that is numeric when it looks numeric and text otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PageNumber {
    Numeric(i64),
    Text(String),
}

impl PageNumber {
    fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(value) => PageNumber::Numeric(value),
            Err(_) => PageNumber::Text(trimmed.to_string()),
        }
    }

    fn display(&self) -> String {
        match self {
            PageNumber::Numeric(value) => value.to_string(),
            PageNumber::Text(text) => text.clone(),
        }
    }

    fn order_value(&self) -> i64 {
        match self {
            PageNumber::Numeric(value) => *value,
            PageNumber::Text(_) => 0,
        }
    }
}

/// One decoded author or editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Person {
    pub given: String,
    pub family: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

/// A supplementary link attached during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extra {
    pub label: String,
    pub link: String,
}

/// Citation-style issued date, year/month/day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issued {
    #[serde(rename = "date-parts")]
    pub date_parts: Vec<i32>,
}

/// Normalized output for one publication, immutable once assembled except
/// for the enrichment fields the assembler appends.
#[derive(Debug, Clone, Serialize)]
pub struct CanonicalRecord {
    pub id: String,
    pub layout: String,
    pub series: String,
    pub publisher: String,
    pub issn: String,
    pub title: String,
    pub tex_title: String,
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(rename = "author", skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Person>,
    #[serde(rename = "editor", skip_serializing_if = "Vec::is_empty")]
    pub editors: Vec<Person>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bibtex_author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bibtex_editor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firstpage: Option<PageNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastpage: Option<PageNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firstpublished: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<Section>,
    pub cycles: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(rename = "container-title", skip_serializing_if = "Option::is_none")]
    pub container_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued: Option<Issued>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf: Option<String>,
    pub extras: Vec<Extra>,
    /// Remaining raw fields carried through verbatim (url, year, ...).
    #[serde(flatten)]
    pub passthrough: BTreeMap<String, String>,
}

/// Fields consumed into typed record slots; everything else passes through.
const CONSUMED: [&str; 15] = [
    "title",
    "abstract",
    "author",
    "editor",
    "pages",
    "published",
    "firstpublished",
    "start",
    "end",
    "sections",
    "section",
    "month_numeric",
    "software",
    "video",
    "supp",
];

pub struct RecordNormalizer {
    decoder: LatexDecoder,
}

impl RecordNormalizer {
    pub fn new() -> Self {
        Self {
            decoder: LatexDecoder::new(),
        }
    }

    pub fn decoder(&self) -> &LatexDecoder {
        &self.decoder
    }

    /// Normalize one entry against its volume context.
    pub fn normalize(&self, entry: &RawEntry, context: &VolumeContext) -> Result<CanonicalRecord> {
        let title_raw = entry.field("title").unwrap_or_default();
        let abstract_text = match entry.field("abstract") {
            // Empty abstracts are dropped rather than emitted as "".
            Some("") | None => None,
            Some(raw) => Some(self.decoder.decode_abstract(raw, &entry.key)?),
        };

        let authors = self.persons(entry, "author")?;
        let editors = self.persons(entry, "editor")?;

        let pages = entry.field("pages").map(split_pages).unwrap_or_default();

        let published = entry
            .field("published")
            .map(|raw| volume::parse_leading_date(raw, &entry.key, "published"))
            .transpose()?;
        let firstpublished = entry
            .field("firstpublished")
            .map(|raw| volume::parse_leading_date(raw, &entry.key, "firstpublished"))
            .transpose()?;
        let start = entry
            .field("start")
            .map(|raw| volume::parse_leading_date(raw, &entry.key, "start"))
            .transpose()?;
        let end = entry
            .field("end")
            .map(|raw| volume::parse_leading_date(raw, &entry.key, "end"))
            .transpose()?;

        let (sections, cycles) = volume::parse_sections(
            entry.field("sections"),
            entry.field("published"),
            &entry.key,
        )?;

        let month = entry
            .field("month_numeric")
            .and_then(|raw| raw.trim().parse::<u32>().ok());

        // Optional-workflow fields (opt*) are working notes, not record data.
        let passthrough: BTreeMap<String, String> = entry
            .fields
            .iter()
            .filter(|(name, _)| !CONSUMED.contains(&name.as_str()) && !name.starts_with("opt"))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Ok(CanonicalRecord {
            id: entry.key.clone(),
            layout: entry.entry_type.clone(),
            series: volume::SERIES.to_string(),
            publisher: volume::PUBLISHER.to_string(),
            issn: volume::ISSN.to_string(),
            title: self.decoder.decode(title_raw),
            tex_title: self.decoder.decode_tex(title_raw),
            abstract_text,
            authors,
            editors,
            bibtex_author: entry.field("author").map(str::to_string),
            bibtex_editor: entry.field("editor").map(str::to_string),
            firstpage: pages.firstpage,
            lastpage: pages.lastpage,
            page: pages.page,
            order: pages.order,
            month,
            published: published.or_else(|| Some(context.stub_date())),
            firstpublished,
            start,
            end,
            sections,
            cycles,
            section: entry.field("section").map(str::to_string),
            number: None,
            date: None,
            note: None,
            address: None,
            container_title: None,
            volume: None,
            genre: None,
            issued: None,
            software: entry.field("software").map(str::to_string),
            video: entry.field("video").map(str::to_string),
            supp: entry.field("supp").map(str::to_string),
            pdf: None,
            extras: Vec::new(),
            passthrough,
        })
    }

    /// Decode an author/editor field into persons. Any person with an empty
    /// given or family part after decoding is fatal and names the entry.
    fn persons(&self, entry: &RawEntry, field: &'static str) -> Result<Vec<Person>> {
        let Some(raw) = entry.field(field) else {
            return Ok(Vec::new());
        };
        let mut persons = Vec::new();
        for (index, person_text) in split_name_list(raw).into_iter().enumerate() {
            let raw_name = parse_person(&person_text);
            let given = self.decoder.decode(&raw_name.given);
            let family = self.decoder.decode(&raw_name.family);
            if given.trim().is_empty() {
                return Err(Error::MalformedPersonName {
                    entry: entry.key.clone(),
                    field,
                    index,
                    part: "given",
                });
            }
            if family.trim().is_empty() {
                return Err(Error::MalformedPersonName {
                    entry: entry.key.clone(),
                    field,
                    index,
                    part: "family",
                });
            }
            persons.push(Person {
                given,
                family,
                prefix: raw_name
                    .prefix
                    .map(|prefix| self.decoder.decode(&prefix))
                    .filter(|prefix| !prefix.trim().is_empty()),
                suffix: raw_name
                    .suffix
                    .map(|suffix| self.decoder.decode(&suffix))
                    .filter(|suffix| !suffix.trim().is_empty()),
            });
        }
        Ok(persons)
    }
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Typed view of a `first-last` pages field.
#[derive(Debug, Default)]
struct PageFields {
    firstpage: Option<PageNumber>,
    lastpage: Option<PageNumber>,
    page: Option<String>,
    order: Option<i64>,
}

fn split_pages(raw: &str) -> PageFields {
    let parts: Vec<&str> = raw.split('-').collect();
    let firstpage = parts.first().map(|part| PageNumber::parse(part));
    let lastpage = parts.last().map(|part| PageNumber::parse(part));
    let page = match (&firstpage, &lastpage) {
        (Some(first), Some(last)) => Some(format!("{}-{}", first.display(), last.display())),
        _ => None,
    };
    let order = firstpage.as_ref().map(PageNumber::order_value);
    PageFields {
        firstpage,
        lastpage,
        page,
        order,
    }
}
