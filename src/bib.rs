//! Narrow entry-parsing collaborator.
//!
//! The pipeline does not own a bibliographic grammar; it consumes entries as
//! a key plus a field-name→raw-text map. This module is the single seam
//! where that shape is produced: a brace-aware scanner over
//! `@type{key, name = value, ...}` blocks with `@string` abbreviation
//! substitution. Anything richer (cross-references, concatenation) is out
//! of scope.
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// One unparsed record: entry key plus raw field text, owned transiently
/// while the entry is processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub key: String,
    pub entry_type: String,
    pub fields: BTreeMap<String, String>,
}

impl RawEntry {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Scan the whole input into entries, applying `@string` substitutions to
/// bare tokens. `@comment` and `@preamble` blocks are skipped.
pub fn parse_entries(text: &str) -> Result<Vec<RawEntry>> {
    let mut scanner = Scanner::new(text);
    let mut strings: BTreeMap<String, String> = BTreeMap::new();
    let mut entries = Vec::new();

    while scanner.seek_entry() {
        let entry_type = scanner.ident().to_ascii_lowercase();
        match entry_type.as_str() {
            "comment" | "preamble" => {
                scanner.skip_group()?;
            }
            "string" => {
                let fields = scanner.fields(&strings, None)?;
                strings.extend(fields);
            }
            _ => {
                scanner.expect('{')?;
                let key = scanner.until(&[',', '}']).trim().to_string();
                if key.is_empty() {
                    return Err(Error::MalformedEntry(format!(
                        "entry at line {} has no key",
                        scanner.line
                    )));
                }
                if scanner.peek() == Some(',') {
                    scanner.advance();
                }
                let fields = scanner.body_fields(&strings, &key)?;
                entries.push(RawEntry {
                    key,
                    entry_type,
                    fields,
                });
            }
        }
    }
    Ok(entries)
}

/// Entries of one type, in source order. Order matters downstream: stub
/// disambiguation is a function of the entries seen so far.
pub fn entries_of_type<'a>(entries: &'a [RawEntry], entry_type: &str) -> Vec<&'a RawEntry> {
    entries
        .iter()
        .filter(|entry| entry.entry_type == entry_type)
        .collect()
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Scanner {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        if ch == '\n' {
            self.line += 1;
        }
        self.pos += 1;
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    /// Advance to the next `@`; returns false at end of input.
    fn seek_entry(&mut self) -> bool {
        while let Some(ch) = self.peek() {
            if ch == '@' {
                self.advance();
                return true;
            }
            self.advance();
        }
        false
    }

    fn ident(&mut self) -> String {
        let mut out = String::new();
        while self
            .peek()
            .is_some_and(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
        {
            if let Some(ch) = self.advance() {
                out.push(ch);
            }
        }
        out
    }

    fn expect(&mut self, wanted: char) -> Result<()> {
        self.skip_whitespace();
        match self.advance() {
            Some(ch) if ch == wanted => Ok(()),
            other => Err(Error::MalformedEntry(format!(
                "expected '{wanted}' at line {}, found {:?}",
                self.line, other
            ))),
        }
    }

    /// Consume up to (not including) the first of `stops`.
    fn until(&mut self, stops: &[char]) -> String {
        let mut out = String::new();
        while let Some(ch) = self.peek() {
            if stops.contains(&ch) {
                break;
            }
            self.advance();
            out.push(ch);
        }
        out
    }

    /// Skip a balanced `{...}` group (for `@comment`/`@preamble`).
    fn skip_group(&mut self) -> Result<()> {
        self.expect('{')?;
        let mut depth = 1;
        let mut prev = '\0';
        while let Some(ch) = self.advance() {
            match ch {
                '{' if prev != '\\' => depth += 1,
                '}' if prev != '\\' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
            prev = ch;
        }
        Err(Error::MalformedEntry(format!(
            "unterminated block at line {}",
            self.line
        )))
    }

    /// Fields of a `@string` block, including its delimiters.
    fn fields(
        &mut self,
        strings: &BTreeMap<String, String>,
        entry_key: Option<&str>,
    ) -> Result<BTreeMap<String, String>> {
        self.expect('{')?;
        self.parse_field_list(strings, entry_key)
    }

    /// Fields of a regular entry whose opening brace and key were already
    /// consumed.
    fn body_fields(
        &mut self,
        strings: &BTreeMap<String, String>,
        entry_key: &str,
    ) -> Result<BTreeMap<String, String>> {
        self.parse_field_list(strings, Some(entry_key))
    }

    fn parse_field_list(
        &mut self,
        strings: &BTreeMap<String, String>,
        entry_key: Option<&str>,
    ) -> Result<BTreeMap<String, String>> {
        let mut fields = BTreeMap::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('}') => {
                    self.advance();
                    return Ok(fields);
                }
                Some(',') => {
                    self.advance();
                    continue;
                }
                Some(_) => {}
                None => {
                    return Err(Error::MalformedEntry(format!(
                        "unterminated entry{} at line {}",
                        entry_key
                            .map(|key| format!(" '{key}'"))
                            .unwrap_or_default(),
                        self.line
                    )));
                }
            }
            let name = self.ident().to_ascii_lowercase();
            if name.is_empty() {
                return Err(Error::MalformedEntry(format!(
                    "expected field name at line {}",
                    self.line
                )));
            }
            self.expect('=')?;
            let value = self.field_value(strings)?;
            fields.insert(name, value);
        }
    }

    fn field_value(&mut self, strings: &BTreeMap<String, String>) -> Result<String> {
        self.skip_whitespace();
        let value = match self.peek() {
            Some('{') => self.braced_value()?,
            Some('"') => self.quoted_value()?,
            Some(_) => {
                let token = self.until(&[',', '}']).trim().to_string();
                strings.get(&token.to_ascii_lowercase()).cloned().unwrap_or(token)
            }
            None => {
                return Err(Error::MalformedEntry(format!(
                    "missing field value at line {}",
                    self.line
                )));
            }
        };
        Ok(collapse_whitespace(&value))
    }

    fn braced_value(&mut self) -> Result<String> {
        self.advance();
        let mut depth = 1;
        let mut prev = '\0';
        let mut out = String::new();
        while let Some(ch) = self.advance() {
            match ch {
                '{' if prev != '\\' => depth += 1,
                '}' if prev != '\\' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(out);
                    }
                }
                _ => {}
            }
            out.push(ch);
            prev = ch;
        }
        Err(Error::MalformedEntry(format!(
            "unterminated braced value at line {}",
            self.line
        )))
    }

    fn quoted_value(&mut self) -> Result<String> {
        self.advance();
        let mut prev = '\0';
        let mut out = String::new();
        while let Some(ch) = self.advance() {
            if ch == '"' && prev != '\\' {
                return Ok(out);
            }
            out.push(ch);
            prev = ch;
        }
        Err(Error::MalformedEntry(format!(
            "unterminated quoted value at line {}",
            self.line
        )))
    }
}

/// Physical line breaks and indentation inside a value collapse to single
/// spaces.
fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_type_and_fields() {
        let text = "@InProceedings{smith24,\n  title = {A Title},\n  pages = {1-10},\n}\n";
        let entries = parse_entries(text).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.key, "smith24");
        assert_eq!(entry.entry_type, "inproceedings");
        assert_eq!(entry.field("title"), Some("A Title"));
        assert_eq!(entry.field("pages"), Some("1-10"));
    }

    #[test]
    fn multiline_values_collapse_to_single_spaces() {
        let text = "@inproceedings{a1,\n  title = {A Title that\n      continues below},\n}\n";
        let entries = parse_entries(text).unwrap();
        assert_eq!(
            entries[0].field("title"),
            Some("A Title that continues below")
        );
    }

    #[test]
    fn nested_braces_stay_in_the_raw_value() {
        let text = "@inproceedings{a1,\n  title = {The {HMM} Model},\n}\n";
        let entries = parse_entries(text).unwrap();
        assert_eq!(entries[0].field("title"), Some("The {HMM} Model"));
    }

    #[test]
    fn string_abbreviations_substitute_into_bare_tokens() {
        let text = "@string{pmlr = {Proceedings of Machine Learning Research}}\n@proceedings{v1,\n  series = pmlr,\n}\n";
        let entries = parse_entries(text).unwrap();
        assert_eq!(
            entries[0].field("series"),
            Some("Proceedings of Machine Learning Research")
        );
    }

    #[test]
    fn comment_blocks_are_skipped() {
        let text = "@comment{not an entry}\n@inproceedings{a1,\n  title = {T},\n}\n";
        let entries = parse_entries(text).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "a1");
    }

    #[test]
    fn unterminated_entry_is_malformed() {
        let err = parse_entries("@inproceedings{a1,\n  title = {T},\n").unwrap_err();
        assert!(matches!(err, Error::MalformedEntry(_)));
    }

    #[test]
    fn entries_of_type_preserves_source_order() {
        let text = "@proceedings{v1, year = {2024}}\n@inproceedings{b, title = {B}}\n@inproceedings{a, title = {A}}\n";
        let entries = parse_entries(text).unwrap();
        let papers = entries_of_type(&entries, "inproceedings");
        let keys: Vec<&str> = papers.iter().map(|entry| entry.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }
}
