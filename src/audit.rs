//! Structural audit of raw bibliography text.
//!
//! Four independent defect classes are scanned without mutating the input:
//! unescaped percent signs and empty author slots are line-scoped; brace
//! balance and backslash runs are field-scoped and may span physical lines.
//! Issues are reported, never fixed here; see the autofix module for the one
//! mechanical repair.

/// Direction of a net brace mismatch at field end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Imbalance {
    ExtraOpening,
    ExtraClosing,
}

/// Length class of a suspicious backslash run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackslashRun {
    Double,
    Triple,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    PercentUnescaped { count: usize },
    EmptyAuthorSlot,
    BraceImbalance { direction: Imbalance },
    BackslashAnomaly { run: BackslashRun },
}

/// One located defect. Ephemeral: produced fresh per audit invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub kind: IssueKind,
    pub line: usize,
    pub message: String,
}

/// Fields whose values carry prose and are checked for percent escaping and
/// brace balance.
const TITLE_LIKE: [&str; 3] = ["title", "abstract", "booktitle"];

/// Run all four defect scans over the raw text.
pub fn audit(text: &str) -> Vec<Issue> {
    let mut issues = Vec::new();
    scan_lines(text, &mut issues);
    scan_fields(text, &mut issues);
    issues.sort_by_key(|issue| issue.line);
    issues
}

fn scan_lines(text: &str, issues: &mut Vec<Issue>) {
    for (index, line) in text.lines().enumerate() {
        let number = index + 1;
        if let Some((name, value)) = field_start(line) {
            if TITLE_LIKE.contains(&name) {
                let count = unescaped_percent_count(line);
                if count > 0 {
                    issues.push(Issue {
                        kind: IssueKind::PercentUnescaped { count },
                        line: number,
                        message: format!(
                            "Line {number}: {count} unescaped % character(s) in {name} field"
                        ),
                    });
                }
            }
            if (name == "author" || name == "editor") && has_empty_slot(value) {
                issues.push(Issue {
                    kind: IssueKind::EmptyAuthorSlot,
                    line: number,
                    message: format!(
                        "Line {number}: empty name slot (double comma) in {name} list"
                    ),
                });
            }
        }
    }
}

fn scan_fields(text: &str, issues: &mut Vec<Issue>) {
    for region in field_regions(text) {
        if TITLE_LIKE.contains(&region.name.as_str()) && region.net_depth != 0 {
            let direction = if region.net_depth > 0 {
                Imbalance::ExtraOpening
            } else {
                Imbalance::ExtraClosing
            };
            let word = match direction {
                Imbalance::ExtraOpening => "extra opening brace",
                Imbalance::ExtraClosing => "extra closing brace",
            };
            issues.push(Issue {
                kind: IssueKind::BraceImbalance { direction },
                line: region.start_line,
                message: format!(
                    "Line {}: {word} in {} field",
                    region.start_line, region.name
                ),
            });
        }
        backslash_anomalies(&region, issues);
    }
}

fn backslash_anomalies(region: &FieldRegion, issues: &mut Vec<Issue>) {
    for (offset, line) in region.text.lines().enumerate() {
        let number = region.start_line + offset;
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            if chars[i] != '\\' {
                i += 1;
                continue;
            }
            let mut run = 1;
            while i + run < chars.len() && chars[i + run] == '\\' {
                run += 1;
            }
            let subtype = match run {
                2 => Some(BackslashRun::Double),
                3 => Some(BackslashRun::Triple),
                _ => None,
            };
            if let Some(kind) = subtype {
                let word = match kind {
                    BackslashRun::Double => "double",
                    BackslashRun::Triple => "triple",
                };
                issues.push(Issue {
                    kind: IssueKind::BackslashAnomaly { run: kind },
                    line: number,
                    message: format!(
                        "Line {number}: {word} backslash in {} field: '{}'",
                        region.name,
                        context_window(&chars, i, run)
                    ),
                });
            }
            i += run;
        }
    }
}

/// Surrounding text attached to a backslash report.
fn context_window(chars: &[char], start: usize, run: usize) -> String {
    let from = start.saturating_sub(20);
    let to = (start + run + 20).min(chars.len());
    chars[from..to].iter().collect()
}

/// A field value possibly spanning several physical lines, with its net
/// brace depth at the point the region ended.
struct FieldRegion {
    name: String,
    start_line: usize,
    text: String,
    net_depth: i32,
}

/// `name = rest` at the start of a line, names being bibliographic field
/// identifiers.
pub(crate) fn field_start(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start();
    let eq = trimmed.find('=')?;
    let name = trimmed[..eq].trim_end();
    if name.is_empty()
        || !name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
        || !name.chars().next().is_some_and(|ch| ch.is_ascii_alphabetic())
    {
        return None;
    }
    Some((name, trimmed[eq + 1..].trim_start()))
}

/// Lines that terminate an unfinished field region: a new field, a new
/// entry, or the closing brace of the enclosing entry.
fn region_boundary(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed == "}" || trimmed.starts_with('@') || field_start(line).is_some()
}

fn field_regions(text: &str) -> Vec<FieldRegion> {
    let lines: Vec<&str> = text.lines().collect();
    let mut regions = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let Some((name, value)) = field_start(lines[i]) else {
            i += 1;
            continue;
        };
        let mut depth = brace_depth(value, 0);
        let mut collected = vec![value.to_string()];
        let mut j = i;
        while depth > 0 && j + 1 < lines.len() && !region_boundary(lines[j + 1]) {
            j += 1;
            collected.push(lines[j].to_string());
            depth = brace_depth(lines[j], depth);
        }
        regions.push(FieldRegion {
            name: name.to_string(),
            start_line: i + 1,
            text: collected.join("\n"),
            net_depth: depth,
        });
        i = j + 1;
    }
    regions
}

/// Running brace depth over one fragment; escaped braces do not count.
fn brace_depth(fragment: &str, start: i32) -> i32 {
    let mut depth = start;
    let mut prev = '\0';
    for ch in fragment.chars() {
        match ch {
            '{' if prev != '\\' => depth += 1,
            '}' if prev != '\\' => depth -= 1,
            _ => {}
        }
        prev = ch;
    }
    depth
}

/// Count of `%` characters not immediately preceded by an escape.
fn unescaped_percent_count(line: &str) -> usize {
    let chars: Vec<char> = line.chars().collect();
    chars
        .iter()
        .enumerate()
        .filter(|&(i, &ch)| ch == '%' && i > 0 && chars[i - 1] != '\\')
        .count()
}

/// Two name-separator commas with only whitespace between them.
fn has_empty_slot(value: &str) -> bool {
    let mut after_comma = false;
    for ch in value.chars() {
        match ch {
            ',' if after_comma => return true,
            ',' => after_comma = true,
            ch if ch.is_whitespace() => {}
            _ => after_comma = false,
        }
    }
    false
}
