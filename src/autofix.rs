//! Mechanical repair of audited issues.
//!
//! Only the percent-escaping fix is safe to apply automatically. Author,
//! brace, and backslash issues always require human judgment and are left
//! for the operator.

/// Rewritten text and the number of escapes inserted.
#[derive(Debug)]
pub struct FixOutcome {
    pub text: String,
    pub replacements: usize,
}

impl FixOutcome {
    pub fn summary(&self) -> String {
        format!("Fixed {} unescaped % character(s)", self.replacements)
    }
}

/// Escape every `%` in title/abstract field lines that is not already
/// escaped. Already-escaped occurrences are untouched, so applying the fix
/// twice changes nothing.
pub fn fix_unescaped_percent(text: &str) -> FixOutcome {
    let mut replacements = 0;
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        if is_fixable_line(line) {
            let (fixed, count) = escape_percents(line);
            replacements += count;
            out.push_str(&fixed);
        } else {
            out.push_str(line);
        }
    }
    FixOutcome {
        text: out,
        replacements,
    }
}

fn is_fixable_line(line: &str) -> bool {
    let Some((name, _)) = crate::audit::field_start(line) else {
        return false;
    };
    matches!(name, "title" | "abstract" | "booktitle")
}

/// Insert `\` before each unescaped `%`. Matching is non-overlapping the way
/// a `([^\\])%` substitution is: the percent of a fixed pair is not treated
/// as the preceding character of the next.
fn escape_percents(line: &str) -> (String, usize) {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut count = 0;
    let mut consumed_end = 0;
    for (i, &ch) in chars.iter().enumerate() {
        if ch == '%' && i > 0 && chars[i - 1] != '\\' && i - 1 >= consumed_end {
            out.push('\\');
            count += 1;
            consumed_end = i + 1;
        }
        out.push(ch);
    }
    (out, count)
}
