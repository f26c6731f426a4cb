//! Applies a finalized substitution map to bibliography text.
//!
//! All mapped characters are matched by one combined pattern and replaced in
//! a single pass per line, so replacement text is never re-scanned and a
//! second run over already-rewritten text is a no-op.
use regex::Regex;
use std::collections::BTreeMap;

/// Rewritten text plus per-character replacement counts.
#[derive(Debug)]
pub struct RewriteOutcome {
    pub text: String,
    pub counts: BTreeMap<char, usize>,
}

impl RewriteOutcome {
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Summary in the `char->replacement` form printed after a tidy run.
    pub fn summary(&self, map: &BTreeMap<char, String>) -> String {
        let parts: Vec<String> = self
            .counts
            .keys()
            .filter_map(|ch| map.get(ch).map(|replacement| format!("{ch}->{replacement}")))
            .collect();
        parts.join(", ")
    }
}

/// Replace every occurrence of a mapped character. Total over the input:
/// characters absent from the map are left untouched.
pub fn rewrite(text: &str, map: &BTreeMap<char, String>) -> RewriteOutcome {
    if map.is_empty() {
        return RewriteOutcome {
            text: text.to_string(),
            counts: BTreeMap::new(),
        };
    }
    for (ch, replacement) in map {
        if map.keys().any(|other| other != ch && replacement.contains(*other)) {
            tracing::warn!(%ch, %replacement, "replacement contains another pending substitution target");
        }
    }

    let pattern: String = map
        .keys()
        .map(|ch| regex::escape(&ch.to_string()))
        .collect::<Vec<_>>()
        .join("|");
    // The pattern is an alternation of escaped literals; compilation cannot
    // fail on any map the resolver produces.
    let combined = match Regex::new(&pattern) {
        Ok(regex) => regex,
        Err(err) => {
            tracing::warn!(%err, "substitution pattern failed to compile; text left unchanged");
            return RewriteOutcome {
                text: text.to_string(),
                counts: BTreeMap::new(),
            };
        }
    };

    let mut counts: BTreeMap<char, usize> = BTreeMap::new();
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let rewritten = combined.replace_all(line, |caps: &regex::Captures| {
            let matched = &caps[0];
            let ch = matched.chars().next().unwrap_or_default();
            *counts.entry(ch).or_default() += 1;
            map.get(&ch).cloned().unwrap_or_else(|| matched.to_string())
        });
        out.push_str(&rewritten);
    }
    RewriteOutcome { text: out, counts }
}
