//! Substitution resolution for inventoried characters.
//!
//! Each character is decided once per run: from the store, from the
//! operator, or by policy (strict failure / lenient pass-through). Prompting
//! sits behind [`Prompter`] so batch runs and tests can inject scripted
//! implementations without touching real streams.
use crate::error::{Error, Result};
use crate::inventory::character_name;
use crate::store::{sanitize_replacement, Origin, SubstitutionStore};
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

/// Independent policy switches consumed from the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolvePolicy {
    pub auto_accept: bool,
    pub strict: bool,
    pub interactive: bool,
    pub verbose: bool,
    pub quiet: bool,
}

/// Capability to ask the operator for a replacement.
pub trait Prompter {
    /// Returns the operator's raw answer. An empty answer accepts
    /// `suggestion` when one exists.
    fn resolve(&mut self, ch: char, name: &str, suggestion: Option<&str>) -> io::Result<String>;
}

/// Blocking console prompt. The pipeline suspends on this until the
/// operator answers; there is no timeout.
pub struct ConsolePrompter;

impl Prompter for ConsolePrompter {
    fn resolve(&mut self, ch: char, name: &str, suggestion: Option<&str>) -> io::Result<String> {
        match suggestion {
            Some(suggestion) => print!(
                "Unicode character '{ch}' ({name}) detected. Suggested replacement: '{suggestion}'. Press Enter to accept or type a new replacement: "
            ),
            None => print!(
                "Unicode character '{ch}' ({name}) detected. Please provide a replacement: "
            ),
        }
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    }
}

/// Outcome of resolving one run's inventory.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Finalized replacement per character, fed to the rewriter.
    pub map: BTreeMap<char, String>,
    /// Characters left untouched under the lenient policy.
    pub passed_through: Vec<char>,
}

/// Decide a replacement for every inventoried character.
///
/// Newly learned or changed mappings are saved back to the store
/// immediately, so an aborted run keeps the answers given so far.
pub fn resolve_all(
    chars: &[char],
    store: &mut SubstitutionStore,
    policy: &ResolvePolicy,
    prompter: &mut dyn Prompter,
) -> Result<Resolution> {
    let mut resolution = Resolution::default();
    for &ch in chars {
        let name = character_name(ch);
        let stored = store
            .get(ch)
            .map(|entry| sanitize_replacement(&entry.replacement));

        // Auto-accept takes a stored answer without prompting, even when the
        // run is otherwise interactive.
        if let Some(replacement) = stored
            .clone()
            .filter(|_| policy.auto_accept || !policy.interactive)
        {
            if replacement.contains(ch) {
                // A stored replacement that contains its own trigger would
                // re-fire on every run; treat it as unresolved.
                tracing::warn!(%ch, %name, %replacement, "stored replacement contains the original character");
                unresolved(ch, &name, policy, &mut resolution)?;
            } else {
                tracing::debug!(%ch, %name, %replacement, "using stored replacement");
                resolution.map.insert(ch, replacement);
            }
            continue;
        }

        if policy.interactive {
            let replacement = prompt_until_valid(ch, &name, stored.as_deref(), prompter)?;
            if stored.as_deref() != Some(replacement.as_str()) {
                store.insert(ch, &replacement, &name, Origin::Learned);
                store.save()?;
            }
            resolution.map.insert(ch, replacement);
            continue;
        }

        unresolved(ch, &name, policy, &mut resolution)?;
    }
    if policy.verbose && !policy.quiet {
        for (ch, replacement) in &resolution.map {
            println!(
                "Replacement for '{ch}' ({}): '{replacement}'",
                character_name(*ch)
            );
        }
    }
    Ok(resolution)
}

fn unresolved(
    ch: char,
    name: &str,
    policy: &ResolvePolicy,
    resolution: &mut Resolution,
) -> Result<()> {
    if policy.strict {
        return Err(Error::UnresolvableSubstitution {
            ch,
            name: name.to_string(),
        });
    }
    tracing::warn!(%ch, %name, "no substitution found; passing character through unchanged");
    resolution.passed_through.push(ch);
    Ok(())
}

fn prompt_until_valid(
    ch: char,
    name: &str,
    suggestion: Option<&str>,
    prompter: &mut dyn Prompter,
) -> Result<String> {
    loop {
        let answer = prompter.resolve(ch, name, suggestion)?;
        let trimmed = answer.trim();
        let replacement = if trimmed.is_empty() {
            match suggestion {
                Some(suggestion) => suggestion.to_string(),
                // No suggestion to accept: an empty answer means "delete
                // the character", which is a legal replacement.
                None => String::new(),
            }
        } else {
            sanitize_replacement(trimmed)
        };
        if replacement.contains(ch) {
            tracing::warn!(%ch, "replacement contains the original character; asking again");
            continue;
        }
        return Ok(replacement);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scripted prompter returning queued answers in order.
    struct Scripted {
        answers: Vec<String>,
    }

    impl Scripted {
        fn new(answers: &[&str]) -> Self {
            Self {
                answers: answers.iter().rev().map(|s| s.to_string()).collect(),
            }
        }
    }

    impl Prompter for Scripted {
        fn resolve(&mut self, _ch: char, _name: &str, _suggestion: Option<&str>) -> io::Result<String> {
            Ok(self.answers.pop().unwrap_or_default())
        }
    }

    fn policy(auto_accept: bool, strict: bool, interactive: bool) -> ResolvePolicy {
        ResolvePolicy {
            auto_accept,
            strict,
            interactive,
            ..ResolvePolicy::default()
        }
    }

    #[test]
    fn auto_accept_uses_stored_replacement() {
        let mut store = SubstitutionStore::in_memory();
        store.insert('\u{e9}', "\\'e", "LATIN SMALL LETTER E WITH ACUTE", Origin::Learned);
        let mut prompter = Scripted::new(&[]);
        let resolution = resolve_all(
            &['\u{e9}'],
            &mut store,
            &policy(true, true, false),
            &mut prompter,
        )
        .unwrap();
        assert_eq!(resolution.map.get(&'\u{e9}').map(String::as_str), Some("\\'e"));
        assert!(resolution.passed_through.is_empty());
    }

    #[test]
    fn strict_policy_fails_on_unknown_character() {
        let mut store = SubstitutionStore::in_memory();
        let mut prompter = Scripted::new(&[]);
        let err = resolve_all(
            &['\u{2603}'],
            &mut store,
            &policy(true, true, false),
            &mut prompter,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnresolvableSubstitution { ch: '\u{2603}', .. }));
    }

    #[test]
    fn lenient_policy_passes_unknown_character_through() {
        let mut store = SubstitutionStore::in_memory();
        let mut prompter = Scripted::new(&[]);
        let resolution = resolve_all(
            &['\u{2603}'],
            &mut store,
            &policy(true, false, false),
            &mut prompter,
        )
        .unwrap();
        assert!(resolution.map.is_empty());
        assert_eq!(resolution.passed_through, vec!['\u{2603}']);
    }

    #[test]
    fn interactive_answer_is_learned_and_persisted() {
        let mut store = SubstitutionStore::in_memory();
        let mut prompter = Scripted::new(&["e"]);
        let resolution = resolve_all(
            &['\u{e9}'],
            &mut store,
            &policy(false, false, true),
            &mut prompter,
        )
        .unwrap();
        assert_eq!(resolution.map.get(&'\u{e9}').map(String::as_str), Some("e"));
        assert_eq!(store.get('\u{e9}').unwrap().replacement, "e");
    }

    #[test]
    fn interactive_empty_answer_accepts_the_suggestion() {
        let mut store = SubstitutionStore::in_memory();
        store.insert('\u{e9}', "\\'e", "LATIN SMALL LETTER E WITH ACUTE", Origin::Learned);
        let mut prompter = Scripted::new(&["\n"]);
        let resolution = resolve_all(
            &['\u{e9}'],
            &mut store,
            &policy(false, false, true),
            &mut prompter,
        )
        .unwrap();
        assert_eq!(resolution.map.get(&'\u{e9}').map(String::as_str), Some("\\'e"));
    }

    #[test]
    fn self_referential_answers_are_rejected_until_clean() {
        let mut store = SubstitutionStore::in_memory();
        let mut prompter = Scripted::new(&["x\u{e9}x", "e"]);
        let resolution = resolve_all(
            &['\u{e9}'],
            &mut store,
            &policy(false, false, true),
            &mut prompter,
        )
        .unwrap();
        assert_eq!(resolution.map.get(&'\u{e9}').map(String::as_str), Some("e"));
    }

    #[test]
    fn stored_self_referential_replacement_is_treated_as_missing() {
        let mut store = SubstitutionStore::in_memory();
        store.insert('\u{e9}', "x\u{e9}", "LATIN SMALL LETTER E WITH ACUTE", Origin::Learned);
        let mut prompter = Scripted::new(&[]);
        let err = resolve_all(
            &['\u{e9}'],
            &mut store,
            &policy(true, true, false),
            &mut prompter,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnresolvableSubstitution { .. }));
    }
}
