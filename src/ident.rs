//! Deterministic short identifiers for publication records.
//!
//! A stub is `slug(family) + two-digit year + disambiguation letters`. The
//! letter suffix is bijective base-26, so collisions resolve a, b, ... z,
//! aa, ab, ... deterministically. State is run-scoped: replaying the same
//! entry sequence from fresh state yields the same stubs.
use chrono::NaiveDate;
use std::collections::BTreeSet;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Letter suffix for a zero-based collision index, in bijective base-26
/// numeration: 0 -> "a", 25 -> "z", 26 -> "aa".
pub fn disambiguation_letters(index: usize) -> String {
    let mut letters = [0u8; 16];
    let mut used = 0;
    let mut n = index;
    loop {
        let (div, rem) = (n / 26, n % 26);
        letters[used] = b'a' + rem as u8;
        used += 1;
        if div == 0 || used == letters.len() {
            break;
        }
        n = div - 1;
    }
    letters[..used].iter().rev().map(|&b| b as char).collect()
}

/// URL-safe slug: marks stripped, lowercased, non-alphanumeric runs
/// collapsed to single dashes.
pub fn slugify(text: &str) -> String {
    let stripped: String = text.nfd().filter(|ch| !is_combining_mark(*ch)).collect();
    let mut slug = String::with_capacity(stripped.len());
    let mut pending_dash = false;
    for ch in stripped.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Run-scoped assigner. Registering happens inside `assign`, so a returned
/// stub is already reserved.
#[derive(Debug, Default)]
pub struct IdentifierAssigner {
    issued: BTreeSet<String>,
}

impl IdentifierAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compose the next free stub for a family name and stub date.
    pub fn assign(&mut self, family: &str, stub_date: NaiveDate) -> String {
        let year = stub_date.format("%y").to_string();
        let mut count = 0;
        loop {
            let stub = slugify(&format!(
                "{}{year}{}",
                family.to_lowercase(),
                disambiguation_letters(count)
            ));
            if self.issued.insert(stub.clone()) {
                return stub;
            }
            count += 1;
        }
    }

    pub fn issued_count(&self) -> usize {
        self.issued.len()
    }
}
