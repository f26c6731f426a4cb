//! Person-name decomposition for author and editor fields.
//!
//! Implements the conventional name grammar: `and`-separated persons, each
//! written as `Family, Given`, `Family, Suffix, Given`, or `Given Family`,
//! with a run of lowercase particles ("von", "van der", "de la") forming the
//! prefix. Braced groups are opaque: separators inside them do not split.

/// Raw name parts before LaTeX decoding. Empty strings mean the part was
/// absent; the normalizer decides whether that is fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawName {
    pub given: String,
    pub family: String,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
}

/// Split an author/editor field into individual person strings on the
/// `and` separator at brace depth zero.
pub fn split_name_list(raw: &str) -> Vec<String> {
    let mut persons: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for word in raw.split_whitespace() {
        let open = word.matches('{').count();
        let close = word.matches('}').count();
        if depth == 0 && word == "and" {
            if !current.trim().is_empty() {
                persons.push(current.trim().to_string());
            }
            current = String::new();
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        depth = depth.saturating_add(open).saturating_sub(close);
    }
    if !current.trim().is_empty() {
        persons.push(current.trim().to_string());
    }
    persons
}

/// Decompose one person string into its parts.
pub fn parse_person(raw: &str) -> RawName {
    let parts = split_top_level(raw, ',');
    match parts.len() {
        0 => RawName::default(),
        1 => parse_given_family(&parts[0]),
        2 => parse_family_first(&parts[0], None, &parts[1]),
        _ => parse_family_first(&parts[0], Some(parts[1].as_str()), &parts[2..].join(", ")),
    }
}

/// `Given [particles] Family` form.
fn parse_given_family(text: &str) -> RawName {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    match tokens.len() {
        0 => RawName::default(),
        1 => RawName {
            family: tokens[0].to_string(),
            ..RawName::default()
        },
        _ => {
            let last = tokens.len() - 1;
            let first_lower = tokens[..last].iter().position(|token| is_particle(token));
            match first_lower {
                None => RawName {
                    given: tokens[..last].join(" "),
                    family: tokens[last].to_string(),
                    ..RawName::default()
                },
                Some(start) => {
                    let mut end = start;
                    for (offset, token) in tokens[start..last].iter().enumerate() {
                        if is_particle(token) {
                            end = start + offset;
                        }
                    }
                    RawName {
                        given: tokens[..start].join(" "),
                        prefix: Some(tokens[start..=end].join(" ")),
                        family: tokens[end + 1..].join(" "),
                        suffix: None,
                    }
                }
            }
        }
    }
}

/// `[particles] Family, [Suffix,] Given` form.
fn parse_family_first(family_part: &str, suffix: Option<&str>, given: &str) -> RawName {
    let tokens: Vec<&str> = family_part.split_whitespace().collect();
    let particle_end = tokens
        .iter()
        .take(tokens.len().saturating_sub(1))
        .take_while(|token| is_particle(token))
        .count();
    let prefix = if particle_end > 0 {
        Some(tokens[..particle_end].join(" "))
    } else {
        None
    };
    RawName {
        given: given.trim().to_string(),
        family: tokens[particle_end..].join(" "),
        prefix,
        suffix: suffix.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
    }
}

/// Particles are tokens whose first alphabetic character is lowercase.
fn is_particle(token: &str) -> bool {
    token
        .chars()
        .find(|ch| ch.is_alphabetic())
        .is_some_and(|ch| ch.is_lowercase())
}

fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut prev = '\0';
    for ch in text.chars() {
        match ch {
            '{' if prev != '\\' => depth += 1,
            '}' if prev != '\\' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if ch == separator && depth == 0 {
            parts.push(current.trim().to_string());
            current = String::new();
        } else {
            current.push(ch);
        }
        prev = ch;
    }
    let trimmed = current.trim();
    if !trimmed.is_empty() || !parts.is_empty() {
        parts.push(trimmed.to_string());
    }
    parts
}
